/// Router Module Index
///
/// Routes are grouped by what they demonstrate rather than by who may call
/// them: each flaw has a vulnerable route and a safe route with the same
/// input shape, mounted under `/vuln` and `/safe` respectively.

/// The route index, liveness probe and OpenAPI document.
pub mod public;

/// Deliberately vulnerable handlers, nested under `/vuln`.
pub mod vulnerable;

/// Remediated handlers, nested under `/safe`. The admin guard is attached here.
pub mod safe;
