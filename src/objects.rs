//! Unrestricted object-graph loading over MessagePack.
//!
//! A payload describes an arbitrary graph of [`Object`] nodes. [`load`] decodes
//! it and rebuilds every node without any filtering. `Construct` nodes name a
//! constructor by string and that name is looked up in [`CONSTRUCTORS`] with no
//! allow-list; the `process` and `shell` constructors launch programs on the
//! host while the graph is still being rebuilt.
//!
//! Unsafe by construction: whoever controls the bytes controls what runs.
//! Never call [`load`] on input you did not produce yourself.

use serde::{Deserialize, Serialize};
use std::process::Command;
use thiserror::Error;

use crate::diagnostics::{SHELL, SHELL_FLAG};

/// Object
///
/// Wire representation of a node in the payload graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Object {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Object>),
    Map(Vec<(Object, Object)>),
    /// Rebuilt by calling the named constructor with the rebuilt `args`.
    Construct { class: String, args: Vec<Object> },
}

/// Value
///
/// A reconstructed node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// Exit code of a program launched during reconstruction.
    ExitStatus(Option<i32>),
}

impl Value {
    /// The runtime type name reported back to the caller.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "()",
            Value::Bool(_) => "bool",
            Value::Int(_) => "i64",
            Value::Float(_) => "f64",
            Value::Str(_) => "String",
            Value::Bytes(_) => "Vec<u8>",
            Value::List(_) => "Vec<Value>",
            Value::Map(_) => "Map<Value, Value>",
            Value::ExitStatus(_) => "ExitStatus",
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed payload: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("unknown class `{0}`")]
    UnknownClass(String),

    #[error("bad arguments for `{class}`: {reason}")]
    BadArguments { class: &'static str, reason: &'static str },

    #[error("`{class}` failed to launch: {source}")]
    Launch {
        class: &'static str,
        #[source]
        source: std::io::Error,
    },
}

type Constructor = fn(Vec<Value>) -> Result<Value, LoadError>;

/// Deepest array/map nesting the decoder accepts. Decoding and reconstruction
/// both recurse once per level, so anything deeper is refused up front rather
/// than exhausting the blocking thread's stack.
pub const MAX_DEPTH: usize = 128;

/// Every class name a payload may reference.
pub const CONSTRUCTORS: &[(&str, Constructor)] = &[
    ("list", construct_list),
    ("string", construct_string),
    ("int", construct_int),
    ("process", construct_process),
    ("shell", construct_shell),
];

/// load
///
/// Decodes `bytes` as an [`Object`] graph and reconstructs it. Blocks while any
/// launched program runs; call it from a blocking context.
///
/// A graph nested deeper than [`MAX_DEPTH`] fails with
/// [`rmp_serde::decode::Error::DepthLimitExceeded`].
pub fn load(bytes: &[u8]) -> Result<Value, LoadError> {
    let mut decoder = rmp_serde::Deserializer::from_read_ref(bytes);
    decoder.set_max_depth(MAX_DEPTH);

    let graph = Object::deserialize(&mut decoder)?;
    reconstruct(graph)
}

fn reconstruct(object: Object) -> Result<Value, LoadError> {
    Ok(match object {
        Object::Nil => Value::Nil,
        Object::Bool(b) => Value::Bool(b),
        Object::Int(i) => Value::Int(i),
        Object::Float(f) => Value::Float(f),
        Object::Str(s) => Value::Str(s),
        Object::Bytes(b) => Value::Bytes(b),
        Object::List(items) => Value::List(
            items
                .into_iter()
                .map(reconstruct)
                .collect::<Result<_, _>>()?,
        ),
        Object::Map(entries) => Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| Ok((reconstruct(k)?, reconstruct(v)?)))
                .collect::<Result<_, LoadError>>()?,
        ),
        Object::Construct { class, args } => {
            let constructor = CONSTRUCTORS
                .iter()
                .find(|(name, _)| *name == class)
                .map(|(_, constructor)| *constructor)
                .ok_or(LoadError::UnknownClass(class))?;

            let args = args
                .into_iter()
                .map(reconstruct)
                .collect::<Result<Vec<_>, _>>()?;

            constructor(args)?
        }
    })
}

fn single(class: &'static str, mut args: Vec<Value>) -> Result<Value, LoadError> {
    match (args.pop(), args.is_empty()) {
        (Some(arg), true) => Ok(arg),
        _ => Err(LoadError::BadArguments {
            class,
            reason: "expected exactly one argument",
        }),
    }
}

fn strings(class: &'static str, args: Vec<Value>) -> Result<Vec<String>, LoadError> {
    args.into_iter()
        .map(|arg| match arg {
            Value::Str(s) => Ok(s),
            _ => Err(LoadError::BadArguments {
                class,
                reason: "expected string arguments",
            }),
        })
        .collect()
}

fn construct_list(args: Vec<Value>) -> Result<Value, LoadError> {
    Ok(Value::List(args))
}

fn construct_string(args: Vec<Value>) -> Result<Value, LoadError> {
    let text = match single("string", args)? {
        Value::Str(s) => s,
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => {
            return Err(LoadError::BadArguments {
                class: "string",
                reason: "expected a scalar",
            });
        }
    };
    Ok(Value::Str(text))
}

fn construct_int(args: Vec<Value>) -> Result<Value, LoadError> {
    let bad = LoadError::BadArguments {
        class: "int",
        reason: "expected an integer literal",
    };
    let int = match single("int", args)? {
        Value::Int(i) => i,
        Value::Float(f) => f as i64,
        Value::Bool(b) => i64::from(b),
        Value::Str(s) => s.trim().parse().map_err(|_| bad)?,
        _ => return Err(bad),
    };
    Ok(Value::Int(int))
}

/// `process(program, arg...)`: runs `program` with the remaining arguments.
fn construct_process(args: Vec<Value>) -> Result<Value, LoadError> {
    let mut argv = strings("process", args)?.into_iter();
    let program = argv.next().ok_or(LoadError::BadArguments {
        class: "process",
        reason: "missing program",
    })?;

    let status = Command::new(program)
        .args(argv)
        .status()
        .map_err(|source| LoadError::Launch {
            class: "process",
            source,
        })?;
    Ok(Value::ExitStatus(status.code()))
}

/// `shell(command_line)`: hands the whole line to the platform shell.
fn construct_shell(args: Vec<Value>) -> Result<Value, LoadError> {
    let line = match single("shell", args)? {
        Value::Str(s) => s,
        _ => {
            return Err(LoadError::BadArguments {
                class: "shell",
                reason: "expected a command line",
            });
        }
    };

    let status = Command::new(SHELL)
        .arg(SHELL_FLAG)
        .arg(&line)
        .status()
        .map_err(|source| LoadError::Launch {
            class: "shell",
            source,
        })?;
    Ok(Value::ExitStatus(status.code()))
}
