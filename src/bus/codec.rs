//! Wire format of bus payloads: `trigger` or `trigger,arg1,arg2,...` as UTF-8.
//!
//! Decoding is typed: the trigger must be known to the receiving machine's
//! trigger set and every positional argument must parse as the kind its
//! schema declares. All argument faults are reported together.

use crate::core::{Arg, ArgKind, Args, Trigger};
use std::fmt;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;
use thiserror::Error;

const SEPARATOR: char = ',';

/// One argument that failed to parse.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("argument {position}: expected {expected}, got '{value}'")]
pub struct ArgError {
    pub position: usize,
    pub expected: ArgKind,
    pub value: String,
}

/// Payloads that cannot be turned into a (trigger, args) pair, or back.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("payload is empty")]
    Empty,

    #[error("unknown trigger '{0}'")]
    UnknownTrigger(String),

    #[error("trigger '{trigger}' takes {expected} argument(s), got {received}")]
    Arity {
        trigger: String,
        expected: usize,
        received: usize,
    },

    #[error("trigger '{trigger}' has {} invalid argument(s): {}", .errors.len(), join(.errors))]
    InvalidArguments {
        trigger: String,
        errors: Vec<ArgError>,
    },

    #[error("cannot encode '{0}': separators are not allowed inside fields")]
    Unencodable(String),
}

fn join(errors: &[ArgError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A trigger with its arguments, as carried on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub trigger: String,
    pub args: Args,
}

impl Message {
    pub fn new(trigger: impl Into<String>, args: Args) -> Self {
        Self {
            trigger: trigger.into(),
            args,
        }
    }

    /// Message for a typed trigger.
    pub fn of<T: Trigger>(trigger: T, args: Args) -> Self {
        Self::new(trigger.name(), args)
    }

    /// Serialize to payload bytes.
    ///
    /// Fails when the trigger is empty or any field contains the separator,
    /// since such a payload would decode to something else.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.trigger.is_empty() {
            return Err(ProtocolError::Empty);
        }
        if self.trigger.contains(SEPARATOR) {
            return Err(ProtocolError::Unencodable(self.trigger.clone()));
        }
        if let Some(bad) = self
            .args
            .iter()
            .filter_map(|arg| match arg {
                Arg::Text(text) if text.contains(SEPARATOR) => Some(text),
                _ => None,
            })
            .next()
        {
            return Err(ProtocolError::Unencodable(bad.clone()));
        }
        Ok(self.to_string().into_bytes())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.trigger)?;
        for arg in self.args.iter() {
            write!(f, "{SEPARATOR}{arg}")?;
        }
        Ok(())
    }
}

/// Decode a payload addressed to a machine whose triggers are `T`.
///
/// # Example
///
/// ```
/// use chargepark::bus::decode;
/// use chargepark::core::Args;
/// use chargepark::trigger_enum;
///
/// trigger_enum! {
///     enum Charger {
///         Config => "webserver_charger_config" (Int, Int),
///     }
/// }
///
/// let (trigger, args) = decode::<Charger>(b"webserver_charger_config,20,100").unwrap();
/// assert_eq!(trigger, Charger::Config);
/// assert_eq!(args, Args::from([20, 100]));
/// assert!(decode::<Charger>(b"webserver_charger_config,x,y").is_err());
/// ```
pub fn decode<T: Trigger>(payload: &[u8]) -> Result<(T, Args), ProtocolError> {
    let text = std::str::from_utf8(payload).map_err(|_| ProtocolError::InvalidUtf8)?;
    if text.is_empty() {
        return Err(ProtocolError::Empty);
    }

    let mut fields = text.split(SEPARATOR);
    let name = fields.next().unwrap_or_default();
    let trigger =
        T::from_name(name).ok_or_else(|| ProtocolError::UnknownTrigger(name.to_string()))?;
    // "trigger" carries no argument list at all, as opposed to "trigger," which carries one empty field
    let fields: Vec<&str> = fields.collect();

    let schema = trigger.schema();
    if fields.len() != schema.len() {
        return Err(ProtocolError::Arity {
            trigger: name.to_string(),
            expected: schema.len(),
            received: fields.len(),
        });
    }

    let checks: Vec<Validation<Arg, NonEmptyVec<ArgError>>> = schema
        .iter()
        .zip(fields)
        .enumerate()
        .map(|(position, (kind, raw))| parse_arg(position, *kind, raw))
        .collect();

    match Validation::all_vec(checks) {
        Validation::Success(args) => Ok((trigger, Args::from(args))),
        Validation::Failure(errors) => Err(ProtocolError::InvalidArguments {
            trigger: name.to_string(),
            errors: errors.iter().cloned().collect(),
        }),
    }
}

fn parse_arg(position: usize, kind: ArgKind, raw: &str) -> Validation<Arg, NonEmptyVec<ArgError>> {
    match kind {
        ArgKind::Text => Validation::success(Arg::Text(raw.to_string())),
        ArgKind::Int => match raw.trim().parse::<i64>() {
            Ok(value) => Validation::success(Arg::Int(value)),
            Err(_) => Validation::fail(ArgError {
                position,
                expected: kind,
                value: raw.to_string(),
            }),
        },
    }
}
