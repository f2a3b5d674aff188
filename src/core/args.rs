//! Typed positional event arguments.
//!
//! Arguments cross process boundaries as comma-separated text. They are
//! validated against the trigger's [`ArgKind`] schema when decoded, so
//! machine actions only ever see well-formed values.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a positional argument.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    Int,
    Text,
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => f.write_str("int"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// A single argument value.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Arg {
    Int(i64),
    Text(String),
}

impl Arg {
    pub fn kind(&self) -> ArgKind {
        match self {
            Self::Int(_) => ArgKind::Int,
            Self::Text(_) => ArgKind::Text,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Arg {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Ordered argument list carried by an event.
///
/// # Example
///
/// ```rust
/// use chargepark::core::{Arg, ArgKind, Args};
///
/// let args = Args::from(vec![Arg::Int(20), Arg::Int(100)]);
/// assert_eq!(args.int(1), Some(100));
/// assert!(args.conforms_to(&[ArgKind::Int, ArgKind::Int]));
/// assert!(!args.conforms_to(&[ArgKind::Int]));
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Args(Vec<Arg>);

impl Args {
    /// Empty argument list.
    pub fn none() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arg> {
        self.0.get(index)
    }

    /// Integer at `index`, `None` if absent or not an integer.
    pub fn int(&self, index: usize) -> Option<i64> {
        match self.0.get(index) {
            Some(Arg::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn text(&self, index: usize) -> Option<&str> {
        match self.0.get(index) {
            Some(Arg::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arg> {
        self.0.iter()
    }

    /// Exact arity and per-position kind match.
    pub fn conforms_to(&self, schema: &[ArgKind]) -> bool {
        self.0.len() == schema.len()
            && self
                .0
                .iter()
                .zip(schema)
                .all(|(arg, kind)| arg.kind() == *kind)
    }
}

impl From<Vec<Arg>> for Args {
    fn from(args: Vec<Arg>) -> Self {
        Self(args)
    }
}

impl<const N: usize> From<[i64; N]> for Args {
    fn from(values: [i64; N]) -> Self {
        Self(values.into_iter().map(Arg::Int).collect())
    }
}

impl FromIterator<Arg> for Args {
    fn from_iter<I: IntoIterator<Item = Arg>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_respect_kind() {
        let args = Args::from(vec![Arg::Int(5), Arg::from("green")]);
        assert_eq!(args.int(0), Some(5));
        assert_eq!(args.int(1), None);
        assert_eq!(args.text(1), Some("green"));
        assert_eq!(args.text(2), None);
    }

    #[test]
    fn conformance_requires_exact_arity() {
        let args = Args::from([20, 100]);
        assert!(args.conforms_to(&[ArgKind::Int, ArgKind::Int]));
        assert!(!args.conforms_to(&[ArgKind::Int, ArgKind::Int, ArgKind::Int]));
        assert!(!args.conforms_to(&[ArgKind::Int, ArgKind::Text]));
        assert!(Args::none().conforms_to(&[]));
    }

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(Arg::Int(-3).to_string(), "-3");
        assert_eq!(Arg::from("abc").to_string(), "abc");
        assert_eq!(ArgKind::Int.to_string(), "int");
    }
}
