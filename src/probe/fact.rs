//! Fact identity and typed values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactKind {
    /// Unsigned integer
    Integer,
    /// Floating point number
    Float,
    /// Free-form text
    Text,
    /// List of strings
    List,
}

/// Unit attached to a numeric fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Plain count (cores, threads)
    Count,
    /// Megahertz
    Megahertz,
    /// Bytes
    Bytes,
}

impl Unit {
    /// Short suffix used when rendering values
    pub fn suffix(&self) -> &'static str {
        match self {
            Unit::Count => "",
            Unit::Megahertz => "MHz",
            Unit::Bytes => "B",
        }
    }
}

/// One named piece of host information
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fact {
    /// Stable identifier, e.g. `cpu.max_freq_mhz`
    pub id: String,
    /// Semantic type of the value
    pub kind: FactKind,
    /// Unit of the value, if numeric
    pub unit: Option<Unit>,
}

impl Fact {
    /// Create a fact without a unit
    pub fn new(id: impl Into<String>, kind: FactKind) -> Self {
        Self {
            id: id.into(),
            kind,
            unit: None,
        }
    }

    /// Integer fact
    pub fn integer(id: impl Into<String>, unit: Unit) -> Self {
        Self::new(id, FactKind::Integer).with_unit(unit)
    }

    /// Float fact
    pub fn float(id: impl Into<String>, unit: Unit) -> Self {
        Self::new(id, FactKind::Float).with_unit(unit)
    }

    /// Text fact
    pub fn text(id: impl Into<String>) -> Self {
        Self::new(id, FactKind::Text)
    }

    /// List fact
    pub fn list(id: impl Into<String>) -> Self {
        Self::new(id, FactKind::List)
    }

    /// Attach a unit
    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }
}

/// A resolved fact value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Unsigned integer
    Integer(u64),
    /// Floating point number
    Float(f64),
    /// Free-form text
    Text(String),
    /// List of strings
    List(Vec<String>),
}

impl FactValue {
    /// Kind of this value
    pub fn kind(&self) -> FactKind {
        match self {
            FactValue::Integer(_) => FactKind::Integer,
            FactValue::Float(_) => FactKind::Float,
            FactValue::Text(_) => FactKind::Text,
            FactValue::List(_) => FactKind::List,
        }
    }

    /// Integer value, if this is an integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FactValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value as float (integers widen)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FactValue::Integer(v) => Some(*v as f64),
            FactValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text value, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FactValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// List value, if this is a list
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FactValue::List(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactValue::Integer(v) => write!(f, "{}", v),
            FactValue::Float(v) => write!(f, "{:.2}", v),
            FactValue::Text(v) => write!(f, "{}", v),
            FactValue::List(v) => write!(f, "{}", v.join(", ")),
        }
    }
}

impl From<u64> for FactValue {
    fn from(v: u64) -> Self {
        FactValue::Integer(v)
    }
}

impl From<f64> for FactValue {
    fn from(v: f64) -> Self {
        FactValue::Float(v)
    }
}

impl From<String> for FactValue {
    fn from(v: String) -> Self {
        FactValue::Text(v)
    }
}

impl From<&str> for FactValue {
    fn from(v: &str) -> Self {
        FactValue::Text(v.to_string())
    }
}

impl From<Vec<String>> for FactValue {
    fn from(v: Vec<String>) -> Self {
        FactValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kinds() {
        assert_eq!(FactValue::from(3u64).kind(), FactKind::Integer);
        assert_eq!(FactValue::from(2.5).kind(), FactKind::Float);
        assert_eq!(FactValue::from("x").kind(), FactKind::Text);
        assert_eq!(FactValue::from(vec!["a".to_string()]).kind(), FactKind::List);
    }

    #[test]
    fn test_integer_widens_to_float() {
        assert_eq!(FactValue::Integer(2800).as_f64(), Some(2800.0));
        assert_eq!(FactValue::Float(1.5).as_u64(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(FactValue::Float(2794.123).to_string(), "2794.12");
        let list = FactValue::List(vec!["eth0".into(), "lo".into()]);
        assert_eq!(list.to_string(), "eth0, lo");
    }

    #[test]
    fn test_fact_constructors() {
        let fact = Fact::integer("cpu.max_freq_mhz", Unit::Megahertz);
        assert_eq!(fact.kind, FactKind::Integer);
        assert_eq!(fact.unit, Some(Unit::Megahertz));
        assert_eq!(Fact::text("os.name").unit, None);
    }
}
