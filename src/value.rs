/// Setup values and per-step configs
use serde::{Deserialize, Serialize};

/// Identifier of a step within one game's step list
pub type StepId = String;

/// A concrete value a step can contribute to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    /// Variant toggles and other on/off outcomes
    Bool(bool),
    /// Counts, seat positions, scores
    Number(i64),
    /// A single item (a map, a first player, one product)
    Item(String),
    /// A set of items, kept in the order the step produced them
    Items(Vec<String>),
    /// A combination index into a pool the consumer knows how to rebuild
    Index(u128),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&str> {
        match self {
            Value::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_items(&self) -> Option<&[String]> {
        match self {
            Value::Items(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<u128> {
        match self {
            Value::Index(index) => Some(*index),
            _ => None,
        }
    }
}

/// Per-step configuration stored in a template
///
/// Steps interpret their own config variant; `Config::None` always means
/// "no constraint, draw freely".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Config {
    None,
    /// Force a boolean outcome
    Flag(bool),
    /// A plain count (number of items to deal, rounds to play, ...)
    Count(u64),
    /// Constrain a draw with forced and excluded items
    Pick(PickConfig),
    /// Address one combination directly by its index
    Index(u128),
}

/// Constraints for a draw step: items that must appear and items that must
/// not
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PickConfig {
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub always: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub never: Vec<String>,
}

impl PickConfig {
    pub fn new() -> Self {
        PickConfig::default()
    }

    pub fn with_always<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.always = items.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_never<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.never = items.into_iter().map(Into::into).collect();
        self
    }
}
