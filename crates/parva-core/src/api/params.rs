use std::fmt;

use url::Url;

/// A flattened scalar query value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Str(s) => f.write_str(s),
            QueryValue::Int(i) => write!(f, "{}", i),
            QueryValue::Float(x) => write!(f, "{}", x),
            QueryValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Str(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Str(value)
    }
}

impl From<&String> for QueryValue {
    fn from(value: &String) -> Self {
        QueryValue::Str(value.clone())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Int(value)
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Int(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        QueryValue::Float(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

/// Ordered query parameters. Unset values are kept so call sites read
/// naturally, and dropped when the query string is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Option<QueryValue>)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.entries.push((key.into(), Some(value.into())));
        self
    }

    pub fn set_opt<V: Into<QueryValue>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.entries.push((key.into(), value.map(Into::into)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().next().is_none()
    }

    /// Pairs with a value, in insertion order
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| value.as_ref().map(|v| (key.as_str(), v)))
    }

    /// Append to `url`'s query string, leaving it untouched when no value is set.
    pub fn apply(&self, url: &mut Url) {
        if self.is_empty() {
            return;
        }
        let mut query = url.query_pairs_mut();
        for (key, value) in self.pairs() {
            query.append_pair(key, &value.to_string());
        }
    }
}
