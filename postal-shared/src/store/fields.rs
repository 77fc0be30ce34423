/// A single column value written by the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    BigInt(i64),
    Double(f64),
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::BigInt(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Double(value)
    }
}

/// Turns an insert or patch payload into ordered column assignments
///
/// Patch payloads only emit the columns that are set.
pub trait Fields {
    fn into_fields(self) -> Vec<(&'static str, FieldValue)>;
}

/// Collects `Some` values of a patch into assignments
#[derive(Debug, Default)]
pub struct FieldSet(Vec<(&'static str, FieldValue)>);

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<FieldValue>) -> Self {
        self.0.push((column, value.into()));
        self
    }

    pub fn set_opt<V: Into<FieldValue>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    pub fn finish(self) -> Vec<(&'static str, FieldValue)> {
        self.0
    }
}
