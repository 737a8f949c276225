use std::fmt;

/// Timestamp carried by every static-info row
pub const STATIC_INFO_TIMESTAMP: i64 = 0;

/// A measured value. Counters stay integral, ratios and rates are floats,
/// hardware names and driver strings are text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

/// One observation: `(timestamp, device, measure, value)`
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: i64, // Unix seconds, 0 for static info
    pub device: String,
    pub measure: String,
    pub value: Value,
}

impl Sample {
    pub fn new(
        timestamp: i64,
        device: impl Into<String>,
        measure: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            timestamp,
            device: device.into(),
            measure: measure.into(),
            value: value.into(),
        }
    }

    /// Build a static-info sample (timestamp 0)
    pub fn static_info(
        device: impl Into<String>,
        measure: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::new(STATIC_INFO_TIMESTAMP, device, measure, value)
    }

    /// Render as a CSV record in column order
    pub fn to_record(&self) -> [String; 4] {
        [
            self.timestamp.to_string(),
            self.device.clone(),
            self.measure.clone(),
            self.value.to_string(),
        ]
    }
}
