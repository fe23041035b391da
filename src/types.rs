// Type definitions and enums

use serde_json::{Map, Number, Value};

/// Number of sequence items shown by [`StructuredAnswer::preview`].
pub const SEQUENCE_PREVIEW_LIMIT: usize = 5;

/// Errors surfaced by the backend gateway.
///
/// Every variant displays as a single human-readable message, so callers can
/// show `err.to_string()` without caring which failure path produced it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// No usable response was received (connection refused, DNS, reset...).
    #[error("{0}")]
    Transport(String),

    /// The backend answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body could not be decoded.
    #[error("{0}")]
    Malformed(String),
}

impl GatewayError {
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        GatewayError::Transport(format!("Could not reach the analysis service: {}", cause))
    }

    pub fn malformed(cause: impl std::fmt::Display) -> Self {
        GatewayError::Malformed(format!(
            "Unexpected response from the analysis service: {}",
            cause
        ))
    }

    /// Fallback used when a non-2xx body carries no `detail` string.
    pub fn status(status: u16) -> Self {
        GatewayError::Server {
            status,
            message: format!("Request failed with status code {}", status),
        }
    }

    /// The user-facing message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            GatewayError::Transport(message) | GatewayError::Malformed(message) => message,
            GatewayError::Server { message, .. } => message,
        }
    }
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// A leaf value inside a structured answer.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The computed result attached to a bot reply.
///
/// Backends return arbitrary JSON here (a count, a column of values, a
/// describe() table...). It is narrowed to a closed set of shapes so that
/// rendering is exhaustive.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum StructuredAnswer {
    Scalar(Scalar),
    Sequence(Vec<StructuredAnswer>),
    /// Keyed mapping, in the order the backend sent the keys.
    Mapping(Vec<(String, StructuredAnswer)>),
}

impl StructuredAnswer {
    pub fn text(s: impl Into<String>) -> Self {
        StructuredAnswer::Scalar(Scalar::Text(s.into()))
    }

    pub fn integer(n: i64) -> Self {
        StructuredAnswer::Scalar(Scalar::Integer(n))
    }

    pub fn float(x: f64) -> Self {
        StructuredAnswer::Scalar(Scalar::Float(x))
    }

    /// Convert back into JSON, e.g. for pretty printing.
    pub fn to_json(&self) -> Value {
        match self {
            StructuredAnswer::Scalar(Scalar::Null) => Value::Null,
            StructuredAnswer::Scalar(Scalar::Bool(b)) => Value::Bool(*b),
            StructuredAnswer::Scalar(Scalar::Integer(n)) => Value::Number((*n).into()),
            StructuredAnswer::Scalar(Scalar::Float(x)) => {
                Number::from_f64(*x).map(Value::Number).unwrap_or(Value::Null)
            }
            StructuredAnswer::Scalar(Scalar::Text(s)) => Value::String(s.clone()),
            StructuredAnswer::Sequence(items) => {
                Value::Array(items.iter().map(StructuredAnswer::to_json).collect())
            }
            StructuredAnswer::Mapping(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), value.to_json());
                }
                Value::Object(map)
            }
        }
    }

    /// Display form of the answer.
    ///
    /// Scalars are shown as plain text. Sequences longer than
    /// [`SEQUENCE_PREVIEW_LIMIT`] are cut to that many items followed by a
    /// `... and more` line. The answer itself is never modified.
    pub fn preview(&self) -> String {
        match self {
            StructuredAnswer::Scalar(scalar) => scalar.to_string(),
            StructuredAnswer::Sequence(items) => {
                let shown: Vec<Value> = items
                    .iter()
                    .take(SEQUENCE_PREVIEW_LIMIT)
                    .map(StructuredAnswer::to_json)
                    .collect();
                let mut out = pretty(&Value::Array(shown));
                if items.len() > SEQUENCE_PREVIEW_LIMIT {
                    out.push_str("\n... and more");
                }
                out
            }
            StructuredAnswer::Mapping(_) => pretty(&self.to_json()),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

impl From<Value> for StructuredAnswer {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => StructuredAnswer::Scalar(Scalar::Null),
            Value::Bool(b) => StructuredAnswer::Scalar(Scalar::Bool(b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => StructuredAnswer::Scalar(Scalar::Integer(i)),
                None => StructuredAnswer::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN))),
            },
            Value::String(s) => StructuredAnswer::Scalar(Scalar::Text(s)),
            Value::Array(items) => {
                StructuredAnswer::Sequence(items.into_iter().map(StructuredAnswer::from).collect())
            }
            Value::Object(map) => StructuredAnswer::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, StructuredAnswer::from(value)))
                    .collect(),
            ),
        }
    }
}
