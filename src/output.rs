use crate::error_utils::serialize_to_json_with_context;
use anyhow::Result;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
    Processing,
}

/// The JSON object printed on stdout: `{status, message, ...extra fields}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub status: Status,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Envelope {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Map::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::new(Status::Processing, message)
    }

    /// Add a top-level field next to `status` and `message`
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Render as pretty (lenient mode) or single-line (strict mode) JSON
    pub fn render(&self, pretty: bool) -> Result<String> {
        if pretty {
            serialize_to_json_with_context(self, "result envelope")
        } else {
            Ok(serde_json::to_string(self)?)
        }
    }
}

/// Print an envelope on stdout. Logs go to stderr, so stdout stays pure JSON.
pub fn emit(envelope: &Envelope, pretty: bool) -> Result<()> {
    println!("{}", envelope.render(pretty)?);
    Ok(())
}
