use octofhir_core::Result;
use serde_json::Value;

/// Turns a fetched FHIR document back into text for display.
pub trait DocumentCodec: Send + Sync {
    fn encode(&self, document: &Value) -> Result<String>;
}

#[derive(Debug, Clone, Copy)]
pub struct JsonCodec {
    pub pretty: bool,
}

impl Default for JsonCodec {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl DocumentCodec for JsonCodec {
    fn encode(&self, document: &Value) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        Ok(text)
    }
}
