use serde::Serialize;
use std::fmt;

/// How a response body should be highlighted when displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HighlightClass {
    Json,
    Xml,
    #[default]
    Plain,
}

impl HighlightClass {
    /// Classify a declared MIME type such as `application/fhir+json; charset=UTF-8`.
    ///
    /// Total: absent, malformed and unrecognized types are all `Plain`.
    #[must_use]
    pub fn classify(mime_type: Option<&str>) -> Self {
        let Some(mime_type) = mime_type else {
            return Self::Plain;
        };
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let Some((_, subtype)) = essence.split_once('/') else {
            return Self::Plain;
        };

        if subtype.contains("json") {
            Self::Json
        } else if subtype.contains("xml") {
            Self::Xml
        } else {
            Self::Plain
        }
    }

    /// Class attribute understood by the SyntaxHighlighter brushes in the UI.
    pub fn brush(&self) -> &'static str {
        match self {
            Self::Json => "brush: jscript",
            Self::Xml => "brush: xml",
            Self::Plain => "brush: plain",
        }
    }
}

impl fmt::Display for HighlightClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.brush())
    }
}
