//! Typed search parameters extracted from submitted form fields.
//!
//! The tester form encodes search parameters in field names:
//! - `param.token.1.<name>`: system half of a token parameter
//! - `param.token.2.<name>`: value half of a token parameter
//! - `param.string.<name>`: a string parameter
//!
//! Every other field carries control information (method, resource type, id)
//! and is ignored here.

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::fields::RawFieldSet;

const TOKEN_PREFIX: &str = "param.token.";
const STRING_PREFIX: &str = "param.string.";
const TOKEN_SYSTEM_MARKER: &str = "1";
const TOKEN_VALUE_MARKER: &str = "2";

/// Search parameters keyed by name, in the order they were first extracted.
pub type ParameterMap = IndexMap<String, Vec<QueryParameter>>;

/// A typed search parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueryParameter {
    /// `system|value` pair, either half may be missing.
    Token {
        system: Option<String>,
        value: Option<String>,
    },
    String { value: String },
}

impl QueryParameter {
    pub fn token(system: Option<&str>, value: Option<&str>) -> Self {
        Self::Token {
            system: system.map(str::to_owned),
            value: value.map(str::to_owned),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String {
            value: value.into(),
        }
    }

    /// Value as it appears in a search query string.
    ///
    /// Tokens carry the system only when it is non-blank: `system|value`,
    /// otherwise just `value`.
    pub fn to_query_value(&self) -> String {
        match self {
            Self::Token { system, value } => {
                let value = value.as_deref().unwrap_or_default();
                match system.as_deref().filter(|s| !s.trim().is_empty()) {
                    Some(system) => format!("{system}|{value}"),
                    None => value.to_string(),
                }
            }
            Self::String { value } => value.clone(),
        }
    }
}

/// Classification of a submitted field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey<'a> {
    TokenSystem(&'a str),
    TokenValue(&'a str),
    String(&'a str),
    Inert,
}

impl<'a> FieldKey<'a> {
    /// Parse a field name. Token fields need a `1` or `2` marker and a
    /// non-empty name; anything else that does not match is inert.
    pub fn parse(key: &'a str) -> Self {
        if let Some(rest) = key.strip_prefix(TOKEN_PREFIX) {
            return match rest.split_once('.') {
                Some((TOKEN_SYSTEM_MARKER, name)) if !name.is_empty() => Self::TokenSystem(name),
                Some((TOKEN_VALUE_MARKER, name)) if !name.is_empty() => Self::TokenValue(name),
                _ => Self::Inert,
            };
        }
        match key.strip_prefix(STRING_PREFIX) {
            Some(name) if !name.is_empty() => Self::String(name),
            _ => Self::Inert,
        }
    }
}

fn token_system_key(name: &str) -> String {
    format!("{TOKEN_PREFIX}{TOKEN_SYSTEM_MARKER}.{name}")
}

fn token_value_key(name: &str) -> String {
    format!("{TOKEN_PREFIX}{TOKEN_VALUE_MARKER}.{name}")
}

/// Incremental extractor over a working set of unconsumed field names.
///
/// Each [`step`](Self::step) removes at least one name from the working set,
/// so extraction terminates after at most `fields.len()` steps.
pub struct ParameterExtractor<'a> {
    fields: &'a RawFieldSet,
    pending: BTreeSet<&'a str>,
    params: ParameterMap,
}

impl<'a> ParameterExtractor<'a> {
    pub fn new(fields: &'a RawFieldSet) -> Self {
        Self {
            fields,
            pending: fields.keys().collect(),
            params: ParameterMap::new(),
        }
    }

    /// Number of field names not yet examined.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.pending.contains(key)
    }

    /// Examine one field. Returns `false` once the working set is empty.
    pub fn step(&mut self) -> bool {
        let Some(key) = self.pending.pop_first() else {
            return false;
        };

        match FieldKey::parse(key) {
            FieldKey::TokenSystem(name) | FieldKey::TokenValue(name) => {
                let system_key = token_system_key(name);
                let value_key = token_value_key(name);
                // Both halves are consumed here, whichever was submitted.
                self.pending.remove(system_key.as_str());
                self.pending.remove(value_key.as_str());

                let param = QueryParameter::token(
                    self.fields.non_blank(&system_key),
                    self.fields.non_blank(&value_key),
                );
                self.push(name, param);
            }
            FieldKey::String(name) => {
                let value = self.fields.get(key).unwrap_or_default();
                self.push(name, QueryParameter::string(value));
            }
            FieldKey::Inert => {
                tracing::trace!(field = key, "ignoring non-parameter field");
            }
        }
        true
    }

    /// Run to completion and return the extracted parameters.
    pub fn finish(mut self) -> ParameterMap {
        while self.step() {}
        self.params
    }

    fn push(&mut self, name: &str, param: QueryParameter) {
        self.params.entry(name.to_string()).or_default().push(param);
    }
}

/// Extract typed search parameters from submitted fields.
pub fn extract_parameters(fields: &RawFieldSet) -> ParameterMap {
    ParameterExtractor::new(fields).finish()
}
