//! Submitted form fields.

use std::collections::HashMap;
use url::form_urlencoded;

/// Field selecting the operation to run.
pub const METHOD_FIELD: &str = "method";
/// Field naming the resource type.
pub const RESOURCE_NAME_FIELD: &str = "resourceName";
/// Field carrying the logical id for read and vread.
pub const ID_FIELD: &str = "id";
/// Field carrying the version id for vread.
pub const VERSION_ID_FIELD: &str = "versionid";

/// The fields of one submission: one value per name.
///
/// When a name is submitted more than once the first value is kept, matching
/// how HTML forms are usually read on the server side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFieldSet {
    fields: HashMap<String, String>,
}

impl RawFieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `application/x-www-form-urlencoded` body.
    pub fn from_form(body: &[u8]) -> Self {
        form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Insert a field unless the name is already present.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Value of `name` if present and not blank.
    pub fn non_blank(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.trim().is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawFieldSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_form_decodes_fields() {
        let fields = RawFieldSet::from_form(
            b"method=searchType&resourceName=Patient&param.string.name=John+Smith&param.token.1.identifier=urn%3Aoid%3A1.2",
        );
        assert_eq!(fields.len(), 4);
        assert_eq!(fields.get("method"), Some("searchType"));
        assert_eq!(fields.get("param.string.name"), Some("John Smith"));
        assert_eq!(fields.get("param.token.1.identifier"), Some("urn:oid:1.2"));
    }

    #[test]
    fn test_repeated_field_keeps_first_value() {
        let fields = RawFieldSet::from_form(b"id=1&id=2");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("id"), Some("1"));
    }

    #[test]
    fn test_non_blank() {
        let fields: RawFieldSet = [("id", "  "), ("versionid", "3")].into_iter().collect();
        assert_eq!(fields.non_blank("id"), None);
        assert_eq!(fields.non_blank("versionid"), Some("3"));
        assert_eq!(fields.non_blank("missing"), None);
    }

    #[test]
    fn test_empty_body() {
        let fields = RawFieldSet::from_form(b"");
        assert!(fields.is_empty());
    }
}
