//! HTML page templates with a swappable in-memory cache.
//!
//! Templates use `{{name}}` placeholders. Every substituted value is HTML
//! escaped; placeholders without a value are left untouched.

use arc_swap::ArcSwap;
use include_dir::{Dir, include_dir};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::TesterError;

static TEMPLATE_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets/templates");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Templates compiled into the binary
    Embedded,
    /// Templates read from disk on first use
    Directory(PathBuf),
}

pub struct PageCache {
    source: TemplateSource,
    pages: ArcSwap<HashMap<String, Arc<str>>>,
}

impl PageCache {
    pub fn new(source: TemplateSource) -> Self {
        Self {
            source,
            pages: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    pub fn embedded() -> Self {
        Self::new(TemplateSource::Embedded)
    }

    /// Fetch a page template, loading and caching it on first use.
    ///
    /// Returns `Ok(None)` for names that are not page names or have no template.
    pub async fn get(&self, name: &str) -> Result<Option<Arc<str>>, TesterError> {
        if !is_page_name(name) {
            return Ok(None);
        }
        if let Some(page) = self.pages.load().get(name) {
            return Ok(Some(Arc::clone(page)));
        }

        let Some(text) = self.load(name).await? else {
            return Ok(None);
        };
        let page: Arc<str> = Arc::from(text);
        self.pages.rcu(|current| {
            let mut next = HashMap::clone(current);
            next.insert(name.to_string(), Arc::clone(&page));
            next
        });
        tracing::debug!(page = name, "template cached");
        Ok(Some(page))
    }

    /// Whether a template exists for `name`, without caching it.
    pub async fn contains(&self, name: &str) -> bool {
        if !is_page_name(name) {
            return false;
        }
        if self.pages.load().contains_key(name) {
            return true;
        }
        match &self.source {
            TemplateSource::Embedded => TEMPLATE_DIR.get_file(name).is_some(),
            TemplateSource::Directory(dir) => tokio::fs::try_exists(dir.join(name))
                .await
                .unwrap_or(false),
        }
    }

    /// Drop every cached template.
    pub fn invalidate(&self) {
        self.pages.store(Arc::new(HashMap::new()));
    }

    pub fn cached_len(&self) -> usize {
        self.pages.load().len()
    }

    async fn load(&self, name: &str) -> Result<Option<String>, TesterError> {
        match &self.source {
            TemplateSource::Embedded => Ok(TEMPLATE_DIR
                .get_file(name)
                .and_then(|f| f.contents_utf8())
                .map(str::to_string)),
            TemplateSource::Directory(dir) => {
                match tokio::fs::read_to_string(dir.join(name)).await {
                    Ok(text) => Ok(Some(text)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(source) => Err(TesterError::Template {
                        name: name.to_string(),
                        source,
                    }),
                }
            }
        }
    }
}

/// `[A-Za-z0-9_-]+.html`, which also keeps lookups inside the template root.
fn is_page_name(name: &str) -> bool {
    name.strip_suffix(".html").is_some_and(|stem| {
        !stem.is_empty()
            && stem
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    })
}

/// Substitute `{{key}}` placeholders with escaped values.
pub fn render(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = after[..end].trim();
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(&escape_html(value)),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_names() {
        assert!(is_page_name("index.html"));
        assert!(is_page_name("result_v-2.html"));
        assert!(!is_page_name(".html"));
        assert!(!is_page_name("index.htm"));
        assert!(!is_page_name("../index.html"));
        assert!(!is_page_name("sub/index.html"));
        assert!(!is_page_name("PublicTester.js"));
    }

    #[test]
    fn test_render_escapes_values() {
        let out = render(
            "<p>{{ status }}</p><pre>{{body}}</pre>{{unknown}}",
            &[("status", "HTTP/1.1 200 OK"), ("body", "<a href=\"x\">&</a>")],
        );
        assert_eq!(
            out,
            "<p>HTTP/1.1 200 OK</p><pre>&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;</pre>{{unknown}}"
        );
    }

    #[test]
    fn test_render_unterminated_placeholder() {
        assert_eq!(render("a {{b", &[("b", "x")]), "a {{b");
        assert_eq!(render("no placeholders", &[]), "no placeholders");
    }

    #[tokio::test]
    async fn test_embedded_pages_are_cached() {
        let cache = PageCache::embedded();
        assert_eq!(cache.cached_len(), 0);

        let first = cache.get("index.html").await.unwrap().unwrap();
        assert!(first.contains("{{base}}"));
        assert_eq!(cache.cached_len(), 1);

        let second = cache.get("index.html").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate();
        assert_eq!(cache.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_missing_and_invalid_pages() {
        let cache = PageCache::embedded();
        assert!(cache.get("nope.html").await.unwrap().is_none());
        assert!(cache.get("../Cargo.toml").await.unwrap().is_none());
        assert!(!cache.contains("nope.html").await);
        assert!(cache.contains("result.html").await);
        assert_eq!(cache.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_directory_source_reloads_after_invalidate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.html");
        std::fs::write(&path, "v1 {{base}}").unwrap();

        let cache = PageCache::new(TemplateSource::Directory(dir.path().to_path_buf()));
        assert_eq!(&*cache.get("custom.html").await.unwrap().unwrap(), "v1 {{base}}");

        std::fs::write(&path, "v2").unwrap();
        assert_eq!(&*cache.get("custom.html").await.unwrap().unwrap(), "v1 {{base}}");

        cache.invalidate();
        assert_eq!(&*cache.get("custom.html").await.unwrap().unwrap(), "v2");
    }
}
