use include_dir::{Dir, include_dir};
use std::collections::HashMap;
use std::sync::OnceLock;

static STATIC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets/static");

/// Content types of the files the tester serves verbatim.
const CONTENT_TYPES: &[(&str, &str)] = &[
    ("PublicTester.js", "text/javascript"),
    ("PublicTester.css", "text/css"),
    ("favicon.svg", "image/svg+xml"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticAsset {
    pub content_type: &'static str,
    pub contents: &'static [u8],
}

fn table() -> &'static HashMap<&'static str, StaticAsset> {
    static TABLE: OnceLock<HashMap<&'static str, StaticAsset>> = OnceLock::new();
    TABLE.get_or_init(|| {
        CONTENT_TYPES
            .iter()
            .filter_map(|&(name, content_type)| {
                let file = STATIC_DIR.get_file(name);
                if file.is_none() {
                    tracing::warn!(asset = name, "static asset missing from build");
                }
                file.map(|f| {
                    (
                        name,
                        StaticAsset {
                            content_type,
                            contents: f.contents(),
                        },
                    )
                })
            })
            .collect()
    })
}

/// Look up a static asset by exact file name.
pub fn lookup_asset(name: &str) -> Option<StaticAsset> {
    table().get(name).copied()
}
