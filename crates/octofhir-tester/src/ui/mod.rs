//! Browser-facing pieces: static assets and HTML page templates.

pub mod assets;
pub mod pages;

pub use assets::{StaticAsset, lookup_asset};
pub use pages::{PageCache, TemplateSource, escape_html, render};
