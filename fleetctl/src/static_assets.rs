//! Embedded static assets and page templates.

use rust_embed::RustEmbed;

/// Stylesheets and other files served under `/static/`
#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Assets;

/// Jinja templates loaded into the renderer at first use
#[derive(RustEmbed)]
#[folder = "templates/"]
pub struct Templates;
