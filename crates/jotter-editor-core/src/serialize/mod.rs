//! Document formats: the persisted JSON shape, HTML and markdown export.

mod html;
mod json;
mod markdown;

pub use html::{HtmlOptions, from_html, to_html};
pub use json::{from_json, from_json_named, to_json, to_json_pretty, to_value};
pub use markdown::to_markdown;
