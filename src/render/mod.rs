//! Rendering of produced documents and extracted structures.

mod json;
mod text;

pub use json::{to_json, JsonFormat};
pub use text::{
    document_preview_text, package_preview_text, to_preview_html, to_preview_text,
    SECTION_UNDERLINE_MARKER,
};
