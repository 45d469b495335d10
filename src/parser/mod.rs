//! Template parsing module.

mod blueprint;
pub mod classify;
mod options;
pub mod styles;
mod template_parser;

pub use blueprint::BlueprintExtractor;
pub(crate) use blueprint::{body_of, has_bottom_border, paragraph_style_id, paragraph_text};
pub use classify::classify_style_name;
pub use options::{ExtractOptions, DEFAULT_HINT_LEN, DEFAULT_MAX_SLOTS};
pub use styles::load_catalog;
pub use template_parser::{Template, TemplateParser};
