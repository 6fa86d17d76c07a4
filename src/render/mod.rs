//! Full and teaser rendering of news items.

mod date;
mod tree;
mod view_builder;

pub use date::{format_pattern, pattern_format};
pub use tree::{RenderElement, RenderTree, StyledImage, ViewMode};
pub use view_builder::{NewsViewBuilder, FEATURED_IMAGE_FIELD, PUBLISH_DATE_FIELD, TAGS_FIELD};
