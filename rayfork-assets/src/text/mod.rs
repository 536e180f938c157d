//! Text pipeline: UTF-8 decoding, fonts, atlas generation and layout.

mod default_font_data;
mod font;
mod image_font;
mod layout;
mod ttf;
pub mod utf8;

pub use font::{Font, GlyphInfo};
pub use image_font::font_from_image;
pub use layout::{layout_text_rect, measure_text, measure_text_rect, PlacedGlyph, TextLayout};
pub use ttf::{font_from_ttf, FONT_ATLAS_PADDING};
