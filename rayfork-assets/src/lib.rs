//! CPU-side asset pipeline for rayfork.
//!
//! Everything that can be computed without a GPU lives here: pixel formats
//! and conversions, images and their operations, compressed-texture
//! container decoders, the text pipeline (UTF-8, fonts, atlases, layout),
//! and mesh/model loading with skeletal animation. The `rayfork` crate
//! builds the draw batcher and context on top of these entities.

pub mod color;
pub mod error;
pub mod formats;
pub mod image;
pub mod io;
pub mod math;
pub mod model;
pub mod pixel_format;
pub mod text;

pub use color::Color;
pub use error::{Error, Result};
pub use self::image::{Gif, Image, MipmapsImage};
pub use io::{AssetIo, MemoryIo, StdIo};
pub use math::{BoundingBox, Ray, RayHit, Rect, Transform};
pub use model::{
    finalize_model, update_model_animation, BoneInfo, Material, MaterialMap, MaterialMapKind,
    Mesh, Model, ModelAnimation,
};
pub use pixel_format::PixelFormat;
pub use text::{Font, GlyphInfo};
