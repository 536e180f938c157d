//! rayfork: an immediate-mode 2D/3D draw batcher over a pluggable
//! graphics device.
//!
//! Applications construct a [`Context`] over a [`GfxDevice`]
//! implementation, load assets through [`rayfork_assets`], upload them to
//! obtain opaque texture/mesh handles, and issue draw calls. The context
//! accumulates emitted vertices and flushes them to the device on state
//! changes, buffer pressure, and frame end.

pub mod camera;
pub mod context;
pub mod device;
pub mod draw3d;
pub mod shapes;
pub mod text_draw;
pub mod texture;
pub mod texture_draw;

pub use camera::{mouse_ray, unproject, world_to_screen, Camera2d, Camera3d, CameraProjection};
pub use context::Context;
pub use device::{
    BlendMode, DrawMode, GfxDevice, MatrixMode, RecordingDevice, TextureFilter, TextureWrap,
};
pub use texture::{Font, RenderTexture, Texture};
pub use texture_draw::{NPatchInfo, NPatchLayout};

// The asset pipeline is part of the public surface
pub use rayfork_assets as assets;
