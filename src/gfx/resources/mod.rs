//! GPU resource management
//!
//! Texture images, their decoding and upload.

pub mod texture_resource;

pub use texture_resource::{TextureError, TextureImage, TextureResource};
