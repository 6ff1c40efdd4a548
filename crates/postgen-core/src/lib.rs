//! # postgen-core
//!
//! Core types shared by every postgen crate: colors, the raster surface,
//! content hashes, configuration, errors, and the static format table that
//! maps a format to its ordered slides.

pub mod color;
pub mod config;
pub mod error;
pub mod format;
pub mod frame;
pub mod hash;
pub mod post;

pub use config::*;

pub use color::Color;
pub use error::{PostError, PostResult};
pub use format::{resolve, AnchorMode, FormatId, SlideDescriptor, TextField, TextPlacement};
pub use frame::FrameBuffer;
pub use hash::{hash_frame, ContentHash};
pub use post::{ImageSource, RenderInput, RenderedAsset};
