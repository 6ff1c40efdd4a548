//! # postgen-render
//!
//! The postgen rendering engine. Resolves a format to its slides and renders
//! each one onto a fixed-size CPU surface: cover-fitted background photo,
//! template overlay, then word-wrapped text with a drop shadow. Output is one
//! PNG per slide.

pub mod assets;
pub mod blur;
pub mod compositor;
pub mod encode;
pub mod text;

pub use assets::{AssetCache, AssetLoader, AssetRef, LoadedImage};
pub use compositor::{cover_fit, cover_rect, Compositor, CoverRect};
pub use encode::encode_png;
pub use text::{baselines, layout, wrap, LaidOutLine, TextRenderer, TextStyle, Typeface};
