use std::path::PathBuf;
use std::sync::Arc;

use crate::format::{FormatId, SlideDescriptor, TextField};
use crate::hash::ContentHash;

/// A user-supplied background photo. Never cached: the reference is
/// transient and may point at different bytes next time.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded image bytes (JPEG, PNG, ...) handed over by the caller.
    Bytes(Arc<[u8]>),
    /// Encoded image on the local filesystem.
    Path(PathBuf),
}

impl ImageSource {
    pub fn describe(&self) -> String {
        match self {
            ImageSource::Bytes(bytes) => format!("<{} bytes>", bytes.len()),
            ImageSource::Path(path) => path.display().to_string(),
        }
    }
}

/// Snapshot of everything a render needs. Rendering is a pure function of
/// this value; it is cloned in, never mutated mid-render.
#[derive(Debug, Clone)]
pub struct RenderInput {
    pub format: FormatId,
    pub background: Option<ImageSource>,
    pub title: String,
    pub body: String,
}

impl RenderInput {
    pub fn new(format: FormatId) -> Self {
        Self {
            format,
            background: None,
            title: String::new(),
            body: String::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_background(mut self, background: ImageSource) -> Self {
        self.background = Some(background);
        self
    }

    pub fn field(&self, field: TextField) -> &str {
        match field {
            TextField::Title => &self.title,
            TextField::Body => &self.body,
        }
    }

    /// Text a slide should draw, if any. Blank fields fall back to the
    /// slide's placeholder when `placeholders` is set.
    pub fn text_for<'a>(&'a self, slide: &'a SlideDescriptor, placeholders: bool) -> Option<&'a str> {
        let field = slide.text?;
        let value = self.field(field);
        if !value.trim().is_empty() {
            return Some(value);
        }
        if placeholders {
            slide.placeholder
        } else {
            None
        }
    }
}

/// One encoded slide, ready for delivery. Lives only for the request.
#[derive(Debug, Clone)]
pub struct RenderedAsset {
    /// PNG-encoded image.
    pub png: Vec<u8>,
    pub suffix: String,
    pub width: u32,
    pub height: u32,
    /// Digest of the pixels that were encoded.
    pub hash: ContentHash,
}

impl RenderedAsset {
    /// `{base}{suffix}.png`; `base` must already be sanitized.
    pub fn file_name(&self, base: &str) -> String {
        format!("{}{}.png", base, self.suffix)
    }
}
