//! Slide compositing: background photo, template overlay, then text.

use std::sync::Arc;

use image::imageops::FilterType;
use image::RgbaImage;
use postgen_core::{
    hash_frame, resolve, CanvasConfig, FrameBuffer, PostResult, PostgenConfig, RenderInput,
    RenderedAsset, SlideDescriptor, CANVAS_HEIGHT, CANVAS_WIDTH,
};

use crate::assets::{AssetLoader, LoadedImage};
use crate::encode::encode_png;
use crate::text::{TextRenderer, TextStyle, Typeface};

/// Placement of a cover-fitted image relative to the canvas origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverRect {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Scale so the image covers the canvas on both axes, centered, with the
/// overflow cropped symmetrically on the long axis.
pub fn cover_rect(image_w: u32, image_h: u32, canvas_w: u32, canvas_h: u32) -> CoverRect {
    let scale = (canvas_w as f64 / image_w as f64).max(canvas_h as f64 / image_h as f64);
    let width = image_w as f64 * scale;
    let height = image_h as f64 * scale;
    CoverRect {
        scale,
        x: (canvas_w as f64 - width) / 2.0,
        y: (canvas_h as f64 - height) / 2.0,
        width,
        height,
    }
}

/// Resample `image` to exactly `width` x `height` with a cover fit.
///
/// The canvas window is mapped back into source pixels and cropped first, so
/// the resize never allocates more than the canvas regardless of the source
/// aspect ratio.
pub fn cover_fit(image: &FrameBuffer, width: u32, height: u32) -> FrameBuffer {
    if image.width == 0 || image.height == 0 || width == 0 || height == 0 {
        return FrameBuffer::new(width, height);
    }
    let rect = cover_rect(image.width, image.height, width, height);
    let window_w = ((width as f64 / rect.scale).round() as u32).clamp(1, image.width);
    let window_h = ((height as f64 / rect.scale).round() as u32).clamp(1, image.height);
    let window_x = (image.width - window_w) / 2;
    let window_y = (image.height - window_h) / 2;

    let Some(src) = RgbaImage::from_raw(image.width, image.height, image.data.clone()) else {
        return FrameBuffer::new(width, height);
    };
    let window = image::imageops::crop_imm(&src, window_x, window_y, window_w, window_h).to_image();
    let fitted = if (window_w, window_h) == (width, height) {
        window
    } else {
        image::imageops::resize(&window, width, height, FilterType::Triangle)
    };

    FrameBuffer::from_raw(width, height, fitted.into_raw()).unwrap_or_else(|| FrameBuffer::new(width, height))
}

/// Stretch `image` to the canvas size. Overlays are authored at the
/// canonical resolution, so this is normally a no-op.
fn fit_overlay(image: &FrameBuffer, width: u32, height: u32) -> FrameBuffer {
    if image.width == width && image.height == height {
        return image.clone();
    }
    tracing::debug!(
        "Resizing overlay from {}x{} to {}x{}",
        image.width,
        image.height,
        width,
        height
    );
    match RgbaImage::from_raw(image.width, image.height, image.data.clone()) {
        Some(src) => {
            let resized = image::imageops::resize(&src, width, height, FilterType::Triangle);
            FrameBuffer::from_raw(width, height, resized.into_raw())
                .unwrap_or_else(|| FrameBuffer::new(width, height))
        }
        None => FrameBuffer::new(width, height),
    }
}

/// Renders slides onto fixed-size surfaces and encodes them as PNG.
pub struct Compositor {
    canvas: CanvasConfig,
    placeholders: bool,
    loader: AssetLoader,
    text: TextRenderer,
}

impl Compositor {
    /// `typeface` must already be resolved; see [`Typeface::load`].
    pub fn new(config: &PostgenConfig, loader: AssetLoader, typeface: Typeface) -> Self {
        Self {
            canvas: config.canvas.clone(),
            placeholders: config.text.placeholders,
            loader,
            text: TextRenderer::new(typeface, TextStyle::from(&config.text)),
        }
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    /// Render one slide.
    pub async fn render(&self, slide: &SlideDescriptor, input: &RenderInput) -> PostResult<RenderedAsset> {
        let background = self.load_background(input).await;
        self.render_with_background(slide, input, background.as_deref()).await
    }

    /// Render every slide of the input's format, in table order.
    pub async fn render_all(&self, input: &RenderInput) -> PostResult<Vec<RenderedAsset>> {
        let slides = resolve(input.format);
        tracing::info!("Rendering {} slide(s) for format '{}'", slides.len(), input.format);

        // Decoded once per request; user photos are never cached.
        let background = self.load_background(input).await;

        let mut assets = Vec::with_capacity(slides.len());
        for slide in slides {
            assets.push(
                self.render_with_background(slide, input, background.as_deref())
                    .await?,
            );
        }
        Ok(assets)
    }

    async fn load_background(&self, input: &RenderInput) -> Option<Arc<FrameBuffer>> {
        let source = input.background.as_ref()?;
        match self.loader.load_ephemeral(source).await {
            LoadedImage::Ready(image) => Some(image),
            LoadedImage::Unavailable { reason } => {
                tracing::warn!("Using placeholder background: {}", reason);
                None
            }
        }
    }

    async fn render_with_background(
        &self,
        slide: &SlideDescriptor,
        input: &RenderInput,
        background: Option<&FrameBuffer>,
    ) -> PostResult<RenderedAsset> {
        let overlay = self.loader.load(slide.template).await;
        let frame = self.compose(slide, input, background, overlay.ready());

        let hash = hash_frame(&frame);
        let png = encode_png(&frame)?;
        tracing::debug!(
            "Rendered slide '{}' ({} bytes, {})",
            slide.suffix,
            png.len(),
            hash.short()
        );

        Ok(RenderedAsset {
            png,
            suffix: slide.suffix.to_string(),
            width: frame.width,
            height: frame.height,
            hash,
        })
    }

    /// Pure composition of already-loaded layers.
    pub fn compose(
        &self,
        slide: &SlideDescriptor,
        input: &RenderInput,
        background: Option<&FrameBuffer>,
        overlay: Option<&FrameBuffer>,
    ) -> FrameBuffer {
        let (width, height) = (CANVAS_WIDTH, CANVAS_HEIGHT);
        let mut fb = FrameBuffer::solid(width, height, &self.canvas.clear);

        match background {
            Some(image) => fb.composite_over(&cover_fit(image, width, height), 0, 0),
            None => fb.fill(&self.canvas.placeholder),
        }

        if let Some(overlay) = overlay {
            fb.composite_over(&fit_overlay(overlay, width, height), 0, 0);
        }

        if let Some(text) = input.text_for(slide, self.placeholders) {
            let lines = self.text.draw(&mut fb, text, &slide.placement);
            tracing::debug!("Slide '{}' text wrapped to {} line(s)", slide.suffix, lines.len());
        }

        fb
    }
}
