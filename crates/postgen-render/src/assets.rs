//! Template asset loading.
//!
//! References are resolved to decoded [`FrameBuffer`]s. Template overlays are
//! cached for the lifetime of the [`AssetCache`] the caller injects; user
//! photos go through [`AssetLoader::load_ephemeral`] and are never cached.
//! Loading fails softly: every failure becomes [`LoadedImage::Unavailable`]
//! so composition can continue with a placeholder.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine;
use dashmap::DashMap;
use postgen_core::{AssetsConfig, FrameBuffer, ImageSource, PostError, PostResult};

/// Process-lifetime store of decoded template overlays, keyed by the
/// reference string. Append-only; entries are never evicted.
#[derive(Debug, Default)]
pub struct AssetCache {
    images: DashMap<String, Arc<FrameBuffer>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, reference: &str) -> Option<Arc<FrameBuffer>> {
        self.images.get(reference).map(|entry| Arc::clone(entry.value()))
    }

    pub fn insert(&self, reference: impl Into<String>, image: Arc<FrameBuffer>) {
        self.images.insert(reference.into(), image);
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.images.contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Where a reference string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetRef {
    /// `http://` or `https://` URL.
    Remote(String),
    /// `data:` URI with its payload still encoded.
    Inline { mime: String, base64: bool, payload: String },
    /// Local file; relative references are joined onto the templates dir.
    File(PathBuf),
}

impl AssetRef {
    pub fn parse(reference: &str, base_dir: &Path) -> Self {
        let trimmed = reference.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return AssetRef::Remote(trimmed.to_string());
        }
        if let Some(rest) = trimmed.strip_prefix("data:") {
            let (meta, payload) = rest.split_once(',').unwrap_or((rest, ""));
            let base64 = meta.ends_with(";base64");
            let mime = meta.trim_end_matches(";base64").to_string();
            return AssetRef::Inline {
                mime,
                base64,
                payload: payload.to_string(),
            };
        }
        let path = Path::new(trimmed);
        if path.is_absolute() {
            AssetRef::File(path.to_path_buf())
        } else {
            AssetRef::File(base_dir.join(path))
        }
    }
}

/// Outcome of a soft-failing load.
#[derive(Debug, Clone)]
pub enum LoadedImage {
    Ready(Arc<FrameBuffer>),
    Unavailable { reason: String },
}

impl LoadedImage {
    pub fn ready(&self) -> Option<&FrameBuffer> {
        match self {
            LoadedImage::Ready(image) => Some(image.as_ref()),
            LoadedImage::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, LoadedImage::Ready(_))
    }
}

/// Fetches, decodes and caches images.
pub struct AssetLoader {
    cache: Arc<AssetCache>,
    templates_dir: PathBuf,
    client: reqwest::Client,
}

impl AssetLoader {
    pub fn new(config: &AssetsConfig, cache: Arc<AssetCache>) -> PostResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .build()
            .map_err(|e| PostError::asset(format!("failed to build HTTP client: {}", e), "<client>"))?;

        Ok(Self {
            cache,
            templates_dir: config.templates_dir.clone(),
            client,
        })
    }

    pub fn cache(&self) -> &Arc<AssetCache> {
        &self.cache
    }

    /// Load a template reference, serving repeat requests from the cache.
    pub async fn load(&self, reference: &str) -> LoadedImage {
        if let Some(cached) = self.cache.get(reference) {
            tracing::debug!("Asset cache hit for '{}'", reference);
            return LoadedImage::Ready(cached);
        }

        let asset_ref = AssetRef::parse(reference, &self.templates_dir);
        let decoded = match self.fetch(&asset_ref, reference).await {
            Ok(bytes) => decode_image(&bytes, reference),
            Err(e) => Err(e),
        };

        match decoded {
            Ok(image) => {
                tracing::info!(
                    "Loaded template '{}' ({}x{})",
                    reference,
                    image.width,
                    image.height
                );
                let image = Arc::new(image);
                self.cache.insert(reference, Arc::clone(&image));
                LoadedImage::Ready(image)
            }
            Err(e) => {
                tracing::warn!("Template '{}' unavailable: {}", reference, e);
                LoadedImage::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Decode a user-supplied image without touching the cache.
    pub async fn load_ephemeral(&self, source: &ImageSource) -> LoadedImage {
        let label = source.describe();
        let bytes = match source {
            ImageSource::Bytes(bytes) => Ok(bytes.to_vec()),
            ImageSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| PostError::asset(format!("failed to read image: {}", e), label.as_str())),
        };

        match bytes.and_then(|bytes| decode_image(&bytes, &label)) {
            Ok(image) => {
                tracing::debug!("Decoded background {} ({}x{})", label, image.width, image.height);
                LoadedImage::Ready(Arc::new(image))
            }
            Err(e) => {
                tracing::warn!("Background image {} unavailable: {}", label, e);
                LoadedImage::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch(&self, asset_ref: &AssetRef, reference: &str) -> PostResult<Vec<u8>> {
        match asset_ref {
            AssetRef::File(path) => tokio::fs::read(path).await.map_err(|e| {
                PostError::asset(format!("failed to read {}: {}", path.display(), e), reference)
            }),
            AssetRef::Inline {
                mime,
                base64,
                payload,
            } => {
                if !*base64 {
                    return Err(PostError::asset(
                        format!("only base64 data URIs are supported (got '{}')", mime),
                        reference,
                    ));
                }
                base64::engine::general_purpose::STANDARD
                    .decode(payload.trim())
                    .map_err(|e| PostError::asset(format!("invalid base64 payload: {}", e), reference))
            }
            AssetRef::Remote(url) => {
                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| PostError::asset(format!("request failed: {}", e), reference))?;
                if !response.status().is_success() {
                    return Err(PostError::asset(
                        format!("remote fetch failed with status {}", response.status()),
                        reference,
                    ));
                }
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| PostError::asset(format!("failed to read body: {}", e), reference))?;
                Ok(bytes.to_vec())
            }
        }
    }
}

/// Decode encoded image bytes into an RGBA frame buffer.
pub fn decode_image(bytes: &[u8], reference: &str) -> PostResult<FrameBuffer> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| PostError::asset(format!("failed to decode image: {}", e), reference))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(PostError::asset("image has no pixels", reference));
    }
    FrameBuffer::from_raw(width, height, rgba.into_raw())
        .ok_or_else(|| PostError::asset("decoded buffer has unexpected length", reference))
}
