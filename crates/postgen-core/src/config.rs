use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PostError, PostResult};
use crate::Color;

/// Pause between two consecutive download triggers. Mobile browsers (Safari
/// in particular) silently drop downloads fired closer together than this.
pub const DEFAULT_DOWNLOAD_INTERVAL: Duration = Duration::from_millis(800);

/// Canonical output width of every slide, in pixels.
pub const CANVAS_WIDTH: u32 = 600;
/// Canonical output height of every slide, in pixels.
pub const CANVAS_HEIGHT: u32 = 750;

/// Surface colors. The slide size is fixed at [`CANVAS_WIDTH`] x
/// [`CANVAS_HEIGHT`] because slide text placements are authored for it.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CanvasConfig {
    /// Color the surface is cleared to before anything is drawn.
    pub clear: Color,
    /// Fill used when there is no background photo or it fails to load.
    pub placeholder: Color,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            clear: Color::WHITE,
            placeholder: Color::PLACEHOLDER,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TextConfig {
    pub font_family: String,
    /// Explicit font file; when unset the family is looked up in system fonts.
    pub font_path: Option<PathBuf>,
    pub color: Color,
    pub shadow_color: Color,
    pub shadow_blur: f32,
    pub shadow_offset_x: i32,
    pub shadow_offset_y: i32,
    /// Substitute each slide's placeholder text when its field is blank.
    pub placeholders: bool,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            font_family: "Roboto".to_string(),
            font_path: None,
            color: Color::WHITE,
            shadow_color: Color::SHADOW,
            shadow_blur: 8.0,
            shadow_offset_x: 0,
            shadow_offset_y: 4,
            placeholders: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Base directory for relative template references.
    pub templates_dir: PathBuf,
    pub fetch_timeout_secs: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            fetch_timeout_secs: 15,
        }
    }
}

impl AssetsConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub download_interval_ms: u64,
    pub output_dir: PathBuf,
    /// Program (plus leading arguments) that receives every file path in a
    /// single invocation. No command means native share is unsupported.
    pub share_command: Option<Vec<String>>,
    pub share_cancel_exit_code: i32,
    pub share_text: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            download_interval_ms: DEFAULT_DOWNLOAD_INTERVAL.as_millis() as u64,
            output_dir: PathBuf::from("output"),
            share_command: None,
            share_cancel_exit_code: 130,
            share_text: "Generated with postgen".to_string(),
        }
    }
}

impl DeliveryConfig {
    pub fn download_interval(&self) -> Duration {
        Duration::from_millis(self.download_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PostgenConfig {
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl PostgenConfig {
    pub fn load_from_file(path: &Path) -> PostResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&contents)
            .map_err(|e| PostError::config(e.to_string(), path))?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(contents: &str) -> PostResult<Self> {
        let config: PostgenConfig = toml::from_str(contents)
            .map_err(|e| PostError::InvalidArgument(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> PostResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| PostError::config(e.to_string(), path))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn validate(&self) -> PostResult<()> {
        if !self.text.shadow_blur.is_finite() || self.text.shadow_blur < 0.0 {
            return Err(PostError::InvalidArgument(
                "text.shadow_blur must be a non-negative number".into(),
            ));
        }
        if let Some(cmd) = &self.delivery.share_command {
            if cmd.is_empty() {
                return Err(PostError::InvalidArgument(
                    "delivery.share_command must name a program".into(),
                ));
            }
        }
        Ok(())
    }
}
