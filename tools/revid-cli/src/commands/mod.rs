//! CLI subcommands and shared transformation flags.

pub mod batch;
pub mod check;
pub mod export;

use std::path::{Path, PathBuf};

use revid_engine::{FontResource, ImageResource};
use revid_settings::Settings;

/// Transformation flags shared by `export` and `batch`.
///
/// A `--settings` document loads first (leniently: unknown or malformed
/// fields fall back to defaults), then explicit flags override individual
/// fields, then the result is sanitized.
#[derive(clap::Args, Debug)]
pub struct TransformArgs {
    /// Settings JSON document to start from
    #[arg(long, value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Brightness offset [-1, 1]
    #[arg(long)]
    pub brightness: Option<f64>,

    /// Contrast multiplier [0, 2]
    #[arg(long)]
    pub contrast: Option<f64>,

    /// Saturation multiplier [0, 3]
    #[arg(long)]
    pub saturation: Option<f64>,

    /// Fraction cropped from each edge, scaled back up [0, 0.2]
    #[arg(long)]
    pub smart_crop: Option<f64>,

    /// Mirror horizontally
    #[arg(long)]
    pub flip_h: bool,

    /// Clockwise rotation: 0, 90, 180 or 270
    #[arg(long)]
    pub rotation: Option<u32>,

    /// Film grain strength [0, 100]
    #[arg(long)]
    pub film_grain: Option<f64>,

    /// Fade in/out at the clip boundaries
    #[arg(long)]
    pub fade: bool,

    /// Fade duration in seconds [0.1, 2.0]
    #[arg(long)]
    pub fade_duration: Option<f64>,

    /// Watermark text
    #[arg(long)]
    pub watermark_text: Option<String>,

    /// Watermark text center X as a percentage [0, 100]
    #[arg(long)]
    pub watermark_x: Option<f64>,

    /// Watermark text center Y as a percentage [0, 100]
    #[arg(long)]
    pub watermark_y: Option<f64>,

    /// Watermark font size [8, 200]
    #[arg(long)]
    pub watermark_size: Option<f64>,

    /// Watermark text color as #RRGGBB
    #[arg(long)]
    pub watermark_color: Option<String>,

    /// Watermark text opacity [0, 100]
    #[arg(long)]
    pub watermark_opacity: Option<f64>,

    /// Watermark image file (PNG/JPEG/WebP/GIF); attaching one enables it
    #[arg(long, value_name = "FILE")]
    pub watermark_image: Option<PathBuf>,

    /// Watermark image center X as a percentage [0, 100]
    #[arg(long)]
    pub watermark_image_x: Option<f64>,

    /// Watermark image center Y as a percentage [0, 100]
    #[arg(long)]
    pub watermark_image_y: Option<f64>,

    /// Watermark image scale [0.05, 2.0]
    #[arg(long)]
    pub watermark_image_scale: Option<f64>,

    /// Watermark image opacity [0, 100]
    #[arg(long)]
    pub watermark_image_opacity: Option<f64>,

    /// Font file (TTF/OTF) used for the text watermark
    #[arg(long, value_name = "FILE")]
    pub watermark_font: Option<PathBuf>,

    /// Playback rate [0.95, 1.05]
    #[arg(long)]
    pub playback_rate: Option<f64>,

    /// Keep source metadata instead of stripping and restamping it
    #[arg(long)]
    pub keep_metadata: bool,
}

impl TransformArgs {
    /// Resolve the flags into a sanitized settings snapshot plus the
    /// attached watermark resources.
    pub fn resolve(
        &self,
    ) -> anyhow::Result<(Settings, Option<ImageResource>, Option<FontResource>)> {
        let mut settings = match &self.settings {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    anyhow::anyhow!("Failed to read settings {}: {e}", path.display())
                })?;
                Settings::from_json_str(&raw)
            }
            None => Settings::default(),
        };

        if let Some(v) = self.brightness {
            settings.brightness = v;
        }
        if let Some(v) = self.contrast {
            settings.contrast = v;
        }
        if let Some(v) = self.saturation {
            settings.saturation = v;
        }
        if let Some(v) = self.smart_crop {
            settings.smart_crop = v;
        }
        if self.flip_h {
            settings.flip_h = true;
        }
        if let Some(v) = self.rotation {
            settings.rotation = v;
        }
        if let Some(v) = self.film_grain {
            settings.film_grain = v;
        }
        if self.fade {
            settings.fade_enabled = true;
        }
        if let Some(v) = self.fade_duration {
            settings.fade_duration = v;
        }
        if let Some(v) = &self.watermark_text {
            settings.watermark_text = v.clone();
        }
        if let Some(v) = self.watermark_x {
            settings.watermark_x = v;
        }
        if let Some(v) = self.watermark_y {
            settings.watermark_y = v;
        }
        if let Some(v) = self.watermark_size {
            settings.watermark_size = v;
        }
        if let Some(v) = &self.watermark_color {
            settings.watermark_color = v.clone();
        }
        if let Some(v) = self.watermark_opacity {
            settings.watermark_opacity = v;
        }
        if let Some(v) = self.watermark_image_x {
            settings.watermark_image_x = v;
        }
        if let Some(v) = self.watermark_image_y {
            settings.watermark_image_y = v;
        }
        if let Some(v) = self.watermark_image_scale {
            settings.watermark_image_scale = v;
        }
        if let Some(v) = self.watermark_image_opacity {
            settings.watermark_image_opacity = v;
        }
        if let Some(v) = self.playback_rate {
            settings.playback_rate = v;
        }
        if self.keep_metadata {
            settings.regenerate_metadata = false;
        }

        let image = match &self.watermark_image {
            Some(path) => Some(load_image_resource(path)?),
            None => None,
        };
        if image.is_some() {
            settings.watermark_image_enabled = true;
        }

        let font = match &self.watermark_font {
            Some(path) => Some(FontResource::from_path(path)?),
            None => None,
        };

        Ok((settings.sanitize(image.is_some()), image, font))
    }
}

fn load_image_resource(path: &Path) -> anyhow::Result<ImageResource> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("Failed to read watermark image {}: {e}", path.display()))?;
    let media_type = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    };

    Ok(ImageResource {
        bytes,
        media_type: media_type.to_string(),
    })
}

/// Display name of a source file.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}
