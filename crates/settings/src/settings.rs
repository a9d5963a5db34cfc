//! Transformation settings and sanitization.

use serde::{Deserialize, Serialize};

/// Font style for the text watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// The complete, declarative description of one transformation.
///
/// All numeric ranges are enforced by [`Settings::sanitize`]; field docs give
/// the valid range and the default used when input is missing or malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Brightness offset, `[-1, 1]`, default 0.
    pub brightness: f64,
    /// Contrast multiplier, `[0, 2]`, default 1.
    pub contrast: f64,
    /// Saturation multiplier, `[0, 3]`, default 1.
    pub saturation: f64,

    /// Fraction trimmed from each edge then scaled back, `[0, 0.20]`.
    pub smart_crop: f64,

    /// Mirror horizontally.
    pub flip_h: bool,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270. Anything else
    /// normalizes to 0.
    pub rotation: u32,

    /// Film grain strength, `[0, 100]`. 0 disables the filter.
    pub film_grain: f64,
    /// Whether to fade in/out at the clip boundaries.
    pub fade_enabled: bool,
    /// Fade duration in seconds, `[0.1, 2.0]`, default 0.5.
    pub fade_duration: f64,

    /// Watermark text. Empty string disables the text watermark.
    pub watermark_text: String,
    /// Horizontal center of the text box as a percentage, `[0, 100]`.
    pub watermark_x: f64,
    /// Vertical center of the text box as a percentage, `[0, 100]`.
    pub watermark_y: f64,
    /// Font size in points, `[8, 200]`, default 24.
    pub watermark_size: f64,
    /// Font family name. Preview-only; the render uses the staged font file.
    pub watermark_font_family: String,
    /// Font weight, `[100, 900]`, default 700.
    pub watermark_font_weight: u32,
    /// Normal or italic.
    pub watermark_font_style: FontStyle,
    /// Text color as `#RRGGBB`. Malformed values fall back to white.
    pub watermark_color: String,
    /// Text opacity as a percentage, `[0, 100]`.
    pub watermark_opacity: f64,

    /// Whether the image watermark is composited. Forced off when no image
    /// resource is attached.
    pub watermark_image_enabled: bool,
    /// Horizontal center of the image as a percentage, `[0, 100]`.
    pub watermark_image_x: f64,
    /// Vertical center of the image as a percentage, `[0, 100]`.
    pub watermark_image_y: f64,
    /// Image scale factor, `[0.05, 2.0]`, default 0.25.
    pub watermark_image_scale: f64,
    /// Image opacity as a percentage, `[0, 100]`, default 90.
    pub watermark_image_opacity: f64,

    /// Playback rate, `[0.95, 1.05]`, default 1.
    pub playback_rate: f64,

    /// Strip all source metadata and stamp a fresh creation time.
    pub regenerate_metadata: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            smart_crop: 0.0,
            flip_h: false,
            rotation: 0,
            film_grain: 0.0,
            fade_enabled: false,
            fade_duration: 0.5,
            watermark_text: String::new(),
            watermark_x: 5.0,
            watermark_y: 5.0,
            watermark_size: 24.0,
            watermark_font_family: "Arial".to_string(),
            watermark_font_weight: 700,
            watermark_font_style: FontStyle::Normal,
            watermark_color: "#ffffff".to_string(),
            watermark_opacity: 100.0,
            watermark_image_enabled: false,
            watermark_image_x: 5.0,
            watermark_image_y: 5.0,
            watermark_image_scale: 0.25,
            watermark_image_opacity: 90.0,
            playback_rate: 1.0,
            regenerate_metadata: true,
        }
    }
}

fn clamp(n: f64, min: f64, max: f64) -> f64 {
    n.max(min).min(max)
}

fn finite_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}

fn valid_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl Settings {
    /// Coerce every field to a valid value.
    ///
    /// Total and idempotent: non-finite numbers fall back to the field
    /// default, out-of-range values clamp to the nearest bound, and the
    /// image watermark is forced off when no image resource is attached.
    pub fn sanitize(mut self, has_watermark_image: bool) -> Self {
        let defaults = Settings::default();

        self.brightness = clamp(finite_or(self.brightness, defaults.brightness), -1.0, 1.0);
        self.contrast = clamp(finite_or(self.contrast, defaults.contrast), 0.0, 2.0);
        self.saturation = clamp(finite_or(self.saturation, defaults.saturation), 0.0, 3.0);

        self.smart_crop = clamp(finite_or(self.smart_crop, defaults.smart_crop), 0.0, 0.2);
        if !matches!(self.rotation, 90 | 180 | 270) {
            self.rotation = 0;
        }

        self.film_grain = clamp(finite_or(self.film_grain, defaults.film_grain), 0.0, 100.0);
        self.fade_duration = clamp(finite_or(self.fade_duration, defaults.fade_duration), 0.1, 2.0);

        self.watermark_x = clamp(finite_or(self.watermark_x, defaults.watermark_x), 0.0, 100.0);
        self.watermark_y = clamp(finite_or(self.watermark_y, defaults.watermark_y), 0.0, 100.0);
        self.watermark_size =
            clamp(finite_or(self.watermark_size, defaults.watermark_size), 8.0, 200.0);
        self.watermark_font_weight = self.watermark_font_weight.clamp(100, 900);
        if !valid_hex_color(&self.watermark_color) {
            self.watermark_color = defaults.watermark_color.clone();
        }
        self.watermark_opacity = clamp(
            finite_or(self.watermark_opacity, defaults.watermark_opacity),
            0.0,
            100.0,
        );

        self.watermark_image_enabled = has_watermark_image && self.watermark_image_enabled;
        self.watermark_image_x = clamp(
            finite_or(self.watermark_image_x, defaults.watermark_image_x),
            0.0,
            100.0,
        );
        self.watermark_image_y = clamp(
            finite_or(self.watermark_image_y, defaults.watermark_image_y),
            0.0,
            100.0,
        );
        self.watermark_image_scale = clamp(
            finite_or(self.watermark_image_scale, defaults.watermark_image_scale),
            0.05,
            2.0,
        );
        self.watermark_image_opacity = clamp(
            finite_or(self.watermark_image_opacity, defaults.watermark_image_opacity),
            0.0,
            100.0,
        );

        self.playback_rate = clamp(
            finite_or(self.playback_rate, defaults.playback_rate),
            0.95,
            1.05,
        );

        self
    }

    /// Parse settings from a JSON document leniently.
    ///
    /// Missing, extra, and wrong-typed fields fall back to their defaults,
    /// so a hand-edited or out-of-date document still loads. The result is
    /// unclamped; callers run [`Settings::sanitize`] before use.
    pub fn from_json_value(value: &serde_json::Value) -> Self {
        let defaults = Settings::default();
        let get = |key: &str| value.get(key);
        let num = |key: &str, fallback: f64| get(key).and_then(|v| v.as_f64()).unwrap_or(fallback);
        let flag = |key: &str, fallback: bool| get(key).and_then(|v| v.as_bool()).unwrap_or(fallback);
        let text = |key: &str, fallback: &str| {
            get(key)
                .and_then(|v| v.as_str())
                .unwrap_or(fallback)
                .to_string()
        };

        if !value.is_object() {
            tracing::warn!("Settings document is not a JSON object; using defaults");
            return defaults;
        }

        Self {
            brightness: num("brightness", defaults.brightness),
            contrast: num("contrast", defaults.contrast),
            saturation: num("saturation", defaults.saturation),
            smart_crop: num("smart_crop", defaults.smart_crop),
            flip_h: flag("flip_h", defaults.flip_h),
            rotation: num("rotation", 0.0) as u32,
            film_grain: num("film_grain", defaults.film_grain),
            fade_enabled: flag("fade_enabled", defaults.fade_enabled),
            fade_duration: num("fade_duration", defaults.fade_duration),
            watermark_text: text("watermark_text", &defaults.watermark_text),
            watermark_x: num("watermark_x", defaults.watermark_x),
            watermark_y: num("watermark_y", defaults.watermark_y),
            watermark_size: num("watermark_size", defaults.watermark_size),
            watermark_font_family: text("watermark_font_family", &defaults.watermark_font_family),
            watermark_font_weight: num("watermark_font_weight", defaults.watermark_font_weight as f64)
                as u32,
            watermark_font_style: match get("watermark_font_style").and_then(|v| v.as_str()) {
                Some("italic") => FontStyle::Italic,
                _ => FontStyle::Normal,
            },
            watermark_color: text("watermark_color", &defaults.watermark_color),
            watermark_opacity: num("watermark_opacity", defaults.watermark_opacity),
            watermark_image_enabled: flag("watermark_image_enabled", defaults.watermark_image_enabled),
            watermark_image_x: num("watermark_image_x", defaults.watermark_image_x),
            watermark_image_y: num("watermark_image_y", defaults.watermark_image_y),
            watermark_image_scale: num("watermark_image_scale", defaults.watermark_image_scale),
            watermark_image_opacity: num("watermark_image_opacity", defaults.watermark_image_opacity),
            playback_rate: num("playback_rate", defaults.playback_rate),
            regenerate_metadata: flag("regenerate_metadata", defaults.regenerate_metadata),
        }
    }

    /// Parse from a JSON string leniently; a document that fails to parse at
    /// all yields the defaults.
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(value) => Self::from_json_value(&value),
            Err(e) => {
                tracing::warn!("Settings document failed to parse: {e}; using defaults");
                Settings::default()
            }
        }
    }
}
