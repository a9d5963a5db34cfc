//! Full engine argument-list generation.

use chrono::{DateTime, Utc};
use revid_settings::Settings;

use crate::filter::{build_audio_filters, build_video_filters};

/// Per-render context the settings object does not carry.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Source media duration in seconds; 0 when unknown. Only needed for
    /// fade-out timing, so callers probe it only when fades are enabled.
    pub input_duration_secs: f64,

    /// Timestamp used for regenerated metadata.
    pub timestamp: DateTime<Utc>,

    /// Working-storage name of the staged watermark image, when one is
    /// attached and enabled.
    pub watermark_image_input: Option<String>,
}

impl RenderContext {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            input_duration_secs: 0.0,
            timestamp,
            watermark_image_input: None,
        }
    }
}

/// Compile the complete argument list for one render.
///
/// Deterministic and total for sanitized settings: the same inputs always
/// produce the same argument vector, and no settings value can make
/// compilation fail.
pub fn generate_args(
    input_name: &str,
    output_name: &str,
    settings: &Settings,
    ctx: &RenderContext,
) -> Vec<String> {
    let mut video_filters = build_video_filters(settings);
    let audio_filters = build_audio_filters(settings);

    let mut args: Vec<String> = vec!["-i".to_string(), input_name.to_string()];

    // Fades are appended after the base chain (even-dimension guard
    // included) so their timestamps are in output time.
    if settings.fade_enabled && settings.fade_duration > 0.0 {
        let d = settings.fade_duration.clamp(0.1, 2.0);
        video_filters.push(format!("fade=t=in:st=0:d={d}"));

        if ctx.input_duration_secs > 0.0 {
            let rate = if settings.playback_rate > 0.0 {
                settings.playback_rate
            } else {
                1.0
            };
            let out_duration = ctx.input_duration_secs / rate;
            let st = (out_duration - d).max(0.0);
            video_filters.push(format!("fade=t=out:st={st}:d={d}"));
        }
    }

    let watermark_image_input = if settings.watermark_image_enabled {
        ctx.watermark_image_input.as_deref()
    } else {
        None
    };

    if let Some(image_name) = watermark_image_input {
        // Two-input graph: the full chain runs on the video into a labeled
        // pad, the image is alpha-multiplied and scaled, and the overlay
        // centers the image at its X/Y percentages.
        args.push("-i".to_string());
        args.push(image_name.to_string());

        let base = if video_filters.is_empty() {
            "null".to_string()
        } else {
            video_filters.join(",")
        };
        let alpha = settings.watermark_image_opacity.clamp(0.0, 100.0) / 100.0;
        let scale = settings.watermark_image_scale.clamp(0.05, 2.0);
        let x = format!("W*{}-w/2", settings.watermark_image_x / 100.0);
        let y = format!("H*{}-h/2", settings.watermark_image_y / 100.0);

        let filter_complex = format!(
            "[0:v]{base}[v0];\
             [1:v]format=rgba,colorchannelmixer=aa={alpha},scale=iw*{scale}:ih*{scale}[wm];\
             [v0][wm]overlay=x={x}:y={y}:format=auto[v]"
        );

        args.push("-filter_complex".to_string());
        args.push(filter_complex);
        args.push("-map".to_string());
        args.push("[v]".to_string());
        args.push("-map".to_string());
        args.push("0:a?".to_string());
    } else if !video_filters.is_empty() {
        args.push("-vf".to_string());
        args.push(video_filters.join(","));
    }

    if !audio_filters.is_empty() {
        args.push("-af".to_string());
        args.push(audio_filters.join(","));
    }

    // Metadata regeneration
    if settings.regenerate_metadata {
        args.push("-map_metadata".to_string());
        args.push("-1".to_string());
        args.push("-metadata".to_string());
        args.push(format!("creation_time={}", ctx.timestamp.to_rfc3339()));
        args.push("-metadata".to_string());
        args.push("comment=transformed".to_string());
    }

    // Fixed encoding policy: fastest preset, browser-compatible pixel
    // format, output name last.
    args.push("-preset".to_string());
    args.push("ultrafast".to_string());
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    args.push(output_name.to_string());

    tracing::debug!(
        video_filters = video_filters.len(),
        audio_filters = audio_filters.len(),
        args = args.len(),
        "Compiled engine argument list"
    );

    args
}
