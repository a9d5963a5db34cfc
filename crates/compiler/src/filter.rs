//! Ordered filter chain construction.
//!
//! Chain order is semantically load-bearing: later stages operate on the
//! coordinate and time system produced by earlier stages, so rotation must
//! precede the crop, the even-dimension guard must follow every resize, and
//! fades are appended last so their timestamps are in output time.

use revid_settings::Settings;

/// Fixed working-storage path the text-watermark font is staged under.
pub const FONT_STAGING_PATH: &str = "wm_font.ttf";

/// Escape text for use inside a drawtext `text='...'` literal.
///
/// drawtext parsing is picky; keep this conservative: escape `:` (the
/// key/value separator) and drop single quotes entirely.
pub fn escape_drawtext(text: &str) -> String {
    text.replace(':', "\\:").replace('\'', "")
}

/// Build the ordered video filter chain for one render.
///
/// The color-grading filter and the trailing even-dimension guard are always
/// emitted; every other stage is omitted when its parameters are a no-op.
pub fn build_video_filters(settings: &Settings) -> Vec<String> {
    let mut filters = Vec::new();

    // Color grading. Identity values still emit so the compiled command is
    // deterministic across settings.
    filters.push(format!(
        "eq=brightness={}:contrast={}:saturation={}",
        settings.brightness, settings.contrast, settings.saturation
    ));

    // Framing
    if settings.flip_h {
        filters.push("hflip".to_string());
    }

    // Rotation
    match settings.rotation {
        90 => filters.push("transpose=1".to_string()),
        180 => {
            filters.push("transpose=1".to_string());
            filters.push("transpose=1".to_string());
        }
        270 => filters.push("transpose=2".to_string()),
        _ => {}
    }

    // Smart crop: trim the same fraction from every edge, then scale back so
    // the output keeps the input resolution.
    if settings.smart_crop > 0.0 {
        let p = settings.smart_crop.clamp(0.0, 0.2);
        let keep = 1.0 - 2.0 * p;
        filters.push(format!("crop=iw*{keep}:ih*{keep}:iw*{p}:ih*{p}"));
        // After the crop iw/ih are the cropped dims, so 1/keep restores them.
        filters.push(format!("scale=iw/{keep}:ih/{keep}"));
    }

    // Film grain
    if settings.film_grain > 0.0 {
        let strength = settings.film_grain.clamp(0.0, 100.0);
        filters.push(format!("noise=alls={strength}:allf=t+u"));
    }

    // Text watermark. X/Y are the center point of the rendered text box.
    if !settings.watermark_text.is_empty() {
        let safe_text = escape_drawtext(&settings.watermark_text);
        let x = format!("(w*{}-text_w/2)", settings.watermark_x / 100.0);
        let y = format!("(h*{}-text_h/2)", settings.watermark_y / 100.0);

        let hex = settings.watermark_color.trim_start_matches('#');
        let alpha = settings.watermark_opacity.clamp(0.0, 100.0) / 100.0;
        let shadow_alpha = (alpha + 0.2).min(1.0);

        filters.push(format!(
            "drawtext=fontfile={FONT_STAGING_PATH}:text='{safe_text}':x={x}:y={y}:\
             fontsize={size}:fontcolor=0x{hex}@{alpha}:\
             shadowcolor=black@{shadow_alpha}:shadowx=2:shadowy=2",
            size = settings.watermark_size,
        ));
    }

    // Speed (video)
    if settings.playback_rate != 1.0 {
        filters.push(format!("setpts=PTS/{}", settings.playback_rate));
    }

    // yuv420p output requires even dimensions, and the crop/scale above can
    // produce odd sizes (e.g. 720x959) that make the encoder fail.
    filters.push("scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string());

    filters
}

/// Decompose a tempo ratio into chained factors, each within the
/// `[0.5, 2.0]` range the atempo primitive accepts per application.
///
/// The product of the returned factors equals `rate`. Non-positive or
/// non-finite rates yield an empty chain.
pub fn decompose_tempo(rate: f64) -> Vec<f64> {
    if !rate.is_finite() || rate <= 0.0 {
        return Vec::new();
    }

    let mut factors = Vec::new();
    let mut rate = rate;
    while rate > 2.0 {
        factors.push(2.0);
        rate /= 2.0;
    }
    while rate < 0.5 {
        factors.push(0.5);
        rate /= 0.5;
    }
    factors.push(rate);
    factors
}

/// Build the audio filter chain: chained atempo factors when the playback
/// rate is not 1, otherwise nothing.
pub fn build_audio_filters(settings: &Settings) -> Vec<String> {
    if settings.playback_rate == 1.0 {
        return Vec::new();
    }

    decompose_tempo(settings.playback_rate)
        .into_iter()
        .map(|factor| format!("atempo={factor}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_transposes(filters: &[String]) -> usize {
        filters.iter().filter(|f| f.starts_with("transpose")).count()
    }

    #[test]
    fn identity_settings_emit_only_eq_and_even_guard() {
        let filters = build_video_filters(&Settings::default());
        assert_eq!(
            filters,
            vec![
                "eq=brightness=0:contrast=1:saturation=1".to_string(),
                "scale=trunc(iw/2)*2:trunc(ih/2)*2".to_string(),
            ]
        );
    }

    #[test]
    fn rotation_emits_expected_transpose_count() {
        for (rotation, expected) in [(0u32, 0usize), (90, 1), (180, 2), (270, 1)] {
            let settings = Settings {
                rotation,
                ..Settings::default()
            };
            let filters = build_video_filters(&settings);
            assert_eq!(
                count_transposes(&filters),
                expected,
                "rotation {rotation}"
            );
        }
        // 270 is the inverse-direction transpose.
        let filters = build_video_filters(&Settings {
            rotation: 270,
            ..Settings::default()
        });
        assert!(filters.contains(&"transpose=2".to_string()));
    }

    #[test]
    fn smart_crop_keeps_and_restores_dimensions() {
        let settings = Settings {
            smart_crop: 0.1,
            ..Settings::default()
        };
        let filters = build_video_filters(&settings);

        let crop = filters
            .iter()
            .find(|f| f.starts_with("crop="))
            .expect("crop filter");
        assert_eq!(crop, "crop=iw*0.8:ih*0.8:iw*0.1:ih*0.1");

        let scale = filters
            .iter()
            .find(|f| f.starts_with("scale=iw"))
            .expect("restoring scale filter");
        assert_eq!(scale, "scale=iw/0.8:ih/0.8");

        // keep * 1/keep restores 100% of the original dimensions.
        let keep: f64 = 1.0 - 2.0 * 0.1;
        assert!((keep * (1.0 / keep) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_crop_emits_nothing() {
        let filters = build_video_filters(&Settings::default());
        assert!(!filters.iter().any(|f| f.starts_with("crop=")));
    }

    #[test]
    fn even_dimension_guard_is_always_last() {
        let busy = Settings {
            brightness: 0.2,
            flip_h: true,
            rotation: 90,
            smart_crop: 0.05,
            film_grain: 40.0,
            watermark_text: "demo".to_string(),
            playback_rate: 1.05,
            ..Settings::default()
        };
        for settings in [Settings::default(), busy] {
            let filters = build_video_filters(&settings);
            assert_eq!(
                filters.last().map(String::as_str),
                Some("scale=trunc(iw/2)*2:trunc(ih/2)*2")
            );
        }
    }

    #[test]
    fn drawtext_escapes_colons_and_strips_quotes() {
        assert_eq!(escape_drawtext("a:b"), "a\\:b");
        assert_eq!(escape_drawtext("it's"), "its");
        assert_eq!(escape_drawtext("10:30 o'clock"), "10\\:30 oclock");
    }

    #[test]
    fn drawtext_centers_text_and_applies_color_alpha() {
        let settings = Settings {
            watermark_text: "sample".to_string(),
            watermark_x: 50.0,
            watermark_y: 50.0,
            watermark_color: "#ff0000".to_string(),
            watermark_opacity: 50.0,
            ..Settings::default()
        };
        let filters = build_video_filters(&settings);
        let drawtext = filters
            .iter()
            .find(|f| f.starts_with("drawtext="))
            .expect("drawtext filter");

        assert!(drawtext.contains("x=(w*0.5-text_w/2)"));
        assert!(drawtext.contains("y=(h*0.5-text_h/2)"));
        assert!(drawtext.contains("fontcolor=0xff0000@0.5"));
        // Shadow alpha is boosted above the text alpha, capped at 1.
        assert!(drawtext.contains("shadowcolor=black@0.7"));
        assert!(drawtext.contains(&format!("fontfile={FONT_STAGING_PATH}")));
    }

    #[test]
    fn shadow_alpha_caps_at_full_opacity() {
        let settings = Settings {
            watermark_text: "sample".to_string(),
            watermark_opacity: 95.0,
            ..Settings::default()
        };
        let filters = build_video_filters(&settings);
        let drawtext = filters.iter().find(|f| f.starts_with("drawtext=")).unwrap();
        assert!(drawtext.contains("shadowcolor=black@1"));
    }

    #[test]
    fn tempo_decomposition_stays_in_range_and_preserves_product() {
        for rate in [3.0, 0.3, 5.5, 0.1, 1.7, 0.95, 1.05] {
            let factors = decompose_tempo(rate);
            assert!(!factors.is_empty());
            for factor in &factors {
                assert!(
                    (0.5..=2.0).contains(factor),
                    "factor {factor} out of range for rate {rate}"
                );
            }
            let product: f64 = factors.iter().product();
            assert!(
                (product - rate).abs() < 1e-9,
                "product {product} != rate {rate}"
            );
        }
    }

    #[test]
    fn unit_rate_emits_no_audio_filters() {
        assert!(build_audio_filters(&Settings::default()).is_empty());
    }

    #[test]
    fn off_unit_rate_emits_single_atempo_within_sanitized_range() {
        let settings = Settings {
            playback_rate: 1.05,
            ..Settings::default()
        };
        assert_eq!(build_audio_filters(&settings), vec!["atempo=1.05"]);
    }
}
