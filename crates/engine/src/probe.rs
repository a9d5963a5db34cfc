//! Source media probing.

use std::path::Path;

use tokio::process::Command;

/// Probe the duration of a media file in seconds via ffprobe.
///
/// Returns `None` on any failure; the only consumer is fade-out timing,
/// which degrades to "fade-out omitted" when the duration is unknown.
pub async fn probe_duration_secs(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let duration = raw.trim().parse::<f64>().ok()?;
    if !duration.is_finite() || duration <= 0.0 {
        return None;
    }
    Some(duration)
}
