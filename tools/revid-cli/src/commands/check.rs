//! Check engine availability and configuration.

use revid_common::config::{config_file_path, AppConfig};
use revid_engine::ffmpeg::command_exists;

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load();

    let ffmpeg = command_exists("ffmpeg").await;
    let ffprobe = command_exists("ffprobe").await;

    println!("ffmpeg:   {}", if ffmpeg { "ok" } else { "missing" });
    println!(
        "ffprobe:  {} (duration probe; without it fade-out is omitted)",
        if ffprobe { "ok" } else { "missing" }
    );
    println!("config:   {}", config_file_path().display());
    println!("work dir: {}", config.work_dir.display());

    if !ffmpeg {
        anyhow::bail!("ffmpeg not found in PATH");
    }
    Ok(())
}
