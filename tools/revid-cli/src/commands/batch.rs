//! Transform a queue of videos sequentially.

use std::path::PathBuf;

use revid_common::config::AppConfig;
use revid_engine::{
    process_queue, FfmpegEngine, FontResolver, JobResources, JobTimeouts, QueueItem, QueueStatus,
};

use super::TransformArgs;

pub async fn run(
    inputs: Vec<PathBuf>,
    out_dir: PathBuf,
    transform: TransformArgs,
) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let (settings, image, font) = transform.resolve()?;
    let resources = JobResources {
        watermark_image: image.as_ref(),
        watermark_font: font.as_ref(),
    };

    let mut queue: Vec<QueueItem> = inputs.into_iter().map(QueueItem::new).collect();
    println!("Processing {} queued item(s) sequentially", queue.len());

    let mut engine = FfmpegEngine::new(&config.work_dir);
    let mut fonts = FontResolver::new();
    let report = process_queue(
        &mut engine,
        &mut fonts,
        JobTimeouts::from(&config.export),
        &settings,
        &resources,
        &mut queue,
    )
    .await;

    std::fs::create_dir_all(&out_dir)?;
    for item in &queue {
        match item.status {
            QueueStatus::Done => {
                if let Some(artifact) = &item.output {
                    let path = out_dir.join(&artifact.file_name);
                    std::fs::write(&path, &artifact.data)?;
                    println!("  done   {} -> {}", item.source_name, path.display());
                }
            }
            QueueStatus::Error => {
                println!(
                    "  failed {}: {}",
                    item.source_name,
                    item.error.as_deref().unwrap_or("processing failed")
                );
            }
            QueueStatus::Pending | QueueStatus::Processing => {}
        }
    }

    println!(
        "Batch finished: {} done, {} failed",
        report.completed, report.failed
    );

    if report.is_total_failure() {
        anyhow::bail!("every queue item failed");
    }
    Ok(())
}
