//! Transform a single video.

use std::io::Write;
use std::path::PathBuf;

use revid_common::config::AppConfig;
use revid_engine::{
    ExportJob, FfmpegEngine, FontResolver, JobProgress, JobResources, JobRunner, JobTimeouts,
};

use super::{source_name, TransformArgs};

pub async fn run(
    input: PathBuf,
    output: Option<PathBuf>,
    transform: TransformArgs,
) -> anyhow::Result<()> {
    let config = AppConfig::load();
    let (settings, image, font) = transform.resolve()?;
    let resources = JobResources {
        watermark_image: image.as_ref(),
        watermark_font: font.as_ref(),
    };

    let mut engine = FfmpegEngine::new(&config.work_dir);
    let mut fonts = FontResolver::new();
    let mut runner = JobRunner::new(&mut engine, &mut fonts, JobTimeouts::from(&config.export));

    let job = ExportJob {
        id: revid_common::id::job_id(),
        source_path: input.clone(),
        source_name: source_name(&input),
        settings,
        timestamp: chrono::Utc::now(),
    };

    println!("Exporting: {}", input.display());

    let mut hook = |p: JobProgress| {
        print!("\r  Progress: {:>5.1}%  ", p.fraction * 100.0);
        std::io::stdout().flush().ok();
    };
    let artifact = runner
        .run(&job, &resources, &mut hook)
        .await
        .map_err(|e| anyhow::anyhow!("Export failed: {e}"))?;
    println!();

    let output_path = output.unwrap_or_else(|| PathBuf::from(&artifact.file_name));
    std::fs::write(&output_path, &artifact.data)?;
    println!(
        "Export complete: {} ({} bytes)",
        output_path.display(),
        artifact.data.len()
    );

    Ok(())
}
