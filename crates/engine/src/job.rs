//! Single-job export execution.
//!
//! One runner serves both the single-export and batch paths. Each job owns
//! its staged working-storage entries for its lifetime; cleanup runs on the
//! runner's single exit path, so staged resources are released on success,
//! error, and timeout alike.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};

use revid_common::config::ExportDefaults;
use revid_common::{RevidError, RevidResult};
use revid_compiler::{generate_args, ProgressTracker, RenderContext};
use revid_settings::Settings;

use crate::engine::{EngineEvent, TranscodeEngine};
use crate::font::{FontResolver, FontResource};
use crate::probe;

/// Outputs smaller than this are treated as corrupt even when the engine
/// reported success.
pub const MIN_OUTPUT_BYTES: usize = 256;

/// Inputs past this size get an operator warning; engine memory limits make
/// failure likely.
pub const MAX_INPUT_BYTES: u64 = 2 * 1024 * 1024 * 1024;

const LOG_RING_CAPACITY: usize = 200;
const LOG_TAIL_LINES: usize = 50;

/// Timeout bounds for one job.
#[derive(Debug, Clone, Copy)]
pub struct JobTimeouts {
    pub load: Duration,
    pub render: Duration,
}

impl Default for JobTimeouts {
    fn default() -> Self {
        Self {
            load: Duration::from_secs(60),
            render: Duration::from_secs(20 * 60),
        }
    }
}

impl From<&ExportDefaults> for JobTimeouts {
    fn from(defaults: &ExportDefaults) -> Self {
        Self {
            load: Duration::from_secs(defaults.load_timeout_secs),
            render: Duration::from_secs(defaults.render_timeout_secs),
        }
    }
}

/// Stages of one export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Staging,
    Rendering,
    ReadingOutput,
    Done,
    Failed,
}

/// Progress report handed to the per-job hook.
#[derive(Debug, Clone, Copy)]
pub struct JobProgress {
    pub stage: JobStage,
    /// Normalized, monotonically non-decreasing fraction in `[0, 1]`.
    pub fraction: f64,
}

/// An image watermark resource: raw bytes plus the declared media type.
#[derive(Debug, Clone)]
pub struct ImageResource {
    pub bytes: Vec<u8>,
    pub media_type: String,
}

impl ImageResource {
    /// Working-storage extension for the declared media type.
    pub fn extension(&self) -> &'static str {
        let t = self.media_type.as_str();
        if t.contains("png") {
            "png"
        } else if t.contains("jpeg") || t.contains("jpg") {
            "jpg"
        } else if t.contains("webp") {
            "webp"
        } else if t.contains("gif") {
            "gif"
        } else {
            "png"
        }
    }
}

/// One request to transform one source file under one settings snapshot.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Identity; also namespaces this job's working-storage entries.
    pub id: String,
    pub source_path: PathBuf,
    /// Display name, used for the output artifact name.
    pub source_name: String,
    /// Sanitized settings snapshot.
    pub settings: Settings,
    /// Timestamp used for regenerated metadata.
    pub timestamp: DateTime<Utc>,
}

/// Watermark resources shared by every job in a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobResources<'a> {
    pub watermark_image: Option<&'a ImageResource>,
    pub watermark_font: Option<&'a FontResource>,
}

/// The rendered output, ready to hand back to the caller.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub data: Vec<u8>,
}

/// Working-storage names owned by one job. Collision-resistant because the
/// job id is never reused.
#[derive(Debug, Clone)]
struct StagedNames {
    input: String,
    output: String,
    watermark: Option<String>,
}

impl StagedNames {
    fn for_job(id: &str, watermark_ext: Option<&str>) -> Self {
        Self {
            input: format!("input_{id}"),
            output: format!("output_{id}.mp4"),
            watermark: watermark_ext.map(|ext| format!("wm_{id}.{ext}")),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &str> {
        [Some(self.input.as_str()), Some(self.output.as_str())]
            .into_iter()
            .chain(std::iter::once(self.watermark.as_deref()))
            .flatten()
    }
}

/// Bounded ring of engine log lines, kept for failure diagnostics.
#[derive(Debug, Default)]
struct LogRing {
    lines: VecDeque<String>,
}

impl LogRing {
    fn push(&mut self, line: String) {
        if self.lines.len() >= LOG_RING_CAPACITY {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn tail(&self, n: usize) -> String {
        let skip = self.lines.len().saturating_sub(n);
        self.lines
            .iter()
            .skip(skip)
            .cloned()
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Executes jobs one at a time against the shared engine instance.
pub struct JobRunner<'a, E: TranscodeEngine> {
    engine: &'a mut E,
    fonts: &'a mut FontResolver,
    timeouts: JobTimeouts,
}

impl<'a, E: TranscodeEngine> JobRunner<'a, E> {
    pub fn new(engine: &'a mut E, fonts: &'a mut FontResolver, timeouts: JobTimeouts) -> Self {
        Self {
            engine,
            fonts,
            timeouts,
        }
    }

    /// Run one job end-to-end: load, probe, stage, execute, read, cleanup.
    ///
    /// Cleanup of this job's staged names runs whether the job succeeds,
    /// fails, or times out. No retry happens here; the caller re-triggers.
    pub async fn run(
        &mut self,
        job: &ExportJob,
        resources: &JobResources<'_>,
        on_progress: &mut dyn FnMut(JobProgress),
    ) -> RevidResult<ExportArtifact> {
        let started = std::time::Instant::now();
        tracing::info!(job = %job.id, source = %job.source_name, "Starting export");
        on_progress(JobProgress {
            stage: JobStage::Staging,
            fraction: 0.0,
        });

        let watermark_ext = resources
            .watermark_image
            .filter(|_| job.settings.watermark_image_enabled)
            .map(ImageResource::extension);
        let names = StagedNames::for_job(&job.id, watermark_ext);

        let mut logs = LogRing::default();
        let mut tracker = ProgressTracker::new();
        let result = self
            .run_staged(job, resources, &names, &mut logs, &mut tracker, on_progress)
            .await;

        // Cleanup always, success or failure; each delete is independently
        // best-effort.
        self.release(&names).await;

        match &result {
            Ok(_) => {
                on_progress(JobProgress {
                    stage: JobStage::Done,
                    fraction: 1.0,
                });
                tracing::info!(
                    job = %job.id,
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Export finished"
                );
            }
            Err(e) => {
                on_progress(JobProgress {
                    stage: JobStage::Failed,
                    fraction: tracker.current(),
                });
                tracing::error!(job = %job.id, error = %e, "Export failed");
                if !logs.is_empty() {
                    tracing::error!(
                        job = %job.id,
                        "Engine log tail:\n{}",
                        logs.tail(LOG_TAIL_LINES)
                    );
                }
            }
        }

        result
    }

    async fn run_staged(
        &mut self,
        job: &ExportJob,
        resources: &JobResources<'_>,
        names: &StagedNames,
        logs: &mut LogRing,
        tracker: &mut ProgressTracker,
        on_progress: &mut dyn FnMut(JobProgress),
    ) -> RevidResult<ExportArtifact> {
        let load_secs = self.timeouts.load.as_secs();
        match tokio::time::timeout(self.timeouts.load, self.engine.load()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(RevidError::LoadTimeout { secs: load_secs }),
        }

        // Fade-out timing needs the source duration; a failed probe only
        // drops the fade-out.
        let input_duration_secs = if job.settings.fade_enabled {
            match probe::probe_duration_secs(&job.source_path).await {
                Some(duration) => duration,
                None => {
                    tracing::debug!(job = %job.id, "Duration probe failed; fade-out omitted");
                    0.0
                }
            }
        } else {
            0.0
        };

        if !job.settings.watermark_text.is_empty() {
            self.fonts
                .ensure_font(&mut *self.engine, resources.watermark_font)
                .await;
        }

        // A previous crashed run may have left entries behind under names we
        // are about to reuse.
        self.release(names).await;

        let input_bytes = tokio::fs::read(&job.source_path).await.map_err(|e| {
            RevidError::staging(format!(
                "Failed to read input {}: {e}",
                job.source_path.display()
            ))
        })?;
        if input_bytes.len() as u64 > MAX_INPUT_BYTES {
            tracing::warn!(
                job = %job.id,
                bytes = input_bytes.len(),
                "Input is larger than 2GiB; engine memory limits may fail this export"
            );
        }
        self.engine
            .write_resource(&names.input, &input_bytes)
            .await
            .map_err(|e| RevidError::staging(format!("Failed to stage input: {e}")))?;
        drop(input_bytes);

        if let (Some(watermark_name), Some(image)) = (&names.watermark, resources.watermark_image)
        {
            self.engine
                .write_resource(watermark_name, &image.bytes)
                .await
                .map_err(|e| {
                    RevidError::staging(format!("Failed to stage watermark image: {e}"))
                })?;
        }

        let ctx = RenderContext {
            input_duration_secs,
            timestamp: job.timestamp,
            watermark_image_input: names.watermark.clone(),
        };
        let args = generate_args(&names.input, &names.output, &job.settings, &ctx);
        tracing::debug!(job = %job.id, ?args, "Compiled engine command");

        let render_secs = self.timeouts.render.as_secs();
        {
            let mut sink = |event: EngineEvent| match event {
                EngineEvent::Progress(raw) => {
                    let fraction = tracker.observe(raw);
                    on_progress(JobProgress {
                        stage: JobStage::Rendering,
                        fraction,
                    });
                }
                EngineEvent::Log(line) => logs.push(line),
            };
            match tokio::time::timeout(self.timeouts.render, self.engine.execute(&args, &mut sink))
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(RevidError::RenderTimeout { secs: render_secs }),
            }
        }

        on_progress(JobProgress {
            stage: JobStage::ReadingOutput,
            fraction: tracker.current(),
        });
        let data = self.engine.read_resource(&names.output).await?;
        if data.len() < MIN_OUTPUT_BYTES {
            return Err(RevidError::OutputTooSmall { bytes: data.len() });
        }

        Ok(ExportArtifact {
            file_name: format!("processed_{}", job.source_name),
            data,
        })
    }

    /// Best-effort deletion of every name the job could have staged.
    async fn release(&mut self, names: &StagedNames) {
        for name in names.iter() {
            if let Err(e) = self.engine.delete_resource(name).await {
                tracing::debug!(resource = name, error = %e, "Ignoring delete failure");
            }
        }
    }
}
