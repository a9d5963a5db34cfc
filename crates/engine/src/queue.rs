//! Sequential batch queue.
//!
//! The shared engine instance is not reentrant, so items run strictly in
//! queue order through the same runner the single-export path uses. One
//! settings snapshot and one set of watermark resources apply to every
//! item; a failed item is recorded and the batch moves on.

use std::path::PathBuf;

use chrono::Utc;

use revid_settings::Settings;

use crate::engine::TranscodeEngine;
use crate::font::FontResolver;
use crate::job::{ExportArtifact, ExportJob, JobProgress, JobResources, JobRunner, JobTimeouts};

/// Lifecycle state of one queue item. Done and Error are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    Pending,
    Processing,
    Done,
    Error,
}

/// One queued source file and its processing state.
///
/// Items are created Pending with zero progress and are only mutated by the
/// scheduler while it is executing that item.
#[derive(Debug)]
pub struct QueueItem {
    pub id: String,
    pub source_path: PathBuf,
    pub source_name: String,
    pub size_bytes: u64,
    pub status: QueueStatus,
    pub progress: f64,
    pub output: Option<ExportArtifact>,
    pub error: Option<String>,
}

impl QueueItem {
    /// Enqueue a source file. The id doubles as the working-storage
    /// namespace for this item's staged resources.
    pub fn new(source_path: PathBuf) -> Self {
        let source_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let size_bytes = std::fs::metadata(&source_path).map(|m| m.len()).unwrap_or(0);

        Self {
            id: revid_common::id::job_id(),
            source_path,
            source_name,
            size_bytes,
            status: QueueStatus::Pending,
            progress: 0.0,
            output: None,
            error: None,
        }
    }
}

/// Per-run tallies for a processed batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchReport {
    /// True when the run produced nothing at all.
    pub fn is_total_failure(&self) -> bool {
        self.completed == 0 && self.skipped == 0 && self.failed > 0
    }
}

/// Process every non-Done item in order, applying one settings snapshot to
/// all of them.
pub async fn process_queue<E: TranscodeEngine>(
    engine: &mut E,
    fonts: &mut FontResolver,
    timeouts: JobTimeouts,
    settings: &Settings,
    resources: &JobResources<'_>,
    queue: &mut [QueueItem],
) -> BatchReport {
    let mut report = BatchReport::default();
    let mut runner = JobRunner::new(engine, fonts, timeouts);

    for item in queue.iter_mut() {
        if item.status == QueueStatus::Done {
            report.skipped += 1;
            continue;
        }

        item.status = QueueStatus::Processing;
        item.progress = 0.0;

        let job = ExportJob {
            id: item.id.clone(),
            source_path: item.source_path.clone(),
            source_name: item.source_name.clone(),
            settings: settings.clone(),
            timestamp: Utc::now(),
        };

        let result = {
            let progress = &mut item.progress;
            let mut hook = |p: JobProgress| *progress = p.fraction;
            runner.run(&job, resources, &mut hook).await
        };

        match result {
            Ok(artifact) => {
                item.status = QueueStatus::Done;
                item.progress = 1.0;
                item.output = Some(artifact);
                item.error = None;
                report.completed += 1;
            }
            Err(e) => {
                item.status = QueueStatus::Error;
                item.error = Some(e.to_string());
                report.failed += 1;
                tracing::error!(item = %item.id, error = %e, "Queue item failed");
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryEngine;

    fn enqueue(tag: &str) -> QueueItem {
        let path = std::env::temp_dir().join(format!("revid_queue_test_{tag}.mp4"));
        std::fs::write(&path, vec![9u8; 512]).unwrap();
        QueueItem::new(path)
    }

    fn cleanup(queue: &[QueueItem]) {
        for item in queue {
            std::fs::remove_file(&item.source_path).ok();
        }
    }

    #[tokio::test]
    async fn one_failing_item_does_not_abort_the_batch() {
        let mut engine = MemoryEngine {
            fail_execute_on: vec![2],
            output_bytes: 4096,
            progress_script: vec![0.5],
            ..MemoryEngine::default()
        };
        let mut fonts = FontResolver::new();
        let mut queue = vec![enqueue("a"), enqueue("b"), enqueue("c")];

        let report = process_queue(
            &mut engine,
            &mut fonts,
            JobTimeouts::default(),
            &Settings::default(),
            &JobResources::default(),
            &mut queue,
        )
        .await;

        assert_eq!(report.completed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(queue[0].status, QueueStatus::Done);
        assert_eq!(queue[1].status, QueueStatus::Error);
        assert_eq!(queue[2].status, QueueStatus::Done);

        // Progress histories stay per-item: finished items pin to 1.0, the
        // failed item keeps its last normalized value.
        assert_eq!(queue[0].progress, 1.0);
        assert_eq!(queue[1].progress, 0.5);
        assert_eq!(queue[2].progress, 1.0);

        assert!(queue[0].output.is_some());
        assert!(queue[1].output.is_none());
        assert!(queue[1]
            .error
            .as_deref()
            .unwrap()
            .contains("scripted execute failure"));

        cleanup(&queue);
    }

    #[tokio::test]
    async fn done_items_are_skipped() {
        let mut engine = MemoryEngine::with_output_bytes(4096);
        let mut fonts = FontResolver::new();
        let mut queue = vec![enqueue("skip_done"), enqueue("skip_pending")];
        queue[0].status = QueueStatus::Done;
        queue[0].progress = 1.0;

        let report = process_queue(
            &mut engine,
            &mut fonts,
            JobTimeouts::default(),
            &Settings::default(),
            &JobResources::default(),
            &mut queue,
        )
        .await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.completed, 1);
        assert_eq!(engine.exec_calls, 1);

        cleanup(&queue);
    }

    #[tokio::test]
    async fn staging_names_are_namespaced_per_item() {
        let mut engine = MemoryEngine::with_output_bytes(4096);
        let mut fonts = FontResolver::new();
        let mut queue = vec![enqueue("ns1"), enqueue("ns2")];

        process_queue(
            &mut engine,
            &mut fonts,
            JobTimeouts::default(),
            &Settings::default(),
            &JobResources::default(),
            &mut queue,
        )
        .await;

        for item in &queue {
            assert!(engine
                .deleted
                .iter()
                .any(|name| name == &format!("input_{}", item.id)));
        }
        assert_ne!(queue[0].id, queue[1].id);
        assert!(engine.storage.is_empty());

        cleanup(&queue);
    }

    #[tokio::test]
    async fn failed_items_retry_on_the_next_run() {
        let mut engine = MemoryEngine {
            fail_execute_on: vec![1],
            output_bytes: 4096,
            ..MemoryEngine::default()
        };
        let mut fonts = FontResolver::new();
        let mut queue = vec![enqueue("retry")];

        let first = process_queue(
            &mut engine,
            &mut fonts,
            JobTimeouts::default(),
            &Settings::default(),
            &JobResources::default(),
            &mut queue,
        )
        .await;
        assert_eq!(first.failed, 1);
        assert!(first.is_total_failure());

        // Error is not terminal for a re-triggered run; only Done is skipped.
        let second = process_queue(
            &mut engine,
            &mut fonts,
            JobTimeouts::default(),
            &Settings::default(),
            &JobResources::default(),
            &mut queue,
        )
        .await;
        assert_eq!(second.completed, 1);
        assert_eq!(queue[0].status, QueueStatus::Done);

        cleanup(&queue);
    }
}
