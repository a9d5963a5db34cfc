//! Process-backed ffmpeg engine client.
//!
//! Working storage is a scratch directory; `execute` spawns one ffmpeg
//! process per call with machine-readable progress on stdout and forwards
//! stderr lines as log events. A timed-out call's child is reaped when the
//! in-flight future is dropped, so the client stays usable for the next
//! job even though the timed-out job's output is never trusted.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use revid_common::{RevidError, RevidResult};

use crate::engine::{EngineEvent, TranscodeEngine};

/// Engine client that drives the system `ffmpeg` binary.
#[derive(Debug)]
pub struct FfmpegEngine {
    work_dir: PathBuf,
    loaded: bool,
}

impl FfmpegEngine {
    /// Create a client over the given working-storage directory. Nothing is
    /// touched until [`TranscodeEngine::load`] runs.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            loaded: false,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn resource_path(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }
}

impl TranscodeEngine for FfmpegEngine {
    async fn load(&mut self) -> RevidResult<()> {
        if self.loaded {
            return Ok(());
        }

        if !command_exists("ffmpeg").await {
            return Err(RevidError::unsupported(
                "ffmpeg not found in PATH; install ffmpeg to export",
            ));
        }

        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| {
                RevidError::engine(format!(
                    "Failed to create working storage {}: {e}",
                    self.work_dir.display()
                ))
            })?;

        tracing::info!(work_dir = %self.work_dir.display(), "Engine loaded");
        self.loaded = true;
        Ok(())
    }

    async fn write_resource(&mut self, name: &str, bytes: &[u8]) -> RevidResult<()> {
        tokio::fs::write(self.resource_path(name), bytes)
            .await
            .map_err(|e| RevidError::engine(format!("Failed to write resource {name}: {e}")))
    }

    async fn execute(
        &mut self,
        args: &[String],
        events: &mut dyn FnMut(EngineEvent),
    ) -> RevidResult<()> {
        tracing::debug!(?args, "Running ffmpeg");

        let mut child = Command::new("ffmpeg")
            .args([
                "-y",
                "-hide_banner",
                "-loglevel",
                "error",
                "-nostats",
                "-progress",
                "pipe:1",
            ])
            .args(args)
            .current_dir(&self.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RevidError::engine(format!("Failed to start ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RevidError::engine("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RevidError::engine("Failed to capture ffmpeg stderr"))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let mut out_done = false;
        let mut err_done = false;
        let mut progress = ProgressState::default();

        // Drain both pipes until EOF so ffmpeg never blocks on a full pipe.
        while !(out_done && err_done) {
            tokio::select! {
                line = out_lines.next_line(), if !out_done => match line {
                    Ok(Some(line)) => {
                        if let Some((key, value)) = line.trim().split_once('=') {
                            progress.update(key, value);
                            if key == "progress" {
                                // The final report is a clean ratio; interim
                                // ones carry the raw out-time signal.
                                let raw = if progress.complete {
                                    1.0
                                } else {
                                    progress.out_time_secs
                                };
                                events(EngineEvent::Progress(raw));
                            }
                        }
                    }
                    Ok(None) => out_done = true,
                    Err(e) => {
                        return Err(RevidError::engine(format!(
                            "Failed reading ffmpeg progress: {e}"
                        )));
                    }
                },
                line = err_lines.next_line(), if !err_done => match line {
                    Ok(Some(line)) => events(EngineEvent::Log(line)),
                    Ok(None) | Err(_) => err_done = true,
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| RevidError::engine(format!("Failed to wait on ffmpeg: {e}")))?;

        if !status.success() {
            return Err(RevidError::engine(format!(
                "ffmpeg exited with status {status}"
            )));
        }

        Ok(())
    }

    async fn read_resource(&mut self, name: &str) -> RevidResult<Vec<u8>> {
        tokio::fs::read(self.resource_path(name))
            .await
            .map_err(|e| RevidError::engine(format!("Failed to read resource {name}: {e}")))
    }

    async fn delete_resource(&mut self, name: &str) -> RevidResult<()> {
        tokio::fs::remove_file(self.resource_path(name))
            .await
            .map_err(|e| RevidError::engine(format!("Failed to delete resource {name}: {e}")))
    }
}

/// Whether a binary resolves on PATH.
pub async fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Accumulated state of ffmpeg's key=value progress stream.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            "out_time_ms" => {
                if let Ok(ms) = value.parse::<f64>() {
                    self.out_time_secs = ms / 1_000_000.0;
                }
            }
            "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_state_parses_out_time_keys() {
        let mut state = ProgressState::default();
        state.update("frame", "120");
        state.update("out_time_ms", "2500000");
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);

        state.update("out_time_us", "7500000");
        assert!((state.out_time_secs - 7.5).abs() < 1e-9);

        assert!(!state.complete);
        state.update("progress", "continue");
        assert!(!state.complete);
        state.update("progress", "end");
        assert!(state.complete);
    }

    #[test]
    fn progress_state_ignores_unparseable_values() {
        let mut state = ProgressState::default();
        state.update("out_time_ms", "N/A");
        assert_eq!(state.out_time_secs, 0.0);
    }

    #[test]
    fn resource_paths_stay_inside_the_work_dir() {
        let engine = FfmpegEngine::new("/tmp/revid-test-work");
        assert_eq!(
            engine.resource_path("input_abc"),
            PathBuf::from("/tmp/revid-test-work/input_abc")
        );
    }
}
