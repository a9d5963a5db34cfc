//! In-memory scripted engine used by the runner and queue tests.

use std::collections::HashMap;
use std::time::Duration;

use revid_common::{RevidError, RevidResult};

use crate::engine::{EngineEvent, TranscodeEngine};

/// Test double for [`TranscodeEngine`]: working storage is a map, and
/// execute behavior (progress script, failures, delays, output size) is
/// configured per test.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    pub storage: HashMap<String, Vec<u8>>,
    pub deleted: Vec<String>,
    pub write_counts: HashMap<String, usize>,

    /// Raw progress values emitted on every execute call.
    pub progress_script: Vec<f64>,
    /// 1-based execute call indexes that fail after emitting progress.
    pub fail_execute_on: Vec<usize>,
    /// Number of upcoming write_resource calls to fail.
    pub fail_writes: usize,
    /// Pause inserted before execute completes.
    pub execute_delay: Option<Duration>,
    /// Size of the fabricated output resource.
    pub output_bytes: usize,

    pub exec_calls: usize,
    pub loaded: bool,
}

impl MemoryEngine {
    pub fn with_output_bytes(output_bytes: usize) -> Self {
        Self {
            output_bytes,
            ..Self::default()
        }
    }

    pub fn write_count(&self, name: &str) -> usize {
        self.write_counts.get(name).copied().unwrap_or(0)
    }
}

impl TranscodeEngine for MemoryEngine {
    async fn load(&mut self) -> RevidResult<()> {
        self.loaded = true;
        Ok(())
    }

    async fn write_resource(&mut self, name: &str, bytes: &[u8]) -> RevidResult<()> {
        if self.fail_writes > 0 {
            self.fail_writes -= 1;
            return Err(RevidError::engine(format!("scripted write failure: {name}")));
        }
        *self.write_counts.entry(name.to_string()).or_insert(0) += 1;
        self.storage.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn execute(
        &mut self,
        args: &[String],
        events: &mut dyn FnMut(EngineEvent),
    ) -> RevidResult<()> {
        self.exec_calls += 1;
        events(EngineEvent::Log(format!("exec #{}", self.exec_calls)));

        for raw in self.progress_script.clone() {
            events(EngineEvent::Progress(raw));
        }

        if let Some(delay) = self.execute_delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_execute_on.contains(&self.exec_calls) {
            return Err(RevidError::engine(format!(
                "scripted execute failure on call {}",
                self.exec_calls
            )));
        }

        let output_name = args
            .last()
            .cloned()
            .ok_or_else(|| RevidError::engine("empty argument list"))?;
        self.storage
            .insert(output_name, vec![0u8; self.output_bytes]);
        Ok(())
    }

    async fn read_resource(&mut self, name: &str) -> RevidResult<Vec<u8>> {
        self.storage
            .get(name)
            .cloned()
            .ok_or_else(|| RevidError::engine(format!("no such resource: {name}")))
    }

    async fn delete_resource(&mut self, name: &str) -> RevidResult<()> {
        self.deleted.push(name.to_string());
        if self.storage.remove(name).is_none() {
            return Err(RevidError::engine(format!("no such resource: {name}")));
        }
        Ok(())
    }
}
