//! The transcoding-engine capability trait.

use revid_common::RevidResult;

/// One event emitted by the engine during an [`TranscodeEngine::execute`]
/// call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A raw progress value. Heterogeneous across engine builds (0..1
    /// ratio, 0..100 percentage, or an elapsed-time value); callers run it
    /// through [`revid_compiler::progress::normalize_progress`].
    Progress(f64),

    /// One line of engine log output.
    Log(String),
}

/// Capability surface of the external transcoding engine.
///
/// The engine instance and its working storage are shared process-wide and
/// are not reentrant: callers must serialize access, which the job runner
/// and batch queue do by construction. Events are delivered through the
/// per-call sink passed to `execute`, so events from one job can never be
/// attributed to another.
///
/// A timed-out `execute` leaves the engine's trustworthiness
/// implementation-defined; the job runner never retries within a run.
#[allow(async_fn_in_trait)]
pub trait TranscodeEngine {
    /// Load the engine. Idempotent; expensive only on the first call.
    async fn load(&mut self) -> RevidResult<()>;

    /// Write a resource into working storage under `name`.
    async fn write_resource(&mut self, name: &str, bytes: &[u8]) -> RevidResult<()>;

    /// Run one compiled argument list to completion, reporting progress and
    /// log events through `events` for the duration of this call only.
    async fn execute(
        &mut self,
        args: &[String],
        events: &mut dyn FnMut(EngineEvent),
    ) -> RevidResult<()>;

    /// Read a resource out of working storage.
    async fn read_resource(&mut self, name: &str) -> RevidResult<Vec<u8>>;

    /// Delete a working-storage resource. Deleting a missing entry is an
    /// error; callers treating deletion as best-effort ignore it.
    async fn delete_resource(&mut self, name: &str) -> RevidResult<()>;
}
