//! Text-watermark font staging.
//!
//! The drawtext filter reads its font from a fixed working-storage path.
//! The resolver stages that file once per distinct font identity and skips
//! the write on repeat calls. Failure degrades text-watermark rendering
//! only, so it is logged as a warning and never propagated.

use std::path::Path;

use revid_common::{RevidError, RevidResult};
use revid_compiler::FONT_STAGING_PATH;

use crate::engine::TranscodeEngine;

/// Identity key used when no custom font is attached.
const DEFAULT_FONT_KEY: &str = "__default__";

/// Well-known system locations tried for the default glyph file.
const DEFAULT_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A font file attached by the user (TTF/OTF bytes).
#[derive(Debug, Clone)]
pub struct FontResource {
    pub name: String,
    pub bytes: Vec<u8>,
    /// Modification time in milliseconds since the epoch; part of the
    /// identity key so an edited file with the same name reloads.
    pub modified_ms: u64,
}

impl FontResource {
    /// Read a font resource from disk.
    pub fn from_path(path: &Path) -> RevidResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| RevidError::staging(format!("Failed to read font {}: {e}", path.display())))?;
        let modified_ms = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "font".to_string());

        Ok(Self {
            name,
            bytes,
            modified_ms,
        })
    }

    fn identity_key(&self) -> String {
        format!("{}:{}:{}", self.name, self.bytes.len(), self.modified_ms)
    }
}

/// Stages the drawtext font into working storage, deduplicating by font
/// identity across jobs.
#[derive(Debug, Default)]
pub struct FontResolver {
    last_key: Option<String>,
}

impl FontResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the drawtext font is present in working storage.
    ///
    /// Idempotent per distinct font identity. Never fails: a load problem
    /// is logged and the job proceeds (its text filter will fail later,
    /// which is the expected, distinguishable outcome).
    pub async fn ensure_font<E: TranscodeEngine>(
        &mut self,
        engine: &mut E,
        font: Option<&FontResource>,
    ) {
        let key = font
            .map(FontResource::identity_key)
            .unwrap_or_else(|| DEFAULT_FONT_KEY.to_string());

        if self.last_key.as_deref() == Some(key.as_str()) {
            return;
        }

        let staged = match font {
            Some(font) => engine.write_resource(FONT_STAGING_PATH, &font.bytes).await,
            None => match default_font_bytes() {
                Some(bytes) => engine.write_resource(FONT_STAGING_PATH, &bytes).await,
                None => Err(RevidError::staging(
                    "No default glyph file found on this system",
                )),
            },
        };

        match staged {
            Ok(()) => {
                self.last_key = Some(key);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not load font; watermark text may fail");
            }
        }
    }
}

/// Best-effort lookup of a bundled-default glyph file.
fn default_font_bytes() -> Option<Vec<u8>> {
    DEFAULT_FONT_PATHS
        .iter()
        .find_map(|candidate| std::fs::read(candidate).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryEngine;

    fn font(name: &str, bytes: &[u8], modified_ms: u64) -> FontResource {
        FontResource {
            name: name.to_string(),
            bytes: bytes.to_vec(),
            modified_ms,
        }
    }

    #[tokio::test]
    async fn repeat_calls_with_same_identity_write_once() {
        let mut engine = MemoryEngine::default();
        let mut resolver = FontResolver::new();
        let custom = font("custom.ttf", b"glyphs", 1000);

        resolver.ensure_font(&mut engine, Some(&custom)).await;
        resolver.ensure_font(&mut engine, Some(&custom)).await;

        assert_eq!(engine.write_count(FONT_STAGING_PATH), 1);
        assert_eq!(
            engine.storage.get(FONT_STAGING_PATH).map(Vec::as_slice),
            Some(b"glyphs".as_slice())
        );
    }

    #[tokio::test]
    async fn changed_identity_restages_the_font() {
        let mut engine = MemoryEngine::default();
        let mut resolver = FontResolver::new();

        resolver
            .ensure_font(&mut engine, Some(&font("a.ttf", b"one", 1)))
            .await;
        resolver
            .ensure_font(&mut engine, Some(&font("a.ttf", b"two!", 2)))
            .await;

        assert_eq!(engine.write_count(FONT_STAGING_PATH), 2);
        assert_eq!(
            engine.storage.get(FONT_STAGING_PATH).map(Vec::as_slice),
            Some(b"two!".as_slice())
        );
    }

    #[tokio::test]
    async fn staging_failure_is_swallowed_and_retried_next_call() {
        let mut engine = MemoryEngine {
            fail_writes: 1,
            ..MemoryEngine::default()
        };
        let mut resolver = FontResolver::new();
        let custom = font("custom.ttf", b"glyphs", 1000);

        // First call fails silently; identity is not cached.
        resolver.ensure_font(&mut engine, Some(&custom)).await;
        assert!(!engine.storage.contains_key(FONT_STAGING_PATH));

        // Second call retries and succeeds.
        resolver.ensure_font(&mut engine, Some(&custom)).await;
        assert!(engine.storage.contains_key(FONT_STAGING_PATH));
    }
}
