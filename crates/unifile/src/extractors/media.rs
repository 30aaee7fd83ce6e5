//! Audio and video transcription extractor.
//!
//! Backends:
//!
//! - `auto` and `dummy` synthesize deterministic segments from the file size
//!   (16000 bytes per second, `media_chunk_seconds` per segment, at least one
//!   segment). No external tools are needed.
//! - Any other name `x` runs the helper program `unifile-asr-x <path>` with the
//!   snapshot's environment. Each non-empty line of its stdout is one segment.
//!
//! Output is one `audio`/`video` unit holding the whole transcript followed by one
//! `segment` unit per chunk with `start`/`end` offsets in seconds.

use std::path::Path;
use std::process::Command;

use crate::Result;
use crate::core::config::{ExtractorSettings, RuntimeOption};
use crate::core::dispatch::ExtractionContext;
use crate::plugins::{Extractor, path_extension};
use crate::types::{Unit, UnitType};

pub(crate) const EXTENSIONS: &[&str] = &[
    "mp3", "wav", "m4a", "flac", "ogg", "mp4", "mov", "mkv", "webm", "avi",
];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi"];

const DUMMY_BYTES_PER_SECOND: u64 = 16_000;

const HELPER_PREFIX: &str = "unifile-asr-";

#[derive(Debug, Clone)]
pub struct MediaExtractor {
    backend: String,
    chunk_seconds: u64,
}

impl Default for MediaExtractor {
    fn default() -> Self {
        Self {
            backend: "auto".to_string(),
            chunk_seconds: 30,
        }
    }
}

fn dummy_segments(size: u64, chunk_seconds: u64) -> Vec<String> {
    let per_chunk = DUMMY_BYTES_PER_SECOND * chunk_seconds;
    let count = size.div_ceil(per_chunk).max(1);
    (0..count).map(|i| format!("[dummy transcript segment {}]", i)).collect()
}

impl MediaExtractor {
    fn backend_label(&self) -> &str {
        if self.backend == "auto" { "dummy" } else { &self.backend }
    }

    fn transcribe(&self, path: &Path, ctx: &ExtractionContext<'_>) -> std::result::Result<Vec<String>, String> {
        match self.backend_label() {
            "dummy" => {
                let size = std::fs::metadata(path)
                    .map_err(|e| format!("Failed to stat media file: {}", e))?
                    .len();
                Ok(dummy_segments(size, self.chunk_seconds))
            }
            backend => {
                let program = format!("{}{}", HELPER_PREFIX, backend);
                let mut cmd = Command::new(&program);
                cmd.arg(path);
                for (key, value) in ctx.env_vars() {
                    match value {
                        Some(value) => cmd.env(key, value),
                        None => cmd.env_remove(key),
                    };
                }
                let output = cmd
                    .output()
                    .map_err(|e| format!("Failed to run ASR helper '{}': {}", program, e))?;
                if !output.status.success() {
                    return Err(format!(
                        "ASR helper '{}' failed with {}: {}",
                        program,
                        output.status,
                        String::from_utf8_lossy(&output.stderr).trim()
                    ));
                }
                Ok(String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect())
            }
        }
    }
}

impl Extractor for MediaExtractor {
    fn name(&self) -> &str {
        "media-asr"
    }

    fn accepted_options(&self) -> &[RuntimeOption] {
        &[RuntimeOption::AsrBackend, RuntimeOption::MediaChunkSeconds]
    }

    fn configure(&mut self, settings: &ExtractorSettings) {
        if let Some(backend) = settings.text(RuntimeOption::AsrBackend) {
            self.backend = backend.to_string();
        }
        if let Some(seconds) = settings.integer(RuntimeOption::MediaChunkSeconds) {
            self.chunk_seconds = seconds.max(1);
        }
    }

    fn extract(&self, path: &Path, ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let media_type = match path_extension(path) {
            Some(ext) if VIDEO_EXTENSIONS.contains(&ext.as_str()) => UnitType::Video,
            _ => UnitType::Audio,
        };
        let backend = self.backend_label().to_string();

        let segments = match self.transcribe(path, ctx) {
            Ok(segments) => segments,
            Err(message) => {
                return Ok(vec![
                    Unit::error(path, "", media_type, "0", message)
                        .with_metadata("exception", "asr")
                        .with_metadata("asr_backend", backend),
                ]);
            }
        };

        let mut units = Vec::with_capacity(segments.len() + 1);
        units.push(
            Unit::ok(path, "", media_type, "0", segments.join("\n"))
                .with_metadata("asr_backend", backend.as_str())
                .with_metadata("segment_count", segments.len())
                .with_metadata("duration_seconds", segments.len() as u64 * self.chunk_seconds),
        );
        for (i, text) in segments.into_iter().enumerate() {
            let start = i as u64 * self.chunk_seconds;
            units.push(
                Unit::ok(path, "", UnitType::Segment, i.to_string(), text)
                    .with_metadata("start", start)
                    .with_metadata("end", start + self.chunk_seconds)
                    .with_metadata("asr_backend", backend.as_str()),
            );
        }
        Ok(units)
    }
}
