//! Image OCR extractor backed by the `tesseract` command-line tool.

use std::path::Path;
use std::process::Command;

use image::ImageReader;

use crate::Result;
use crate::core::config::{ExtractorSettings, RuntimeOption};
use crate::core::dispatch::ExtractionContext;
use crate::plugins::Extractor;
use crate::types::{Unit, UnitType};

pub(crate) const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp", "gif", "webp"];

/// Runs OCR on an image and emits one `image` unit.
///
/// The OCR program is invoked as `<program> [args..] <path> stdout -l <lang>` with the
/// snapshot's environment variables applied. A missing binary or a non-zero exit
/// yields an error unit; width and height are attached whenever the image header
/// can be read.
#[derive(Debug, Clone)]
pub struct ImageExtractor {
    program: String,
    leading_args: Vec<String>,
    language: String,
    disable_ocr: bool,
    deterministic: bool,
}

impl Default for ImageExtractor {
    fn default() -> Self {
        Self::with_command("tesseract", Vec::<String>::new())
    }
}

impl ImageExtractor {
    /// Use a different OCR command. `leading_args` go before the image path.
    pub fn with_command(program: impl Into<String>, leading_args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
            language: "eng".to_string(),
            disable_ocr: false,
            deterministic: false,
        }
    }

    fn run_ocr(&self, path: &Path, ctx: &ExtractionContext<'_>) -> std::result::Result<String, String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language);
        if self.deterministic {
            cmd.args(["--dpi", "300"]);
        }
        for (key, value) in ctx.env_vars() {
            match value {
                Some(value) => cmd.env(key, value),
                None => cmd.env_remove(key),
            };
        }

        let output = cmd
            .output()
            .map_err(|e| format!("Failed to run OCR program '{}': {}", self.program, e))?;
        if !output.status.success() {
            return Err(format!(
                "OCR program '{}' failed with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn dimensions(path: &Path) -> Option<(u32, u32)> {
    ImageReader::open(path)
        .ok()?
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()
}

impl Extractor for ImageExtractor {
    fn name(&self) -> &str {
        "image-ocr"
    }

    fn accepted_options(&self) -> &[RuntimeOption] {
        &[
            RuntimeOption::OcrLanguage,
            RuntimeOption::DisableOcr,
            RuntimeOption::Deterministic,
        ]
    }

    fn configure(&mut self, settings: &ExtractorSettings) {
        if let Some(language) = settings.text(RuntimeOption::OcrLanguage) {
            self.language = language.to_string();
        }
        if let Some(disabled) = settings.bool(RuntimeOption::DisableOcr) {
            self.disable_ocr = disabled;
        }
        if let Some(deterministic) = settings.bool(RuntimeOption::Deterministic) {
            self.deterministic = deterministic;
        }
    }

    fn extract(&self, path: &Path, ctx: &ExtractionContext<'_>) -> Result<Vec<Unit>> {
        let unit = if self.disable_ocr {
            Unit::ok(path, "", UnitType::Image, "0", "").with_metadata("ocr", false)
        } else {
            match self.run_ocr(path, ctx) {
                Ok(text) => Unit::ok(path, "", UnitType::Image, "0", text)
                    .with_metadata("ocr", true)
                    .with_metadata("ocr_lang", self.language.as_str()),
                Err(message) => {
                    tracing::debug!(path = %path.display(), error = %message, "OCR failed");
                    Unit::error(path, "", UnitType::Image, "0", message).with_metadata("exception", "ocr")
                }
            }
        };

        Ok(vec![match dimensions(path) {
            Some((width, height)) => unit.with_metadata("width", width).with_metadata("height", height),
            None => unit,
        }])
    }
}
