//! File conversion via ffmpeg and libreoffice.
//!
//! Media formats (image/audio/video) go through ffmpeg; office document
//! formats go through a headless libreoffice conversion.

use super::require_str;
use crate::error::ToolError;
use crate::registry::{Tool, ToolContext, ToolResult};
use crate::schema::ParamSchema;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use ulid::Ulid;

const MEDIA_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "mov", "webm", "gif", "mp3", "wav", "flac", "opus", "ogg",
];

/// Converts the message media into another format.
pub struct FileConverter {
    ffmpeg: String,
    libreoffice: String,
    scratch_dir: PathBuf,
}

impl FileConverter {
    /// Creates the tool with binary paths and the scratch directory.
    #[must_use]
    pub fn new(ffmpeg: String, libreoffice: String, scratch_dir: PathBuf) -> Self {
        Self {
            ffmpeg,
            libreoffice,
            scratch_dir,
        }
    }

    fn is_media(mime_type: &str, input: &Path) -> bool {
        if mime_type.starts_with("image/")
            || mime_type.starts_with("audio/")
            || mime_type.starts_with("video/")
        {
            return true;
        }
        input
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| MEDIA_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    }

    async fn convert_with_ffmpeg(
        &self,
        input: &Path,
        target: &str,
        output: &Path,
    ) -> Result<(), ToolError> {
        let mut command = Command::new(&self.ffmpeg);
        command.arg("-y").arg("-i").arg(input);
        if target == "mp3" {
            command.args(["-b:a", "192k", "-vn"]);
        }
        command.arg(output);

        let result = command.output().await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::Subprocess {
                program: "ffmpeg".to_string(),
                reason: stderr.lines().last().unwrap_or("unknown error").to_string(),
            });
        }
        Ok(())
    }

    async fn convert_with_libreoffice(
        &self,
        input: &Path,
        target: &str,
    ) -> Result<PathBuf, ToolError> {
        let result = Command::new(&self.libreoffice)
            .args(["--headless", "--convert-to", target, "--outdir"])
            .arg(&self.scratch_dir)
            .arg(input)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::Subprocess {
                program: "libreoffice".to_string(),
                reason: stderr.lines().last().unwrap_or("unknown error").to_string(),
            });
        }

        // libreoffice names the output after the input stem.
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or(ToolError::InvalidArgument {
                name: "output_format",
                reason: "input file has no usable name".to_string(),
            })?;
        let output = self.scratch_dir.join(format!("{stem}.{target}"));
        if !output.exists() {
            return Err(ToolError::Subprocess {
                program: "libreoffice".to_string(),
                reason: "conversion produced no output file".to_string(),
            });
        }
        Ok(output)
    }
}

#[async_trait]
impl Tool for FileConverter {
    fn name(&self) -> &'static str {
        "file_converter"
    }

    fn description(&self) -> &str {
        "Converts the file in the user's message into another format \
         (images, audio, video, and office documents)."
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property(
                "output_format",
                ParamSchema::string().describe("Target format extension, e.g. \"pdf\" or \"mp3\""),
            )
            .require("output_format")
    }

    fn needs_media(&self) -> bool {
        true
    }

    async fn run(&self, args: JsonValue, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let output_format = require_str(&args, "output_format")?;
        let target = output_format.trim().trim_start_matches('.').to_ascii_lowercase();
        if target.is_empty() || !target.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ToolError::InvalidArgument {
                name: "output_format",
                reason: format!("'{output_format}' is not a format extension"),
            });
        }

        let input = ctx.input_file.as_ref().ok_or(ToolError::MediaRequired)?;
        let mime_type = ctx.mime_type.as_deref().unwrap_or("application/octet-stream");

        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let output = if Self::is_media(mime_type, input) {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .map_or_else(|| Ulid::new().to_string(), str::to_string);
            let output = self.scratch_dir.join(format!("{stem}_converted.{target}"));
            self.convert_with_ffmpeg(input, &target, &output).await?;
            output
        } else {
            self.convert_with_libreoffice(input, &target).await?
        };

        Ok(ToolResult::success(json!({
            "file_path": output.to_string_lossy(),
        })))
    }
}
