//! Sticker rendering via ffmpeg.
//!
//! Images become static webp stickers; videos become animated stickers
//! capped at six seconds. Output is always 512x512, cropped to fill.

use super::scratch_file;
use crate::error::ToolError;
use crate::registry::{Tool, ToolContext, ToolResult};
use crate::schema::ParamSchema;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::path::PathBuf;
use tokio::process::Command;

const STICKER_FILTER: &str = "scale=512:512:force_original_aspect_ratio=increase,fps=15,crop=512:512";
const MAX_ANIMATED_SECONDS: &str = "6";

/// Renders the message media into a chat sticker.
pub struct StickerMaker {
    ffmpeg: String,
    scratch_dir: PathBuf,
}

impl StickerMaker {
    /// Creates the tool with the ffmpeg binary path and scratch directory.
    #[must_use]
    pub fn new(ffmpeg: String, scratch_dir: PathBuf) -> Self {
        Self { ffmpeg, scratch_dir }
    }
}

#[async_trait]
impl Tool for StickerMaker {
    fn name(&self) -> &'static str {
        "sticker_maker"
    }

    fn description(&self) -> &str {
        "Turns the image or video in the user's message into a chat sticker."
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object().property(
            "target",
            ParamSchema::string().describe("Reserved; pass \"auto\""),
        )
    }

    fn needs_media(&self) -> bool {
        true
    }

    async fn run(&self, _args: JsonValue, ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let input = ctx.input_file.as_ref().ok_or(ToolError::MediaRequired)?;
        let is_video = ctx
            .mime_type
            .as_deref()
            .is_some_and(|m| m.starts_with("video/"));

        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let output = scratch_file(&self.scratch_dir, "sticker", "webp");

        let mut command = Command::new(&self.ffmpeg);
        command.arg("-y");
        if is_video {
            command.args(["-ss", "0", "-t", MAX_ANIMATED_SECONDS]);
        }
        command.arg("-i").arg(input);
        command.args(["-vcodec", "libwebp", "-vf", STICKER_FILTER]);
        if is_video {
            command.args(["-loop", "0", "-an", "-vsync", "0"]);
        }
        command.arg(&output);

        let result = command.output().await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::Subprocess {
                program: "ffmpeg".to_string(),
                reason: stderr.lines().last().unwrap_or("unknown error").to_string(),
            });
        }

        Ok(ToolResult::success(json!({
            "sticker_path": output.to_string_lossy(),
        })))
    }
}
