//! File generation from model-provided content.
//!
//! Text-shaped formats are written directly; pdf and docx are produced by
//! writing the text and converting it through headless libreoffice. The
//! intermediate text file is removed on every exit path.

use super::{optional_str, require_str};
use crate::error::ToolError;
use crate::registry::{Tool, ToolContext, ToolResult};
use crate::schema::ParamSchema;
use async_trait::async_trait;
use serde_json::{Value as JsonValue, json};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Writes model-provided content into a downloadable file.
pub struct FileGenerator {
    libreoffice: String,
    scratch_dir: PathBuf,
}

impl FileGenerator {
    /// Creates the tool with the libreoffice binary path and scratch
    /// directory.
    #[must_use]
    pub fn new(libreoffice: String, scratch_dir: PathBuf) -> Self {
        Self {
            libreoffice,
            scratch_dir,
        }
    }

    async fn convert_text(&self, source: &Path, target: &str) -> Result<PathBuf, ToolError> {
        let result = Command::new(&self.libreoffice)
            .args(["--headless", "--convert-to", target, "--outdir"])
            .arg(&self.scratch_dir)
            .arg(source)
            .output()
            .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ToolError::Subprocess {
                program: "libreoffice".to_string(),
                reason: stderr.lines().last().unwrap_or("unknown error").to_string(),
            });
        }

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("generated");
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
impl Tool for FileGenerator {
    fn name(&self) -> &'static str {
        "file_generator"
    }

    fn description(&self) -> &str {
        "Creates a downloadable file (txt, md, code, pdf, or docx) from \
         the given content."
    }

    fn parameters(&self) -> ParamSchema {
        ParamSchema::object()
            .property(
                "filename",
                ParamSchema::string().describe("File name including extension"),
            )
            .property("content", ParamSchema::string().describe("File content"))
            .property(
                "format",
                ParamSchema::string()
                    .describe("Output format; inferred from the filename when omitted")
                    .one_of(&["txt", "md", "pdf", "docx", "code"]),
            )
            .require("filename")
            .require("content")
    }

    async fn run(&self, args: JsonValue, _ctx: &ToolContext) -> Result<ToolResult, ToolError> {
        let filename = require_str(&args, "filename")?;
        let content = require_str(&args, "content")?;
        let format = optional_str(&args, "format");

        // Only the final path component; no directory traversal via args.
        let filename = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or(ToolError::InvalidArgument {
                name: "filename",
                reason: "not a usable file name".to_string(),
            })?;

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let wants_office = matches!(format, Some("pdf") | Some("docx"))
            || matches!(extension.as_deref(), Some("pdf") | Some("docx"));

        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let output = if wants_office {
            let target = match (format, extension.as_deref()) {
                (Some("pdf"), _) | (_, Some("pdf")) => "pdf",
                _ => "docx",
            };
            let stem = Path::new(filename)
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("generated");
            let intermediate = self.scratch_dir.join(format!("{stem}.txt"));
            tokio::fs::write(&intermediate, content).await?;

            let converted = self.convert_text(&intermediate, target).await;
            if let Err(e) = tokio::fs::remove_file(&intermediate).await {
                tracing::warn!(path = %intermediate.display(), error = %e, "could not remove intermediate file");
            }
            converted?
        } else {
            let output = self.scratch_dir.join(filename);
            tokio::fs::write(&output, content).await?;
            output
        };

        Ok(ToolResult::success(json!({
            "file_path": output.to_string_lossy(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(dir: &Path) -> FileGenerator {
        FileGenerator::new("libreoffice".to_string(), dir.to_path_buf())
    }

    #[tokio::test]
    async fn missing_arguments_are_rejected() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let err = tool(scratch.path())
            .run(json!({"filename": "notes.txt"}), &ToolContext::default())
            .await
            .unwrap_err();
        assert_eq!(err, ToolError::MissingArgument { name: "content" });
    }

    #[tokio::test]
    async fn text_file_is_written_directly() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let result = tool(scratch.path())
            .run(
                json!({"filename": "notes.txt", "content": "hello"}),
                &ToolContext::default(),
            )
            .await
            .expect("run");

        assert!(result.success);
        let path = PathBuf::from(result.str_field("file_path").expect("path"));
        assert_eq!(std::fs::read_to_string(path).expect("read"), "hello");
    }

    #[tokio::test]
    async fn filename_is_stripped_to_basename() {
        let scratch = tempfile::tempdir().expect("tempdir");
        let result = tool(scratch.path())
            .run(
                json!({"filename": "../../etc/notes.txt", "content": "hi"}),
                &ToolContext::default(),
            )
            .await
            .expect("run");

        let path = PathBuf::from(result.str_field("file_path").expect("path"));
        assert_eq!(path.parent(), Some(scratch.path()));
        assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("notes.txt"));
    }
}
