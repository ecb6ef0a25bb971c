//! Outbound text formatting.
//!
//! Model replies arrive as markdown; the chat surface understands a smaller
//! markup set (`*bold*`, `_italic_`, `~strikethrough~`, triple-backtick
//! monospace). This pass rewrites the common markdown constructs and leaves
//! everything else untouched.

use regex::Regex;
use std::sync::LazyLock;

static BOLD_STARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"));
static BOLD_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__(.*?)__").expect("bold underscore pattern"));
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+(.*)$").expect("header pattern"));
static STRIKETHROUGH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~(.*?)~~").expect("strikethrough pattern"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]\((.*?)\)").expect("link pattern"));

/// Rewrites markdown constructs into chat-surface markup.
#[must_use]
pub fn format_for_chat(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let formatted = BOLD_STARS.replace_all(text, "*$1*");
    let formatted = BOLD_UNDERSCORES.replace_all(&formatted, "*$1*");
    let formatted = HEADER.replace_all(&formatted, "*$1*");
    let formatted = STRIKETHROUGH.replace_all(&formatted, "~$1~");
    let formatted = LINK.replace_all(&formatted, "$1 ($2)");

    formatted.into_owned()
}
