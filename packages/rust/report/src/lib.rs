//! Prompt templates and report text utilities.
//!
//! The two generation passes (draft, enhance) are plain string templates over
//! the crawl findings; this crate owns them plus the small amount of text
//! handling the web layer needs (download filename, display title).

mod prompts;

use std::sync::LazyLock;

use regex::Regex;

pub use prompts::{draft_prompt, enhancement_prompt};

/// Default report title when the Markdown has no H1.
const UNTITLED: &str = "Research Report";

/// Build the download filename for a report: `<topic>_report.md` with
/// whitespace collapsed to underscores and path-hostile characters stripped.
pub fn report_filename(topic: &str) -> String {
    static UNSAFE_CHARS: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|]"#).expect("valid regex"));
    static WHITESPACE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let stripped = UNSAFE_CHARS.replace_all(topic.trim(), "");
    let slug = WHITESPACE.replace_all(&stripped, "_");

    if slug.is_empty() {
        "research_report.md".to_string()
    } else {
        format!("{slug}_report.md")
    }
}

/// Extract a display title from the first H1 in the Markdown text.
pub fn extract_title(markdown: &str) -> String {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE
        .captures(markdown)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_else(|| UNTITLED.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_replaces_whitespace() {
        assert_eq!(
            report_filename("electric vehicles"),
            "electric_vehicles_report.md"
        );
        assert_eq!(
            report_filename("  rust   async runtimes "),
            "rust_async_runtimes_report.md"
        );
    }

    #[test]
    fn filename_strips_hostile_characters() {
        assert_eq!(
            report_filename("AI: state of the art?"),
            "AI_state_of_the_art_report.md"
        );
        assert_eq!(report_filename("a/b\\c"), "abc_report.md");
    }

    #[test]
    fn filename_falls_back_when_nothing_survives() {
        assert_eq!(report_filename("???"), "research_report.md");
        assert_eq!(report_filename(""), "research_report.md");
    }

    #[test]
    fn title_from_first_h1() {
        let md = "intro text\n\n# Electric Vehicles in 2026\n\n## Findings\n# Second";
        assert_eq!(extract_title(md), "Electric Vehicles in 2026");
    }

    #[test]
    fn title_fallback_without_h1() {
        assert_eq!(extract_title("no headings here"), UNTITLED);
    }
}
