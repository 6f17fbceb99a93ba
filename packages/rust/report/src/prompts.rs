//! Prompt templates for the two generation passes.
//!
//! Both templates are fixed; only the topic, crawl findings, and draft text
//! are interpolated. The report structure they ask for (executive summary,
//! key findings, analysis, implications, conclusion, references) is part of
//! the product's contract, so tests assert on these section names.

use deepdraft_shared::ResearchFindings;

/// Character budget for the crawler's final analysis inside the draft prompt.
/// Keeps the prompt inside the model's context window on big crawls.
const MAX_ANALYSIS_CHARS: usize = 24_000;

/// Build the draft-report prompt from the crawl findings.
///
/// At most `max_sources` sources are quoted; each renders its URL and its
/// summary, with the placeholder standing in for a missing summary.
pub fn draft_prompt(topic: &str, findings: &ResearchFindings, max_sources: usize) -> String {
    let sources_text = sources_digest(findings, max_sources);
    let final_analysis = truncate_content(&findings.final_analysis, MAX_ANALYSIS_CHARS);

    format!(
        r#"You are a research assistant analyzing the following research results on: "{topic}"

Final Analysis from research tool:
{final_analysis}

Sources ({total} total):
{sources_text}

Please organize these research findings into a well-structured academic report with:
1. Executive Summary
2. Key Findings
3. Detailed Analysis
4. Implications
5. Conclusion
6. References (properly cite all sources)

Format the report in Markdown."#,
        total = findings.source_count(),
    )
}

/// Build the enhancement prompt from the initial draft.
pub fn enhancement_prompt(topic: &str, initial_report: &str) -> String {
    format!(
        r#"RESEARCH TOPIC: {topic}

INITIAL RESEARCH REPORT:
{initial_report}

As an expert content enhancer specializing in research elaboration, please enhance this research report by:
1. Adding more detailed explanations of complex concepts
2. Including relevant examples, case studies, and real-world applications
3. Expanding on key points with additional context and nuance
4. Adding visual elements descriptions (charts, diagrams, infographics)
5. Incorporating latest trends and future predictions
6. Suggesting practical implications for different stakeholders

Maintain academic rigor and factual accuracy while making the report more comprehensive.
Format the enhanced report in Markdown."#,
    )
}

/// Render the numbered source digest quoted inside the draft prompt.
fn sources_digest(findings: &ResearchFindings, max_sources: usize) -> String {
    findings
        .sources
        .iter()
        .take(max_sources)
        .enumerate()
        .map(|(i, source)| {
            format!(
                "Source {n}: {url}\nSummary: {summary}",
                n = i + 1,
                url = source.url,
                summary = source.summary_or_placeholder(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Truncate content to approximately `max_chars` characters.
fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        content.to_string()
    } else {
        // Cut on a char boundary at or below the budget.
        let mut cut = max_chars;
        while !content.is_char_boundary(cut) {
            cut -= 1;
        }
        format!(
            "{}\n\n[... analysis truncated for model context window ...]",
            &content[..cut]
        )
    }
}
