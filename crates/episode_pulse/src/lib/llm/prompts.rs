use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};

const TITLES: &str = include_str!("./prompts/titles.txt");
const TITLES_FEEDBACK: &str = include_str!("./prompts/titles_feedback.txt");
const CONTENT: &str = include_str!("./prompts/content.txt");
const EXAMPLES_SECTION: &str = include_str!("./prompts/examples_section.txt");

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").unwrap());

/// Substitutes `{{KEY}}` placeholders in one pass; unknown keys are left
/// untouched so inserted text is never re-expanded.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| {
            let key = &caps[1];
            values
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

pub fn titles(transcript: &str, feedback: Option<&str>, today: NaiveDate, max_chars: usize) -> String {
    let date = today.format("%Y-%m-%d").to_string();
    let year = today.year().to_string();
    let max_chars = max_chars.to_string();
    let feedback = feedback.map(str::trim).filter(|f| !f.is_empty());

    let template = if feedback.is_some() { TITLES_FEEDBACK } else { TITLES };

    fill(
        template,
        &[
            ("CURRENT_DATE", date.as_str()),
            ("CURRENT_YEAR", year.as_str()),
            ("TITLE_MAX_CHARS", max_chars.as_str()),
            ("FEEDBACK", feedback.unwrap_or_default()),
            ("TRANSCRIPT", transcript),
        ],
    )
}

pub fn content(
    transcript: &str,
    selected_title: &str,
    examples: Option<&str>,
    today: NaiveDate,
) -> String {
    let date = today.format("%Y-%m-%d").to_string();
    let year = today.year().to_string();
    let examples = examples
        .map(|e| fill(EXAMPLES_SECTION, &[("EXAMPLES", e.trim())]))
        .unwrap_or_default();

    fill(
        CONTENT,
        &[
            ("CURRENT_DATE", date.as_str()),
            ("CURRENT_YEAR", year.as_str()),
            ("SELECTED_TITLE", selected_title),
            ("EXAMPLES", examples.as_str()),
            ("TRANSCRIPT", transcript),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
    }

    #[test]
    fn test_fill_is_single_pass() {
        let filled = fill(
            "{{A}} and {{B}} and {{UNKNOWN}}",
            &[("A", "{{B}}"), ("B", "two")],
        );
        assert_eq!(filled, "{{B}} and two and {{UNKNOWN}}");
    }

    #[test]
    fn test_title_prompt_without_feedback() {
        let prompt = titles("the transcript", None, today(), 60);

        assert!(prompt.contains("Today is 2026-03-14"));
        assert!(prompt.contains("current year is 2026"));
        assert!(prompt.contains("the transcript"));
        assert!(prompt.contains("At most 60 characters"));
        assert!(!prompt.contains("REVIEWER FEEDBACK"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn test_title_prompt_with_feedback() {
        let prompt = titles("the transcript", Some("  shorter please "), today(), 60);

        assert!(prompt.contains("REVIEWER FEEDBACK:\nshorter please\n"));
        assert!(prompt.contains("NEW title options"));
    }

    #[test]
    fn test_blank_feedback_uses_initial_prompt() {
        assert_eq!(
            titles("t", Some("   "), today(), 60),
            titles("t", None, today(), 60)
        );
    }

    #[test]
    fn test_content_prompt_keeps_video_placeholder() {
        let prompt = content("the transcript", "Why Teams Stall", Some("## Example 1: hi"), today());

        assert!(prompt.contains("☕️ First Cup: Why Teams Stall"));
        assert!(prompt.contains("STYLE EXAMPLES"));
        assert!(prompt.contains("## Example 1: hi"));
        assert!(prompt.contains("{{YOUTUBE_URL}}"));
        assert!(!prompt.contains("{{SELECTED_TITLE}}"));
    }

    #[test]
    fn test_content_prompt_without_examples() {
        let prompt = content("the transcript", "Why Teams Stall", None, today());
        assert!(!prompt.contains("STYLE EXAMPLES"));
        assert!(!prompt.contains("{{EXAMPLES}}"));
    }
}
