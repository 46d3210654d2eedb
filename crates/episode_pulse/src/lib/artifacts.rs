use std::{io::ErrorKind, path::Path};

use anyhow::Context;
use chrono::DateTime;
use chrono_tz::Tz;
use episode_store::{Artifact, ArtifactBundle};

use crate::{
    llm::prompts::fill,
    parser::{ExtractedFields, Field},
};

pub const DEFAULT_DESCRIPTION_TEMPLATE: &str =
    "{{HOOK}}\n\n{{KEY_TOPICS}}\n\n⏱️ TIMESTAMPS:\n{{TIMESTAMPS}}\n\n---\n\nKeywords: {{KEYWORDS}}\n";

/// Marks a newsletter examples file that actually contains examples
const EXAMPLES_MARKER: &str = "## Example 1:";

/// Description template at `path`, or the built-in one when it is missing
pub async fn load_description_template(path: &Path) -> anyhow::Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(template) => Ok(template),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Description template not found, using default");
            Ok(DEFAULT_DESCRIPTION_TEMPLATE.to_string())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

/// Style examples for the content prompt, if the file has any
pub async fn load_newsletter_examples(path: &Path) -> anyhow::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) if contents.contains(EXAMPLES_MARKER) => Ok(Some(contents)),
        Ok(_) => {
            tracing::info!(path = %path.display(), "Newsletter examples file has no examples");
            Ok(None)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
    }
}

pub fn populate_description(template: &str, fields: &ExtractedFields) -> String {
    fill(
        template,
        &[
            ("HOOK", fields.hook.as_str()),
            ("KEY_TOPICS", fields.key_topics.as_str()),
            ("TIMESTAMPS", fields.timestamps.as_str()),
            ("PANELISTS", fields.panelists.as_str()),
            ("KEYWORDS", fields.keywords.as_str()),
        ],
    )
}

fn description_components(fields: &ExtractedFields) -> String {
    let sections = [
        ("HOOK", Field::Hook),
        ("KEY TOPICS", Field::KeyTopics),
        ("TIMESTAMPS", Field::Timestamps),
        ("PANELISTS", Field::Panelists),
        ("KEYWORDS", Field::Keywords),
    ]
    .iter()
    .map(|(label, field)| format!("{label}:\n{}", fields.get(*field)))
    .collect::<Vec<_>>()
    .join("\n\n");

    format!("=== DESCRIPTION COMPONENTS ===\n\n{sections}\n")
}

/// Output directory name: `<stem>_<YYYYmmdd_HHMMSS>` in local time
pub fn output_dir_name(stem: &str, now: DateTime<Tz>) -> String {
    format!("{stem}_{}", now.format("%Y%m%d_%H%M%S"))
}

/// Every artifact of one generation cycle
pub fn render_bundle(
    stem: &str,
    now: DateTime<Tz>,
    title: &str,
    fields: &ExtractedFields,
    description_template: &str,
    response: &str,
) -> ArtifactBundle {
    let mut bundle = ArtifactBundle::new(output_dir_name(stem, now));

    bundle.insert(
        Artifact::SelectedTitle,
        format!("=== SELECTED TITLE ===\n\n{title}\n"),
    );
    bundle.insert(
        Artifact::YoutubeDescription,
        populate_description(description_template, fields),
    );
    bundle.insert(
        Artifact::Keywords,
        format!("=== KEYWORDS (comma-separated) ===\n\n{}\n", fields.keywords),
    );
    bundle.insert(
        Artifact::NewsletterTeaser,
        format!("{}\n", fields.newsletter_teaser),
    );
    bundle.insert(Artifact::BlogPost, format!("{}\n", fields.blog_post));
    bundle.insert(
        Artifact::DescriptionComponents,
        description_components(fields),
    );
    bundle.insert(Artifact::FullResponse, response);

    bundle
}
