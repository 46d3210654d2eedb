//! # Section parser
//!
//! Splits one free-form content response from the generative model into the
//! closed set of [`Field`]s, normalizing each according to its class.
//!
//! Extraction never fails. A missing or empty section becomes an empty field
//! plus an [`ExtractionWarning`]; callers decide whether a warning matters.

use std::{ops::Deref, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

static SECTION_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?mi)^[ \t>#*_]*(HOOK|KEY[ _]TOPICS|TIMESTAMPS|PANELISTS|KEYWORDS|NEWSLETTER[ _]TEASER|(?:LINKEDIN[ \t]*/[ \t]*)?BLOG[ _]POST)[ \t*_]*:(?:[ \t]*(?:\*\*|__)[ \t]*$)?[ \t]*",
    )
    .unwrap()
});

/// Generic label lines used when the blog post header is missing
static FALLBACK_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^[ \t>#*_]*[^\n:]{0,40}?\b(?:article|newsletter)\b[^\n:]{0,40}:[ \t]*")
        .unwrap()
});

/// `☕️ First Cup:` headline that opens the blog post proper
static BLOG_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[^\n]*?\x{2615}\x{FE0F}?\s*First Cup:").unwrap());

static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]+)\]\(([^)\n]*)\)").unwrap());

static MARKDOWN_BOLD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*|__").unwrap());

static MARKDOWN_ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\s][^*\n]*?)\*").unwrap());

/// Trailing list numbering the model sometimes leaves after keywords, e.g. `3.`
static TRAILING_ENUMERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\d+\.\s*$").unwrap());

/// Closed set of sections in the content response, in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Hook,
    KeyTopics,
    Timestamps,
    Panelists,
    Keywords,
    NewsletterTeaser,
    BlogPost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// Markup stripped
    Plain,
    /// Markup preserved
    Rich,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Hook,
        Field::KeyTopics,
        Field::Timestamps,
        Field::Panelists,
        Field::Keywords,
        Field::NewsletterTeaser,
        Field::BlogPost,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Field::Hook => "hook",
            Field::KeyTopics => "key_topics",
            Field::Timestamps => "timestamps",
            Field::Panelists => "panelists",
            Field::Keywords => "keywords",
            Field::NewsletterTeaser => "newsletter_teaser",
            Field::BlogPost => "blog_post",
        }
    }

    pub const fn header(self) -> &'static str {
        match self {
            Field::Hook => "HOOK",
            Field::KeyTopics => "KEY_TOPICS",
            Field::Timestamps => "TIMESTAMPS",
            Field::Panelists => "PANELISTS",
            Field::Keywords => "KEYWORDS",
            Field::NewsletterTeaser => "NEWSLETTER TEASER",
            Field::BlogPost => "LINKEDIN/BLOG POST",
        }
    }

    pub const fn class(self) -> FieldClass {
        match self {
            Field::NewsletterTeaser | Field::BlogPost => FieldClass::Rich,
            _ => FieldClass::Plain,
        }
    }

    fn from_label(label: &str) -> Option<Self> {
        let key = label
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect::<String>()
            .to_ascii_uppercase();

        match key.as_str() {
            "HOOK" => Some(Field::Hook),
            "KEYTOPICS" => Some(Field::KeyTopics),
            "TIMESTAMPS" => Some(Field::Timestamps),
            "PANELISTS" => Some(Field::Panelists),
            "KEYWORDS" => Some(Field::Keywords),
            "NEWSLETTERTEASER" => Some(Field::NewsletterTeaser),
            "LINKEDINBLOGPOST" | "BLOGPOST" => Some(Field::BlogPost),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Content-quality conditions found while extracting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// The section header never appeared
    MissingSection(Field),
    /// The header appeared but nothing usable followed it
    EmptySection(Field),
    /// The blog post has no `☕️ First Cup:` headline and was kept as-is
    MissingBlogMarker,
    /// The blog post was recovered from a generic article/newsletter label
    BlogPostFromFallback,
}

impl std::fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionWarning::MissingSection(field) => {
                write!(f, "section {} not found in response", field.header())
            }
            ExtractionWarning::EmptySection(field) => {
                write!(f, "section {} is empty", field.header())
            }
            ExtractionWarning::MissingBlogMarker => {
                write!(f, "blog post has no '☕️ First Cup:' headline, keeping full content")
            }
            ExtractionWarning::BlogPostFromFallback => {
                write!(f, "blog post recovered from a generic article label")
            }
        }
    }
}

/// Normalized value of every [`Field`]; absent sections are empty strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedFields {
    pub hook: String,
    pub key_topics: String,
    pub timestamps: String,
    pub panelists: String,
    pub keywords: String,
    pub newsletter_teaser: String,
    pub blog_post: String,
}

impl ExtractedFields {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Hook => &self.hook,
            Field::KeyTopics => &self.key_topics,
            Field::Timestamps => &self.timestamps,
            Field::Panelists => &self.panelists,
            Field::Keywords => &self.keywords,
            Field::NewsletterTeaser => &self.newsletter_teaser,
            Field::BlogPost => &self.blog_post,
        }
    }

    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Hook => &mut self.hook,
            Field::KeyTopics => &mut self.key_topics,
            Field::Timestamps => &mut self.timestamps,
            Field::Panelists => &mut self.panelists,
            Field::Keywords => &mut self.keywords,
            Field::NewsletterTeaser => &mut self.newsletter_teaser,
            Field::BlogPost => &mut self.blog_post,
        }
    }

    pub fn keyword_list(&self) -> Vec<&str> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .collect()
    }
}

/// Result of one extraction: the complete field set plus any warnings
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub fields: ExtractedFields,
    pub warnings: Vec<ExtractionWarning>,
}

impl Deref for Extraction {
    type Target = ExtractedFields;

    fn deref(&self) -> &Self::Target {
        &self.fields
    }
}

/// Raw text returned by the generative model for one content request
#[derive(Debug, Clone)]
pub struct ResponseBlob(String);

impl Deref for ResponseBlob {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<String> for ResponseBlob {
    fn from(value: String) -> Self {
        ResponseBlob(value)
    }
}

impl ResponseBlob {
    pub fn new(blob: impl Into<String>) -> Self {
        ResponseBlob(blob.into())
    }

    pub fn extract(&self) -> Extraction {
        extract(self)
    }
}

struct SectionHeader {
    field: Field,
    start: usize,
    end: usize,
}

/// Locates the first occurrence of every recognized header, in input order.
///
/// A repeated header is body text of whatever section it appears in, so only
/// first occurrences bound sections. The blog post runs to the end of input,
/// so nothing after its header is a header.
fn locate_headers(blob: &str) -> Vec<SectionHeader> {
    let mut seen = [false; Field::ALL.len()];
    let mut headers = Vec::new();

    for caps in SECTION_HEADER_RE.captures_iter(blob) {
        let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(field) = Field::from_label(label.as_str()) else {
            continue;
        };
        if std::mem::replace(&mut seen[field.index()], true) {
            continue;
        }
        headers.push(SectionHeader {
            field,
            start: whole.start(),
            end: whole.end(),
        });
        if field == Field::BlogPost {
            break;
        }
    }

    headers
}

/// Parses a content response into normalized fields.
///
/// Each section runs from its header to the next recognized header, or to the
/// end of input for the last one. Header order does not matter, except that
/// the blog post always runs to the end of input. Without a blog post header,
/// a generic article label ends the section it appears in.
#[tracing::instrument(skip_all, fields(len = blob.len()))]
pub fn extract(blob: &str) -> Extraction {
    let headers = locate_headers(blob);
    let fallback = if headers.iter().any(|h| h.field == Field::BlogPost) {
        None
    } else {
        fallback_blog_post(blob, &headers)
    };
    let mut extraction = Extraction::default();

    for (idx, header) in headers.iter().enumerate() {
        let next_start = headers.get(idx + 1).map_or(blob.len(), |next| next.start);
        let section_end = match &fallback {
            Some(fb) if (header.end..next_start).contains(&fb.label_start) => fb.label_start,
            _ => next_start,
        };
        let raw = &blob[header.end..section_end];

        let value = match header.field {
            Field::Keywords => normalize_keywords(raw),
            Field::BlogPost => {
                let (body, has_marker) = trim_to_blog_marker(&trim_noise(raw));
                if !has_marker && !body.is_empty() {
                    extraction.warnings.push(ExtractionWarning::MissingBlogMarker);
                }
                body
            }
            field if field.class() == FieldClass::Plain => strip_markup(&trim_noise(raw)),
            _ => trim_noise(raw),
        };

        if value.is_empty() {
            extraction
                .warnings
                .push(ExtractionWarning::EmptySection(header.field));
        }
        *extraction.fields.slot(header.field) = value;
    }

    for field in Field::ALL {
        if headers.iter().any(|h| h.field == field) {
            continue;
        }
        if field == Field::BlogPost {
            if let Some(fb) = &fallback {
                let (body, has_marker) = trim_to_blog_marker(&fb.body);
                extraction
                    .warnings
                    .push(ExtractionWarning::BlogPostFromFallback);
                if !has_marker {
                    extraction.warnings.push(ExtractionWarning::MissingBlogMarker);
                }
                extraction.fields.blog_post = body;
                continue;
            }
        }
        extraction
            .warnings
            .push(ExtractionWarning::MissingSection(field));
    }

    for warning in &extraction.warnings {
        tracing::warn!(%warning, "Content quality warning");
    }

    extraction
}

/// Blog post recovered from a generic label
struct FallbackBlog {
    /// Where the label line starts; the section before it ends here
    label_start: usize,
    body: String,
}

/// Captures trailing content after the last generic "article"/"newsletter"
/// label that is not itself a recognized header.
fn fallback_blog_post(blob: &str, headers: &[SectionHeader]) -> Option<FallbackBlog> {
    let label = FALLBACK_LABEL_RE
        .find_iter(blob)
        .filter(|m| !headers.iter().any(|h| h.start == m.start()))
        .last()?;

    let end = headers
        .iter()
        .map(|h| h.start)
        .filter(|start| *start > label.end())
        .min()
        .unwrap_or(blob.len());

    let body = trim_noise(&blob[label.end()..end]);
    (!body.is_empty()).then_some(FallbackBlog {
        label_start: label.start(),
        body,
    })
}

/// Drops anything before the `☕️ First Cup:` headline line.
/// Returns the body and whether the marker was found.
fn trim_to_blog_marker(body: &str) -> (String, bool) {
    match BLOG_MARKER_RE.find(body) {
        Some(marker) => (body[marker.start()..].trim().to_string(), true),
        None => (body.to_string(), false),
    }
}

fn is_separator_line(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| matches!(c, '-' | '=' | '*' | '_' | '#' | '~'))
}

/// Trims surrounding whitespace and separator lines such as `---` or `===`
fn trim_noise(raw: &str) -> String {
    let lines = raw.trim().lines().collect::<Vec<_>>();
    let start = lines
        .iter()
        .position(|l| !is_separator_line(l))
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !is_separator_line(l))
        .map_or(start, |i| i + 1);

    lines[start..end.max(start)].join("\n").trim().to_string()
}

/// Removes bold, italic and link markup, keeping the visible text
pub fn strip_markup(text: &str) -> String {
    let text = MARKDOWN_LINK_RE.replace_all(text, "$1");
    let text = MARKDOWN_BOLD_RE.replace_all(&text, "");
    let text = MARKDOWN_ITALIC_RE.replace_all(&text, "$1");
    text.into_owned()
}

/// Normalizes a keywords section to a single `a, b, c` line.
///
/// Hashtags are dropped and only the first line is kept. Markup is stripped
/// per token until nothing changes, trailing enumeration artifacts are
/// removed and empty tokens dropped. Returns an empty string when no keyword
/// survives. Idempotent.
pub fn normalize_keywords(raw: &str) -> String {
    let raw = raw.replace('#', "");
    let first_line = raw.trim().lines().next().unwrap_or_default();

    let mut tokens = first_line
        .split(',')
        .map(clean_keyword)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    while let Some(last) = tokens.last_mut() {
        let stripped = TRAILING_ENUMERATION_RE.replace(last, "").trim().to_string();
        if stripped.is_empty() {
            tokens.pop();
        } else if stripped == *last {
            break;
        } else {
            *last = stripped;
        }
    }

    tokens.join(", ")
}

/// Strips markup from one keyword until it is stable
fn clean_keyword(token: &str) -> String {
    let mut current = token.trim().to_string();
    loop {
        let next = strip_markup(&current).trim().to_string();
        if next == current {
            return current;
        }
        current = next;
    }
}
