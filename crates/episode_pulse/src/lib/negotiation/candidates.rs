use std::{future::Future, ops::Deref, sync::LazyLock};

use chrono::Utc;
use chrono_tz::Tz;
use regex::Regex;

use crate::{
    error::Error,
    llm::{prompts, GenerationRequest, Generator},
    parser::strip_markup,
};

static TITLE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?mi)^[ \t>*_#-]*TITLE\s*\d+\s*[:.)]\s*(.+?)\s*$").unwrap());

/// Exactly five title candidates, in the order the model proposed them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleCandidateSet([String; TitleCandidateSet::SIZE]);

impl TitleCandidateSet {
    pub const SIZE: usize = 5;

    pub fn new(titles: [String; Self::SIZE]) -> Self {
        Self(titles)
    }

    /// Takes the first five candidates; fewer is an error
    pub fn from_candidates(titles: Vec<String>) -> Result<Self, Error> {
        let found = titles.len();
        let titles: [String; Self::SIZE] = titles
            .into_iter()
            .take(Self::SIZE)
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| Error::IncompleteCandidates { found })?;

        Ok(Self(titles))
    }

    /// 1-based lookup, matching what the human types
    pub fn get(&self, index: usize) -> Option<&str> {
        index
            .checked_sub(1)
            .and_then(|i| self.0.get(i))
            .map(String::as_str)
    }
}

impl Deref for TitleCandidateSet {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Extracts `TITLE n: ...` candidates, dropping any over `max_chars`
pub fn parse_titles(response: &str, max_chars: usize) -> Vec<String> {
    TITLE_LINE_RE
        .captures_iter(response)
        .filter_map(|caps| {
            let raw = caps.get(1)?.as_str();
            let title = strip_markup(raw)
                .trim()
                .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”'))
                .trim()
                .to_string();

            if title.is_empty() {
                return None;
            }
            if title.chars().count() > max_chars {
                tracing::debug!(%title, max_chars, "Dropping title over budget");
                return None;
            }
            Some(title)
        })
        .collect()
}

/// Produces a fresh candidate set, optionally steered by feedback
pub trait CandidateSource {
    fn candidates(
        &self,
        transcript: &str,
        feedback: Option<&str>,
    ) -> impl Future<Output = Result<TitleCandidateSet, Error>> + Send;
}

impl<T: CandidateSource + Send + Sync> CandidateSource for &T {
    async fn candidates(
        &self,
        transcript: &str,
        feedback: Option<&str>,
    ) -> Result<TitleCandidateSet, Error> {
        (**self).candidates(transcript, feedback).await
    }
}

/// [`CandidateSource`] backed by a generative model
pub struct TitleGenerator<G> {
    generator: G,
    model: Option<String>,
    max_tokens: u32,
    max_chars: usize,
    timezone: Tz,
}

impl<G> TitleGenerator<G> {
    pub fn new(generator: G, max_tokens: u32, max_chars: usize, timezone: Tz) -> Self {
        Self {
            generator,
            model: None,
            max_tokens,
            max_chars,
            timezone,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

impl<G: Generator + Send + Sync> CandidateSource for TitleGenerator<G> {
    #[tracing::instrument(skip_all, fields(regenerate = feedback.is_some()))]
    async fn candidates(
        &self,
        transcript: &str,
        feedback: Option<&str>,
    ) -> Result<TitleCandidateSet, Error> {
        let today = Utc::now().with_timezone(&self.timezone).date_naive();
        let request = GenerationRequest {
            prompt: prompts::titles(transcript, feedback, today, self.max_chars),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
        };

        let response = self
            .generator
            .generate(request)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to generate titles"))
            .map_err(|e| Error::Generation(e.to_string()))?;

        let titles = parse_titles(&response, self.max_chars);
        tracing::info!(count = titles.len(), "Parsed title candidates");

        TitleCandidateSet::from_candidates(titles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn five() -> Vec<String> {
        (1..=5).map(|i| format!("Title {i}")).collect()
    }

    #[test]
    fn test_parse_titles_basic() {
        let response = "Here you go:\nTITLE 1: Are We in an AI Bubble?\nTITLE 2: \"Quoted Title\"\n**TITLE 3:** **Bold Title**\nTitle 4: lower label\nnot a title\nTITLE 5: Last One";
        let titles = parse_titles(response, 60);

        assert_eq!(
            titles,
            vec![
                "Are We in an AI Bubble?",
                "Quoted Title",
                "Bold Title",
                "lower label",
                "Last One",
            ]
        );
    }

    #[test]
    fn test_parse_titles_drops_over_budget() {
        let long = "x".repeat(61);
        let response = format!("TITLE 1: {long}\nTITLE 2: Short");
        assert_eq!(parse_titles(&response, 60), vec!["Short"]);
    }

    #[test]
    fn test_set_takes_first_five() {
        let mut titles = five();
        titles.push("Title 6".into());
        let set = TitleCandidateSet::from_candidates(titles).unwrap();

        assert_eq!(set.len(), 5);
        assert_eq!(set.get(1), Some("Title 1"));
        assert_eq!(set.get(5), Some("Title 5"));
        assert_eq!(set.get(0), None);
        assert_eq!(set.get(6), None);
    }

    #[test]
    fn test_set_rejects_fewer_than_five() {
        let err = TitleCandidateSet::from_candidates(five()[..3].to_vec()).unwrap_err();
        assert!(matches!(err, Error::IncompleteCandidates { found: 3 }));

        let err = TitleCandidateSet::from_candidates(Vec::new()).unwrap_err();
        assert!(matches!(err, Error::IncompleteCandidates { found: 0 }));
    }
}
