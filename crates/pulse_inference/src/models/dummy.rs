use std::collections::HashMap;
use std::fmt;

use pulse_core::{InferenceModel, Result, Sentiment};

const SUMMARY_SENTENCES: usize = 2;
const MAX_TOPICS: usize = 5;

const POSITIVE: &[&str] = &[
    "launch", "launched", "release", "released", "growth", "record", "improved", "faster", "win",
    "success", "funding", "raised", "great", "excited", "new", "best",
];
const NEGATIVE: &[&str] = &[
    "outage", "breach", "layoffs", "vulnerability", "bug", "crash", "lawsuit", "decline", "lost",
    "failed", "failure", "slow", "down", "hack", "worst",
];
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "their", "there", "these", "those", "which", "while", "would",
    "could", "should", "other", "being", "where", "because", "through", "before",
];

/// Offline stand-in that derives everything from the text itself.
#[derive(Default)]
pub struct DummyModel;

impl fmt::Debug for DummyModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyModel").finish()
    }
}

impl DummyModel {
    pub fn new() -> Self {
        Self
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
}

/// Splits after `.`, `!` or `?` when followed by whitespace, so "1.80" stays whole.
fn sentences(text: &str) -> impl Iterator<Item = &str> {
    let mut cuts = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        let at_boundary = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
        if matches!(c, '.' | '!' | '?') && at_boundary {
            cuts.push(idx + c.len_utf8());
        }
    }
    cuts.push(text.len());

    let mut start = 0;
    cuts.into_iter()
        .map(move |end| {
            let sentence = &text[start..end];
            start = end;
            sentence.trim()
        })
        .filter(|s| !s.is_empty())
}

#[async_trait::async_trait]
impl InferenceModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn summarize(&self, text: &str) -> Result<String> {
        Ok(sentences(text).take(SUMMARY_SENTENCES).collect::<Vec<_>>().join(" "))
    }

    async fn analyze_sentiment(&self, text: &str) -> Result<Sentiment> {
        let score: i32 = words(text)
            .map(|w| {
                if POSITIVE.contains(&w.as_str()) {
                    1
                } else if NEGATIVE.contains(&w.as_str()) {
                    -1
                } else {
                    0
                }
            })
            .sum();
        Ok(match score {
            s if s > 0 => Sentiment::Positive,
            s if s < 0 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        })
    }

    async fn extract_topics(&self, text: &str) -> Result<Vec<String>> {
        // word -> (count, first position)
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        for (position, word) in words(text).enumerate() {
            if word.chars().count() <= 4 || STOPWORDS.contains(&word.as_str()) {
                continue;
            }
            counts.entry(word).or_insert((0, position)).0 += 1;
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| a.1 .1.cmp(&b.1 .1)));
        Ok(ranked.into_iter().take(MAX_TOPICS).map(|(word, _)| word).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dummy_model() {
        let model = DummyModel::new();
        let text = "Rust 1.80 released today! The release brings faster builds. Compiler teams celebrate. More soon.";

        assert_eq!(
            model.summarize(text).await.unwrap(),
            "Rust 1.80 released today! The release brings faster builds."
        );
        assert_eq!(model.analyze_sentiment(text).await.unwrap(), Sentiment::Positive);
        assert_eq!(
            model.analyze_sentiment("Major outage after a security breach").await.unwrap(),
            Sentiment::Negative
        );
        assert_eq!(model.analyze_sentiment("Meeting notes").await.unwrap(), Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_dummy_topics() {
        let model = DummyModel::new();
        let topics = model
            .extract_topics("Rust compiler news: the compiler got faster, and rust tooling too. Tooling, tooling!")
            .await
            .unwrap();
        assert_eq!(topics, vec!["tooling", "compiler", "faster"]);
    }
}
