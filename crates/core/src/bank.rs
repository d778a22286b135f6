//! Static Question Bank
//!
//! Read-only, prewritten content for the topics the tutor knows about: a
//! baseline diagnostic test per topic and a set of titled lessons, each with
//! an explanation and its paired comprehension question. The bank is the
//! second-tier fallback whenever the content generator can't be trusted.

use crate::question::Question;
use anyhow::{Context, Result};
use fuzzy_matcher::{FuzzyMatcher, skim::SkimMatcherV2};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::error;

const BUILTIN_TOPICS: [&str; 3] = [
    include_str!("../bank/fractions.json"),
    include_str!("../bank/multiplication.json"),
    include_str!("../bank/division.json"),
];

/// Fuzzy queries shorter than this only match exactly.
const MIN_FUZZY_QUERY_LEN: usize = 4;
const MIN_FUZZY_SCORE: i64 = 60;

/// A prewritten lesson: the explanation shown to the student and the
/// question that checks it.
#[derive(Debug, Clone, Deserialize)]
pub struct BankLesson {
    pub title: String,
    pub content: String,
    pub quiz: Question,
}

/// Everything the bank holds for one topic.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicBank {
    pub topic: String,
    pub baseline: Vec<Question>,
    #[serde(default)]
    pub lessons: Vec<BankLesson>,
}

pub struct QuestionBank {
    // Keyed by lowercased topic name.
    topics: BTreeMap<String, TopicBank>,
    matcher: SkimMatcherV2,
}

impl std::fmt::Debug for QuestionBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionBank")
            .field("topics", &self.topics.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

impl QuestionBank {
    /// A bank with no topics; every lookup misses.
    pub fn empty() -> Self {
        Self {
            topics: BTreeMap::new(),
            matcher: SkimMatcherV2::default(),
        }
    }

    /// The bank compiled into the binary (Fractions, Multiplication, Division).
    pub fn builtin() -> Self {
        let mut bank = Self::empty();
        for source in BUILTIN_TOPICS {
            if let Err(e) = bank.insert_json(source) {
                error!(error = ?e, "Skipping malformed built-in bank topic");
            }
        }
        bank
    }

    /// Parses one topic document and adds it, replacing any topic of the same name.
    pub fn insert_json(&mut self, source: &str) -> Result<()> {
        let topic: TopicBank =
            serde_json::from_str(source).context("Failed to parse question bank topic")?;
        self.insert(topic);
        Ok(())
    }

    pub fn insert(&mut self, topic: TopicBank) {
        self.topics.insert(topic.topic.to_lowercase(), topic);
    }

    fn topic(&self, topic: &str) -> Option<&TopicBank> {
        self.topics.get(&topic.trim().to_lowercase())
    }

    /// The baseline diagnostic questions for `topic`, if the topic is known
    /// and has any.
    pub fn baseline(&self, topic: &str) -> Option<&[Question]> {
        self.topic(topic)
            .map(|t| t.baseline.as_slice())
            .filter(|questions| !questions.is_empty())
    }

    /// The prewritten lesson titled `title` under `topic`.
    pub fn lesson(&self, topic: &str, title: &str) -> Option<&BankLesson> {
        let title = title.trim();
        self.topic(topic)?
            .lessons
            .iter()
            .find(|lesson| lesson.title.eq_ignore_ascii_case(title))
    }

    /// The prewritten lesson titled `title` under any topic.
    pub fn find_lesson(&self, title: &str) -> Option<&BankLesson> {
        let title = title.trim();
        self.topics
            .values()
            .flat_map(|t| t.lessons.iter())
            .find(|lesson| lesson.title.eq_ignore_ascii_case(title))
    }

    /// Lessons of `topic` in their prewritten order.
    pub fn lessons(&self, topic: &str) -> &[BankLesson] {
        self.topic(topic).map_or(&[], |t| t.lessons.as_slice())
    }

    /// Canonical names of all known topics.
    pub fn topics(&self) -> Vec<String> {
        self.topics.values().map(|t| t.topic.clone()).collect()
    }

    /// Maps free text to a known topic name: an exact case-insensitive match
    /// first, then the best fuzzy match above a minimum score.
    pub fn resolve_topic(&self, query: &str) -> Option<String> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return None;
        }
        if let Some(topic) = self.topics.get(&query) {
            return Some(topic.topic.clone());
        }
        if query.chars().count() < MIN_FUZZY_QUERY_LEN {
            return None;
        }
        self.topics
            .iter()
            .filter_map(|(key, topic)| {
                self.matcher
                    .fuzzy_match(key, &query)
                    .filter(|score| *score >= MIN_FUZZY_SCORE)
                    .map(|score| (score, topic))
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, topic)| topic.topic.clone())
    }
}
