//! Content Record Parser
//!
//! Turns loosely structured generator output into typed records. The raw text
//! is expected to carry a JSON payload, possibly wrapped in prose or markdown
//! fences. Anything that fails to decode or violates a record invariant is
//! replaced by a deterministic fallback, so callers always get a usable value.

use crate::bank::QuestionBank;
use crate::question::{LessonPlan, Question, QuestionError, RawQuestion};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::warn;

/// Upper bound on embedded payload candidates tried before giving up.
const MAX_CANDIDATES: usize = 16;

/// Responses longer than this are rejected without scanning.
const MAX_RAW_BYTES: usize = 32 * 1024;

/// Why a raw generator response was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    #[error("response was empty")]
    Empty,
    #[error("response is {0} bytes long")]
    TooLong(usize),
    #[error("no JSON payload found")]
    NoPayload,
    #[error("payload did not decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("question {index} is invalid: {source}")]
    InvalidQuestion {
        index: usize,
        source: QuestionError,
    },
    #[error("test contains no questions")]
    NoQuestions,
    #[error("lesson step {0} is blank")]
    BlankStep(usize),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TestPayload {
    List(Vec<RawQuestion>),
    Wrapped { questions: Vec<RawQuestion> },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlanPayload {
    List(Vec<String>),
    Wrapped { steps: Vec<String> },
}

/// Finds the balanced `{...}` or `[...]` region starting at byte `start`.
fn balanced_region(text: &str, start: usize) -> Option<&str> {
    let mut stack: Vec<u8> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (idx, &byte) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => stack.push(byte),
            b'}' | b']' => {
                let open = stack.pop()?;
                if (open == b'{') != (byte == b'}') {
                    return None;
                }
                if stack.is_empty() {
                    return text.get(start..=idx);
                }
            }
            _ => {}
        }
    }
    None
}

/// Yields the embedded JSON regions of `text`, outermost-first, left to right.
///
/// At most [`MAX_CANDIDATES`] opening brackets are scanned, each scan being
/// linear in the rest of the text.
fn payload_candidates(text: &str) -> impl Iterator<Item = &str> {
    text.match_indices(['{', '['])
        .take(MAX_CANDIDATES)
        .filter_map(move |(start, _)| balanced_region(text, start))
}

/// Decodes the first payload in `raw` that deserializes as `T`.
fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, ParseFailure> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ParseFailure::Empty);
    }
    if text.len() > MAX_RAW_BYTES {
        return Err(ParseFailure::TooLong(text.len()));
    }
    let mut last_error = match serde_json::from_str(text) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };
    for candidate in payload_candidates(text) {
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = e,
        }
    }
    if text.contains(['{', '[']) {
        Err(ParseFailure::Decode(last_error))
    } else {
        Err(ParseFailure::NoPayload)
    }
}

fn validate_questions(raw: Vec<RawQuestion>) -> Result<Vec<Question>, ParseFailure> {
    if raw.is_empty() {
        return Err(ParseFailure::NoQuestions);
    }
    raw.into_iter()
        .enumerate()
        .map(|(index, q)| {
            Question::try_from(q).map_err(|source| ParseFailure::InvalidQuestion { index, source })
        })
        .collect()
}

/// Strictly decodes a diagnostic test: a list of questions, bare or under `"questions"`.
pub fn decode_test(raw: &str) -> Result<Vec<Question>, ParseFailure> {
    let raw_questions = match decode::<TestPayload>(raw)? {
        TestPayload::List(list) | TestPayload::Wrapped { questions: list } => list,
    };
    validate_questions(raw_questions)
}

/// Strictly decodes a lesson plan: a list of titles, bare or under `"steps"`.
pub fn decode_plan(raw: &str, topic: &str) -> Result<LessonPlan, ParseFailure> {
    let steps = match decode::<PlanPayload>(raw)? {
        PlanPayload::List(steps) | PlanPayload::Wrapped { steps } => steps,
    };
    let steps = steps
        .into_iter()
        .enumerate()
        .map(|(idx, step)| {
            let step = step.trim().to_string();
            if step.is_empty() {
                Err(ParseFailure::BlankStep(idx))
            } else {
                Ok(step)
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LessonPlan::new(topic, steps))
}

/// Strictly decodes a single quiz question.
pub fn decode_quiz(raw: &str) -> Result<Question, ParseFailure> {
    let raw_question = decode::<RawQuestion>(raw)?;
    Question::try_from(raw_question)
        .map_err(|source| ParseFailure::InvalidQuestion { index: 0, source })
}

/// The generic diagnostic test used when neither the generator nor the bank
/// can supply one.
pub fn fallback_test(topic: &str) -> Vec<Question> {
    vec![
        Question::fixed(
            &format!("What is the best way to begin learning {topic}?"),
            [
                "Skip straight to the hardest problems",
                "Start with the basic ideas",
                "Guess every answer",
            ],
            1,
        ),
        Question::fixed(
            &format!("A {topic} problem feels tricky. What should you do?"),
            [
                "Give up right away",
                "Pick an answer at random",
                "Break it into smaller steps",
            ],
            2,
        ),
        Question::fixed(
            &format!("How do you get better at {topic}?"),
            [
                "Practice a little every day",
                "Never practice",
                "Only read the answers",
            ],
            0,
        ),
    ]
}

pub fn fallback_plan(topic: &str) -> LessonPlan {
    LessonPlan::new(
        topic,
        vec![
            format!("Introduction to {topic}"),
            format!("Practice with {topic}"),
        ],
    )
}

pub fn fallback_quiz() -> Question {
    Question::fixed(
        "Which sentence best describes the lesson you just read?",
        [
            "It explained one new idea with an example",
            "It was about something else entirely",
            "It had no explanation at all",
        ],
        0,
    )
}

/// Parses a diagnostic test, falling back to the topic's bank baseline and
/// then to the generic test. The flag is `true` only when the generator's own
/// questions were used.
pub fn parse_test(raw: &str, topic: &str, bank: &QuestionBank) -> (Vec<Question>, bool) {
    match decode_test(raw) {
        Ok(questions) => (questions, true),
        Err(e) => {
            let questions = match bank.baseline(topic) {
                Some(baseline) => {
                    warn!(record = "test", %topic, reason = %e, fallback = "bank", "Generator output rejected");
                    baseline.to_vec()
                }
                None => {
                    warn!(record = "test", %topic, reason = %e, fallback = "generic", "Generator output rejected");
                    fallback_test(topic)
                }
            };
            (questions, false)
        }
    }
}

pub fn parse_plan(raw: &str, topic: &str) -> LessonPlan {
    decode_plan(raw, topic).unwrap_or_else(|e| {
        warn!(record = "plan", %topic, reason = %e, "Generator output rejected");
        fallback_plan(topic)
    })
}

pub fn parse_quiz(raw: &str) -> Question {
    decode_quiz(raw).unwrap_or_else(|e| {
        warn!(record = "quiz", reason = %e, "Generator output rejected");
        fallback_quiz()
    })
}
