use serde::{Deserialize, Serialize};

/// Number of answer choices every multiple-choice question carries.
pub const OPTION_COUNT: usize = 3;

/// Reasons a candidate question is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuestionError {
    #[error("question text is empty")]
    EmptyText,
    #[error("expected 3 options, found {0}")]
    OptionCount(usize),
    #[error("option {0} is empty")]
    EmptyOption(usize),
    #[error("correct index {0} is out of range")]
    CorrectIndex(i64),
}

/// Wire shape used by the content generator and the question bank.
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestion {
    #[serde(alias = "text")]
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "correct_index")]
    pub correct_answer_index: i64,
}

/// A multiple-choice question with exactly [`OPTION_COUNT`] options.
///
/// The fields are private so a `Question` can only exist in a valid shape:
/// non-empty text, non-empty options and a `correct_index` inside `options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawQuestion")]
pub struct Question {
    #[serde(rename = "question")]
    text: String,
    options: Vec<String>,
    #[serde(rename = "correct_answer_index")]
    correct_index: usize,
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: i64,
    ) -> Result<Self, QuestionError> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() != OPTION_COUNT {
            return Err(QuestionError::OptionCount(options.len()));
        }
        let options: Vec<String> = options.into_iter().map(|o| o.trim().to_string()).collect();
        if let Some(idx) = options.iter().position(|o| o.is_empty()) {
            return Err(QuestionError::EmptyOption(idx));
        }
        let correct_index = usize::try_from(correct_index)
            .ok()
            .filter(|idx| *idx < options.len())
            .ok_or(QuestionError::CorrectIndex(correct_index))?;
        Ok(Self {
            text,
            options,
            correct_index,
        })
    }

    /// Builds a question from fixed content compiled into the crate.
    pub(crate) fn fixed(text: &str, options: [&str; OPTION_COUNT], correct_index: usize) -> Self {
        debug_assert!(correct_index < OPTION_COUNT);
        Self {
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_index: correct_index.min(OPTION_COUNT - 1),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_text(&self) -> &str {
        &self.options[self.correct_index]
    }
}

impl TryFrom<RawQuestion> for Question {
    type Error = QuestionError;

    fn try_from(raw: RawQuestion) -> Result<Self, Self::Error> {
        Question::new(raw.question, raw.options, raw.correct_answer_index)
    }
}

/// The student's answer to one diagnostic test question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredQuestion {
    pub question_text: String,
    pub selected_text: String,
    pub correct_text: String,
    pub is_correct: bool,
}

/// The student's answer to the comprehension check of one lesson step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub lesson_title: String,
    pub selected_text: String,
    pub correct_text: String,
    pub is_correct: bool,
}

/// An ordered list of lesson titles for one topic.
///
/// An empty `steps` list is a degenerate but valid plan: the planner skipped
/// every concept, and the conversation goes straight to the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub topic: String,
    pub steps: Vec<String>,
}

impl LessonPlan {
    pub fn new(topic: impl Into<String>, steps: Vec<String>) -> Self {
        Self {
            topic: topic.into(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
