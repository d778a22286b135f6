//! Content Generation Gateway
//!
//! This module defines the contract for the external writer of tutoring
//! content (diagnostic tests, lesson plans, explanations and quizzes) and
//! provides an LLM-backed implementation plus a deterministic offline one.
//! Every operation returns raw text; turning it into typed records is the
//! job of the [`parser`](crate::parser) module.

use crate::bank::QuestionBank;
use crate::parser::fallback_test;
use crate::question::{AnsweredQuestion, Question};
use crate::llm_client::LLMClient;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Prompt keys an [`LLMContentGenerator`] expects in its template map.
pub const PROMPT_KEYS: [&str; 4] = [
    "generate_test",
    "generate_plan",
    "generate_explanation",
    "generate_quiz",
];

const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a friendly, patient tutor for primary school students (age 8-12).";

/// Loads every `*.md` file in `dir` as a prompt template keyed by its file
/// stem, and checks that all of [`PROMPT_KEYS`] are present.
pub fn load_prompts(dir: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read prompts from {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            prompts.insert(key, content);
        }
    }
    if let Some(missing) = PROMPT_KEYS.iter().find(|key| !prompts.contains_key(**key)) {
        anyhow::bail!("{missing}.md not found in {}", dir.display());
    }
    Ok(prompts)
}

/// Defines the contract for any service that can write tutoring content.
///
/// This abstraction allows the driver to swap between an LLM-backed writer
/// and a canned one while keeping a single fallback policy in the parser.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Writes a short multiple-choice diagnostic test for `topic`.
    async fn generate_test(&self, topic: &str) -> Result<String>;

    /// Writes a lesson plan (a list of lesson titles) personalized to the
    /// student's diagnostic results.
    async fn generate_plan(&self, topic: &str, test_results: &[AnsweredQuestion]) -> Result<String>;

    /// Writes a short plain-prose explanation of one lesson step.
    async fn generate_explanation(&self, lesson: &str) -> Result<String>;

    /// Writes one comprehension question about exactly `explanation`.
    async fn generate_quiz(&self, explanation: &str) -> Result<String>;
}

/// A `ContentGenerator` that renders prompt templates and sends them to an LLM.
pub struct LLMContentGenerator {
    client: Arc<dyn LLMClient>,
    prompts: HashMap<String, String>,
}

impl LLMContentGenerator {
    /// Creates a new LLM-backed generator.
    ///
    /// # Arguments
    ///
    /// * `client` - The chat client used for every request.
    /// * `prompts` - Template strings keyed by [`PROMPT_KEYS`], plus an
    ///   optional `"system_prompt"`. Templates may use `{topic}`,
    ///   `{test_results}`, `{lesson}` and `{explanation}`.
    pub fn new(client: Arc<dyn LLMClient>, prompts: HashMap<String, String>) -> Self {
        Self { client, prompts }
    }

    async fn run(&self, key: &str, vars: &[(&str, &str)]) -> Result<String> {
        let template = self
            .prompts
            .get(key)
            .with_context(|| format!("Missing prompt template: '{key}'"))?;
        let prompt = vars
            .iter()
            .fold(template.clone(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            });
        let system_prompt = self
            .prompts
            .get("system_prompt")
            .map_or(DEFAULT_SYSTEM_PROMPT, String::as_str);
        self.client
            .complete(system_prompt, &prompt)
            .await
            .with_context(|| format!("LLM request for '{key}' failed"))
    }
}

#[async_trait]
impl ContentGenerator for LLMContentGenerator {
    async fn generate_test(&self, topic: &str) -> Result<String> {
        self.run("generate_test", &[("topic", topic)]).await
    }

    async fn generate_plan(&self, topic: &str, test_results: &[AnsweredQuestion]) -> Result<String> {
        let results = serde_json::to_string_pretty(test_results)?;
        self.run("generate_plan", &[("topic", topic), ("test_results", &results)])
            .await
    }

    async fn generate_explanation(&self, lesson: &str) -> Result<String> {
        self.run("generate_explanation", &[("lesson", lesson)]).await
    }

    async fn generate_quiz(&self, explanation: &str) -> Result<String> {
        self.run("generate_quiz", &[("explanation", explanation)])
            .await
    }
}

/// A deterministic `ContentGenerator` for offline use and demos.
///
/// Content comes from the question bank where possible; otherwise it is
/// assembled from fixed templates. Output always uses the same JSON wire
/// shapes an LLM is asked to produce.
pub struct CannedContentGenerator {
    bank: Arc<QuestionBank>,
}

impl CannedContentGenerator {
    pub fn new(bank: Arc<QuestionBank>) -> Self {
        Self { bank }
    }
}

fn first_sentence(text: &str) -> String {
    let sentence = text
        .split_terminator(['.', '!', '?', '\n'])
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or("The idea we just covered");
    sentence.chars().take(80).collect()
}

#[async_trait]
impl ContentGenerator for CannedContentGenerator {
    async fn generate_test(&self, topic: &str) -> Result<String> {
        let questions = match self.bank.baseline(topic) {
            Some(baseline) => baseline.to_vec(),
            None => fallback_test(topic),
        };
        Ok(serde_json::to_string(&questions)?)
    }

    /// One step per missed question (at least one, at most three), taken in
    /// order from the topic's bank lessons.
    async fn generate_plan(&self, topic: &str, test_results: &[AnsweredQuestion]) -> Result<String> {
        let missed = test_results.iter().filter(|r| !r.is_correct).count();
        let wanted = missed.clamp(1, 3);
        let lessons = self.bank.lessons(topic);
        let steps: Vec<String> = if lessons.is_empty() {
            vec![
                format!("Introduction to {topic}"),
                format!("Practice with {topic}"),
            ]
        } else {
            lessons.iter().take(wanted).map(|l| l.title.clone()).collect()
        };
        Ok(serde_json::to_string(&steps)?)
    }

    async fn generate_explanation(&self, lesson: &str) -> Result<String> {
        Ok(match self.bank.find_lesson(lesson) {
            Some(prewritten) => prewritten.content.clone(),
            None => format!(
                "Let's explore {lesson}! Think of it like building with blocks: \
                 we start with one small piece, look at it closely, and then add the next piece on top."
            ),
        })
    }

    async fn generate_quiz(&self, explanation: &str) -> Result<String> {
        let quiz = self
            .bank
            .topics()
            .iter()
            .flat_map(|topic| self.bank.lessons(topic))
            .find(|lesson| lesson.content == explanation)
            .map(|lesson| lesson.quiz.clone());
        let quiz = match quiz {
            Some(quiz) => quiz,
            None => Question::new(
                "Which of these was part of the lesson you just read?",
                vec![
                    first_sentence(explanation),
                    "How to bake bread".to_string(),
                    "The names of the planets".to_string(),
                ],
                0,
            )?,
        };
        Ok(serde_json::to_string(&quiz)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::MockLLMClient;
    use crate::parser::{decode_plan, decode_quiz, decode_test};
    use mockall::predicate::eq;

    fn prompts() -> HashMap<String, String> {
        HashMap::from([
            ("generate_test".to_string(), "Test about {topic}".to_string()),
            (
                "generate_plan".to_string(),
                "Plan {topic} from {test_results}".to_string(),
            ),
            ("generate_quiz".to_string(), "Quiz on: {explanation}".to_string()),
        ])
    }

    #[tokio::test]
    async fn test_llm_generator_renders_templates() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .with(eq(DEFAULT_SYSTEM_PROMPT), eq("Test about Fractions"))
            .times(1)
            .returning(|_, _| Ok("[]".to_string()));
        let generator = LLMContentGenerator::new(Arc::new(client), prompts());

        assert_eq!(generator.generate_test("Fractions").await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_llm_generator_passes_results_as_json() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .withf(|_, prompt| prompt.starts_with("Plan Division from") && prompt.contains("\"is_correct\": false"))
            .times(1)
            .returning(|_, _| Ok("[\"Understanding Division\"]".to_string()));
        let generator = LLMContentGenerator::new(Arc::new(client), prompts());
        let results = vec![AnsweredQuestion {
            question_text: "What is 12 ÷ 3?".into(),
            selected_text: "3".into(),
            correct_text: "4".into(),
            is_correct: false,
        }];

        let raw = generator.generate_plan("Division", &results).await.unwrap();
        assert_eq!(raw, "[\"Understanding Division\"]");
    }

    #[tokio::test]
    async fn test_llm_generator_missing_template_is_an_error() {
        let mut client = MockLLMClient::new();
        client.expect_complete().never();
        let generator = LLMContentGenerator::new(Arc::new(client), prompts());

        let err = generator.generate_explanation("Adding Fractions").await.unwrap_err();
        assert!(err.to_string().contains("generate_explanation"));
    }

    #[tokio::test]
    async fn test_llm_generator_wraps_client_errors() {
        let mut client = MockLLMClient::new();
        client
            .expect_complete()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset")));
        let generator = LLMContentGenerator::new(Arc::new(client), prompts());

        let err = generator.generate_quiz("Halves are equal parts.").await.unwrap_err();
        assert!(format!("{err:#}").contains("connection reset"));
    }

    #[test]
    fn test_load_prompts_reads_markdown_files() {
        let dir = tempfile::tempdir().unwrap();
        for key in PROMPT_KEYS {
            fs::write(dir.path().join(format!("{key}.md")), format!("{key} for {{topic}}")).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let prompts = load_prompts(dir.path()).unwrap();
        assert_eq!(prompts.len(), PROMPT_KEYS.len());
        assert_eq!(prompts["generate_test"], "generate_test for {topic}");
    }

    #[test]
    fn test_load_prompts_requires_every_key() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("generate_test.md"), "x").unwrap();

        let err = load_prompts(dir.path()).unwrap_err();
        assert!(err.to_string().contains("generate_plan.md"));
    }

    #[tokio::test]
    async fn test_canned_generator_output_parses() {
        let bank = Arc::new(QuestionBank::builtin());
        let generator = CannedContentGenerator::new(bank.clone());

        let test = decode_test(&generator.generate_test("Fractions").await.unwrap()).unwrap();
        assert_eq!(test, bank.baseline("Fractions").unwrap().to_vec());

        let plan = decode_plan(&generator.generate_plan("Geometry", &[]).await.unwrap(), "Geometry")
            .unwrap();
        assert_eq!(plan.steps, vec!["Introduction to Geometry", "Practice with Geometry"]);

        let explanation = generator.generate_explanation("Adding Fractions").await.unwrap();
        let quiz = decode_quiz(&generator.generate_quiz(&explanation).await.unwrap()).unwrap();
        assert_eq!(quiz.text(), "What is 2/6 + 3/6?");

        let generic = generator.generate_explanation("Shapes").await.unwrap();
        let quiz = decode_quiz(&generator.generate_quiz(&generic).await.unwrap()).unwrap();
        assert_eq!(quiz.correct_text(), "Let's explore Shapes");
    }

    #[tokio::test]
    async fn test_canned_plan_grows_with_missed_questions() {
        let generator = CannedContentGenerator::new(Arc::new(QuestionBank::builtin()));
        let missed = |n: usize| {
            (0..3)
                .map(|i| AnsweredQuestion {
                    question_text: format!("q{i}"),
                    selected_text: "a".into(),
                    correct_text: "b".into(),
                    is_correct: i >= n,
                })
                .collect::<Vec<_>>()
        };

        for (n, expected) in [(0, 1), (2, 2), (3, 3)] {
            let raw = generator.generate_plan("Fractions", &missed(n)).await.unwrap();
            let plan = decode_plan(&raw, "Fractions").unwrap();
            assert_eq!(plan.len(), expected);
            assert_eq!(plan.steps[0], "Understanding Fractions Basics");
        }
    }
}
