//! Conversation Driver
//!
//! The driver owns every tutoring session and is the only component that
//! changes a session's stage. Each incoming message is dispatched on the
//! session's current [`Stage`]; the handler may ask the content generator for
//! material, normalizes it through the [`parser`](crate::parser), updates the
//! session and reports whether the conversation can keep going on its own.
//! Stages that need no student input (planning, learning) are chained within
//! the same turn until a stage that waits for the student is reached.

use crate::answer::resolve;
use crate::bank::QuestionBank;
use crate::generator::ContentGenerator;
use crate::parser::{parse_plan, parse_quiz, parse_test};
use crate::question::{AnsweredQuestion, Question, QuizResult};
use crate::render;
use crate::session::{Session, Stage};
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const AFFIRMATIVE: [&str; 9] = [
    "yes", "yeah", "yep", "ok", "okay", "sure", "start", "ready", "go",
];
const NEGATIVE: [&str; 4] = ["no", "not", "later", "wait"];
const RESTART: [&str; 3] = ["restart", "again", "start over"];

/// Longest run of automatic transitions a single turn can produce
/// (quiz answer -> learning -> quiz, or test answer -> planning -> learning -> quiz).
const MAX_CHAINED_STEPS: usize = 8;

/// Tunables for the conversation driver.
#[derive(Debug, Clone)]
pub struct TutorSettings {
    /// Topic for sessions created without one.
    pub default_topic: String,
    /// Budget for each content generator call; expiry counts as a failure.
    pub generator_timeout: Duration,
    /// Explanations longer than this are cut before being shown and quizzed.
    pub max_explanation_chars: usize,
}

impl Default for TutorSettings {
    fn default() -> Self {
        Self {
            default_topic: "Fractions".to_string(),
            generator_timeout: Duration::from_secs(30),
            max_explanation_chars: 1500,
        }
    }
}

/// In-memory sessions keyed by id.
///
/// Each session sits behind its own lock so turns for one student are
/// strictly sequential while different students proceed in parallel.
#[derive(Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) -> Arc<Mutex<Session>> {
        let handle = Arc::new(Mutex::new(session.clone()));
        self.sessions.lock().await.insert(session.id, handle.clone());
        handle
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<Session>>> {
        self.sessions.lock().await.get(&id).cloned()
    }

    /// Returns the session for `id`, creating a fresh one on `topic` if absent.
    pub async fn get_or_create(&self, id: Uuid, topic: &str) -> Arc<Mutex<Session>> {
        self.sessions
            .lock()
            .await
            .entry(id)
            .or_insert_with(|| {
                info!(session_id = %id, %topic, "Creating session on first message");
                Arc::new(Mutex::new(Session::new(id, topic)))
            })
            .clone()
    }

    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.lock().await.remove(&id).is_some()
    }
}

/// The reply to one student message and the stage the session was left in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub reply: String,
    pub stage: Stage,
}

/// Whether a handler's result needs the student before anything else happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    AwaitInput,
    Continue,
}

/// True when `text` contains an agreeing word and no refusing one.
pub fn is_affirmative(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .collect();
    words.iter().any(|w| AFFIRMATIVE.contains(w)) && !words.iter().any(|w| NEGATIVE.contains(w))
}

/// The tutoring conversation driver.
pub struct Tutor {
    generator: Arc<dyn ContentGenerator>,
    bank: Arc<QuestionBank>,
    sessions: SessionStore,
    settings: TutorSettings,
}

impl Tutor {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        bank: Arc<QuestionBank>,
        settings: TutorSettings,
    ) -> Self {
        Self {
            generator,
            bank,
            sessions: SessionStore::new(),
            settings,
        }
    }

    pub fn topics(&self) -> Vec<String> {
        self.bank.topics()
    }

    /// Canonical bank name for `requested` if there is one, else the trimmed
    /// text itself, else the default topic.
    fn choose_topic(&self, requested: Option<&str>) -> String {
        match requested.map(str::trim).filter(|t| !t.is_empty()) {
            Some(topic) => self
                .bank
                .resolve_topic(topic)
                .unwrap_or_else(|| topic.to_string()),
            None => self.settings.default_topic.clone(),
        }
    }

    /// Starts a new session at the welcome stage and returns its id and greeting.
    pub async fn create_session(&self, topic: Option<&str>) -> (Uuid, String) {
        let topic = self.choose_topic(topic);
        let session = Session::new(Uuid::new_v4(), &topic);
        let id = session.id;
        self.sessions.insert(session).await;
        info!(session_id = %id, %topic, "Session created");
        (id, render::welcome(&topic))
    }

    /// Handles one student message and returns the reply.
    ///
    /// An unknown `session_id` gets a new session on the default topic. The
    /// session stays locked for the whole turn, including chained automatic
    /// transitions.
    pub async fn handle_turn(&self, session_id: Uuid, user_text: &str) -> String {
        self.respond(session_id, user_text).await.reply
    }

    /// Like [`Tutor::handle_turn`], also reporting the stage reached. The
    /// stage is read under the same lock as the turn itself.
    #[instrument(skip(self, user_text))]
    pub async fn respond(&self, session_id: Uuid, user_text: &str) -> Turn {
        let handle = self
            .sessions
            .get_or_create(session_id, &self.settings.default_topic)
            .await;
        let mut session = handle.lock().await;
        let reply = self.advance(&mut session, user_text).await;
        Turn {
            reply,
            stage: session.stage(),
        }
    }

    /// A copy of the session for read-only display.
    pub async fn snapshot(&self, session_id: Uuid) -> Option<Session> {
        let handle = self.sessions.get(session_id).await?;
        let session = handle.lock().await;
        Some(session.clone())
    }

    /// Returns the session to the welcome stage on its current topic.
    pub async fn reset(&self, session_id: Uuid) -> Option<String> {
        let handle = self.sessions.get(session_id).await?;
        let mut session = handle.lock().await;
        let topic = session.topic.clone();
        session.restart(&topic);
        info!(%session_id, %topic, "Session reset");
        Some(render::welcome(&topic))
    }

    pub async fn remove(&self, session_id: Uuid) -> bool {
        self.sessions.remove(session_id).await
    }

    /// Runs handlers from the current stage until one waits for input.
    async fn advance(&self, session: &mut Session, user_text: &str) -> String {
        let mut input = Some(user_text);
        let mut replies = Vec::new();

        for _ in 0..MAX_CHAINED_STEPS {
            let before = session.stage();
            let (reply, flow) = match before {
                Stage::Welcome => self.on_welcome(session, input.take().unwrap_or_default()).await,
                Stage::Testing => self.on_testing(session, input.take().unwrap_or_default()),
                Stage::Planning => self.on_planning(session).await,
                Stage::Learning => self.on_learning(session).await,
                Stage::Quiz => self.on_quiz(session, input.take().unwrap_or_default()),
                Stage::Complete => self.on_complete(session, input.take()),
            };
            if session.stage() != before {
                info!(session_id = %session.id, from = %before, to = %session.stage(), "Stage transition");
            }
            replies.push(reply);
            if flow == Flow::AwaitInput {
                debug_assert!(session.stage().awaits_input());
                return replies.join("\n\n");
            }
        }
        panic!(
            "session {} did not reach an input stage within {MAX_CHAINED_STEPS} transitions",
            session.id
        );
    }

    /// Awaits one generator call under the configured timeout. Failures and
    /// timeouts yield an empty string, which the parser turns into a fallback.
    async fn request(&self, record: &'static str, call: impl Future<Output = Result<String>>) -> String {
        match tokio::time::timeout(self.settings.generator_timeout, call).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(record, error = %format!("{e:#}"), "Content generator failed");
                String::new()
            }
            Err(_) => {
                warn!(
                    record,
                    timeout_ms = self.settings.generator_timeout.as_millis() as u64,
                    "Content generator timed out"
                );
                String::new()
            }
        }
    }

    async fn on_welcome(&self, session: &mut Session, input: &str) -> (String, Flow) {
        if !is_affirmative(input) {
            return (render::not_ready(), Flow::AwaitInput);
        }
        let topic = session.topic.clone();
        let raw = self
            .request("test", self.generator.generate_test(&topic))
            .await;
        let (questions, generated) = parse_test(&raw, &topic, &self.bank);
        debug!(%topic, generated, count = questions.len(), "Diagnostic test ready");

        session.begin_test(questions);
        session.set_stage(Stage::Testing);
        let first = match session.pending_test_question() {
            Some(question) => render::test_question(1, question),
            None => panic!("diagnostic test started without questions"),
        };
        (
            format!("Great! Let's start with a quick warm-up! 🎯\n\n{first}"),
            Flow::AwaitInput,
        )
    }

    fn on_testing(&self, session: &mut Session, input: &str) -> (String, Flow) {
        let number = session.test_cursor() + 1;
        let question = match session.pending_test_question() {
            Some(question) => question.clone(),
            None => panic!("TESTING stage with no pending question"),
        };

        let outcome = match resolve(input, &question) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(session_id = %session.id, reason = %e, "Re-prompting test question");
                let asked = render::test_question(number, &question);
                return (render::reprompt(&asked, &question), Flow::AwaitInput);
            }
        };

        session.record_test_answer(AnsweredQuestion {
            question_text: question.text().to_string(),
            selected_text: outcome.selected_text,
            correct_text: outcome.correct_text,
            is_correct: outcome.is_correct,
        });
        let feedback = render::test_feedback(outcome.is_correct);

        match session.pending_test_question() {
            Some(next) => (
                format!("{feedback}\n\n{}", render::test_question(number + 1, next)),
                Flow::AwaitInput,
            ),
            None => {
                session.set_stage(Stage::Planning);
                (feedback.to_string(), Flow::Continue)
            }
        }
    }

    async fn on_planning(&self, session: &mut Session) -> (String, Flow) {
        let topic = session.topic.clone();
        let score = session.test_score();
        let raw = self
            .request(
                "plan",
                self.generator.generate_plan(&topic, session.test_results()),
            )
            .await;
        let plan = parse_plan(&raw, &topic);
        info!(%topic, score = %score, steps = plan.len(), "Lesson plan ready");

        let reply = render::plan_intro(score, &plan);
        let empty = plan.is_empty();
        session.install_plan(plan);
        session.set_stage(if empty { Stage::Complete } else { Stage::Learning });
        (reply, Flow::Continue)
    }

    /// Trims and bounds an explanation; `None` when there is nothing to show.
    fn clean_explanation(&self, raw: &str) -> Option<String> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        let limit = self.settings.max_explanation_chars;
        if text.chars().count() <= limit {
            return Some(text.to_string());
        }
        let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
        cut.push('…');
        Some(cut)
    }

    async fn quiz_for(&self, explanation: &str) -> Question {
        let raw = self
            .request("quiz", self.generator.generate_quiz(explanation))
            .await;
        parse_quiz(&raw)
    }

    async fn on_learning(&self, session: &mut Session) -> (String, Flow) {
        let title = match session.current_lesson_title() {
            Some(title) => title.to_string(),
            None => panic!("LEARNING stage with lesson cursor outside the plan"),
        };
        let number = session.lesson_cursor() + 1;

        let raw = self
            .request("explanation", self.generator.generate_explanation(&title))
            .await;
        let (explanation, quiz) = match self.clean_explanation(&raw) {
            Some(explanation) => {
                let quiz = self.quiz_for(&explanation).await;
                (explanation, quiz)
            }
            None => match self.bank.lesson(&session.topic, &title) {
                Some(lesson) => {
                    warn!(record = "explanation", lesson = %title, fallback = "bank", "Explanation missing");
                    (lesson.content.clone(), lesson.quiz.clone())
                }
                None => {
                    warn!(record = "explanation", lesson = %title, fallback = "generic", "Explanation missing");
                    let explanation = render::generic_explanation(&title);
                    let quiz = self.quiz_for(&explanation).await;
                    (explanation, quiz)
                }
            },
        };

        let reply = render::lesson(number, &title, &explanation, &quiz);
        session.set_lesson_material(explanation, quiz);
        session.set_stage(Stage::Quiz);
        (reply, Flow::AwaitInput)
    }

    fn on_quiz(&self, session: &mut Session, input: &str) -> (String, Flow) {
        let (quiz, title) = match (session.current_quiz(), session.current_lesson_title()) {
            (Some(quiz), Some(title)) => (quiz.clone(), title.to_string()),
            _ => panic!("QUIZ stage without a quiz for the current lesson"),
        };

        let outcome = match resolve(input, &quiz) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!(session_id = %session.id, reason = %e, "Re-prompting quiz question");
                let asked = render::quiz_question(&quiz);
                return (render::reprompt(&asked, &quiz), Flow::AwaitInput);
            }
        };

        let feedback = render::quiz_feedback(outcome.is_correct, &outcome.correct_text);
        session.record_quiz_result(QuizResult {
            lesson_title: title,
            selected_text: outcome.selected_text,
            correct_text: outcome.correct_text,
            is_correct: outcome.is_correct,
        });
        session.set_stage(if session.lessons_finished() {
            Stage::Complete
        } else {
            Stage::Learning
        });
        (feedback, Flow::Continue)
    }

    /// Renders the final tallies, or starts over when the student names a
    /// topic or asks to restart.
    fn on_complete(&self, session: &mut Session, input: Option<&str>) -> (String, Flow) {
        let restart_topic = input.and_then(|text| {
            let wanted = text.trim().to_lowercase();
            if RESTART.contains(&wanted.as_str()) {
                Some(session.topic.clone())
            } else {
                self.bank.resolve_topic(&wanted)
            }
        });
        if let Some(topic) = restart_topic {
            session.restart(&topic);
            return (render::welcome(&topic), Flow::AwaitInput);
        }
        (
            render::summary(&session.topic, session.test_score(), session.quiz_score()),
            Flow::AwaitInput,
        )
    }
}
