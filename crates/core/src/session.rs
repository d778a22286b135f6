//! Tutoring Session State
//!
//! This module holds the mutable record of one student's progress through a
//! tutoring conversation: the diagnostic test, the lesson plan, and the quiz
//! attached to each lesson step. Only the conversation driver writes to it;
//! every mutator is crate-private and keeps the cursor invariants in lockstep.

use crate::question::{AnsweredQuestion, LessonPlan, Question, QuizResult};
use crate::score::{Tally, tally};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// The phase of the conversation a session is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Welcome,
    Testing,
    Planning,
    Learning,
    Quiz,
    Complete,
}

impl Stage {
    /// Whether the driver must wait for a student message in this stage.
    /// Planning and Learning run automatically as soon as they are reached.
    pub fn awaits_input(self) -> bool {
        !matches!(self, Stage::Planning | Stage::Learning)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Welcome => "WELCOME",
            Stage::Testing => "TESTING",
            Stage::Planning => "PLANNING",
            Stage::Learning => "LEARNING",
            Stage::Quiz => "QUIZ",
            Stage::Complete => "COMPLETE",
        };
        f.write_str(name)
    }
}

/// One student's tutoring conversation.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Unique key of the session in the session store.
    pub id: Uuid,
    /// The subject being taught (e.g., "Fractions").
    pub topic: String,
    stage: Stage,
    /// Diagnostic questions, fixed once the test starts.
    test_questions: Vec<Question>,
    /// Index of the next unanswered test question; always `test_results.len()`.
    test_cursor: usize,
    test_results: Vec<AnsweredQuestion>,
    lesson_plan: Option<LessonPlan>,
    /// Index of the current lesson step in `lesson_plan.steps`.
    lesson_cursor: usize,
    /// The explanation last shown, kept because its quiz was generated from it.
    current_explanation: Option<String>,
    current_quiz: Option<Question>,
    quiz_results: Vec<QuizResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: Uuid, topic: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            topic: topic.into(),
            stage: Stage::Welcome,
            test_questions: Vec::new(),
            test_cursor: 0,
            test_results: Vec::new(),
            lesson_plan: None,
            lesson_cursor: 0,
            current_explanation: None,
            current_quiz: None,
            quiz_results: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn test_questions(&self) -> &[Question] {
        &self.test_questions
    }

    pub fn test_cursor(&self) -> usize {
        self.test_cursor
    }

    pub fn test_results(&self) -> &[AnsweredQuestion] {
        &self.test_results
    }

    pub fn lesson_plan(&self) -> Option<&LessonPlan> {
        self.lesson_plan.as_ref()
    }

    pub fn lesson_cursor(&self) -> usize {
        self.lesson_cursor
    }

    pub fn current_explanation(&self) -> Option<&str> {
        self.current_explanation.as_deref()
    }

    pub fn current_quiz(&self) -> Option<&Question> {
        self.current_quiz.as_ref()
    }

    pub fn quiz_results(&self) -> &[QuizResult] {
        &self.quiz_results
    }

    pub fn test_score(&self) -> Tally {
        tally(&self.test_results)
    }

    pub fn quiz_score(&self) -> Tally {
        tally(&self.quiz_results)
    }

    /// The test question awaiting an answer, if any remain.
    pub fn pending_test_question(&self) -> Option<&Question> {
        self.test_questions.get(self.test_cursor)
    }

    /// Title of the lesson step under the cursor.
    pub fn current_lesson_title(&self) -> Option<&str> {
        self.lesson_plan
            .as_ref()?
            .steps
            .get(self.lesson_cursor)
            .map(String::as_str)
    }

    /// Whether every step of the plan has been quizzed.
    pub fn lessons_finished(&self) -> bool {
        self.lesson_plan
            .as_ref()
            .is_none_or(|plan| self.lesson_cursor >= plan.steps.len())
    }

    // --- Mutators (driver only) ---

    pub(crate) fn set_stage(&mut self, stage: Stage) {
        if matches!(stage, Stage::Learning | Stage::Quiz) {
            assert!(
                !self.lessons_finished(),
                "lesson cursor {} is past the plan while entering {stage}",
                self.lesson_cursor
            );
        }
        self.stage = stage;
        self.touch();
    }

    pub(crate) fn begin_test(&mut self, questions: Vec<Question>) {
        self.test_questions = questions;
        self.test_cursor = 0;
        self.test_results.clear();
        self.touch();
    }

    /// Appends an answer and advances the test cursor by exactly one.
    pub(crate) fn record_test_answer(&mut self, answer: AnsweredQuestion) {
        assert_eq!(
            self.test_cursor,
            self.test_results.len(),
            "test cursor drifted from recorded answers"
        );
        assert!(
            self.test_cursor < self.test_questions.len(),
            "answer recorded past the last test question"
        );
        self.test_results.push(answer);
        self.test_cursor += 1;
        self.touch();
    }

    pub(crate) fn install_plan(&mut self, plan: LessonPlan) {
        self.lesson_plan = Some(plan);
        self.lesson_cursor = 0;
        self.quiz_results.clear();
        self.current_explanation = None;
        self.current_quiz = None;
        self.touch();
    }

    pub(crate) fn set_lesson_material(&mut self, explanation: String, quiz: Question) {
        self.current_explanation = Some(explanation);
        self.current_quiz = Some(quiz);
        self.touch();
    }

    /// Appends a quiz result and moves to the next lesson step.
    pub(crate) fn record_quiz_result(&mut self, result: QuizResult) {
        assert_eq!(
            self.lesson_cursor,
            self.quiz_results.len(),
            "lesson cursor drifted from recorded quiz results"
        );
        self.quiz_results.push(result);
        self.lesson_cursor += 1;
        self.current_quiz = None;
        self.touch();
    }

    /// Clears all progress and returns to the welcome stage on `topic`.
    pub(crate) fn restart(&mut self, topic: impl Into<String>) {
        let created_at = self.created_at;
        *self = Session::new(self.id, topic);
        self.created_at = created_at;
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question::new("2+2?", vec!["3".into(), "4".into(), "5".into()], 1).unwrap()
    }

    fn answered(ok: bool) -> AnsweredQuestion {
        AnsweredQuestion {
            question_text: "2+2?".into(),
            selected_text: if ok { "4" } else { "3" }.into(),
            correct_text: "4".into(),
            is_correct: ok,
        }
    }

    #[test]
    fn test_new_session_starts_at_welcome() {
        let session = Session::new(Uuid::new_v4(), "Fractions");
        assert_eq!(session.stage(), Stage::Welcome);
        assert_eq!(session.test_cursor(), 0);
        assert!(session.lesson_plan().is_none());
        assert!(session.lessons_finished());
    }

    #[test]
    fn test_record_test_answer_keeps_cursor_in_lockstep() {
        let mut session = Session::new(Uuid::new_v4(), "Fractions");
        session.begin_test(vec![question(), question()]);
        session.record_test_answer(answered(false));
        assert_eq!(session.test_cursor(), session.test_results().len());
        session.record_test_answer(answered(true));
        assert_eq!(session.test_cursor(), 2);
        assert!(session.pending_test_question().is_none());
        assert_eq!(session.test_score(), Tally { correct: 1, total: 2 });
    }

    #[test]
    #[should_panic(expected = "past the last test question")]
    fn test_recording_beyond_the_test_is_fatal() {
        let mut session = Session::new(Uuid::new_v4(), "Fractions");
        session.begin_test(vec![question()]);
        session.record_test_answer(answered(true));
        session.record_test_answer(answered(true));
    }

    #[test]
    #[should_panic(expected = "past the plan")]
    fn test_entering_learning_without_steps_is_fatal() {
        let mut session = Session::new(Uuid::new_v4(), "Fractions");
        session.install_plan(LessonPlan::new("Fractions", vec![]));
        session.set_stage(Stage::Learning);
    }

    #[test]
    fn test_restart_clears_progress() {
        let mut session = Session::new(Uuid::new_v4(), "Fractions");
        session.begin_test(vec![question()]);
        session.record_test_answer(answered(true));
        session.install_plan(LessonPlan::new("Fractions", vec!["Adding Fractions".into()]));
        session.set_stage(Stage::Learning);

        session.restart("Division");
        assert_eq!(session.topic, "Division");
        assert_eq!(session.stage(), Stage::Welcome);
        assert!(session.test_results().is_empty());
        assert!(session.lesson_plan().is_none());
    }

    #[test]
    fn test_stage_serializes_in_upper_case() {
        assert_eq!(serde_json::to_string(&Stage::Quiz).unwrap(), "\"QUIZ\"");
        assert_eq!(Stage::Complete.to_string(), "COMPLETE");
        assert!(!Stage::Planning.awaits_input());
        assert!(Stage::Testing.awaits_input());
    }
}
