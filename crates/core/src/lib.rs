pub mod answer;
pub mod bank;
pub mod driver;
pub mod generator;
pub mod llm_client;
pub mod parser;
pub mod question;
pub mod render;
pub mod score;
pub mod session;

pub use bank::QuestionBank;
pub use driver::{SessionStore, Turn, Tutor, TutorSettings};
pub use generator::{CannedContentGenerator, ContentGenerator, LLMContentGenerator};
pub use session::{Session, Stage};
