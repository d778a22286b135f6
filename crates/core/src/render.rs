//! Student-facing message text.

use crate::answer::option_letter;
use crate::question::{LessonPlan, Question};
use crate::score::Tally;

pub fn welcome(topic: &str) -> String {
    format!(
        "Hi there! I can help with {topic}! 🎓 To find out what you already know, \
         can we start with a super quick 3-question warm-up? It's not for a grade, \
         just to help me build the perfect lesson for you! Say 'ok' when you're ready."
    )
}

pub fn not_ready() -> String {
    "No problem! When you're ready to start learning, just say 'ok'! 😊".to_string()
}

pub fn options(question: &Question) -> String {
    question
        .options()
        .iter()
        .enumerate()
        .map(|(i, option)| format!("{}) {option}", option_letter(i)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// "A, B, or C" for a question with three options.
fn letter_choices(question: &Question) -> String {
    let letters: Vec<String> = (0..question.options().len())
        .map(|i| option_letter(i).to_string())
        .collect();
    match letters.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{}, or {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::new(),
    }
}

pub fn test_question(number: usize, question: &Question) -> String {
    format!(
        "**Question {number}:**\n{}\n\n{}",
        question.text(),
        options(question)
    )
}

pub fn quiz_question(question: &Question) -> String {
    format!(
        "**Quick Check! 🎯**\n{}\n\n{}",
        question.text(),
        options(question)
    )
}

/// Asks for a letter again and repeats the pending question verbatim.
pub fn reprompt(question_text: &str, question: &Question) -> String {
    format!(
        "Please answer with {}! 😊\n\n{question_text}",
        letter_choices(question)
    )
}

pub fn test_feedback(is_correct: bool) -> &'static str {
    if is_correct { "Great job! ✨" } else { "Good try! 💪" }
}

pub fn quiz_feedback(is_correct: bool, correct_text: &str) -> String {
    if is_correct {
        "Excellent! You got it! 🎉".to_string()
    } else {
        format!("Good try! The answer was: {correct_text}. Let's keep learning! 💪")
    }
}

pub fn plan_intro(score: Tally, plan: &LessonPlan) -> String {
    let mut text = format!(
        "Great job on the warm-up! You got {} out of {} right. 🎉",
        score.correct, score.total
    );
    if plan.is_empty() {
        text.push_str("\n\nYou already know everything I was going to teach. Amazing!");
    } else {
        text.push_str("\n\nHere's your personalized lesson plan:\n");
        for (i, step) in plan.steps.iter().enumerate() {
            text.push_str(&format!("{}. {step}\n", i + 1));
        }
    }
    text
}

pub fn lesson(number: usize, title: &str, explanation: &str, quiz: &Question) -> String {
    format!(
        "📚 **Lesson {number}: {title}**\n\n{explanation}\n\n---\n\n{}",
        quiz_question(quiz)
    )
}

pub fn summary(topic: &str, test: Tally, quiz: Tally) -> String {
    format!(
        "🎉 **Congratulations!** 🎉\n\n\
         You've completed your {topic} learning journey!\n\n\
         📊 **Your Progress:**\n\
         - Warm-up Score: {test}\n\
         - Quiz Score: {quiz}\n\n\
         Would you like to learn another topic? Name one, or say 'restart' to go again! 😊"
    )
}

/// Explanation shown when neither the generator nor the bank has one.
pub fn generic_explanation(title: &str) -> String {
    format!(
        "Let's learn about {title}! We'll take it one small step at a time. \
         Read the question below carefully and pick the answer that makes the most sense to you."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question() -> Question {
        Question::new("What is 5 × 6?", vec!["25".into(), "30".into(), "35".into()], 1).unwrap()
    }

    #[test]
    fn test_options_are_lettered() {
        assert_eq!(options(&question()), "A) 25\nB) 30\nC) 35");
    }

    #[test]
    fn test_reprompt_repeats_question() {
        let q = question();
        let asked = test_question(2, &q);
        let again = reprompt(&asked, &q);
        assert!(again.starts_with("Please answer with A, B, or C!"));
        assert!(again.ends_with(&asked));
    }

    #[test]
    fn test_summary_contains_both_tallies() {
        let text = summary(
            "Division",
            Tally { correct: 2, total: 3 },
            Tally { correct: 0, total: 0 },
        );
        assert!(text.contains("Warm-up Score: 2/3"));
        assert!(text.contains("Quiz Score: 0/0"));
    }
}
