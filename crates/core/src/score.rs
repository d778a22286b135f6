//! Score Aggregator

use crate::question::{AnsweredQuestion, QuizResult};
use serde::Serialize;
use std::fmt;

/// Anything that was either answered correctly or not.
pub trait Scored {
    fn is_correct(&self) -> bool;
}

impl Scored for AnsweredQuestion {
    fn is_correct(&self) -> bool {
        self.is_correct
    }
}

impl Scored for QuizResult {
    fn is_correct(&self) -> bool {
        self.is_correct
    }
}

impl Scored for bool {
    fn is_correct(&self) -> bool {
        *self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.correct, self.total)
    }
}

/// Counts correct results. An empty sequence tallies to `0/0`.
pub fn tally<'a, T, I>(results: I) -> Tally
where
    T: Scored + 'a,
    I: IntoIterator<Item = &'a T>,
{
    results.into_iter().fold(Tally::default(), |acc, r| Tally {
        correct: acc.correct + usize::from(r.is_correct()),
        total: acc.total + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_tally_empty() {
        let none: Vec<QuizResult> = Vec::new();
        assert_eq!(tally(&none), Tally { correct: 0, total: 0 });
        assert_eq!(tally(&none).to_string(), "0/0");
    }

    #[test]
    fn test_tally_answered_questions() {
        let answered = |ok| AnsweredQuestion {
            question_text: "q".into(),
            selected_text: "a".into(),
            correct_text: "b".into(),
            is_correct: ok,
        };
        let results = vec![answered(true), answered(false), answered(true)];
        assert_eq!(tally(&results), Tally { correct: 2, total: 3 });
    }

    proptest! {
        #[test]
        fn prop_tally_is_order_independent(mut results in proptest::collection::vec(any::<bool>(), 0..20), seed in any::<u64>()) {
            let before = tally(&results);
            let len = results.len();
            if len > 1 {
                results.rotate_left((seed as usize) % len);
                results.reverse();
            }
            prop_assert_eq!(tally(&results), before);
            prop_assert_eq!(before.total, len);
        }
    }
}
