//! Answer Resolver: maps a single-letter reply onto a question's options.

use crate::question::Question;

/// The resolved answer to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub selected_index: usize,
    pub selected_text: String,
    pub correct_text: String,
    pub is_correct: bool,
}

/// The reply was not a single option letter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{input}' is not one of the option letters")]
pub struct UnrecognizedAnswer {
    pub input: String,
}

/// Letter label for the option at `index` (`0 -> 'A'`).
pub fn option_letter(index: usize) -> char {
    u8::try_from(index)
        .ok()
        .and_then(|i| b'A'.checked_add(i))
        .map_or('?', char::from)
}

/// Resolves `reply` (e.g. `"b"`, `" C "`) against `question`.
///
/// Only a lone ASCII letter within the question's option range is accepted.
pub fn resolve(reply: &str, question: &Question) -> Result<AnswerOutcome, UnrecognizedAnswer> {
    let options = question.options();
    assert!(!options.is_empty(), "question reached the resolver without options");

    let unrecognized = || UnrecognizedAnswer {
        input: reply.to_string(),
    };
    let mut chars = reply.trim().chars();
    let letter = match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
        _ => return Err(unrecognized()),
    };
    let index = usize::from(letter as u8 - b'A');
    let selected_text = options.get(index).ok_or_else(unrecognized)?.clone();

    Ok(AnswerOutcome {
        selected_index: index,
        selected_text,
        correct_text: question.correct_text().to_string(),
        is_correct: index == question.correct_index(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn question(correct: i64) -> Question {
        Question::new(
            "Which fraction is larger: 2/3 or 2/5?",
            vec!["2/3".into(), "2/5".into(), "They are the same".into()],
            correct,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let q = question(1);
        let outcome = resolve("c", &q).unwrap();
        assert_eq!(outcome.selected_index, 2);
        assert_eq!(outcome.selected_text, "They are the same");
        assert_eq!(outcome.correct_text, "2/5");
        assert!(!outcome.is_correct);

        assert!(resolve(" B ", &q).unwrap().is_correct);
    }

    #[test]
    fn test_resolve_rejects_everything_else() {
        let q = question(0);
        for reply in ["", "  ", "D", "z", "ab", "A)", "the first one", "1", "é"] {
            assert_eq!(
                resolve(reply, &q),
                Err(UnrecognizedAnswer {
                    input: reply.to_string()
                }),
                "{reply:?} should not resolve"
            );
        }
    }

    #[test]
    fn test_option_letter() {
        assert_eq!(option_letter(0), 'A');
        assert_eq!(option_letter(2), 'C');
        assert_eq!(option_letter(300), '?');
    }

    proptest! {
        #[test]
        fn prop_correct_iff_letter_matches_index(correct in 0i64..3, pick in 0usize..3, lower in any::<bool>()) {
            let q = question(correct);
            let letter = option_letter(pick);
            let reply = if lower { letter.to_ascii_lowercase() } else { letter }.to_string();
            let outcome = resolve(&reply, &q).unwrap();
            prop_assert_eq!(outcome.selected_index, pick);
            prop_assert_eq!(outcome.is_correct, pick as i64 == correct);
        }
    }
}
