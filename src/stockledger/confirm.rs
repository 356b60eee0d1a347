//! Confirmation protocol for destructive operations.
//!
//! The caller is shown today's date (`YYYY-MM-DD`) and a random word from a
//! fixed list, and must type both back. A correct answer yields a [`Verified`]
//! token; the destructive API calls take that token, so they cannot run on an
//! unverified path.

use crate::commands::helpers::format_date;
use crate::error::{LedgerError, Result};
use chrono::NaiveDate;
use rand::seq::SliceRandom;

pub const VERIFICATION_WORDS: [&str; 10] = [
    "CONFIRMAR",
    "ELIMINAR",
    "PELIGRO",
    "ADVERTENCIA",
    "BORRAR",
    "DESTRUIR",
    "LIMPIAR",
    "FINALIZAR",
    "TERMINAR",
    "ACABAR",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    date: String,
    word: &'static str,
}

/// Proof that a [`Challenge`] was answered correctly.
#[derive(Debug)]
pub struct Verified {
    _private: (),
}

impl Challenge {
    pub fn issue(today: NaiveDate) -> Self {
        let word = VERIFICATION_WORDS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(VERIFICATION_WORDS[0]);
        Self::with_word(today, word)
    }

    pub fn with_word(today: NaiveDate, word: &'static str) -> Self {
        Self {
            date: format_date(today),
            word,
        }
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn word(&self) -> &str {
        self.word
    }

    /// The date must match exactly; the word is compared uppercased.
    pub fn verify(&self, date_input: &str, word_input: &str) -> Result<Verified> {
        if date_input.trim() == self.date && word_input.trim().to_uppercase() == self.word {
            Ok(Verified { _private: () })
        } else {
            Err(LedgerError::VerificationMismatch)
        }
    }
}

#[cfg(test)]
impl Verified {
    pub(crate) fn for_tests() -> Self {
        Verified { _private: () }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn issued_word_comes_from_the_list() {
        for _ in 0..20 {
            let challenge = Challenge::issue(today());
            assert!(VERIFICATION_WORDS.contains(&challenge.word()));
            assert_eq!(challenge.date(), "2024-03-10");
        }
    }

    #[test]
    fn correct_answer_passes_case_insensitively() {
        let challenge = Challenge::with_word(today(), "BORRAR");
        assert!(challenge.verify("2024-03-10", "borrar").is_ok());
        assert!(challenge.verify(" 2024-03-10 ", "Borrar\n").is_ok());
    }

    #[test]
    fn wrong_date_or_word_is_a_mismatch() {
        let challenge = Challenge::with_word(today(), "BORRAR");
        assert!(matches!(
            challenge.verify("2024-03-09", "BORRAR"),
            Err(LedgerError::VerificationMismatch)
        ));
        assert!(matches!(
            challenge.verify("10-03-2024", "BORRAR"),
            Err(LedgerError::VerificationMismatch)
        ));
        assert!(matches!(
            challenge.verify("2024-03-10", "LIMPIAR"),
            Err(LedgerError::VerificationMismatch)
        ));
    }
}
