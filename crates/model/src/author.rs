//! Authoring of new quizzes.
//!
//! Questions arrive either as a structured list or as a free-text outline. Each line of an outline describes one question as `Question||A||B||C||1`, where the middle
//! parts are the choices and the final part is the zero-based index of the correct choice.
//! Malformed lines never fail the whole outline. They are skipped and reported back instead.

use crate::quiz::{Draft, RawQuestion};
use alloc::{
    string::{String, ToString},
    vec::Vec,
};
use serde::Deserialize;

const SEPARATOR: &str = "||";

fn default_title() -> String {
    String::from("Quiz 1")
}

const fn default_duration() -> u32 {
    15
}

/// Acceptable schema for new quizzes.
#[derive(Debug, Deserialize)]
pub struct Authoring {
    #[serde(default = "default_title")]
    pub title: String,
    /// Seconds allotted to each question.
    #[serde(default = "default_duration")]
    pub duration: u32,
    pub questions: Questions,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Questions {
    List(Vec<RawQuestion>),
    /// Free-text outline, one question per line.
    Outline(String),
}

impl Authoring {
    /// Splits the submission into the quiz to create and the outline lines that were skipped.
    pub fn into_draft(self) -> (Draft, Vec<usize>) {
        let Self { title, duration, questions } = self;
        let (questions, skipped) = match questions {
            Questions::List(questions) => (questions, Vec::new()),
            Questions::Outline(text) => {
                let Outline { questions, skipped } = parse(&text);
                (questions, skipped)
            }
        };
        (Draft { title, duration, questions }, skipped)
    }
}

/// Result of reading an outline.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Outline {
    pub questions: Vec<RawQuestion>,
    /// One-based line numbers of the non-blank lines that were skipped.
    pub skipped: Vec<usize>,
}

/// Parses a single outline line. Returns [`None`] unless the non-empty parts make up a
/// [valid](RawQuestion::is_valid) question.
pub fn parse_line(line: &str) -> Option<RawQuestion> {
    let parts: Vec<_> = line.split(SEPARATOR).map(str::trim).filter(|part| !part.is_empty()).collect();
    let [text, choices @ .., answer] = parts.as_slice() else {
        return None;
    };

    let question = RawQuestion {
        text: text.to_string(),
        choices: choices.iter().map(ToString::to_string).collect(),
        // An unreadable index falls back to the first choice.
        answer: answer.parse().unwrap_or(0),
    };
    Some(question).filter(RawQuestion::is_valid)
}

pub fn parse(outline: &str) -> Outline {
    let mut result = Outline::default();
    for (number, line) in (1..).zip(outline.lines()) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Some(question) => result.questions.push(question),
            None => result.skipped.push(number),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn reads_question_choices_and_answer() {
        let question = parse_line("2+2=?||3||4||5||1").unwrap();
        assert_eq!(question.text, "2+2=?");
        assert_eq!(question.choices, ["3", "4", "5"]);
        assert_eq!(question.answer, 1);
    }

    #[test]
    fn trims_and_drops_empty_parts() {
        let question = parse_line("  Capital of France? || Paris ||  || Lyon || 0 ").unwrap();
        assert_eq!(question.text, "Capital of France?");
        assert_eq!(question.choices, ["Paris", "Lyon"]);
        assert_eq!(question.answer, 0);
    }

    #[test]
    fn unreadable_answer_defaults_to_zero() {
        let question = parse_line("Pick one||A||B||second").unwrap();
        assert_eq!(question.choices, ["A", "B"]);
        assert_eq!(question.answer, 0);
    }

    #[test]
    fn rejects_short_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("Lonely question?").is_none());
        assert!(parse_line("Question?||2").is_none());
        assert!(parse_line("Question?||||2").is_none());
        assert!(parse_line("Question?||Only||0").is_none());
    }

    #[test]
    fn rejects_answers_outside_the_choices() {
        assert!(parse_line("Pick||A||B||2").is_none());
        assert!(parse_line("Pick||A||B||1").is_some());
    }

    #[test]
    fn skips_malformed_lines_and_reports_them() {
        let Outline { questions, skipped } = parse("A?||1||2||0\n\nbroken line\nB?||x||y||z||2\n  \nC?||0\n");
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text, "A?");
        assert_eq!(questions[1].text, "B?");
        assert_eq!(questions[1].answer, 2);
        assert_eq!(skipped, vec![3, 6]);
    }

    #[test]
    fn accepts_outline_or_list() {
        let outline: Authoring =
            serde_json::from_str(r#"{ "questions": "2+2=?||3||4||5||1\noops" }"#).unwrap();
        let (draft, skipped) = outline.into_draft();
        assert_eq!(draft.title, "Quiz 1");
        assert_eq!(draft.duration, 15);
        assert_eq!(draft.questions.len(), 1);
        assert_eq!(skipped, vec![2]);

        let list: Authoring = serde_json::from_str(
            r#"{ "title": "Colors", "duration": 30, "questions": [{ "text": "Sky?", "choices": ["Blue", "Red"], "answer": 0 }] }"#,
        )
        .unwrap();
        let (draft, skipped) = list.into_draft();
        assert_eq!(draft.title, "Colors");
        assert_eq!(draft.duration, 30);
        assert_eq!(draft.questions[0].choices, ["Blue", "Red"]);
        assert!(skipped.is_empty());
    }
}
