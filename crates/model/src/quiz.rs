use alloc::{string::String, vec::Vec};
use core::num::NonZeroU64;
use serde::{Deserialize, Deserializer, Serialize};

pub type QuizId = NonZeroU64;
pub type QuestionId = NonZeroU64;
pub type ParticipantId = NonZeroU64;

/// Most choices a single question may offer.
pub const MAX_CHOICES: usize = 25;

/// Acceptable schema for new questions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawQuestion {
    /// Question to be displayed to the participants.
    pub text: String,
    /// Possible answers to select from.
    pub choices: Vec<String>,
    /// Index of the selection with the correct answer.
    pub answer: u16,
}

impl RawQuestion {
    /// Whether participants can be shown this question: it has text, at least two choices, and
    /// the correct answer is one of them.
    pub fn is_valid(&self) -> bool {
        let count = self.choices.len();
        !self.text.trim().is_empty() && (2..=MAX_CHOICES).contains(&count) && usize::from(self.answer) < count
    }
}

/// A stored question along with its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: QuestionId,
    #[serde(flatten)]
    pub raw: RawQuestion,
}

/// Everything needed to create a quiz in one go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    /// Seconds allotted to every question of the quiz.
    pub duration: u32,
    /// Questions in presentation order.
    pub questions: Vec<RawQuestion>,
}

/// Summary row for the operator's listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizInfo {
    pub id: QuizId,
    pub title: String,
    pub questions: u16,
    #[serde(flatten)]
    pub progress: crate::progress::Progress,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Registration {
    pub quiz: QuizId,
    pub name: String,
    #[serde(default)]
    pub surname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub quiz: QuizId,
    pub name: String,
    pub surname: Option<String>,
    /// Epoch seconds of the registration.
    pub joined_at: u64,
}

/// A participant's selection for some question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Submission {
    #[serde(rename = "participant_id")]
    pub participant: ParticipantId,
    #[serde(rename = "question_id")]
    pub question: QuestionId,
    /// An absent choice means the participant ran out of time. Negative values such as `-1` mean
    /// the same thing.
    #[serde(default, deserialize_with = "deserialize_choice")]
    pub answer: Option<u16>,
}

fn deserialize_choice<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u16>, D::Error> {
    use serde::de::{Error, Unexpected};
    let Some(choice) = Option::<i64>::deserialize(deserializer)? else {
        return Ok(None);
    };

    if choice < 0 {
        return Ok(None);
    }

    u16::try_from(choice)
        .map(Some)
        .map_err(|_| D::Error::invalid_value(Unexpected::Signed(choice), &"a choice index"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
    pub participant: ParticipantId,
    pub question: QuestionId,
    pub choice: Option<u16>,
    pub answered_at: u64,
}

/// Outcome of recording an answer. Neither variant is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Receipt {
    Accepted,
    AlreadyAnswered,
}
