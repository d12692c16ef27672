#![no_std]
extern crate alloc;

pub mod author;
pub mod progress;
pub mod quiz;
pub mod stats;

pub use progress::{Progress, State, View};
pub use quiz::{
    Answer, Draft, Participant, ParticipantId, Question, QuestionId, QuizId, QuizInfo, RawQuestion, Receipt,
    Registration, Submission,
};
pub use stats::Standing;
