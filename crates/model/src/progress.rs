use crate::quiz::{Question, QuestionId, RawQuestion};
use alloc::{string::String, vec::Vec};
use serde::{Deserialize, Serialize};

/// The mutable part of a quiz. Everything a poller needs to derive the
/// current phase and deadline lives in these three numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Progress {
    /// Zero-based ordinal of the live question, if any.
    pub current: Option<u16>,
    /// Epoch seconds at which the first question went live. Zero if the quiz has never started.
    pub started_at: u64,
    /// Seconds allotted to each question.
    pub duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Active(u16),
    Finished,
}

/// What a participant sees when polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum View {
    Waiting,
    Question { question_id: QuestionId, text: String, choices: Vec<String>, index: u16, time_left: u64 },
    Finished,
}

impl Progress {
    pub const fn new(duration: u32) -> Self {
        Self { current: None, started_at: 0, duration }
    }

    pub const fn state(&self) -> State {
        match (self.current, self.started_at) {
            (_, 0) => State::Idle,
            (None, _) => State::Finished,
            (Some(index), _) => State::Active(index),
        }
    }

    /// Puts the first question live. Only valid from [`State::Idle`]; returns whether anything changed.
    pub fn start(&mut self, now: u64) -> bool {
        if !matches!(self.state(), State::Idle) {
            return false;
        }
        self.current = Some(0);
        // Zero is reserved for "never started".
        self.started_at = now.max(1);
        true
    }

    /// Moves to the next question, or finishes the quiz after the last one. Only valid from
    /// [`State::Active`]; returns whether anything changed.
    pub fn advance(&mut self, total: u16) -> bool {
        let State::Active(index) = self.state() else {
            return false;
        };
        self.current = index.checked_add(1).filter(|&next| next < total);
        true
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.started_at = 0;
    }

    /// Epoch seconds at which the window of the question at `index` closes.
    pub fn deadline(&self, index: u16) -> u64 {
        let windows = u64::from(index) + 1;
        self.started_at.saturating_add(windows.saturating_mul(self.duration.into()))
    }

    /// Seconds until the deadline of the question at `index`, clamped at zero. This exceeds the
    /// duration whenever the operator advanced before the previous window closed.
    pub fn time_left(&self, index: u16, now: u64) -> u64 {
        self.deadline(index).saturating_sub(now)
    }

    /// Derives the view at the instant `now`. The `question` must be the one found at the
    /// `current` position, or [`None`] if no such question was authored.
    pub fn view(&self, now: u64, question: Option<Question>) -> View {
        let index = match self.state() {
            State::Idle => return View::Waiting,
            State::Finished => return View::Finished,
            State::Active(index) => index,
        };

        let Some(Question { id, raw: RawQuestion { text, choices, .. } }) = question else {
            return View::Finished;
        };

        View::Question { question_id: id, text, choices, index, time_left: self.time_left(index, now) }
    }
}
