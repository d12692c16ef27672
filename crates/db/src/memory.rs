use crate::{
    error::{Error, Result},
    Answer, Draft, Participant, ParticipantId, Progress, Question, QuestionId, QuizId, QuizInfo, Receipt, Standing,
    Store,
};
use core::{
    num::NonZeroU64,
    sync::atomic::{AtomicU64, Ordering},
};
use dashmap::{mapref::entry::Entry, DashMap};
use std::collections::HashMap;

struct QuizRow {
    title: Box<str>,
    progress: Progress,
    /// Presentation order is the slice order.
    questions: Box<[Question]>,
}

/// Process-local store. Every map is sharded, so a write only ever locks the shard of the quiz or
/// the (participant, question) pair that it touches.
#[derive(Default)]
pub struct Memory {
    quizzes: DashMap<QuizId, QuizRow>,
    /// Owner of each question, for existence checks.
    questions: DashMap<QuestionId, QuizId>,
    participants: DashMap<ParticipantId, Participant>,
    answers: DashMap<(ParticipantId, QuestionId), Answer>,
    /// Shared by all entities so that identifiers follow insertion order.
    sequence: AtomicU64,
}

impl Memory {
    fn next_id(&self) -> NonZeroU64 {
        NonZeroU64::MIN.saturating_add(self.sequence.fetch_add(1, Ordering::Relaxed))
    }

    fn update<F>(&self, quiz: QuizId, op: F) -> Result<Progress>
    where
        F: FnOnce(&mut Progress, u16),
    {
        let mut row = self.quizzes.get_mut(&quiz).ok_or(Error::NotFound)?;
        let QuizRow { progress, questions, .. } = &mut *row;
        let total = u16::try_from(questions.len()).map_err(|_| Error::Fatal)?;
        op(progress, total);
        Ok(*progress)
    }
}

impl Store for Memory {
    async fn create_quiz(&self, draft: &Draft) -> Result<QuizId> {
        if u16::try_from(draft.questions.len()).is_err() {
            return Err(Error::BadInput);
        }

        let id = self.next_id();
        let questions: Box<[_]> = draft
            .questions
            .iter()
            .map(|raw| Question { id: self.next_id(), raw: raw.clone() })
            .collect();
        for question in questions.iter() {
            self.questions.insert(question.id, id);
        }

        let row = QuizRow { title: draft.title.as_str().into(), progress: Progress::new(draft.duration), questions };
        self.quizzes.insert(id, row);
        Ok(id)
    }

    async fn get_quizzes(&self) -> Result<Vec<QuizInfo>> {
        let mut quizzes = self
            .quizzes
            .iter()
            .map(|entry| -> Result<QuizInfo> {
                let QuizRow { title, progress, questions } = entry.value();
                let questions = u16::try_from(questions.len()).map_err(|_| Error::Fatal)?;
                Ok(QuizInfo { id: *entry.key(), title: title.clone().into_string(), questions, progress: *progress })
            })
            .collect::<Result<Vec<_>>>()?;
        quizzes.sort_unstable_by_key(|info| info.id);
        Ok(quizzes)
    }

    async fn get_progress(&self, quiz: QuizId) -> Result<Progress> {
        self.quizzes.get(&quiz).map(|row| row.progress).ok_or(Error::NotFound)
    }

    async fn get_question_at(&self, quiz: QuizId, index: u16) -> Result<Option<Question>> {
        let row = self.quizzes.get(&quiz).ok_or(Error::NotFound)?;
        Ok(row.questions.get(usize::from(index)).cloned())
    }

    async fn start(&self, quiz: QuizId, now: u64) -> Result<Progress> {
        self.update(quiz, |progress, _| {
            progress.start(now);
        })
    }

    async fn advance(&self, quiz: QuizId) -> Result<Progress> {
        self.update(quiz, |progress, total| {
            progress.advance(total);
        })
    }

    async fn reset(&self, quiz: QuizId) -> Result<Progress> {
        self.update(quiz, |progress, _| progress.reset())
    }

    async fn register(&self, quiz: QuizId, name: &str, surname: Option<&str>, now: u64) -> Result<ParticipantId> {
        if !self.quizzes.contains_key(&quiz) {
            return Err(Error::NotFound);
        }

        let id = self.next_id();
        let participant =
            Participant { id, quiz, name: name.into(), surname: surname.map(Into::into), joined_at: now };
        self.participants.insert(id, participant);
        Ok(id)
    }

    async fn get_participant(&self, participant: ParticipantId) -> Result<Participant> {
        self.participants.get(&participant).map(|entry| entry.value().clone()).ok_or(Error::NotFound)
    }

    async fn record(&self, answer: &Answer) -> Result<Receipt> {
        if !self.participants.contains_key(&answer.participant) || !self.questions.contains_key(&answer.question) {
            return Err(Error::NotFound);
        }

        // The entry guard holds the shard lock, so no two callers can both observe a vacancy.
        Ok(match self.answers.entry((answer.participant, answer.question)) {
            Entry::Vacant(entry) => {
                entry.insert(*answer);
                Receipt::Accepted
            }
            Entry::Occupied(_) => Receipt::AlreadyAnswered,
        })
    }

    async fn get_standings(&self, quiz: QuizId) -> Result<Vec<Standing>> {
        if !self.quizzes.contains_key(&quiz) {
            return Err(Error::NotFound);
        }

        let mut standings: Vec<_> = self
            .participants
            .iter()
            .filter(|entry| entry.quiz == quiz)
            .map(|entry| Standing {
                participant: entry.id,
                name: entry.name.clone(),
                surname: entry.surname.clone(),
                answers: 0,
            })
            .collect();
        standings.sort_unstable_by_key(|standing| standing.participant);

        let mut counts = HashMap::<ParticipantId, u64>::new();
        for entry in self.answers.iter() {
            *counts.entry(entry.key().0).or_default() += 1;
        }

        for standing in &mut standings {
            standing.answers = counts.get(&standing.participant).copied().unwrap_or_default();
        }

        Ok(standings)
    }
}
