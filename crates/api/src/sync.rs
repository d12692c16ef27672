use crate::{
    clock::Clock,
    error::{Error, Result},
    App,
};
use db::{ParticipantId, QuizId, QuizInfo, Receipt, Store};
use model::{author::Authoring, Registration, Submission, View};
use serde::Serialize;

/// Reply to a successful authoring request.
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Authored {
    pub id: QuizId,
    /// One-based outline lines that could not be read as questions.
    pub skipped: Vec<usize>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct Registered {
    pub id: ParticipantId,
}

impl<S: Store, C: Clock> App<S, C> {
    pub async fn register(&self, registration: Registration) -> Result<ParticipantId> {
        let Registration { quiz, name, surname } = registration;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput);
        }

        let surname = surname.as_deref().map(str::trim).filter(|surname| !surname.is_empty());
        let id = self
            .store
            .register(quiz, name, surname, self.clock.now())
            .await
            .map_err(|err| Error::from_store(err, Error::UnknownQuiz))?;
        log::info!("Participant {id} joined quiz {quiz}.");
        Ok(id)
    }

    /// Current phase of the participant's quiz.
    pub async fn poll(&self, participant: ParticipantId) -> Result<View> {
        let participant = self
            .store
            .get_participant(participant)
            .await
            .map_err(|err| Error::from_store(err, Error::UnknownParticipant))?;
        self.engine().view(participant.quiz, self.clock.now()).await
    }

    pub async fn submit(&self, submission: Submission) -> Result<Receipt> {
        let Submission { participant, question, answer } = submission;
        self.store.get_participant(participant).await.map_err(|err| Error::from_store(err, Error::UnknownParticipant))?;
        self.ledger().record(participant, question, answer).await
    }

    pub async fn author(&self, authoring: Authoring) -> Result<Authored> {
        let (draft, skipped) = authoring.into_draft();
        if draft.duration == 0 || draft.title.trim().is_empty() {
            return Err(Error::InvalidInput);
        }

        if let Some(position) = draft.questions.iter().position(|question| !question.is_valid()) {
            log::warn!("Rejected quiz {:?} because question {position} is malformed.", draft.title);
            return Err(Error::InvalidInput);
        }

        let id = self.store.create_quiz(&draft).await.map_err(|err| Error::from_store(err, Error::Fatal))?;
        if !skipped.is_empty() {
            log::warn!("Skipped malformed lines {skipped:?} while authoring quiz {id}.");
        }
        log::info!("Quiz {id} authored with {} questions.", draft.questions.len());
        Ok(Authored { id, skipped })
    }

    pub async fn quizzes(&self) -> Result<Vec<QuizInfo>> {
        self.store.get_quizzes().await.map_err(|err| Error::from_store(err, Error::Fatal))
    }
}
