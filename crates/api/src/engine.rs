use crate::{
    clock::Clock,
    error::{Error, Result},
};
use db::{Progress, QuizId, Store};
use model::{State, View};

/// Drives and observes the progression of quizzes. Transitions only happen on operator
/// commands; phases and countdowns are derived on every read.
pub struct Engine<'a, S, C> {
    pub(crate) store: &'a S,
    pub(crate) clock: &'a C,
}

impl<S: Store, C: Clock> Engine<'_, S, C> {
    pub async fn start(&self, quiz: QuizId) -> Result<Progress> {
        let now = self.clock.now();
        let progress = self.store.start(quiz, now).await.map_err(|err| Error::from_store(err, Error::UnknownQuiz))?;
        log::info!("Quiz {quiz} is {:?} since {}.", progress.state(), progress.started_at);
        Ok(progress)
    }

    pub async fn advance(&self, quiz: QuizId) -> Result<Progress> {
        let progress = self.store.advance(quiz).await.map_err(|err| Error::from_store(err, Error::UnknownQuiz))?;
        log::info!("Quiz {quiz} advanced to {:?}.", progress.state());
        Ok(progress)
    }

    pub async fn reset(&self, quiz: QuizId) -> Result<Progress> {
        let progress = self.store.reset(quiz).await.map_err(|err| Error::from_store(err, Error::UnknownQuiz))?;
        log::info!("Quiz {quiz} reset.");
        Ok(progress)
    }

    /// What every poller of the quiz should see at the instant `now`.
    pub async fn view(&self, quiz: QuizId, now: u64) -> Result<View> {
        let missing = |err| Error::from_store(err, Error::UnknownQuiz);
        let progress = self.store.get_progress(quiz).await.map_err(missing)?;
        let question = match progress.state() {
            State::Active(index) => self.store.get_question_at(quiz, index).await.map_err(missing)?,
            State::Idle | State::Finished => None,
        };
        Ok(progress.view(now, question))
    }
}
