use crate::{
    clock::Clock,
    error::{Error, Result},
};
use db::{Answer, ParticipantId, QuestionId, Receipt, Store};

/// Keeps at most one answer per (participant, question) pair. The live question is not consulted,
/// so the first submission for a pair wins whenever it arrives.
pub struct Ledger<'a, S, C> {
    pub(crate) store: &'a S,
    pub(crate) clock: &'a C,
}

impl<S: Store, C: Clock> Ledger<'_, S, C> {
    pub async fn record(&self, participant: ParticipantId, question: QuestionId, choice: Option<u16>) -> Result<Receipt> {
        let answer = Answer { participant, question, choice, answered_at: self.clock.now() };
        let receipt =
            self.store.record(&answer).await.map_err(|err| Error::from_store(err, Error::UnknownQuestion))?;
        log::debug!("Answer {choice:?} from {participant} to question {question}: {receipt:?}.");
        Ok(receipt)
    }
}
