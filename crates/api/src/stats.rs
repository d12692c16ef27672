use crate::error::{Error, Result};
use db::{QuizId, Standing, Store};

/// Read-only reporting over the answer ledger.
pub struct Stats<'a, S> {
    pub(crate) store: &'a S,
}

impl<S: Store> Stats<'_, S> {
    /// Answer counts per participant, highest first, ties in registration order.
    pub async fn standings(&self, quiz: QuizId) -> Result<Vec<Standing>> {
        let mut standings =
            self.store.get_standings(quiz).await.map_err(|err| Error::from_store(err, Error::UnknownQuiz))?;
        model::stats::rank(&mut standings);
        Ok(standings)
    }
}
