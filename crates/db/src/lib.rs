pub mod error;
mod memory;
mod postgres;

use core::future::Future;

pub use memory::Memory;
pub use model::{
    Answer, Draft, Participant, ParticipantId, Progress, Question, QuestionId, QuizId, QuizInfo, RawQuestion,
    Receipt, Standing,
};
pub use postgres::{Config, Database, NoTls};

/// Durable record of quizzes, participants, and answers.
///
/// Implementations must apply [`start`](Store::start), [`advance`](Store::advance), and
/// [`reset`](Store::reset) atomically per quiz, and [`record`](Store::record) atomically per
/// (participant, question) pair. Nothing else needs mutual exclusion.
pub trait Store: Send + Sync {
    /// Creates a quiz along with its questions, which keep the given order.
    fn create_quiz(&self, draft: &Draft) -> impl Future<Output = error::Result<QuizId>> + Send;

    fn get_quizzes(&self) -> impl Future<Output = error::Result<Vec<QuizInfo>>> + Send;

    /// Snapshot of the progression pointer of a quiz.
    fn get_progress(&self, quiz: QuizId) -> impl Future<Output = error::Result<Progress>> + Send;

    /// Looks up a question by its presentation order rather than its identity.
    fn get_question_at(
        &self,
        quiz: QuizId,
        index: u16,
    ) -> impl Future<Output = error::Result<Option<Question>>> + Send;

    /// Puts the first question live at `now` if the quiz has never started.
    fn start(&self, quiz: QuizId, now: u64) -> impl Future<Output = error::Result<Progress>> + Send;

    /// Moves an active quiz to its next question (or to the finished state) without ever skipping one.
    fn advance(&self, quiz: QuizId) -> impl Future<Output = error::Result<Progress>> + Send;

    fn reset(&self, quiz: QuizId) -> impl Future<Output = error::Result<Progress>> + Send;

    fn register(
        &self,
        quiz: QuizId,
        name: &str,
        surname: Option<&str>,
        now: u64,
    ) -> impl Future<Output = error::Result<ParticipantId>> + Send;

    fn get_participant(&self, participant: ParticipantId) -> impl Future<Output = error::Result<Participant>> + Send;

    /// Persists the answer unless one already exists for the same (participant, question) pair.
    fn record(&self, answer: &Answer) -> impl Future<Output = error::Result<Receipt>> + Send;

    /// Answer counts of every participant in the quiz, in registration order.
    fn get_standings(&self, quiz: QuizId) -> impl Future<Output = error::Result<Vec<Standing>>> + Send;
}
