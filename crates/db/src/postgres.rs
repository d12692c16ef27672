use crate::{
    error::{Error, Result},
    Answer, Draft, Participant, ParticipantId, Progress, Question, QuizId, QuizInfo, RawQuestion, Receipt, Standing,
    Store,
};
use core::num::NonZeroU64;
use futures_util::TryStreamExt;
use tokio_postgres::{types::Json, Row};

pub use tokio_postgres::{tls::NoTls, Client, Config};

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS quiz (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    title TEXT NOT NULL,
    current SMALLINT CHECK (current >= 0),
    started_at BIGINT NOT NULL DEFAULT 0,
    duration INTEGER NOT NULL CHECK (duration > 0)
);
CREATE TABLE IF NOT EXISTS question (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    quiz BIGINT NOT NULL REFERENCES quiz (id),
    position SMALLINT NOT NULL,
    text TEXT NOT NULL,
    choices TEXT[] NOT NULL,
    answer SMALLINT NOT NULL,
    UNIQUE (quiz, position)
);
CREATE TABLE IF NOT EXISTS participant (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    quiz BIGINT NOT NULL REFERENCES quiz (id),
    name TEXT NOT NULL,
    surname TEXT,
    joined_at BIGINT NOT NULL
);
CREATE TABLE IF NOT EXISTS answer (
    participant BIGINT NOT NULL REFERENCES participant (id),
    question BIGINT NOT NULL REFERENCES question (id),
    choice INTEGER,
    answered_at BIGINT NOT NULL,
    PRIMARY KEY (participant, question)
);";

/// PostgreSQL-backed store. Per-quiz atomicity comes from single-statement conditional updates,
/// and pair uniqueness comes from the primary key of the `answer` table.
pub struct Database(Client);

impl From<Client> for Database {
    fn from(client: Client) -> Self {
        Self(client)
    }
}

fn to_id(id: i64) -> Result<NonZeroU64> {
    u64::try_from(id).ok().and_then(NonZeroU64::new).ok_or(Error::Fatal)
}

fn to_timestamp(time: u64) -> Result<i64> {
    i64::try_from(time).map_err(|_| Error::BadInput)
}

fn deserialize_progress_from_row(row: &Row) -> Result<Progress> {
    let current: Option<i16> = row.try_get("current")?;
    let started_at: i64 = row.try_get("started_at")?;
    let duration: i32 = row.try_get("duration")?;
    Ok(Progress {
        current: current.map(u16::try_from).transpose().map_err(|_| Error::Fatal)?,
        started_at: u64::try_from(started_at).map_err(|_| Error::Fatal)?,
        duration: u32::try_from(duration).map_err(|_| Error::Fatal)?,
    })
}

fn deserialize_question_from_row(row: &Row) -> Result<Question> {
    let id = to_id(row.try_get("id")?)?;
    let text = row.try_get("text")?;
    let choices = row.try_get("choices")?;
    let answer: i16 = row.try_get("answer")?;
    let answer = u16::try_from(answer).map_err(|_| Error::Fatal)?;
    Ok(Question { id, raw: RawQuestion { text, choices, answer } })
}

fn deserialize_standing_from_row(row: Row) -> Result<Standing> {
    let participant = to_id(row.try_get("id")?)?;
    let name = row.try_get("name")?;
    let surname = row.try_get("surname")?;
    let answers: i64 = row.try_get("answers")?;
    let answers = u64::try_from(answers).map_err(|_| Error::Fatal)?;
    Ok(Standing { participant, name, surname, answers })
}

impl Database {
    /// Creates the tables if they do not exist yet.
    pub async fn init(&self) -> Result<()> {
        self.0.batch_execute(SCHEMA).await?;
        Ok(())
    }
}

impl Store for Database {
    async fn create_quiz(&self, draft: &Draft) -> Result<QuizId> {
        let duration = i32::try_from(draft.duration).map_err(|_| Error::BadInput)?;
        if draft.questions.iter().any(|question| i16::try_from(question.answer).is_err()) {
            return Err(Error::BadInput);
        }

        // Both inserts run as one statement, so a quiz never exists with only some of its questions.
        let questions = Json(&draft.questions);
        let row = self
            .0
            .query_one(
                "WITH new_quiz AS (INSERT INTO quiz (title, duration) VALUES ($1, $2) RETURNING id), \
                 new_questions AS ( \
                     INSERT INTO question (quiz, position, text, choices, answer) \
                     SELECT new_quiz.id, item.position - 1, item.value ->> 'text', \
                         ARRAY(SELECT choice.value FROM jsonb_array_elements_text(item.value -> 'choices') \
                             WITH ORDINALITY AS choice(value, position) ORDER BY choice.position), \
                         (item.value ->> 'answer')::SMALLINT \
                     FROM new_quiz, jsonb_array_elements($3::JSONB) WITH ORDINALITY AS item(value, position) \
                 ) \
                 SELECT id FROM new_quiz",
                &[&draft.title, &duration, &questions],
            )
            .await?;
        to_id(row.try_get("id")?)
    }

    async fn get_quizzes(&self) -> Result<Vec<QuizInfo>> {
        let rows = self
            .0
            .query(
                "SELECT quiz.id, quiz.title, quiz.current, quiz.started_at, quiz.duration, COUNT(question.id) AS questions \
                 FROM quiz LEFT JOIN question ON question.quiz = quiz.id \
                 GROUP BY quiz.id ORDER BY quiz.id",
                &[],
            )
            .await?;
        rows.iter()
            .map(|row| -> Result<QuizInfo> {
                let questions: i64 = row.try_get("questions")?;
                Ok(QuizInfo {
                    id: to_id(row.try_get("id")?)?,
                    title: row.try_get("title")?,
                    questions: u16::try_from(questions).map_err(|_| Error::Fatal)?,
                    progress: deserialize_progress_from_row(row)?,
                })
            })
            .collect()
    }

    async fn get_progress(&self, quiz: QuizId) -> Result<Progress> {
        let qid = quiz.get() as i64;
        let row = self
            .0
            .query_opt("SELECT current, started_at, duration FROM quiz WHERE id = $1", &[&qid])
            .await?
            .ok_or(Error::NotFound)?;
        deserialize_progress_from_row(&row)
    }

    async fn get_question_at(&self, quiz: QuizId, index: u16) -> Result<Option<Question>> {
        let qid = quiz.get() as i64;
        let Ok(position) = i16::try_from(index) else {
            return Ok(None);
        };
        self.0
            .query_opt(
                "SELECT id, text, choices, answer FROM question WHERE quiz = $1 AND position = $2",
                &[&qid, &position],
            )
            .await?
            .as_ref()
            .map(deserialize_question_from_row)
            .transpose()
    }

    async fn start(&self, quiz: QuizId, now: u64) -> Result<Progress> {
        let qid = quiz.get() as i64;
        let now = to_timestamp(now)?;
        let row = self
            .0
            .query_opt(
                "UPDATE quiz SET current = 0, started_at = GREATEST($2, 1) \
                 WHERE id = $1 AND started_at = 0 \
                 RETURNING current, started_at, duration",
                &[&qid, &now],
            )
            .await?;
        match row {
            Some(row) => deserialize_progress_from_row(&row),
            None => self.get_progress(quiz).await,
        }
    }

    async fn advance(&self, quiz: QuizId) -> Result<Progress> {
        let qid = quiz.get() as i64;
        let row = self
            .0
            .query_opt(
                "UPDATE quiz SET current = CASE \
                     WHEN current + 1 < (SELECT COUNT(*) FROM question WHERE question.quiz = quiz.id) THEN current + 1 \
                 END \
                 WHERE id = $1 AND current IS NOT NULL AND started_at <> 0 \
                 RETURNING current, started_at, duration",
                &[&qid],
            )
            .await?;
        match row {
            Some(row) => deserialize_progress_from_row(&row),
            None => self.get_progress(quiz).await,
        }
    }

    async fn reset(&self, quiz: QuizId) -> Result<Progress> {
        let qid = quiz.get() as i64;
        let row = self
            .0
            .query_opt(
                "UPDATE quiz SET current = NULL, started_at = 0 WHERE id = $1 RETURNING current, started_at, duration",
                &[&qid],
            )
            .await?
            .ok_or(Error::NotFound)?;
        deserialize_progress_from_row(&row)
    }

    async fn register(&self, quiz: QuizId, name: &str, surname: Option<&str>, now: u64) -> Result<ParticipantId> {
        let qid = quiz.get() as i64;
        let now = to_timestamp(now)?;
        let row = self
            .0
            .query_one(
                "INSERT INTO participant (quiz, name, surname, joined_at) VALUES ($1, $2, $3, $4) RETURNING id",
                &[&qid, &name, &surname, &now],
            )
            .await?;
        to_id(row.try_get("id")?)
    }

    async fn get_participant(&self, participant: ParticipantId) -> Result<Participant> {
        let pid = participant.get() as i64;
        let row = self
            .0
            .query_opt("SELECT quiz, name, surname, joined_at FROM participant WHERE id = $1", &[&pid])
            .await?
            .ok_or(Error::NotFound)?;
        let joined_at: i64 = row.try_get("joined_at")?;
        Ok(Participant {
            id: participant,
            quiz: to_id(row.try_get("quiz")?)?,
            name: row.try_get("name")?,
            surname: row.try_get("surname")?,
            joined_at: u64::try_from(joined_at).map_err(|_| Error::Fatal)?,
        })
    }

    async fn record(&self, answer: &Answer) -> Result<Receipt> {
        let pid = answer.participant.get() as i64;
        let qid = answer.question.get() as i64;
        let choice = answer.choice.map(i32::from);
        let now = to_timestamp(answer.answered_at)?;
        let inserted = self
            .0
            .execute(
                "INSERT INTO answer (participant, question, choice, answered_at) VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (participant, question) DO NOTHING",
                &[&pid, &qid, &choice, &now],
            )
            .await?;
        match inserted {
            0 => Ok(Receipt::AlreadyAnswered),
            1 => Ok(Receipt::Accepted),
            _ => Err(Error::Fatal),
        }
    }

    async fn get_standings(&self, quiz: QuizId) -> Result<Vec<Standing>> {
        // Distinguishes an unknown quiz from a quiz without participants.
        self.get_progress(quiz).await?;
        let qid = quiz.get() as i64;
        self.0
            .query_raw(
                "SELECT participant.id, participant.name, participant.surname, COUNT(answer.question) AS answers \
                 FROM participant LEFT JOIN answer ON answer.participant = participant.id \
                 WHERE participant.quiz = $1 GROUP BY participant.id ORDER BY participant.id",
                &[&qid],
            )
            .await?
            .map_err(Error::from)
            .and_then(|row| core::future::ready(deserialize_standing_from_row(row)))
            .try_collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, Database, Draft, NoTls, RawQuestion, Receipt, Store};
    use crate::Answer;
    use model::{State, View};

    #[tokio::test(flavor = "current_thread")]
    #[ignore = "requires a running PostgreSQL server"]
    async fn database_test() {
        use std::env::var;
        let user = var("PG_USERNAME").unwrap();
        let pass = var("PG_PASSWORD").unwrap();
        let host = var("PG_HOSTNAME").unwrap();
        let data = var("PG_DATABASE").unwrap();

        let (client, conn) = Config::new()
            .user(&user)
            .password(&pass)
            .host(&host)
            .dbname(&data)
            .port(5432)
            .connect(NoTls)
            .await
            .expect("cannot connect to database");
        let handle = tokio::spawn(conn);
        let db = Database::from(client);
        db.init().await.unwrap();

        // Quiz creation
        let draft = Draft {
            title: String::from("Planets"),
            duration: 15,
            questions: vec![
                RawQuestion {
                    text: String::from("Largest planet?"),
                    choices: vec![String::from("Mars"), String::from("Jupiter"), String::from("Venus")],
                    answer: 1,
                },
                RawQuestion {
                    text: String::from("Closest to the sun?"),
                    choices: vec![String::from("Mercury"), String::from("Earth")],
                    answer: 0,
                },
            ],
        };
        let quiz = db.create_quiz(&draft).await.unwrap();
        let first = db.get_question_at(quiz, 0).await.unwrap().unwrap();
        assert_eq!(first.raw, draft.questions[0]);
        assert!(db.get_question_at(quiz, 2).await.unwrap().is_none());

        // Progression
        assert_eq!(db.advance(quiz).await.unwrap().state(), State::Idle);
        let progress = db.start(quiz, 1000).await.unwrap();
        assert_eq!(progress.state(), State::Active(0));
        assert!(matches!(progress.view(1000, Some(first.clone())), View::Question { time_left: 15, .. }));
        assert_eq!(db.start(quiz, 5000).await.unwrap().started_at, 1000);
        assert_eq!(db.advance(quiz).await.unwrap().state(), State::Active(1));
        assert_eq!(db.advance(quiz).await.unwrap().state(), State::Finished);
        assert_eq!(db.advance(quiz).await.unwrap().state(), State::Finished);

        // Answers
        let pid = db.register(quiz, "Ann", None, 1001).await.unwrap();
        let answer = Answer { participant: pid, question: first.id, choice: Some(1), answered_at: 1002 };
        assert_eq!(db.record(&answer).await.unwrap(), Receipt::Accepted);
        assert_eq!(db.record(&answer).await.unwrap(), Receipt::AlreadyAnswered);

        // Choices are not range-checked, and every index fits the column.
        let second = db.get_question_at(quiz, 1).await.unwrap().unwrap();
        let wide = Answer { participant: pid, question: second.id, choice: Some(u16::MAX), answered_at: 1003 };
        assert_eq!(db.record(&wide).await.unwrap(), Receipt::Accepted);

        let standings = db.get_standings(quiz).await.unwrap();
        assert_eq!(standings.len(), 1);
        assert_eq!(standings[0].answers, 2);

        assert_eq!(db.reset(quiz).await.unwrap().state(), State::Idle);

        drop(db);
        handle.await.unwrap().unwrap();
    }
}
