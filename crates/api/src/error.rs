use core::fmt::{self, Display};
use hyper::StatusCode;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    UnknownParticipant,
    UnknownQuiz,
    UnknownQuestion,
    InvalidInput,
    Fatal,
}

impl Error {
    /// Translates a store error, given what a missing record means at the call site.
    pub fn from_store(err: db::error::Error, missing: Self) -> Self {
        use db::error::Error as DbError;
        match err {
            DbError::NotFound => missing,
            DbError::BadInput => Self::InvalidInput,
            DbError::Fatal => Self::Fatal,
        }
    }

    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UnknownParticipant | Self::UnknownQuiz | Self::UnknownQuestion => StatusCode::NOT_FOUND,
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnknownParticipant => "participant not found",
            Self::UnknownQuiz => "quiz not found",
            Self::UnknownQuestion => "question not found",
            Self::InvalidInput => "invalid input",
            Self::Fatal => "Oops! We have encountered an unrecoverable error on our end.",
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
