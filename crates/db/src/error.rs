use core::fmt::{self, Display};
use tokio_postgres::error::SqlState;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// The referenced quiz, question, or participant does not exist.
    NotFound,
    /// The store refused the values we tried to write.
    BadInput,
    /// Unrecoverable error.
    Fatal,
}

impl From<tokio_postgres::Error> for Error {
    fn from(err: tokio_postgres::Error) -> Self {
        let Some(err) = err.as_db_error() else {
            log::error!("database connection failure: {err}");
            return Self::Fatal;
        };

        match *err.code() {
            SqlState::FOREIGN_KEY_VIOLATION => Self::NotFound,
            SqlState::CHECK_VIOLATION | SqlState::NOT_NULL_VIOLATION | SqlState::NUMERIC_VALUE_OUT_OF_RANGE => {
                Self::BadInput
            }
            _ => {
                log::error!("unexpected database error: {err}");
                Self::Fatal
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "Resource not found.",
            Self::BadInput => "Unacceptable input.",
            Self::Fatal => "Unrecoverable store error.",
        })
    }
}

pub type Result<T> = core::result::Result<T, Error>;
