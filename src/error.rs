use std::io;
use std::result;

use serenity::prelude::SerenityError;
use thiserror::Error as ThisError;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq, ThisError)]
pub enum Error {
    #[error("{0}")]
    SerenityError(String),
    #[error("{0}")]
    Giveaway(String),
    #[error("The giveaway `{0}` was not found or has already ended.")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("Can't persist the giveaways state: {0}")]
    Persistence(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<SerenityError> for Error {
    fn from(err: SerenityError) -> Error {
        let description = err.to_string();
        Error::SerenityError(description)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::Persistence(err.to_string())
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Error {
        Error::Persistence(err.error.to_string())
    }
}
