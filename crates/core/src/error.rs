use thiserror::Error;

use crate::model::{AnswerError, ContentError, CredentialsError};
use crate::navigator::NavigationError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
}
