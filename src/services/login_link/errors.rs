use thiserror::Error;

use crate::services::{account_resolver::AccountResolutionError, smtp_mailer::MailError};

/// Broad class of a failure, used by callers to decide how to respond and whether to log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    Configuration,
    Storage,
}

#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    Account(#[from] AccountResolutionError),
    #[error(
        "no sender address configured: set the request from-address, LOGIN_LINK_FROM_ADDRESS or MAIL_DEFAULT_FROM_ADDRESS"
    )]
    MissingSenderAddress,
    #[error("configured sender address is not a valid mailbox: {0}")]
    InvalidSenderAddress(String),
    #[error("mail transport failure: {0}")]
    MailTransport(#[source] MailError),
    #[error("token storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl IssueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IssueError::Account(err) if err.is_validation() => ErrorKind::Validation,
            IssueError::Account(_) | IssueError::Storage(_) => ErrorKind::Storage,
            IssueError::MissingSenderAddress | IssueError::InvalidSenderAddress(_) => {
                ErrorKind::Configuration
            }
            IssueError::MailTransport(_) => ErrorKind::Transport,
        }
    }

    pub fn code(&self) -> Option<u32> {
        match self {
            IssueError::Account(err) => err.code(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error("This login link is invalid.")]
    TokenNotFound,
    #[error("This login link has expired. Please request a new one.")]
    TokenExpired,
    #[error("This login link has already been used. Please request a new one.")]
    TokenAlreadyUsed,
    #[error("This login link is not valid here.")]
    AuthContextMismatch,
    #[error("token storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl RedeemError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RedeemError::Storage(_) => ErrorKind::Storage,
            _ => ErrorKind::Validation,
        }
    }

    pub fn code(&self) -> Option<u32> {
        match self {
            RedeemError::TokenNotFound => Some(1704878350),
            RedeemError::TokenExpired => Some(1704878351),
            RedeemError::TokenAlreadyUsed => Some(1704878352),
            RedeemError::AuthContextMismatch => Some(1704878353),
            RedeemError::Storage(_) => None,
        }
    }
}
