use async_trait::async_trait;
use time::OffsetDateTime;

use crate::models::login_token::{AuthContext, LoginToken, NewLoginToken, TokenStatus};

/// Result of an atomic consume attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    Consumed { account_id: i64 },
    NotFound,
    ContextMismatch,
    Expired,
    AlreadyUsed,
}

impl ConsumeOutcome {
    /// Explains why a row that exists was not updated by the conditional write.
    pub fn classify_rejection(
        token: &LoginToken,
        context: AuthContext,
        now: OffsetDateTime,
    ) -> Self {
        if !token.belongs_to(context) {
            return ConsumeOutcome::ContextMismatch;
        }
        match token.status(now) {
            TokenStatus::Expired => ConsumeOutcome::Expired,
            TokenStatus::Redeemed => ConsumeOutcome::AlreadyUsed,
            // a concurrent consumer held the row and rolled back
            TokenStatus::Valid => ConsumeOutcome::AlreadyUsed,
        }
    }
}

#[async_trait]
pub trait TokenRepository: Send + Sync {
    async fn insert_token(&self, token: &NewLoginToken) -> Result<(), sqlx::Error>;
    async fn find_token(&self, token: &str) -> Result<Option<LoginToken>, sqlx::Error>;
    /// Sets `used_at = now` iff the token exists in `context`, is unused and `now <= valid_until`.
    /// Check and mark happen in a single storage operation.
    async fn consume_token(
        &self,
        token: &str,
        context: AuthContext,
        now: OffsetDateTime,
    ) -> Result<ConsumeOutcome, sqlx::Error>;
}
