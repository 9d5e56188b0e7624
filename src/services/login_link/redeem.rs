use time::OffsetDateTime;
use tracing::{debug, error, info};

use super::{LoginLinkService, RedeemError};
use crate::db::token_repository::ConsumeOutcome;
use crate::models::login_token::AuthContext;

impl LoginLinkService {
    pub async fn redeem(&self, token: &str, context: AuthContext) -> Result<i64, RedeemError> {
        self.redeem_at(token, context, OffsetDateTime::now_utc())
            .await
    }

    /// Consumes `token` as of `now` and returns the account it was issued for.
    pub async fn redeem_at(
        &self,
        token: &str,
        context: AuthContext,
        now: OffsetDateTime,
    ) -> Result<i64, RedeemError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RedeemError::TokenNotFound);
        }

        let outcome = match self.tokens.consume_token(token, context, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(auth_context = %context, "failed to consume login token: {:?}", err);
                return Err(err.into());
            }
        };

        let err = match outcome {
            ConsumeOutcome::Consumed { account_id } => {
                info!(account_id, auth_context = %context, "login token redeemed");
                return Ok(account_id);
            }
            ConsumeOutcome::NotFound => RedeemError::TokenNotFound,
            ConsumeOutcome::Expired => RedeemError::TokenExpired,
            ConsumeOutcome::AlreadyUsed => RedeemError::TokenAlreadyUsed,
            ConsumeOutcome::ContextMismatch if self.settings.expose_context_mismatch => {
                RedeemError::AuthContextMismatch
            }
            ConsumeOutcome::ContextMismatch => RedeemError::TokenNotFound,
        };

        debug!(auth_context = %context, outcome = ?outcome, "login token rejected");
        Err(err)
    }
}
