use async_trait::async_trait;

use crate::models::account::AccountMatch;

/// Lookup of accounts by email. Implementations must return every match, never just the first,
/// and must leave soft-deleted rows out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_accounts(
        &self,
        email: &str,
        scope: Option<i64>,
    ) -> Result<Vec<AccountMatch>, sqlx::Error>;
}
