use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use time::OffsetDateTime;

use super::account_directory::AccountDirectory;
use super::token_repository::{ConsumeOutcome, TokenRepository};
use crate::models::account::{Account, AccountMatch};
use crate::models::login_token::{AuthContext, LoginToken, NewLoginToken};

fn poisoned() -> sqlx::Error {
    sqlx::Error::Protocol("in-memory store lock poisoned".into())
}

/// Token store backed by a map. The map lock is the storage boundary: consume checks and marks
/// while holding it, so concurrent redemptions of one token serialize here.
#[derive(Debug, Default)]
pub struct InMemoryTokenRepository {
    tokens: Mutex<HashMap<String, LoginToken>>,
    pub fail_writes: bool,
}

impl InMemoryTokenRepository {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Vec<LoginToken> {
        match self.tokens.lock() {
            Ok(tokens) => tokens.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn insert_token(&self, token: &NewLoginToken) -> Result<(), sqlx::Error> {
        if self.fail_writes {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        let mut tokens = self.tokens.lock().map_err(|_| poisoned())?;
        if tokens.contains_key(&token.token) {
            return Err(sqlx::Error::Protocol("duplicate token".into()));
        }
        tokens.insert(token.token.clone(), token.clone().into_record());
        Ok(())
    }

    async fn find_token(&self, token: &str) -> Result<Option<LoginToken>, sqlx::Error> {
        let tokens = self.tokens.lock().map_err(|_| poisoned())?;
        Ok(tokens.get(token).cloned())
    }

    async fn consume_token(
        &self,
        token: &str,
        context: AuthContext,
        now: OffsetDateTime,
    ) -> Result<ConsumeOutcome, sqlx::Error> {
        let mut tokens = self.tokens.lock().map_err(|_| poisoned())?;
        let Some(record) = tokens.get_mut(token) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        if record.belongs_to(context) && record.is_redeemable(now) {
            record.used_at = Some(now);
            return Ok(ConsumeOutcome::Consumed {
                account_id: record.account_id,
            });
        }

        Ok(ConsumeOutcome::classify_rejection(record, context, now))
    }
}

/// Directory over a fixed list of accounts, filtered the way the SQL directory filters.
#[derive(Debug, Default)]
pub struct InMemoryAccountDirectory {
    pub accounts: Vec<Account>,
    pub should_fail: bool,
}

impl InMemoryAccountDirectory {
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts,
            should_fail: false,
        }
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn find_accounts(
        &self,
        email: &str,
        scope: Option<i64>,
    ) -> Result<Vec<AccountMatch>, sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(self
            .accounts
            .iter()
            .filter(|a| a.email.to_lowercase() == email.to_lowercase() && !a.deleted)
            .filter(|a| scope.is_none() || a.partition_id == scope)
            .map(Account::as_match)
            .collect())
    }
}
