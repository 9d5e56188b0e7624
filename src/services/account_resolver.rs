use std::sync::Arc;

use lettre::Address;
use thiserror::Error;
use tracing::debug;

use crate::db::account_directory::AccountDirectory;

#[derive(Debug, Error)]
pub enum AccountResolutionError {
    #[error("Please enter a valid email address.")]
    InvalidEmailSyntax,
    #[error("No account was found for this email address.")]
    NoAccountFound,
    #[error("More than one account uses this email address. Please contact support.")]
    MultipleAccountsFound,
    #[error("The account for this email address is disabled.")]
    AccountDisabled,
    #[error("account directory error: {0}")]
    Directory(#[from] sqlx::Error),
}

impl AccountResolutionError {
    /// Stable code shown next to the message. Directory faults carry none.
    pub fn code(&self) -> Option<u32> {
        match self {
            AccountResolutionError::InvalidEmailSyntax => Some(1704878340),
            AccountResolutionError::NoAccountFound => Some(1704878341),
            AccountResolutionError::MultipleAccountsFound => Some(1704878342),
            AccountResolutionError::AccountDisabled => Some(1704878343),
            AccountResolutionError::Directory(_) => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        !matches!(self, AccountResolutionError::Directory(_))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && email.parse::<Address>().is_ok()
}

/// Maps an email to exactly one enabled account id.
#[derive(Clone)]
pub struct AccountResolver {
    directory: Arc<dyn AccountDirectory>,
    scope: Option<i64>,
}

impl AccountResolver {
    pub fn new(directory: Arc<dyn AccountDirectory>, scope: Option<i64>) -> Self {
        Self { directory, scope }
    }

    pub async fn resolve(&self, email: &str) -> Result<i64, AccountResolutionError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AccountResolutionError::InvalidEmailSyntax);
        }

        let matches = self.directory.find_accounts(email, self.scope).await?;
        debug!(matches = matches.len(), scope = ?self.scope, "account lookup");

        match matches.as_slice() {
            [] => Err(AccountResolutionError::NoAccountFound),
            [only] if !only.enabled => Err(AccountResolutionError::AccountDisabled),
            [only] => Ok(only.id),
            _ => Err(AccountResolutionError::MultipleAccountsFound),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::account_directory::MockAccountDirectory;
    use crate::db::mock_db::InMemoryAccountDirectory;
    use crate::models::account::{Account, AccountMatch};
    use mockall::predicate::eq;

    fn account(id: i64, email: &str, disabled: bool) -> Account {
        Account {
            id,
            email: email.into(),
            disabled,
            deleted: false,
            partition_id: None,
        }
    }

    fn resolver_over(accounts: Vec<Account>, scope: Option<i64>) -> AccountResolver {
        AccountResolver::new(
            Arc::new(InMemoryAccountDirectory::with_accounts(accounts)),
            scope,
        )
    }

    #[tokio::test]
    async fn sole_enabled_match_resolves() {
        let resolver = resolver_over(vec![account(42, "a@x.com", false)], None);
        assert_eq!(resolver.resolve("a@x.com").await.unwrap(), 42);
        assert_eq!(resolver.resolve("  a@x.com ").await.unwrap(), 42);
    }

    #[tokio::test]
    async fn email_match_ignores_case() {
        let resolver = resolver_over(vec![account(42, "Alice@X.com", false)], None);
        assert_eq!(resolver.resolve("alice@x.COM").await.unwrap(), 42);

        let resolver = resolver_over(
            vec![account(1, "bob@x.com", false), account(2, "BOB@x.com", false)],
            None,
        );
        assert!(matches!(
            resolver.resolve("Bob@x.com").await.unwrap_err(),
            AccountResolutionError::MultipleAccountsFound
        ));
    }

    #[tokio::test]
    async fn invalid_syntax_never_queries_directory() {
        let mut directory = MockAccountDirectory::new();
        directory.expect_find_accounts().times(0);
        let resolver = AccountResolver::new(Arc::new(directory), None);

        for input in ["not-an-email", "", "   ", "a@", "@x.com"] {
            let err = resolver.resolve(input).await.unwrap_err();
            assert!(
                matches!(err, AccountResolutionError::InvalidEmailSyntax),
                "input {input:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn no_match_is_not_found() {
        let resolver = resolver_over(vec![account(1, "other@x.com", false)], None);
        let err = resolver.resolve("a@x.com").await.unwrap_err();
        assert!(matches!(err, AccountResolutionError::NoAccountFound));
        assert_eq!(err.code(), Some(1704878341));
    }

    #[tokio::test]
    async fn multiple_matches_fail_closed_in_any_order() {
        for rows in [
            vec![AccountMatch { id: 1, enabled: true }, AccountMatch { id: 2, enabled: true }],
            vec![AccountMatch { id: 2, enabled: false }, AccountMatch { id: 1, enabled: true }],
            vec![
                AccountMatch { id: 3, enabled: true },
                AccountMatch { id: 1, enabled: true },
                AccountMatch { id: 2, enabled: true },
            ],
        ] {
            let mut directory = MockAccountDirectory::new();
            directory
                .expect_find_accounts()
                .with(eq("a@x.com"), eq(None))
                .times(1)
                .returning(move |_, _| Ok(rows.clone()));
            let resolver = AccountResolver::new(Arc::new(directory), None);

            let err = resolver.resolve("a@x.com").await.unwrap_err();
            assert!(matches!(err, AccountResolutionError::MultipleAccountsFound));
        }
    }

    #[tokio::test]
    async fn disabled_sole_match_is_reported() {
        let resolver = resolver_over(vec![account(7, "a@x.com", true)], None);
        let err = resolver.resolve("a@x.com").await.unwrap_err();
        assert!(matches!(err, AccountResolutionError::AccountDisabled));
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn scope_participates_in_uniqueness() {
        let mut scoped = account(2, "a@x.com", false);
        scoped.partition_id = Some(5);
        let accounts = vec![account(1, "a@x.com", false), scoped];

        let unscoped = resolver_over(accounts.clone(), None);
        assert!(matches!(
            unscoped.resolve("a@x.com").await.unwrap_err(),
            AccountResolutionError::MultipleAccountsFound
        ));

        let in_partition = resolver_over(accounts.clone(), Some(5));
        assert_eq!(in_partition.resolve("a@x.com").await.unwrap(), 2);

        let empty_partition = resolver_over(accounts, Some(6));
        assert!(matches!(
            empty_partition.resolve("a@x.com").await.unwrap_err(),
            AccountResolutionError::NoAccountFound
        ));
    }

    #[tokio::test]
    async fn directory_failure_is_not_a_validation_error() {
        let directory = InMemoryAccountDirectory {
            accounts: vec![],
            should_fail: true,
        };
        let resolver = AccountResolver::new(Arc::new(directory), None);
        let err = resolver.resolve("a@x.com").await.unwrap_err();
        assert!(matches!(err, AccountResolutionError::Directory(_)));
        assert!(!err.is_validation());
        assert_eq!(err.code(), None);
    }
}
