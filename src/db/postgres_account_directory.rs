use async_trait::async_trait;
use sqlx::PgPool;

use crate::{db::account_directory::AccountDirectory, models::account::AccountMatch};

pub struct PostgresAccountDirectory {
    pub pool: PgPool,
}

#[async_trait]
impl AccountDirectory for PostgresAccountDirectory {
    async fn find_accounts(
        &self,
        email: &str,
        scope: Option<i64>,
    ) -> Result<Vec<AccountMatch>, sqlx::Error> {
        match scope {
            Some(partition_id) => {
                sqlx::query_as::<_, AccountMatch>(
                    r#"
                    SELECT id, NOT disabled AS enabled
                    FROM accounts
                    WHERE lower(email) = lower($1)
                      AND deleted = false
                      AND partition_id = $2
                    "#,
                )
                .bind(email)
                .bind(partition_id)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, AccountMatch>(
                    r#"
                    SELECT id, NOT disabled AS enabled
                    FROM accounts
                    WHERE lower(email) = lower($1)
                      AND deleted = false
                    "#,
                )
                .bind(email)
                .fetch_all(&self.pool)
                .await
            }
        }
    }
}
