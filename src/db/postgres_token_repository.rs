use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::{
    db::token_repository::{ConsumeOutcome, TokenRepository},
    models::login_token::{AuthContext, LoginToken, NewLoginToken},
};

pub struct PostgresTokenRepository {
    pub pool: PgPool,
}

#[async_trait]
impl TokenRepository for PostgresTokenRepository {
    async fn insert_token(&self, token: &NewLoginToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO login_tokens (token, account_id, auth_context, created_at, valid_until)
            VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&token.token)
        .bind(token.account_id)
        .bind(token.auth_context.as_str())
        .bind(token.created_at)
        .bind(token.valid_until)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn find_token(&self, token: &str) -> Result<Option<LoginToken>, sqlx::Error> {
        sqlx::query_as::<_, LoginToken>(
            r#"
            SELECT token, account_id, auth_context, created_at, valid_until, used_at
            FROM login_tokens
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    async fn consume_token(
        &self,
        token: &str,
        context: AuthContext,
        now: OffsetDateTime,
    ) -> Result<ConsumeOutcome, sqlx::Error> {
        let consumed: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE login_tokens
            SET used_at = $3
            WHERE token = $1
              AND auth_context = $2
              AND used_at IS NULL
              AND valid_until >= $3
            RETURNING account_id
            "#,
        )
        .bind(token)
        .bind(context.as_str())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(account_id) = consumed {
            return Ok(ConsumeOutcome::Consumed { account_id });
        }

        // The update already decided; this read only labels the rejection.
        Ok(match self.find_token(token).await? {
            Some(existing) => ConsumeOutcome::classify_rejection(&existing, context, now),
            None => ConsumeOutcome::NotFound,
        })
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod tests {
    use super::*;
    use std::sync::Arc;
    use time::Duration;

    fn new_token(value: &str, now: OffsetDateTime) -> NewLoginToken {
        NewLoginToken {
            token: value.into(),
            account_id: 42,
            auth_context: AuthContext::Frontend,
            created_at: now,
            valid_until: now + Duration::minutes(15),
        }
    }

    // Postgres keeps microseconds; truncate so round-tripped values compare equal.
    fn now_micros() -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        now.replace_nanosecond(now.nanosecond() / 1_000 * 1_000)
            .unwrap_or(now)
    }

    #[sqlx::test]
    async fn conditional_update_consumes_once(pool: PgPool) {
        let repo = PostgresTokenRepository { pool };
        let now = now_micros();
        repo.insert_token(&new_token("t1", now)).await.unwrap();

        assert_eq!(
            repo.consume_token("t1", AuthContext::Frontend, now)
                .await
                .unwrap(),
            ConsumeOutcome::Consumed { account_id: 42 }
        );
        assert_eq!(
            repo.consume_token("t1", AuthContext::Frontend, now)
                .await
                .unwrap(),
            ConsumeOutcome::AlreadyUsed
        );

        let stored = repo.find_token("t1").await.unwrap().unwrap();
        assert_eq!(stored.used_at, Some(now));
    }

    #[sqlx::test]
    async fn rejected_update_leaves_row_untouched(pool: PgPool) {
        let repo = PostgresTokenRepository { pool };
        let now = now_micros();
        repo.insert_token(&new_token("t1", now)).await.unwrap();

        assert_eq!(
            repo.consume_token("missing", AuthContext::Frontend, now)
                .await
                .unwrap(),
            ConsumeOutcome::NotFound
        );
        assert_eq!(
            repo.consume_token("t1", AuthContext::Backend, now)
                .await
                .unwrap(),
            ConsumeOutcome::ContextMismatch
        );
        assert_eq!(
            repo.consume_token("t1", AuthContext::Frontend, now + Duration::minutes(16))
                .await
                .unwrap(),
            ConsumeOutcome::Expired
        );
        // still redeemable at exactly valid_until
        assert_eq!(
            repo.consume_token("t1", AuthContext::Frontend, now + Duration::minutes(15))
                .await
                .unwrap(),
            ConsumeOutcome::Consumed { account_id: 42 }
        );
    }

    #[sqlx::test]
    async fn concurrent_updates_yield_one_success(pool: PgPool) {
        let repo = Arc::new(PostgresTokenRepository { pool });
        let now = now_micros();
        repo.insert_token(&new_token("race", now)).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.consume_token("race", AuthContext::Frontend, now)
                        .await
                        .unwrap()
                })
            })
            .collect();

        let mut consumed = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), ConsumeOutcome::Consumed { .. }) {
                consumed += 1;
            }
        }
        assert_eq!(consumed, 1);
    }
}
