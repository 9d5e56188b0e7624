use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Namespace of the account universe a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum AuthContext {
    #[serde(rename = "fe")]
    Frontend,
    #[serde(rename = "be")]
    Backend,
}

impl AuthContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthContext::Frontend => "fe",
            AuthContext::Backend => "be",
        }
    }
}

impl fmt::Display for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAuthContext(pub String);

impl fmt::Display for UnknownAuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown auth context '{}'", self.0)
    }
}

impl std::error::Error for UnknownAuthContext {}

impl FromStr for AuthContext {
    type Err = UnknownAuthContext;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fe" => Ok(AuthContext::Frontend),
            "be" => Ok(AuthContext::Backend),
            other => Err(UnknownAuthContext(other.to_string())),
        }
    }
}

/// Logical state of a stored token at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    Valid,
    Redeemed,
    Expired,
}

/// Persisted login token row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct LoginToken {
    pub token: String,
    pub account_id: i64,
    pub auth_context: String,
    pub created_at: OffsetDateTime,
    pub valid_until: OffsetDateTime,
    pub used_at: Option<OffsetDateTime>,
}

impl LoginToken {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.valid_until
    }

    pub fn is_redeemable(&self, now: OffsetDateTime) -> bool {
        self.status(now) == TokenStatus::Valid
    }

    /// Expiry wins over redemption: a used token past its horizon reports `Expired`.
    pub fn status(&self, now: OffsetDateTime) -> TokenStatus {
        if self.is_expired(now) {
            TokenStatus::Expired
        } else if self.used_at.is_some() {
            TokenStatus::Redeemed
        } else {
            TokenStatus::Valid
        }
    }

    pub fn belongs_to(&self, context: AuthContext) -> bool {
        self.auth_context == context.as_str()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLoginToken {
    pub token: String,
    pub account_id: i64,
    pub auth_context: AuthContext,
    pub created_at: OffsetDateTime,
    pub valid_until: OffsetDateTime,
}

impl NewLoginToken {
    pub fn into_record(self) -> LoginToken {
        LoginToken {
            token: self.token,
            account_id: self.account_id,
            auth_context: self.auth_context.as_str().to_string(),
            created_at: self.created_at,
            valid_until: self.valid_until,
            used_at: None,
        }
    }
}
