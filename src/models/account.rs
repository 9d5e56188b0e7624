use serde::{Deserialize, Serialize};

/// One row returned by the account directory for an email lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow, Serialize, Deserialize)]
pub struct AccountMatch {
    pub id: i64,
    pub enabled: bool,
}

/// Full account row. The core only ever reads it through [`AccountMatch`].
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub disabled: bool,
    pub deleted: bool,
    pub partition_id: Option<i64>,
}

impl Account {
    pub fn as_match(&self) -> AccountMatch {
        AccountMatch {
            id: self.id,
            enabled: !self.disabled,
        }
    }
}
