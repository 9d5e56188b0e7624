//! Issuance and redemption of single-use login links.
//!
//! [`LoginLinkService::issue`] resolves an email to one account, stores a fresh token and mails
//! a link carrying it. [`LoginLinkService::redeem`] consumes a presented token exactly once and
//! yields the account id it was issued for.

mod errors;
mod issue;
mod redeem;
pub mod sender;

use std::sync::Arc;

use time::Duration;

use crate::config::{LoginLinkSettings, SenderSettings};
use crate::db::{account_directory::AccountDirectory, token_repository::TokenRepository};
use crate::services::{
    account_resolver::AccountResolver, link_builder::RedemptionUrlBuilder,
    login_mail::LoginMailTemplate, smtp_mailer::Mailer, token_generator::TokenGenerator,
};

pub use errors::{ErrorKind, IssueError, RedeemError};

/// Per-request overrides. Every field is optional and falls back to the deployment settings.
#[derive(Debug, Clone, Default)]
pub struct MessageSettings {
    pub sender: SenderSettings,
    pub ttl: Option<Duration>,
    pub target: Option<String>,
}

pub struct LoginLinkService {
    tokens: Arc<dyn TokenRepository>,
    resolver: AccountResolver,
    generator: Arc<dyn TokenGenerator>,
    links: Arc<dyn RedemptionUrlBuilder>,
    mailer: Arc<dyn Mailer>,
    template: LoginMailTemplate,
    settings: LoginLinkSettings,
}

impl LoginLinkService {
    pub fn new(
        tokens: Arc<dyn TokenRepository>,
        directory: Arc<dyn AccountDirectory>,
        generator: Arc<dyn TokenGenerator>,
        links: Arc<dyn RedemptionUrlBuilder>,
        mailer: Arc<dyn Mailer>,
        settings: LoginLinkSettings,
    ) -> Self {
        Self {
            tokens,
            resolver: AccountResolver::new(directory, settings.storage_pid),
            generator,
            links,
            mailer,
            template: LoginMailTemplate::default(),
            settings,
        }
    }

    pub fn with_template(mut self, template: LoginMailTemplate) -> Self {
        self.template = template;
        self
    }
}
