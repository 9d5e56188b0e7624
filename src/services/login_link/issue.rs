use lettre::Address;
use time::OffsetDateTime;
use tracing::{debug, error, info};

use super::{sender::resolve_sender, IssueError, LoginLinkService, MessageSettings};
use crate::models::login_token::{AuthContext, NewLoginToken};
use crate::services::{login_mail::LoginMailContext, smtp_mailer::OutgoingMail};

impl LoginLinkService {
    pub async fn issue(
        &self,
        email: &str,
        context: AuthContext,
        settings: &MessageSettings,
    ) -> Result<(), IssueError> {
        self.issue_at(email, context, settings, OffsetDateTime::now_utc())
            .await
    }

    /// Issues a login link as of `now`.
    ///
    /// The sender is resolved and parsed before anything else, so a deployment without a usable
    /// from-address never touches the directory or the token store. Once stored, a token stays stored even
    /// when the mail cannot be delivered; it expires on its own.
    pub async fn issue_at(
        &self,
        email: &str,
        context: AuthContext,
        settings: &MessageSettings,
        now: OffsetDateTime,
    ) -> Result<(), IssueError> {
        let sender = resolve_sender(&[
            &settings.sender,
            &self.settings.sender,
            &self.settings.system_sender,
        ])
        .ok_or_else(|| {
            error!("login link requested but no sender address is configured");
            IssueError::MissingSenderAddress
        })?;
        if sender.address.parse::<Address>().is_err() {
            error!(address = %sender.address, "configured sender address is not a valid mailbox");
            return Err(IssueError::InvalidSenderAddress(sender.address));
        }

        let email = email.trim();
        let account_id = match self.resolver.resolve(email).await {
            Ok(id) => id,
            Err(err) if err.is_validation() => {
                debug!(code = ?err.code(), "login link request rejected: {}", err);
                return Err(err.into());
            }
            Err(err) => {
                error!("account lookup failed: {}", err);
                return Err(err.into());
            }
        };

        let ttl = settings
            .ttl
            .filter(|ttl| ttl.is_positive())
            .unwrap_or(self.settings.token_ttl);
        let record = NewLoginToken {
            token: self.generator.generate(),
            account_id,
            auth_context: context,
            created_at: now,
            valid_until: now + ttl,
        };

        if let Err(err) = self.tokens.insert_token(&record).await {
            error!(account_id, "failed to store login token: {:?}", err);
            return Err(err.into());
        }

        let target = settings
            .target
            .as_deref()
            .unwrap_or(self.settings.default_target.as_str());
        let login_url = self.links.build(&record.token, target);
        let rendered = self.template.render(&LoginMailContext {
            site_title: &self.settings.site_title,
            email,
            login_url: &login_url,
            valid_minutes: ttl.whole_minutes(),
        });

        let mail = OutgoingMail {
            to: email.to_string(),
            from: sender,
            subject: rendered.subject,
            body_html: rendered.body_html,
        };

        if let Err(err) = self.mailer.send_html(&mail).await {
            error!(account_id, auth_context = %context, "failed to send login link: {}", err);
            return Err(IssueError::MailTransport(err));
        }

        info!(account_id, auth_context = %context, valid_until = %record.valid_until, "login link sent");
        Ok(())
    }
}
