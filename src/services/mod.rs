pub mod account_resolver;
pub mod link_builder;
pub mod login_link;
pub mod login_mail;
pub mod smtp_mailer;
pub mod token_generator;
