pub mod account;
pub mod login_token;
