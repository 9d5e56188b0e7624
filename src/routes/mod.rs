pub mod login_link;

pub use login_link::{handle_redeem_login_link, handle_request_login_link, handle_session};
