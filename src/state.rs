use crate::config::Config;
use crate::services::login_link::LoginLinkService;
use crate::session::JwtKeys;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub login_links: Arc<LoginLinkService>,
    pub jwt_keys: Arc<JwtKeys>,
    pub config: Arc<Config>,
}
