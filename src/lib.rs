pub mod config;
pub mod db;
pub mod models;
pub mod responses;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;

pub use services::login_link::LoginLinkService;
pub use state::AppState;
