pub mod account_directory;
pub mod mock_db;
pub mod postgres_account_directory;
pub mod postgres_token_repository;
pub mod token_repository;
