use rand::{distr::Alphanumeric, Rng};

/// Length of a generated login token. 43 base-62 characters carry roughly 256 bits.
pub const LOGIN_TOKEN_LENGTH: usize = 43;

pub trait TokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Draws tokens from the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlphanumericTokenGenerator;

impl TokenGenerator for AlphanumericTokenGenerator {
    fn generate(&self) -> String {
        rand::rng()
            .sample_iter(&Alphanumeric)
            .take(LOGIN_TOKEN_LENGTH)
            .map(char::from)
            .collect()
    }
}
