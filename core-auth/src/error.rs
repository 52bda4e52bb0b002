use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// Deliberately generic: callers cannot tell an unknown account from a
    /// wrong password. The distinction is logged at debug level only.
    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Identity backend unavailable: {0}")]
    GatewayUnavailable(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
