use bridge_traits::BridgeError;
use core_auth::AuthError;
use core_media::MediaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Not authenticated; sign in before starting the dashboard")]
    NotAuthenticated,

    #[error("Dashboard already started")]
    AlreadyStarted,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
