use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FirebaseError {
    #[error("Firebase API error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    #[error("Failed to parse Firebase response: {0}")]
    Parse(String),

    #[error("Resumable upload protocol violation: {0}")]
    UploadProtocol(String),

    #[error("Not a storage object URL: {0}")]
    InvalidObjectUrl(String),
}

impl From<FirebaseError> for BridgeError {
    fn from(err: FirebaseError) -> Self {
        match err {
            FirebaseError::Api {
                status_code,
                message,
            } => BridgeError::RemoteRejected {
                status: status_code,
                message,
            },
            FirebaseError::Parse(message) => BridgeError::WireFormat(message),
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, FirebaseError>;
