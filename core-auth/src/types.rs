//! Authentication session types.

use chrono::{DateTime, Utc};

/// An authenticated operator session.
///
/// The id token is a bearer credential for the backend REST surfaces; treat
/// it like a password when logging (see `core_runtime::logging::redact_if_sensitive`).
#[derive(Debug, Clone)]
pub struct Session {
    /// Backend-assigned user identifier.
    pub user_id: String,
    /// E-mail address the session was opened with.
    pub email: String,
    /// Bearer token for authenticated backend calls.
    pub id_token: String,
    /// Token expiry, when the backend reports one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Whether the session's token has expired according to `now`.
    ///
    /// Sessions without a reported expiry never count as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expiry) if expiry <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: Option<DateTime<Utc>>) -> Session {
        Session {
            user_id: "u1".into(),
            email: "operator@example.com".into(),
            id_token: "tok".into(),
            expires_at,
        }
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        assert!(!session(None).is_expired(now));
        assert!(!session(Some(now + Duration::hours(1))).is_expired(now));
        assert!(session(Some(now - Duration::seconds(1))).is_expired(now));
    }
}
