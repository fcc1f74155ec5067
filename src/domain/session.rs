// Session context shared by the sync tasks

/// Bearer credentials for the remote API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    pub fn is_present(&self) -> bool {
        !self.token.trim().is_empty()
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

// Keep tokens out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// The active (user, pond, token) tuple that enables API calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub pond_code: String,
    pub credentials: Credentials,
}

impl Session {
    pub fn new(user_id: String, username: String, pond_code: String, credentials: Credentials) -> Self {
        Self {
            user_id,
            username,
            pond_code,
            credentials,
        }
    }

    /// Name of the first identifying field that is absent, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.pond_code.trim().is_empty() {
            Some("pond code")
        } else if self.user_id.trim().is_empty() {
            Some("user id")
        } else if !self.credentials.is_present() {
            Some("token")
        } else {
            None
        }
    }
}
