//! Admin gate.

/// Credential check behind the admin dashboard. The trait is the seam a real
/// deployment fills with SSO or a directory lookup; the shipped
/// implementation is an exact match against one configured pair.
pub trait Authenticator: Send + Sync {
    fn verify(&self, username: &str, password: &str) -> bool;
}

pub struct StaticCredentials {
    username: String,
    password: String,
}

impl StaticCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new("admin", "Admin1234")
    }
}

impl Authenticator for StaticCredentials {
    fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && password == self.password
    }
}
