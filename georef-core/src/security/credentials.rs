//! Fact database login for discrete connection parameters.
//!
//! The password arrives from `PGPASSWORD` or the interactive prompt and is
//! held in a [`Zeroizing`] buffer that is wiped on drop. `Debug` masks it.

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// User name and optional password, wiped from memory on drop.
///
/// ```rust
/// use georef_core::security::Credentials;
///
/// let creds = Credentials::new("etl".to_string(), Some("s3cret".to_string()));
/// assert_eq!(creds.username(), "etl");
/// assert!(!format!("{:?}", creds).contains("s3cret"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Wraps a user name and password. `None` means connect without one.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Login user.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Whether a password was supplied.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Borrows the password for assembling the driver URI.
    ///
    /// Callers must not log or store the returned value.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
