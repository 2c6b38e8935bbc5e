//! Local session.
//!
//! There is no credential check: logging in just records a display name.

use serde::{Deserialize, Serialize};

/// Who is using the app, if anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub is_authenticated: bool,
    pub display_name: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log in as `display_name`. Blank names are ignored.
    pub fn login(&mut self, display_name: &str) -> bool {
        let name = display_name.trim();
        if name.is_empty() {
            tracing::debug!("Login ignored: blank display name");
            return false;
        }
        self.is_authenticated = true;
        self.display_name = Some(name.to_string());
        true
    }

    pub fn logout(&mut self) {
        *self = Self::default();
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }
}
