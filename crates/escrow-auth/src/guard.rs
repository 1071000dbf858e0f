//! Route guard.
//!
//! Decides what a protected destination should do given a session snapshot.
//! Holds no state of its own.

use crate::SessionSnapshot;
use serde::Serialize;

/// Default login entry point.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Outcome of a guard check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum GuardDecision {
    /// Startup resolution is still pending; show a placeholder.
    Loading,
    /// Not authenticated; send the user to login and come back afterwards.
    RedirectToLogin { login_path: String, return_to: String },
    /// Authenticated without any of the required roles.
    AccessDenied { required: Vec<String> },
    Allow,
}

/// Gate for a protected destination.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    roles: Vec<String>,
    login_path: String,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteGuard {
    /// Guard that only requires authentication.
    pub fn new() -> Self {
        Self {
            roles: Vec::new(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
        }
    }

    /// Require any one of `roles`.
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_login_path(mut self, login_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn check(&self, session: &SessionSnapshot, destination: &str) -> GuardDecision {
        if session.loading {
            return GuardDecision::Loading;
        }

        if !session.is_authenticated {
            return GuardDecision::RedirectToLogin {
                login_path: self.login_path.clone(),
                return_to: destination.to_string(),
            };
        }

        if !self.roles.is_empty() && !session.has_role(self.roles.as_slice()) {
            return GuardDecision::AccessDenied {
                required: self.roles.clone(),
            };
        }

        GuardDecision::Allow
    }
}

/// Where to go after a successful login.
///
/// Only same-site relative paths are honoured; anything else falls back to `/`.
pub fn post_login_destination(return_to: Option<&str>) -> String {
    match return_to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}
