//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐  NoStoredSession   ┌─────────────────┐
//! │   Unresolved    │ ─────────────────► │    Anonymous    │ ◄───────────┐
//! └────────┬────────┘                    └────────┬────────┘             │
//!          │ ResumeStarted                        │ LoginAttempt         │
//!          ▼                                      ▼                      │
//! ┌─────────────────┐  ResumeFailed      ┌─────────────────┐ LoginFailed │
//! │    Resuming     │ ──► Anonymous      │    LoggingIn    │ ────────────┤
//! └────────┬────────┘                    └────────┬────────┘             │
//!          │ Resumed                              │ LoginSuccess         │
//!          ▼                                      ▼                      │
//! ┌─────────────────┐    TokenExpired    ┌─────────────────┐RefreshFailed│
//! │  Authenticated  │ ─────────────────► │   Refreshing    │ ────────────┤
//! └────────┬────────┘ ◄───────────────── └─────────────────┘             │
//!          │ LogoutRequested  RefreshSuccess                             │
//!          ▼                                                             │
//! ┌─────────────────┐  LogoutComplete                                    │
//! │   LoggingOut    │ ───────────────────────────────────────────────────┘
//! └─────────────────┘
//! ```
//!
//! `LoginAttempt` is also accepted while resuming or refreshing; the pending
//! refresh then finishes without moving the machine.

use rust_fsm::*;
use serde::{Deserialize, Serialize};

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unresolved)

    Unresolved => {
        NoStoredSession => Anonymous,
        ResumeStarted => Resuming,
        LoginAttempt => LoggingIn,
        LogoutRequested => LoggingOut
    },
    Resuming => {
        Resumed => Authenticated,
        ResumeFailed => Anonymous,
        LoginAttempt => LoggingIn
    },
    Anonymous => {
        LoginAttempt => LoggingIn,
        ResumeStarted => Resuming,
        LogoutRequested => LoggingOut
    },
    LoggingIn => {
        LoginSuccess => Authenticated,
        LoginFailed => Anonymous
    },
    Authenticated => {
        TokenExpired => Refreshing,
        LogoutRequested => LoggingOut,
        LoginAttempt => LoggingIn
    },
    Refreshing => {
        RefreshSuccess => Authenticated,
        RefreshFailed => Anonymous,
        LoginAttempt => LoggingIn
    },
    LoggingOut => {
        LogoutComplete => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state for external consumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Process just started; stored session not looked at yet.
    Unresolved,
    /// Exchanging a stored refresh token for a session.
    Resuming,
    /// No session.
    Anonymous,
    /// Login request in flight.
    LoggingIn,
    /// Access token and identity are set.
    Authenticated,
    /// Renewing a rejected access token.
    Refreshing,
    /// Tearing down the session.
    LoggingOut,
}

impl SessionState {
    /// Returns true only in the Authenticated state.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    /// Returns true while an operation is in progress.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SessionState::Resuming
                | SessionState::LoggingIn
                | SessionState::Refreshing
                | SessionState::LoggingOut
        )
    }
}

impl From<&SessionMachineState> for SessionState {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unresolved => SessionState::Unresolved,
            SessionMachineState::Resuming => SessionState::Resuming,
            SessionMachineState::Anonymous => SessionState::Anonymous,
            SessionMachineState::LoggingIn => SessionState::LoggingIn,
            SessionMachineState::Authenticated => SessionState::Authenticated,
            SessionMachineState::Refreshing => SessionState::Refreshing,
            SessionMachineState::LoggingOut => SessionState::LoggingOut,
        }
    }
}

/// Payload for session state change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionChangedPayload {
    /// Current session state.
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
