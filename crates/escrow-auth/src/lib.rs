//! Authentication core for the escrow client.
//!
//! This crate provides:
//! - Session management with single-flight token refresh
//! - An API client that attaches bearer tokens and retries once after a 401
//! - A transport seam over reqwest
//! - A route guard over session snapshots
//! - Explicit FSM-based session state

mod client;
mod error;
mod guard;
mod session;
mod session_fsm;
mod transport;

#[cfg(test)]
mod testing;

pub use client::ApiClient;
pub use error::{ClientError, ClientResult, FieldErrors};
pub use guard::{post_login_destination, GuardDecision, RouteGuard, DEFAULT_LOGIN_PATH};
pub use session::{
    Identity, SessionManager, SessionPhase, SessionSnapshot, SessionStateCallback, TokenPair,
};
pub use session_fsm::session_machine;
pub use session_fsm::{
    SessionChangedPayload, SessionMachine, SessionMachineInput, SessionMachineState, SessionState,
};
pub use transport::{
    ApiRequest, ApiResponse, FormField, FormValue, Method, ReqwestTransport, RequestBody,
    Transport,
};
