//! Session use cases.
//!
//! Creating and joining sessions, state snapshots and token checks.

use std::sync::Arc;

mod auth;
mod create_session;
mod error;
mod get_session;
mod join_session;

pub use auth::{AuthError, Authenticate};
pub use create_session::CreateSession;
pub use error::SessionError;
pub use get_session::{GetSessionByCode, GetSessionState, SessionState};
pub use join_session::{JoinSession, JoinedSession, MAX_PLAYER_NAME_LENGTH};

/// Container for session use cases.
pub struct SessionUseCases {
    pub authenticate: Arc<Authenticate>,
    pub create: Arc<CreateSession>,
    pub get_by_code: Arc<GetSessionByCode>,
    pub join: Arc<JoinSession>,
    pub get_state: Arc<GetSessionState>,
}

impl SessionUseCases {
    pub fn new(
        authenticate: Arc<Authenticate>,
        create: Arc<CreateSession>,
        get_by_code: Arc<GetSessionByCode>,
        join: Arc<JoinSession>,
        get_state: Arc<GetSessionState>,
    ) -> Self {
        Self {
            authenticate,
            create,
            get_by_code,
            join,
            get_state,
        }
    }
}
