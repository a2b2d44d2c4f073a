//! Request middleware.

mod context;
mod headers;
mod session;
mod storage;

pub use context::{X_RESPONSE_TIME, current_request_id, request_context};
pub use headers::{SECURE_HEADERS, secure_headers};
pub use session::{CurrentSession, SESSION_COOKIE, resolve_session, session_middleware, session_token};
pub use storage::{SelectedStorage, storage_middleware};
