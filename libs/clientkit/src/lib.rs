//! # clientkit - authenticated REST client plumbing
//!
//! Everything a screen needs to talk to the obras API:
//!
//! - [`session`]: the injectable session (tokens, decoded identity, auth state)
//!   with `hydrate`/`teardown` lifecycle and pluggable token storage
//! - [`http`]: the API client that attaches the bearer token and performs the
//!   single-flight 401 → refresh → resubmit cycle
//! - [`error`]: the transport error taxonomy shared by every gateway
//! - [`fanout`]: bounded-concurrency parallel map for per-item requests

pub mod error;
pub mod fanout;
pub mod http;
pub mod session;

pub use error::{ApiError, ErrorKind};
pub use http::client::ApiClient;
pub use http::request::{ApiRequest, FilePart, MultipartForm};
pub use session::store::{FileTokenStore, MemoryTokenStore, StoreError, TokenStore};
pub use session::{AuthState, Identity, Role, Session, SessionError, SignOutReason, TokenPair};
