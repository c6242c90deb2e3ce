//! Injectable session: persisted tokens, decoded identity and observable auth state.
//!
//! A [`Session`] is built once per process with [`Session::hydrate`] and handed
//! to whoever needs it; nothing in this crate keeps a global. Tokens are read
//! and written through a [`TokenStore`] so the same session works against a
//! file on disk or an in-memory map in tests.

pub mod claims;
pub mod store;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

pub use claims::{decode_claims, AccessClaims, ClaimsError, Role};
use store::{MemoryTokenStore, StoreError, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

/// Who is signed in, as decoded from the access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: i64,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<AccessClaims> for Identity {
    fn from(c: AccessClaims) -> Self {
        Self {
            user_id: c.user_id,
            role: c.role,
        }
    }
}

/// Why the session ended up signed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    /// Nothing persisted, or only part of a token pair.
    NoSession,
    Logout,
    /// The server rejected the access token and there was no refresh token.
    MissingRefreshToken,
    /// The refresh exchange failed.
    RefreshRejected,
    /// A persisted or freshly issued access token could not be decoded.
    InvalidToken,
}

impl std::fmt::Display for SignOutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignOutReason::NoSession => "no active session",
            SignOutReason::Logout => "signed out",
            SignOutReason::MissingRefreshToken => "session expired and no refresh token is stored",
            SignOutReason::RefreshRejected => "session expired and could not be renewed",
            SignOutReason::InvalidToken => "stored access token is invalid",
        };
        f.write_str(s)
    }
}

/// Observable authentication state. `SignedOut` is the cue to send the user
/// back to the login entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    SignedIn(Identity),
    SignedOut(SignOutReason),
}

impl AuthState {
    pub fn identity(&self) -> Option<Identity> {
        match self {
            AuthState::SignedIn(id) => Some(*id),
            AuthState::SignedOut(_) => None,
        }
    }
}

/// Token pair as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("access token cannot be decoded: {0}")]
    InvalidToken(#[from] ClaimsError),
}

#[derive(Default)]
struct Credentials {
    access: Option<String>,
    refresh: Option<String>,
}

pub struct Session {
    store: Arc<dyn TokenStore>,
    creds: RwLock<Credentials>,
    state: watch::Sender<AuthState>,
    // held for the duration of a refresh exchange so concurrent 401s share one
    refresh_gate: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // tokens stay out of debug output
        f.debug_struct("Session")
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}

impl Session {
    fn with_store(store: Arc<dyn TokenStore>, creds: Credentials, state: AuthState) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            store,
            creds: RwLock::new(creds),
            state: tx,
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Rebuild the session from persisted tokens.
    ///
    /// The session is signed in only when both tokens are stored and the
    /// access token decodes. An undecodable access token is wiped. A lone
    /// access token is kept and still sent as bearer, but the state stays
    /// signed out until a full pair is established.
    pub fn hydrate(store: Arc<dyn TokenStore>) -> Result<Self, SessionError> {
        let access = store.get(ACCESS_TOKEN_KEY)?;
        let refresh = store.get(REFRESH_TOKEN_KEY)?;

        let state = match (&access, &refresh) {
            (Some(a), Some(_)) => match decode_claims(a) {
                Ok(claims) => AuthState::SignedIn(claims.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "discarding undecodable stored access token");
                    store.remove(ACCESS_TOKEN_KEY)?;
                    store.remove(REFRESH_TOKEN_KEY)?;
                    return Ok(Self::with_store(
                        store,
                        Credentials::default(),
                        AuthState::SignedOut(SignOutReason::InvalidToken),
                    ));
                }
            },
            _ => AuthState::SignedOut(SignOutReason::NoSession),
        };

        tracing::debug!(
            signed_in = matches!(state, AuthState::SignedIn(_)),
            has_access = access.is_some(),
            has_refresh = refresh.is_some(),
            "session hydrated"
        );
        Ok(Self::with_store(store, Credentials { access, refresh }, state))
    }

    /// Fresh signed-out session over an in-memory store.
    pub fn in_memory() -> Self {
        Self::with_store(
            Arc::new(MemoryTokenStore::new()),
            Credentials::default(),
            AuthState::SignedOut(SignOutReason::NoSession),
        )
    }

    /// Persist a freshly issued token pair and publish the decoded identity.
    pub fn establish(&self, pair: TokenPair) -> Result<Identity, SessionError> {
        let identity: Identity = decode_claims(&pair.access_token)?.into();

        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
        {
            let mut creds = self.creds.write();
            creds.access = Some(pair.access_token);
            creds.refresh = Some(pair.refresh_token);
        }
        self.state.send_replace(AuthState::SignedIn(identity));

        tracing::info!(user_id = identity.user_id, role = %identity.role, "session established");
        Ok(identity)
    }

    /// Swap in a refreshed access token; the identity is re-decoded from it.
    pub fn replace_access_token(&self, token: &str) -> Result<Identity, SessionError> {
        let identity: Identity = decode_claims(token)?.into();

        self.store.set(ACCESS_TOKEN_KEY, token)?;
        let has_refresh = {
            let mut creds = self.creds.write();
            creds.access = Some(token.to_string());
            creds.refresh.is_some()
        };
        if has_refresh {
            self.state.send_replace(AuthState::SignedIn(identity));
        }
        Ok(identity)
    }

    /// Clear storage and publish `SignedOut(reason)`.
    ///
    /// In-memory credentials are dropped even when the store fails, so the
    /// process never keeps using a session it meant to end.
    pub fn teardown(&self, reason: SignOutReason) -> Result<(), SessionError> {
        *self.creds.write() = Credentials::default();
        self.state.send_replace(AuthState::SignedOut(reason));

        tracing::info!(%reason, "session torn down");
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.creds.read().access.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.creds.read().refresh.clone()
    }

    pub fn auth_state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity()
    }

    pub fn is_signed_in(&self) -> bool {
        matches!(*self.state.borrow(), AuthState::SignedIn(_))
    }

    /// Watch auth state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub(crate) fn refresh_gate(&self) -> &tokio::sync::Mutex<()> {
        &self.refresh_gate
    }
}

#[cfg(test)]
pub(crate) mod test_tokens {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;

    /// Unsigned JWT carrying `userId` and `role`; `tag` makes tokens distinct.
    pub fn jwt(user_id: i64, role: &str, tag: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({"userId": user_id, "role": role, "jti": tag}).to_string(),
        );
        format!("{}.{}.sig", header, payload)
    }
}
