//! Session client with single-flight renewal.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

use super::auth::{self, Registered, Registration};
use super::identity::{Identity, decode_identity};
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::{RenewalFailure, SessionError};
use crate::storage::{Storage, keys};

/// Default bound on a single renewal call.
pub const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::from_secs(10);

type RenewalFuture = Shared<BoxFuture<'static, Result<SecretString, RenewalFailure>>>;

/// Process-wide authenticated session.
///
/// Cheap to clone; every clone shares the same credentials, renewal slot and
/// subscribers.
#[derive(Clone)]
pub struct SessionClient {
    inner: Arc<SessionClientInner>,
}

struct SessionClientInner {
    transport: Arc<dyn Transport>,
    storage: Arc<dyn Storage>,
    state: RwLock<SessionState>,
    /// Most recent renewal, keyed by the generation it started from
    renewal: Mutex<Option<InflightRenewal>>,
    renewal_timeout: Duration,
    identity_tx: watch::Sender<Option<Identity>>,
}

#[derive(Default)]
struct SessionState {
    access_token: Option<SecretString>,
    refresh_token: Option<SecretString>,
    identity: Option<Identity>,
    /// Bumped on every credential change
    generation: u64,
}

impl SessionState {
    fn set_access_token(&mut self, token: Option<SecretString>) {
        self.identity = token
            .as_ref()
            .and_then(|token| decode_identity(token.expose_secret()));
        self.access_token = token;
    }

    fn clear(&mut self) {
        self.set_access_token(None);
        self.refresh_token = None;
    }
}

struct InflightRenewal {
    generation: u64,
    outcome: RenewalFuture,
}

impl SessionClient {
    /// Create a session client, seeding credentials from `storage`.
    ///
    /// Unreadable or corrupt credential records are discarded and the session
    /// starts signed out.
    #[must_use]
    pub fn new(
        transport: Arc<dyn Transport>,
        storage: Arc<dyn Storage>,
        renewal_timeout: Duration,
    ) -> Self {
        let (access_token, refresh_token) = load_tokens(storage.as_ref());

        let mut state = SessionState {
            refresh_token,
            ..SessionState::default()
        };
        state.set_access_token(access_token);

        if state.access_token.is_some() {
            tracing::debug!(
                identity = ?state.identity.as_ref().map(|i| &i.username),
                "Restored session from storage"
            );
        }

        let (identity_tx, _) = watch::channel(state.identity.clone());

        Self {
            inner: Arc::new(SessionClientInner {
                transport,
                storage,
                state: RwLock::new(state),
                renewal: Mutex::new(None),
                renewal_timeout,
                identity_tx,
            }),
        }
    }

    // =========================================================================
    // Authenticated calls
    // =========================================================================

    /// Dispatch a request with the current access token attached.
    ///
    /// On a 401 the session is renewed (joining any renewal already in
    /// flight) and the request is replayed exactly once. A second 401 is
    /// returned to the caller as `RequestFailed`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` if a 401 arrives and no refresh token
    /// is held, `SessionError::SessionExpired` if renewal fails, and
    /// `SessionError::RequestFailed` for any other non-success status.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn call(&self, request: &ApiRequest) -> Result<ApiResponse, SessionError> {
        let (token, generation) = self.inner.token_snapshot();

        let response = self
            .inner
            .transport
            .send(request, token.as_ref().map(ExposeSecret::expose_secret))
            .await?;

        if !response.is_unauthorized() {
            return into_result(response);
        }

        tracing::debug!("Access token rejected, renewing session");
        let token = self.join_renewal(generation).await?;

        let response = self
            .inner
            .transport
            .send(request, Some(token.expose_secret()))
            .await?;

        if response.is_unauthorized() {
            tracing::warn!("Request rejected again after renewal, not retrying");
        }

        into_result(response)
    }

    /// Dispatch a request and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// Same as [`SessionClient::call`], plus `SessionError::Parse` if the body
    /// does not match `T`.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
    ) -> Result<T, SessionError> {
        let response = self.call(request).await?;
        Ok(response.json()?)
    }

    // =========================================================================
    // Renewal
    // =========================================================================

    /// Obtain a new access token using the refresh token.
    ///
    /// Joins a renewal already in flight for the current credentials instead
    /// of starting a second one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoSession` if no refresh token is held (any
    /// stale access token is cleared) and `SessionError::SessionExpired` if
    /// the refresh endpoint fails or times out (both tokens are cleared).
    pub async fn renew(&self) -> Result<SecretString, SessionError> {
        let generation = self.inner.read_state().generation;
        self.join_renewal(generation).await
    }

    /// Join or start the renewal for credentials of `generation`.
    async fn join_renewal(&self, generation: u64) -> Result<SecretString, SessionError> {
        let outcome = {
            let mut slot = self
                .inner
                .renewal
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            let joined = slot
                .as_ref()
                .filter(|inflight| inflight.generation == generation)
                .map(|inflight| inflight.outcome.clone());

            if let Some(outcome) = joined {
                outcome
            } else {
                let current = {
                    let state = self.inner.read_state();
                    if state.generation != generation
                        && let Some(ref token) = state.access_token
                    {
                        tracing::debug!("Credentials changed while request was in flight");
                        return Ok(token.clone());
                    }
                    state.generation
                };

                let outcome = self.start_renewal(current);
                *slot = Some(InflightRenewal {
                    generation: current,
                    outcome: outcome.clone(),
                });
                outcome
            }
        };

        outcome.await.map_err(SessionError::from)
    }

    fn start_renewal(&self, generation: u64) -> RenewalFuture {
        let inner = Arc::clone(&self.inner);
        async move { inner.renew_from(generation).await }
            .boxed()
            .shared()
    }

    // =========================================================================
    // Sign in / out
    // =========================================================================

    /// Sign in and store the issued tokens.
    ///
    /// Returns the identity decoded from the new access token.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` if the credentials are rejected.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Option<Identity>, SessionError> {
        let tokens = auth::login(self.inner.transport.as_ref(), username, password).await?;

        self.inner.replace_state(None, |state| {
            state.set_access_token(Some(tokens.access));
            state.refresh_token = Some(tokens.refresh);
        });

        let identity = self.current_identity();
        match identity {
            Some(ref identity) => {
                tracing::info!(username = %identity.username, role = %identity.role, "Signed in");
            }
            None => tracing::warn!("Signed in but the access token carries no readable identity"),
        }
        Ok(identity)
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RequestFailed` if the server rejects the
    /// registration.
    pub async fn register(&self, registration: &Registration) -> Result<Registered, SessionError> {
        auth::register(self.inner.transport.as_ref(), registration).await
    }

    /// Discard both tokens and the identity. No network call.
    pub fn logout(&self) {
        self.inner.replace_state(None, SessionState::clear);
        tracing::info!("Signed out");
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Identity decoded from the current access token.
    #[must_use]
    pub fn current_identity(&self) -> Option<Identity> {
        self.inner.read_state().identity.clone()
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.inner.read_state().access_token.clone()
    }

    /// Whether an access token is held.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.read_state().access_token.is_some()
    }

    /// Subscribe to identity changes (sign in, renewal, sign out).
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.inner.identity_tx.subscribe()
    }

    /// Re-read credentials from storage, replacing memory if they differ.
    ///
    /// Returns `true` if the in-memory session changed.
    pub fn reload_from_storage(&self) -> bool {
        let identity = {
            let mut state = self.inner.write_state();
            let (access_token, refresh_token) = load_tokens(self.inner.storage.as_ref());

            if same_secret(state.access_token.as_ref(), access_token.as_ref())
                && same_secret(state.refresh_token.as_ref(), refresh_token.as_ref())
            {
                return false;
            }

            state.set_access_token(access_token);
            state.refresh_token = refresh_token;
            state.generation += 1;
            state.identity.clone()
        };

        self.inner.publish_identity(identity);
        tracing::debug!("Session reloaded after external change");
        true
    }

    /// Reload credentials whenever another storage handle changes them.
    ///
    /// The task ends when the storage channel closes or every clone of this
    /// client has been dropped.
    #[must_use]
    pub fn watch_storage(&self) -> JoinHandle<()> {
        let mut events = self.inner.storage.subscribe();
        let origin = self.inner.storage.origin();
        let weak = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event)
                        if event.origin == origin
                            || (event.key != keys::ACCESS_TOKEN
                                && event.key != keys::REFRESH_TOKEN) => {}
                    Ok(_) | Err(RecvError::Lagged(_)) => {
                        let Some(inner) = weak.upgrade() else { break };
                        Self { inner }.reload_from_storage();
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

impl SessionClientInner {
    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn token_snapshot(&self) -> (Option<SecretString>, u64) {
        let state = self.read_state();
        (state.access_token.clone(), state.generation)
    }

    /// Apply a credential change and publish the resulting identity.
    ///
    /// With `expected_generation` set, the change is skipped (returning
    /// `false`) if the credentials changed since that generation.
    fn replace_state(
        &self,
        expected_generation: Option<u64>,
        apply: impl FnOnce(&mut SessionState),
    ) -> bool {
        let identity = {
            let mut state = self.write_state();
            if let Some(expected) = expected_generation
                && state.generation != expected
            {
                return false;
            }

            apply(&mut state);
            state.generation += 1;

            self.persist(&state);
            state.identity.clone()
        };

        self.publish_identity(identity);
        true
    }

    fn publish_identity(&self, identity: Option<Identity>) {
        self.identity_tx.send_if_modified(|current| {
            if *current == identity {
                false
            } else {
                *current = identity;
                true
            }
        });
    }

    fn persist(&self, state: &SessionState) {
        for (key, token) in [
            (keys::ACCESS_TOKEN, state.access_token.as_ref()),
            (keys::REFRESH_TOKEN, state.refresh_token.as_ref()),
        ] {
            let result = match token {
                Some(token) => self.storage.set(key, token.expose_secret()),
                None => self.storage.remove(key),
            };
            if let Err(e) = result {
                tracing::warn!(key, error = %e, "Failed to persist session credential");
            }
        }
    }

    async fn renew_from(&self, generation: u64) -> Result<SecretString, RenewalFailure> {
        let refresh_token = self.read_state().refresh_token.clone();

        let Some(refresh_token) = refresh_token else {
            tracing::info!("No refresh token held, clearing session");
            self.replace_state(Some(generation), SessionState::clear);
            return Err(RenewalFailure::NoSession);
        };

        let renewal = tokio::time::timeout(
            self.renewal_timeout,
            auth::refresh_access_token(self.transport.as_ref(), &refresh_token),
        )
        .await;

        match renewal {
            Ok(Ok(renewed)) => {
                let access_token = renewed.access.clone();
                let applied = self.replace_state(Some(generation), |state| {
                    state.set_access_token(Some(renewed.access));
                    if let Some(refresh) = renewed.refresh {
                        state.refresh_token = Some(refresh);
                    }
                });

                if applied {
                    tracing::info!("Session renewed");
                    return Ok(access_token);
                }

                // Signed out or replaced while the refresh was in flight
                match self.read_state().access_token.clone() {
                    Some(current) => {
                        tracing::debug!("Credentials changed during renewal, keeping newer ones");
                        Ok(current)
                    }
                    None => {
                        tracing::debug!("Session ended during renewal, discarding renewed token");
                        Err(RenewalFailure::NoSession)
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Session renewal failed, signing out");
                self.replace_state(Some(generation), SessionState::clear);
                Err(RenewalFailure::SessionExpired)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = u64::try_from(self.renewal_timeout.as_millis()).unwrap_or(u64::MAX),
                    "Session renewal timed out, signing out"
                );
                self.replace_state(Some(generation), SessionState::clear);
                Err(RenewalFailure::SessionExpired)
            }
        }
    }
}

impl std::fmt::Debug for SessionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.read_state();
        f.debug_struct("SessionClient")
            .field("authenticated", &state.access_token.is_some())
            .field("identity", &state.identity)
            .field("renewal_timeout", &self.inner.renewal_timeout)
            .finish_non_exhaustive()
    }
}

fn into_result(response: ApiResponse) -> Result<ApiResponse, SessionError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(SessionError::request_failed(&response))
    }
}

fn same_secret(a: Option<&SecretString>, b: Option<&SecretString>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        (None, None) => true,
        _ => false,
    }
}

/// Read both credentials, discarding unreadable records.
fn load_tokens(storage: &dyn Storage) -> (Option<SecretString>, Option<SecretString>) {
    let read = |key: &str| match storage.get(key) {
        Ok(Some(value)) if !value.trim().is_empty() => {
            Some(SecretString::from(value.trim().to_string()))
        }
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable session credential");
            if let Err(e) = storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to discard session credential");
            }
            None
        }
    };

    (read(keys::ACCESS_TOKEN), read(keys::REFRESH_TOKEN))
}
