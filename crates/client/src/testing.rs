//! In-process fake of the commerce API for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Method, StatusCode};
use serde_json::json;
use tokio::sync::broadcast;

use crate::session::auth::{LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
use crate::session::{ApiRequest, ApiResponse, Transport};
use crate::storage::{Storage, StorageError, StorageEvent, StorageOrigin};

/// How the fake answers the refresh endpoint.
#[derive(Debug, Clone)]
pub enum RefreshBehavior {
    /// Issue this access token and accept it from now on.
    Issue(String),
    /// Issue a new access token and rotate the refresh token.
    Rotate { access: String, refresh: String },
    /// Answer 401.
    Reject,
    /// Never answer.
    Hang,
}

/// A request as the fake saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

struct FakeState {
    valid_access: Option<String>,
    reject_all_bearers: bool,
    refresh: RefreshBehavior,
    refresh_delay: Duration,
    routes: HashMap<(Method, String), ApiResponse>,
}

/// Commerce API fake.
///
/// Every path except the auth endpoints requires the bearer to equal the
/// currently valid access token; anything else gets a 401.
pub struct FakeApi {
    state: Mutex<FakeState>,
    requests: Mutex<Vec<RecordedRequest>>,
    pub refresh_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                valid_access: None,
                reject_all_bearers: false,
                refresh: RefreshBehavior::Reject,
                refresh_delay: Duration::ZERO,
                routes: HashMap::new(),
            }),
            requests: Mutex::new(Vec::new()),
            refresh_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_valid_access(&self, token: &str) {
        self.state.lock().unwrap().valid_access = Some(token.to_string());
    }

    pub fn reject_all_bearers(&self) {
        self.state.lock().unwrap().reject_all_bearers = true;
    }

    pub fn set_refresh(&self, behavior: RefreshBehavior) {
        self.state.lock().unwrap().refresh = behavior;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        self.state.lock().unwrap().refresh_delay = delay;
    }

    pub fn route(&self, method: Method, path: &str, response: ApiResponse) {
        self.state
            .lock()
            .unwrap()
            .routes
            .insert((method, path.to_string()), response);
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    async fn refresh(&self) -> ApiResponse {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let (behavior, delay) = {
            let state = self.state.lock().unwrap();
            (state.refresh.clone(), state.refresh_delay)
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match behavior {
            RefreshBehavior::Issue(access) => {
                self.set_valid_access(&access);
                ApiResponse::new(StatusCode::OK, json!({ "access": access }).to_string())
            }
            RefreshBehavior::Rotate { access, refresh } => {
                self.set_valid_access(&access);
                ApiResponse::new(
                    StatusCode::OK,
                    json!({ "access": access, "refresh": refresh }).to_string(),
                )
            }
            RefreshBehavior::Reject => ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                r#"{"detail": "Token is invalid or expired"}"#,
            ),
            RefreshBehavior::Hang => futures::future::pending().await,
        }
    }

    fn respond(&self, request: &ApiRequest, bearer: Option<&str>) -> ApiResponse {
        let state = self.state.lock().unwrap();
        let route = state
            .routes
            .get(&(request.method.clone(), request.path.clone()))
            .cloned();

        let is_auth_path = [LOGIN_PATH, REGISTER_PATH].contains(&request.path.as_str());
        let authorized = !state.reject_all_bearers
            && bearer.is_some()
            && bearer == state.valid_access.as_deref();

        if !is_auth_path && !authorized {
            return ApiResponse::new(
                StatusCode::UNAUTHORIZED,
                r#"{"detail": "Given token not valid for any token type"}"#,
            );
        }

        route.unwrap_or_else(|| ApiResponse::new(StatusCode::OK, "{}"))
    }
}

impl Transport for FakeApi {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
        bearer: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ApiResponse, reqwest::Error>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(RecordedRequest {
                method: request.method.clone(),
                path: request.path.clone(),
                query: request.query.clone(),
                bearer: bearer.map(str::to_string),
                body: request.body.clone(),
            });

            if request.path == REFRESH_PATH {
                return Ok(self.refresh().await);
            }
            Ok(self.respond(request, bearer))
        })
    }
}

/// Storage wrapper whose reads block for `delay`.
pub struct SlowReads<S> {
    inner: S,
    delay: Duration,
}

impl<S: Storage> SlowReads<S> {
    pub const fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl<S: Storage> Storage for SlowReads<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        std::thread::sleep(self.delay);
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }

    fn origin(&self) -> StorageOrigin {
        self.inner.origin()
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.subscribe()
    }
}
