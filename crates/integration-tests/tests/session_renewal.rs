//! Token renewal against a live HTTP server.
//!
//! Each test starts its own mock API on an ephemeral port and persists into
//! a fresh temporary directory.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures::future::join_all;
use secrecy::{ExposeSecret, SecretString};
use tempfile::TempDir;

use nexus_market_client::{Marketplace, SessionError};
use nexus_market_core::Role;
use nexus_market_integration_tests::MockMarket;

async fn signed_in_customer() -> (MockMarket, TempDir, Marketplace) {
    let mock = MockMarket::start().await;
    mock.add_user("ana", "hunter22", Role::Customer, None);

    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();
    market
        .session()
        .login("ana", &SecretString::from("hunter22".to_string()))
        .await
        .unwrap();

    (mock, dir, market)
}

#[tokio::test]
async fn test_login_populates_identity() {
    let (_mock, _dir, market) = signed_in_customer().await;

    let identity = market.session().current_identity().unwrap();
    assert_eq!(identity.username, "ana");
    assert_eq!(identity.role, Role::Customer);
    assert!(identity.tenant_id.is_none());
}

#[tokio::test]
async fn test_expired_access_token_is_renewed_and_replayed() {
    let (mock, _dir, market) = signed_in_customer().await;
    let before = market.session().access_token().unwrap();

    mock.expire_access_tokens();
    let orders = market.api().orders().await.unwrap();

    assert!(orders.is_empty());
    assert_eq!(mock.hits("POST", "auth/refresh/"), 1);
    assert_eq!(mock.hits("GET", "orders/"), 2);

    let after = market.session().access_token().unwrap();
    assert_ne!(before.expose_secret(), after.expose_secret());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_expired_calls_share_one_renewal() {
    let (mock, _dir, market) = signed_in_customer().await;
    mock.expire_access_tokens();
    mock.set_refresh_delay(Duration::from_millis(200));

    let calls = (0..8).map(|_| {
        let api = market.api().clone();
        async move { api.orders().await }
    });
    let results = join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(mock.hits("POST", "auth/refresh/"), 1);
    assert!(market.session().is_authenticated());
}

#[tokio::test]
async fn test_rejected_refresh_ends_session_everywhere() {
    let (mock, dir, market) = signed_in_customer().await;
    mock.expire_access_tokens();
    mock.reject_refresh();

    let err = market.api().orders().await.unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired));
    assert!(!market.session().is_authenticated());
    assert!(market.session().current_identity().is_none());

    // The credentials are gone from disk too
    let reopened = Marketplace::open(&mock.config(dir.path())).unwrap();
    assert!(!reopened.session().is_authenticated());
    assert!(!dir.path().join("refresh_token.value").exists());
}

#[tokio::test]
async fn test_slow_refresh_times_out_and_ends_session() {
    let (mock, dir, _) = signed_in_customer().await;

    let mut config = mock.config(dir.path());
    config.renewal_timeout = Duration::from_millis(100);
    let market = Marketplace::open(&config).unwrap();
    assert!(market.session().is_authenticated());

    mock.expire_access_tokens();
    mock.set_refresh_delay(Duration::from_secs(2));

    let err = market.api().orders().await.unwrap_err();
    assert!(matches!(err, SessionError::SessionExpired));
    assert!(!market.session().is_authenticated());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let (mock, dir, market) = signed_in_customer().await;
    drop(market);

    let reopened = Marketplace::open(&mock.config(dir.path())).unwrap();
    assert_eq!(
        reopened.session().current_identity().unwrap().username,
        "ana"
    );
    reopened.api().orders().await.unwrap();
    assert_eq!(mock.hits("POST", "auth/refresh/"), 0);
}

#[tokio::test]
async fn test_rotated_refresh_token_is_persisted() {
    let (mock, dir, market) = signed_in_customer().await;
    mock.rotate_refresh_tokens();

    mock.expire_access_tokens();
    market.api().orders().await.unwrap();
    drop(market);

    // A restarted client must hold the rotated token, not the revoked one
    mock.expire_access_tokens();
    let reopened = Marketplace::open(&mock.config(dir.path())).unwrap();
    reopened.api().orders().await.unwrap();

    assert_eq!(mock.hits("POST", "auth/refresh/"), 2);
    assert!(reopened.session().is_authenticated());
}

#[tokio::test]
async fn test_logout_then_call_requires_login() {
    let (mock, _dir, market) = signed_in_customer().await;

    market.session().logout();
    let err = market.api().orders().await.unwrap_err();

    assert!(err.requires_authentication());
    assert_eq!(mock.hits("POST", "auth/refresh/"), 0);
}

#[tokio::test]
async fn test_wrong_password_is_reported() {
    let mock = MockMarket::start().await;
    mock.add_user("ana", "hunter22", Role::Customer, None);
    let dir = TempDir::new().unwrap();
    let market = Marketplace::open(&mock.config(dir.path())).unwrap();

    let err = market
        .session()
        .login("ana", &SecretString::from("wrong".to_string()))
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    assert!(err.to_string().contains("No active account"));
    assert!(!market.session().is_authenticated());
}
