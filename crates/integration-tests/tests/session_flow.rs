//! Sign-in, sign-out and session restore across restarts.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use catering_client::session::{AuthEvent, SESSION_KEY, SUPPRESS_RESTORE_KEY};
use catering_client::storage::{FileStore, KeyValueStore};
use catering_integration_tests::TestApp;

#[tokio::test]
async fn test_session_restored_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::with_store(Arc::new(FileStore::new(dir.path())))
        .await
        .unwrap();
    app.sign_in().await.unwrap();

    let restarted = app.restart();
    let user = restarted.session().restore().await.unwrap();
    assert_eq!(user.id, app.customer);
    assert_eq!(restarted.profile().fetch().await.unwrap().full_name.as_deref(), Some("Budi"));
}

#[tokio::test]
async fn test_sign_out_suppresses_exactly_one_restore() {
    let app = TestApp::new().await.unwrap();
    app.sign_in().await.unwrap();
    // A stale session that a failed removal could have left behind.
    let stale = app.store.get_item(SESSION_KEY).await.unwrap().unwrap();

    app.client.auth_flows().sign_out().await;
    assert!(app.store.get_item(SUPPRESS_RESTORE_KEY).await.unwrap().is_some());
    app.store.set_item(SESSION_KEY, &stale).await.unwrap();

    let first = app.restart();
    assert!(first.session().restore().await.is_none());
    assert!(app.store.get_item(SUPPRESS_RESTORE_KEY).await.unwrap().is_none());

    app.sign_in().await.unwrap();
    let second = app.restart();
    assert!(second.session().restore().await.is_some());
}

#[tokio::test]
async fn test_auth_state_listener_sees_sign_in_and_out() {
    let app = TestApp::new().await.unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscription = app.client.session().on_auth_state_change(move |state| {
        sink.lock().unwrap().push((state.event, state.user().is_some()));
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    app.sign_in().await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    app.client.auth_flows().sign_out().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    subscription.unsubscribe();

    let seen = events.lock().unwrap().clone();
    assert_eq!(seen.first(), Some(&(AuthEvent::InitialSession, false)));
    assert!(seen.contains(&(AuthEvent::SignedIn, true)));
    assert_eq!(seen.last(), Some(&(AuthEvent::SignedOut, false)));
}
