//! Integration tests exercising the public session API end to end.

use portico_session::prelude::*;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower::{Layer, ServiceExt, service_fn};

#[tokio::test]
async fn test_memory_store_lifecycle() {
    let store = Arc::new(MemoryStore::new());

    let session = Session::new();
    assert!(session.is_new());
    session.set("user_id", 42);
    session.set("username", "alice");
    store.save(&session).await;

    let loaded = store.load(session.id()).await.expect("session present");
    assert_eq!(loaded.get_as::<i64>("user_id"), Some(42));
    assert_eq!(loaded.get_as::<String>("username"), Some("alice".to_string()));
    assert!(!loaded.is_new());

    store.remove(&session).await;
    assert!(store.load(session.id()).await.is_none());

    store.close().await;
}

#[tokio::test]
async fn test_session_options_shape_new_sessions() {
    let session = SessionOptions::new()
        .with_timeout(Duration::from_secs(60))
        .with_id_length(32)
        .with_const_attr("tenant", "acme")
        .with_attr("theme", "dark")
        .build();

    assert!(session.id().len() > 24);
    assert_eq!(session.timeout(), Duration::from_secs(60));
    assert_eq!(session.const_attr("tenant"), Some(&"acme".into()));
    assert_eq!(session.get("theme"), Some("dark".into()));
}

#[tokio::test]
async fn test_manager_round_trip_through_headers() {
    let manager = SessionManager::cookie(Arc::new(MemoryStore::new()));

    let session = Session::new();
    session.set("cart", vec![1, 2, 3]);

    let mut response = http::HeaderMap::new();
    manager.save(&session, &mut response).await;
    let set_cookie = response
        .get(http::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();

    // Replay the cookie the way a browser would.
    let pair = set_cookie.split(';').next().unwrap();
    let mut request = http::HeaderMap::new();
    request.insert(http::header::COOKIE, pair.parse().unwrap());

    let loaded = manager.load(&request).await.expect("session loads back");
    assert_eq!(loaded.id(), session.id());

    manager.close().await;
}

#[tokio::test]
async fn test_middleware_persists_across_requests() {
    let store = Arc::new(MemoryStore::new());
    let manager = Arc::new(SessionManager::cookie(store));
    let layer = SessionLayer::new(manager);

    let handler = service_fn(|req: http::Request<()>| async move {
        let session = session_from(&req).expect("session attached");
        let visits = session.get_as::<i64>("visits").unwrap_or(0);
        session.set("visits", visits + 1);
        Ok::<_, Infallible>(http::Response::new(visits + 1))
    });

    // First request: no cookie, a fresh session is fabricated and saved.
    let first = layer
        .layer(handler.clone())
        .oneshot(http::Request::new(()))
        .await
        .unwrap();
    assert_eq!(*first.body(), 1);
    let set_cookie = first
        .headers()
        .get(http::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    let pair = set_cookie.split(';').next().unwrap().to_string();

    // Second request presents the cookie and sees the prior state.
    let mut request = http::Request::new(());
    request
        .headers_mut()
        .insert(http::header::COOKIE, pair.parse().unwrap());
    let second = layer.layer(handler).oneshot(request).await.unwrap();
    assert_eq!(*second.body(), 2);
}

#[tokio::test]
async fn test_cache_backed_store_config_defaults() {
    let config = CacheStoreConfig::default();
    assert_eq!(config.key_prefix, "sess:");
    assert_eq!(config.retries, 3);
    assert!(config.retry_deadline.is_none());

    let config = CacheStoreConfig::default()
        .with_key_prefix("myapp:")
        .with_retries(5)
        .with_retry_deadline(Duration::from_secs(2));
    assert_eq!(config.key_prefix, "myapp:");
    assert_eq!(config.retries, 5);
    assert_eq!(config.retry_deadline, Some(Duration::from_secs(2)));
}
