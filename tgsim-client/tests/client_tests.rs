//! Integration tests for tgsim-client.
//!
//! These tests verify the client API surface without requiring a running server.

use std::sync::Arc;
use std::time::Duration;
use tgsim_client::{Client, ClientError, ErrorCode, TransportError};
use tgsim_core::config::ClientConfig;
use tgsim_core::providers::{MemoryStore, MockEnv};
use tgsim_core::session::SessionStore;

fn session() -> SessionStore {
    SessionStore::new(Arc::new(MemoryStore::new()))
}

#[test]
fn test_client_construction() {
    let client = Client::new("http://localhost:8000/api", session());
    assert!(client.is_ok());

    let client = Client::new("https://sim.example.com/api", session());
    assert!(client.is_ok());
}

#[test]
fn test_client_invalid_url() {
    let result = Client::new("localhost:8000", session());

    match result {
        Err(ClientError::InvalidUrl(msg)) => {
            assert!(msg.contains("http://"));
        }
        _ => panic!("Expected InvalidUrl error"),
    }
}

#[test]
fn test_client_from_config() {
    let env = MockEnv::new()
        .with_var("TGSIM_API_URL", "https://sim.example.com/api/")
        .with_var("TGSIM_TIMEOUT_MS", "1500");
    let config = ClientConfig::from_env(&env);

    let client = Client::from_config(&config, session()).unwrap();
    assert_eq!(client.base_url(), "https://sim.example.com/api/");
}

#[test]
fn test_client_debug_hides_credential() {
    let session = session();
    session.set("super-secret").unwrap();
    let client = Client::new("http://localhost:8000/api", session).unwrap();

    let debug = format!("{client:?}");
    assert!(debug.contains("localhost:8000"));
    assert!(!debug.contains("super-secret"));
}

#[test]
fn test_error_display() {
    let err = ClientError::Api {
        status: 404,
        body: "Not found".to_string(),
    };
    assert_eq!(err.to_string(), "API error (status 404): Not found");

    let err = ClientError::InvalidUrl("bad url".to_string());
    assert_eq!(err.to_string(), "Invalid URL: bad url");

    let err = ClientError::Timeout(Duration::from_millis(250));
    assert_eq!(err.to_string(), "Request timed out after 250ms");

    let err = ClientError::MissingCredential;
    assert!(err.to_string().contains("TGSIM_API_KEY"));
}

#[test]
fn test_error_source_chain() {
    let err = ClientError::Network(TransportError::Connection("connection refused".into()));
    let source = std::error::Error::source(&err).expect("network errors carry a source");
    assert!(source.to_string().contains("connection refused"));
    assert_eq!(err.code(), ErrorCode::Network);
}
