#![allow(dead_code)]

//! Shared fixtures for the integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use integraph::endpoint::{Callback, HandleFn, TransformFn};
use serde_json::json;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test tracing subscriber once per binary; controlled by
/// `RUST_LOG` as usual.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Uppercases string payloads; non-strings become the empty string.
pub fn uppercase() -> TransformFn {
    Callback::payload(|p| json!(p.as_str().unwrap_or_default().to_uppercase()))
}

/// Replies with the payload unchanged.
pub fn reply_identity() -> HandleFn {
    Callback::payload(|p| Some(p.clone()))
}

/// Replies with the payload unchanged and counts each invocation.
pub fn counting_reply(counter: Arc<AtomicUsize>) -> HandleFn {
    Callback::payload(move |p| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(p.clone())
    })
}
