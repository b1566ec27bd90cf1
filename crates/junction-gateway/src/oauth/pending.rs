//! Pending authorization attempts
//!
//! While a backend's authorization redirect is out in a browser, the connect
//! attempt parks here keyed by a reversible encoding of the backend URL. The
//! callback endpoint resolves or rejects the attempt; entries are removed on
//! resolution so repeated reconnects cannot grow the map.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Outcome delivered to a waiting connect attempt: the authorization code, or
/// the error reported by the authorization server.
pub type CallbackOutcome = Result<String, String>;

/// URL-safe, reversible key identifying a backend in the callback route.
pub fn backend_key(url: &str) -> String {
    urlencoding::encode(url).into_owned()
}

/// Recover the backend URL from a callback route key.
pub fn backend_url(key: &str) -> anyhow::Result<String> {
    Ok(urlencoding::decode(key)?.into_owned())
}

/// Process-wide map of in-flight authorization attempts.
#[derive(Default)]
pub struct PendingAuthorizations {
    waiters: Mutex<HashMap<String, oneshot::Sender<CallbackOutcome>>>,
}

impl PendingAuthorizations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `key`. A stale waiter for the same backend is
    /// dropped, failing its (abandoned) attempt.
    pub fn register(&self, key: &str) -> oneshot::Receiver<CallbackOutcome> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(key.to_string(), tx);
        rx
    }

    /// Deliver an authorization code. Returns false when no attempt was
    /// waiting (already resolved, or never registered).
    pub fn resolve(&self, key: &str, code: String) -> bool {
        match self.waiters.lock().remove(key) {
            Some(tx) => tx.send(Ok(code)).is_ok(),
            None => false,
        }
    }

    /// Fail the waiting attempt with the authorization server's error.
    pub fn reject(&self, key: &str, error: String) -> bool {
        match self.waiters.lock().remove(key) {
            Some(tx) => tx.send(Err(error)).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}
