//! Session/identity collaborator consulted before an upload starts.

use std::sync::{Arc, RwLock};

pub trait SessionProvider: Send + Sync {
    /// Whether a user is present right now. Checked immediately before each
    /// entry would start uploading.
    fn session_present(&self) -> bool;
}

impl<T: SessionProvider> SessionProvider for Arc<T> {
    fn session_present(&self) -> bool {
        (**self).session_present()
    }
}

/// Bearer-token session. The token can be set or cleared while a queue is
/// draining, which is exactly the mid-queue logout case.
#[derive(Debug, Default)]
pub struct TokenSession {
    token: RwLock<Option<String>>,
}

impl TokenSession {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

impl SessionProvider for TokenSession {
    fn session_present(&self) -> bool {
        self.token
            .read()
            .map(|token| token.is_some())
            .unwrap_or(false)
    }
}
