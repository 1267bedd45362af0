//! In-memory collaborators for handler tests.

use crate::documents::{DocumentPath, DocumentStore, Fields};
use crate::error::{ProviderError, ProviderResult};
use crate::identity::{DecodedIdentity, IdentityProvider, ProviderUser};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryIdentityProvider {
    tokens: Mutex<HashMap<String, DecodedIdentity>>,
    users: Mutex<HashMap<String, ProviderUser>>,
    update_error: Mutex<Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, token: &str, identity: DecodedIdentity) -> Self {
        self.tokens.lock().unwrap().insert(token.to_string(), identity);
        self
    }

    pub fn with_user(self, uid: &str, email: &str, email_verified: bool) -> Self {
        self.users.lock().unwrap().insert(
            uid.to_string(),
            ProviderUser {
                uid: uid.to_string(),
                email: Some(email.to_string()),
                email_verified,
            },
        );
        self
    }

    /// Make every `set_email_verified` call fail with `message`
    pub fn failing_updates(self, message: &str) -> Self {
        *self.update_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn user(&self, uid: &str) -> Option<ProviderUser> {
        self.users.lock().unwrap().get(uid).cloned()
    }

    /// Operation log, e.g. `["verify_token", "set_email_verified:abc123"]`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn verify_token(&self, token: &str) -> ProviderResult<DecodedIdentity> {
        self.record("verify_token".to_string());
        self.tokens
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or_else(|| ProviderError::new("Invalid Access Token"))
    }

    async fn set_email_verified(&self, uid: &str, verified: bool) -> ProviderResult<()> {
        self.record(format!("set_email_verified:{}", uid));
        if let Some(message) = self.update_error.lock().unwrap().clone() {
            return Err(ProviderError::new(message));
        }
        match self.users.lock().unwrap().get_mut(uid) {
            Some(user) => {
                user.email_verified = verified;
                Ok(())
            }
            None => Err(ProviderError::new("User does not exist.")),
        }
    }

    async fn get_user(&self, uid: &str) -> ProviderResult<ProviderUser> {
        self.record(format!("get_user:{}", uid));
        self.user(uid)
            .ok_or_else(|| ProviderError::new("User does not exist."))
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: Mutex<HashMap<String, Fields>>,
    error: Mutex<Option<String>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, message: &str) -> Self {
        *self.error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Look up a document by its `collection/id` path
    pub fn document(&self, path: &str) -> Option<Fields> {
        self.documents.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn upsert_merge(&self, path: &DocumentPath, fields: Fields) -> ProviderResult<()> {
        if let Some(message) = self.error.lock().unwrap().clone() {
            return Err(ProviderError::new(message));
        }
        self.documents
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .extend(fields);
        Ok(())
    }
}
