//! Mock backend implementation for testing
//!
//! Provides a configurable in-memory backend implementing all three
//! collaborator contracts. It can simulate failures at specific points
//! (e.g. the nth object-store write) so tests can verify partial-failure
//! semantics of multi-step submissions without network access.
//!
//! Available for all builds (not just tests) to support integration tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::{AuthProvider, DataStore, ObjectStore, Order, OwnerPredicate};
use crate::error::{AuthError, DbError, Result, UploadError};
use crate::types::{Identity, Session};

#[derive(Debug, Default)]
struct MockState {
    accounts: Vec<MockAccount>,
    session: Option<Session>,
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<String, Vec<u8>>,
    /// Every successful `put` path, in call order
    put_log: Vec<String>,
    /// Monotonic insert counter; spaces out `created_at` so feed ordering
    /// is deterministic even within one test run
    seq: i64,
    put_calls: usize,
    insert_calls: usize,
    update_calls: usize,
    delete_calls: usize,
    select_calls: usize,
}

#[derive(Debug, Clone)]
struct MockAccount {
    email: String,
    password: String,
    identity: Identity,
    verified: bool,
}

/// Failure configuration for the mock backend
#[derive(Debug, Clone, Default)]
pub struct MockFailures {
    /// Fail the nth call to `put` (1-based)
    pub put_fails_on: Option<usize>,
    /// Fail every `insert`
    pub insert_fails: bool,
    /// Fail every `update`
    pub update_fails: bool,
    /// Fail every `select_all`
    pub select_fails: bool,
    /// Sign-ups leave the account unverified until `verify_email` is called
    pub require_email_verification: bool,
}

/// In-memory backend for tests
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
    failures: MockFailures,
}

// Timestamps start here and advance one second per inserted post.
const MOCK_EPOCH: i64 = 1_700_000_000;

impl MockBackend {
    pub fn new() -> Self {
        Self::with_failures(MockFailures::default())
    }

    pub fn with_failures(failures: MockFailures) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            failures,
        }
    }

    /// Backend whose nth object-store write fails (1-based)
    pub fn put_failure_on(n: usize) -> Self {
        Self::with_failures(MockFailures {
            put_fails_on: Some(n),
            ..Default::default()
        })
    }

    /// Backend whose inserts all fail
    pub fn insert_failure() -> Self {
        Self::with_failures(MockFailures {
            insert_fails: true,
            ..Default::default()
        })
    }

    /// Backend whose feed fetches all fail
    pub fn select_failure() -> Self {
        Self::with_failures(MockFailures {
            select_fails: true,
            ..Default::default()
        })
    }

    /// Create an account and an active session for it in one step
    pub fn signed_in(email: &str) -> (Self, Identity) {
        let backend = Self::new();
        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
        };
        {
            let mut state = backend.state.lock().unwrap();
            state.accounts.push(MockAccount {
                email: email.to_string(),
                password: "password".to_string(),
                identity: identity.clone(),
                verified: true,
            });
            state.session = Some(Session {
                user: identity.clone(),
                access_token: Some(format!("mock-token-{}", identity.id)),
                refresh_token: None,
            });
        }
        (backend, identity)
    }

    /// Mark an account's email as verified
    pub fn verify_email(&self, email: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(account) = state.accounts.iter_mut().find(|a| a.email == email) {
            account.verified = true;
        }
    }

    /// All rows currently stored in a table
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    /// Paths of every stored object, in insertion-independent sorted order
    pub fn object_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .state
            .lock()
            .unwrap()
            .objects
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }

    /// Paths of successful object writes, in the order they happened
    pub fn put_order(&self) -> Vec<String> {
        self.state.lock().unwrap().put_log.clone()
    }

    pub fn object_count(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn put_call_count(&self) -> usize {
        self.state.lock().unwrap().put_calls
    }

    pub fn insert_call_count(&self) -> usize {
        self.state.lock().unwrap().insert_calls
    }

    pub fn update_call_count(&self) -> usize {
        self.state.lock().unwrap().update_calls
    }

    pub fn delete_call_count(&self) -> usize {
        self.state.lock().unwrap().delete_calls
    }

    pub fn select_call_count(&self) -> usize {
        self.state.lock().unwrap().select_calls
    }

    fn next_created_at(state: &mut MockState) -> DateTime<Utc> {
        state.seq += 1;
        DateTime::from_timestamp(MOCK_EPOCH + state.seq, 0).unwrap_or_else(Utc::now)
    }

    /// Embed the author's profile row under `profiles`, the shape the real
    /// store produces for an embedded join
    fn embed_author(state: &MockState, row: &mut Value) {
        let user_id = row
            .get("user_id")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let Some(user_id) = user_id else { return };

        let author = state
            .tables
            .get("profiles")
            .and_then(|rows| {
                rows.iter()
                    .find(|p| p.get("id").and_then(|v| v.as_str()) == Some(user_id.as_str()))
            })
            .map(|p| {
                serde_json::json!({
                    "full_name": p.get("full_name").cloned().unwrap_or(Value::Null),
                    "nickname": p.get("nickname").cloned().unwrap_or(Value::Null),
                })
            })
            .unwrap_or(Value::Null);

        row["profiles"] = author;
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthProvider for MockBackend {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session> {
        let _ = full_name;
        let mut state = self.state.lock().unwrap();

        if state.accounts.iter().any(|a| a.email == email) {
            return Err(
                AuthError::Provider(format!("Account already exists: {}", email)).into(),
            );
        }

        let identity = Identity {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
        };
        let verified = !self.failures.require_email_verification;
        state.accounts.push(MockAccount {
            email: email.to_string(),
            password: password.to_string(),
            identity: identity.clone(),
            verified,
        });

        let session = Session {
            user: identity,
            access_token: verified.then(|| format!("mock-token-{}", Uuid::new_v4())),
            refresh_token: None,
        };
        if session.is_usable() {
            state.session = Some(session.clone());
        }
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let mut state = self.state.lock().unwrap();

        let account = state
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .cloned()
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid login credentials".to_string()))?;

        if !account.verified {
            return Err(AuthError::EmailNotVerified(format!(
                "Email not confirmed: {}",
                email
            ))
            .into());
        }

        let session = Session {
            user: account.identity,
            access_token: Some(format!("mock-token-{}", Uuid::new_v4())),
            refresh_token: None,
        };
        state.session = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        self.state.lock().unwrap().session = None;
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<Identity>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .session
            .as_ref()
            .map(|s| s.user.clone()))
    }
}

#[async_trait]
impl DataStore for MockBackend {
    async fn insert(&self, table: &str, mut record: Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.insert_calls += 1;

        if self.failures.insert_fails {
            return Err(DbError::Backend("Mock insert failed".to_string()).into());
        }

        if record.get("id").is_none() {
            record["id"] = Value::String(Uuid::new_v4().to_string());
        }
        if table == "posts" {
            let created_at = Self::next_created_at(&mut state);
            record["created_at"] = Value::String(created_at.to_rfc3339());
        }

        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        table: &str,
        id: &str,
        owner: OwnerPredicate<'_>,
        fields: Value,
    ) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.update_calls += 1;

        if self.failures.update_fails {
            return Err(DbError::Backend("Mock update failed".to_string()).into());
        }

        let rows = state.tables.entry(table.to_string()).or_default();
        let row = rows
            .iter_mut()
            .find(|r| {
                r.get("id").and_then(|v| v.as_str()) == Some(id)
                    && r.get(owner.column).and_then(|v| v.as_str()) == Some(owner.id)
            })
            .ok_or_else(|| DbError::NotFound(format!("{}/{}", table, id)))?;

        if let (Some(target), Some(patch)) = (row.as_object_mut(), fields.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    async fn upsert(&self, table: &str, record: Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();

        let id = record
            .get("id")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| DbError::Constraint("upsert requires an id field".to_string()))?;

        let rows = state.tables.entry(table.to_string()).or_default();
        match rows
            .iter_mut()
            .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id.as_str()))
        {
            Some(existing) => *existing = record.clone(),
            None => rows.push(record.clone()),
        }
        Ok(record)
    }

    async fn delete(&self, table: &str, id: &str, owner: OwnerPredicate<'_>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls += 1;

        let rows = state.tables.entry(table.to_string()).or_default();
        rows.retain(|r| {
            !(r.get("id").and_then(|v| v.as_str()) == Some(id)
                && r.get(owner.column).and_then(|v| v.as_str()) == Some(owner.id))
        });
        Ok(())
    }

    async fn select_all(
        &self,
        table: &str,
        order: Order<'_>,
        join: Option<&str>,
    ) -> Result<Vec<Value>> {
        let mut state = self.state.lock().unwrap();
        state.select_calls += 1;

        if self.failures.select_fails {
            return Err(DbError::Network("Mock fetch failed".to_string()).into());
        }

        let mut rows = state.tables.get(table).cloned().unwrap_or_default();

        rows.sort_by(|a, b| {
            let key = |r: &Value| {
                r.get(order.column)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .unwrap_or_default()
            };
            let cmp = key(a).cmp(&key(b));
            if order.descending {
                cmp.reverse()
            } else {
                cmp
            }
        });

        if join.is_some() {
            for row in rows.iter_mut() {
                Self::embed_author(&state, row);
            }
        }

        Ok(rows)
    }

    async fn select_one(&self, table: &str, id: &str) -> Result<Value> {
        let state = self.state.lock().unwrap();

        state
            .tables
            .get(table)
            .and_then(|rows| {
                rows.iter()
                    .find(|r| r.get("id").and_then(|v| v.as_str()) == Some(id))
            })
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("{}/{}", table, id)).into())
    }
}

#[async_trait]
impl ObjectStore for MockBackend {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.put_calls += 1;

        if self.failures.put_fails_on == Some(state.put_calls) {
            return Err(UploadError::Rejected {
                path: path.to_string(),
                reason: "Mock store rejected the write".to_string(),
            }
            .into());
        }

        state.objects.insert(path.to_string(), bytes.to_vec());
        state.put_log.push(path.to_string());
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("mock://media/{}", path)
    }
}
