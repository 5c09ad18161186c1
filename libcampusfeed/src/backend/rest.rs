//! HTTP backend implementation
//!
//! Talks to a Supabase-compatible backend service: GoTrue-style auth
//! endpoints under `/auth/v1`, PostgREST-style table endpoints under
//! `/rest/v1`, and storage object endpoints under `/storage/v1`. The wire
//! format belongs to the service; this module's job is to map it onto the
//! collaborator contracts and fold HTTP failures into the error taxonomy.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::backend::{AuthProvider, DataStore, ObjectStore, Order, OwnerPredicate};
use crate::config::BackendConfig;
use crate::error::{AuthError, ConfigError, DbError, Result, UploadError};
use crate::types::{Identity, Session};

pub struct RestBackend {
    base: String,
    anon_key: String,
    bucket: String,
    http: Client,
    session: RwLock<Option<Session>>,
}

impl RestBackend {
    /// Build a backend client from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfigError::MissingField(format!("HTTP client: {}", e)))?;

        let mut base = config.url.clone();
        while base.ends_with('/') {
            base.pop();
        }

        Ok(Self {
            base,
            anon_key: config.anon_key.clone(),
            bucket: config.bucket.clone(),
            http,
            session: RwLock::new(None),
        })
    }

    /// Install a previously persisted session
    pub fn restore_session(&self, session: Session) {
        *self.session.write().unwrap() = Some(session);
    }

    /// The active session, if any
    pub fn session(&self) -> Option<Session> {
        self.session.read().unwrap().clone()
    }

    /// Bearer token for request authorization: the session's access token
    /// when signed in, the anon key otherwise
    fn bearer(&self) -> String {
        self.session
            .read()
            .unwrap()
            .as_ref()
            .and_then(|s| s.access_token.clone())
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base, table)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
    }

    async fn read_rows(&self, response: reqwest::Response, context: &str) -> Result<Vec<Value>> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DbError::Network(format!("{}: {}", context, e)))?;

        if !status.is_success() {
            return Err(map_db_error(status, &body, context).into());
        }

        serde_json::from_str(&body)
            .map_err(|e| DbError::Malformed(format!("{}: {}", context, e)).into())
    }
}

/// Map a data-store HTTP failure to the error taxonomy
///
/// PostgREST reports constraint violations as 409 (with the Postgres error
/// code in the body) and missing single objects as 406.
fn map_db_error(status: StatusCode, body: &str, context: &str) -> DbError {
    match status {
        StatusCode::CONFLICT => DbError::Constraint(format!("{}: {}", context, body)),
        StatusCode::NOT_FOUND | StatusCode::NOT_ACCEPTABLE => {
            DbError::NotFound(format!("{}: {}", context, body))
        }
        _ if body.contains("23505") || body.contains("duplicate key") => {
            DbError::Constraint(format!("{}: {}", context, body))
        }
        _ => DbError::Backend(format!("{} failed ({}): {}", context, status, body)),
    }
}

/// Map an auth HTTP failure to the error taxonomy
///
/// GoTrue reports both bad credentials and unconfirmed emails as 400, so
/// the body text is what distinguishes them.
fn map_auth_error(status: StatusCode, body: &str, context: &str) -> AuthError {
    if body.contains("Email not confirmed") || body.contains("email_not_confirmed") {
        return AuthError::EmailNotVerified(format!("{}: {}", context, body));
    }
    if status == StatusCode::BAD_REQUEST
        || status == StatusCode::UNAUTHORIZED
        || body.contains("Invalid login credentials")
    {
        return AuthError::InvalidCredentials(format!("{}: {}", context, body));
    }
    AuthError::Provider(format!("{} failed ({}): {}", context, status, body))
}

fn network_auth(e: reqwest::Error, context: &str) -> AuthError {
    AuthError::Network(format!("{}: {}", context, e))
}

/// Extract a session from a GoTrue response body
///
/// Sign-up with email confirmation enabled returns the bare user object
/// with no tokens; password sign-in returns tokens plus a nested user.
fn parse_session(body: &Value, context: &str) -> std::result::Result<Session, AuthError> {
    let user = body.get("user").unwrap_or(body);
    let id = user.get("id").and_then(|v| v.as_str());
    let email = user.get("email").and_then(|v| v.as_str());

    let (Some(id), Some(email)) = (id, email) else {
        return Err(AuthError::Provider(format!(
            "{}: response carried no user identity",
            context
        )));
    };

    Ok(Session {
        user: Identity {
            id: id.to_string(),
            email: email.to_string(),
        },
        access_token: body
            .get("access_token")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn sign_up(&self, email: &str, password: &str, full_name: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/signup", self.base);
        let payload = serde_json::json!({
            "email": email,
            "password": password,
            "data": { "full_name": full_name },
        });

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| network_auth(e, "sign-up"))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| network_auth(e, "sign-up"))?;

        if !status.is_success() {
            return Err(map_auth_error(status, &body.to_string(), "sign-up").into());
        }

        let session = parse_session(&body, "sign-up")?;
        if session.is_usable() {
            *self.session.write().unwrap() = Some(session.clone());
        }
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/token", self.base);
        let payload = serde_json::json!({ "email": email, "password": password });

        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| network_auth(e, "sign-in"))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|e| network_auth(e, "sign-in"))?;

        if !status.is_success() {
            return Err(map_auth_error(status, &body.to_string(), "sign-in").into());
        }

        let session = parse_session(&body, "sign-in")?;
        *self.session.write().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<()> {
        let url = format!("{}/auth/v1/logout", self.base);
        let response = self
            .authed(self.http.post(&url))
            .send()
            .await
            .map_err(|e| network_auth(e, "sign-out"))?;

        // Revocation failure still ends the local session
        let status = response.status();
        *self.session.write().unwrap() = None;

        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            tracing::warn!("Sign-out returned {}, session cleared locally", status);
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<Identity>> {
        Ok(self
            .session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.user.clone()))
    }
}

#[async_trait]
impl DataStore for RestBackend {
    async fn insert(&self, table: &str, record: Value) -> Result<Value> {
        let response = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await
            .map_err(|e| DbError::Network(format!("insert {}: {}", table, e)))?;

        let mut rows = self.read_rows(response, "insert").await?;
        if rows.is_empty() {
            return Err(DbError::Backend(format!(
                "insert into {} returned no representation",
                table
            ))
            .into());
        }
        Ok(rows.remove(0))
    }

    async fn update(
        &self,
        table: &str,
        id: &str,
        owner: OwnerPredicate<'_>,
        fields: Value,
    ) -> Result<Value> {
        let response = self
            .authed(self.http.patch(self.table_url(table)))
            .query(&[
                ("id", format!("eq.{}", id)),
                (owner.column, format!("eq.{}", owner.id)),
            ])
            .header("Prefer", "return=representation")
            .json(&fields)
            .send()
            .await
            .map_err(|e| DbError::Network(format!("update {}: {}", table, e)))?;

        let mut rows = self.read_rows(response, "update").await?;
        if rows.is_empty() {
            // Row-level authorization: nothing matched the id plus owner
            return Err(DbError::NotFound(format!("{}/{}", table, id)).into());
        }
        Ok(rows.remove(0))
    }

    async fn upsert(&self, table: &str, record: Value) -> Result<Value> {
        let response = self
            .authed(self.http.post(self.table_url(table)))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&record)
            .send()
            .await
            .map_err(|e| DbError::Network(format!("upsert {}: {}", table, e)))?;

        let mut rows = self.read_rows(response, "upsert").await?;
        if rows.is_empty() {
            return Err(DbError::Backend(format!(
                "upsert into {} returned no representation",
                table
            ))
            .into());
        }
        Ok(rows.remove(0))
    }

    async fn delete(&self, table: &str, id: &str, owner: OwnerPredicate<'_>) -> Result<()> {
        let response = self
            .authed(self.http.delete(self.table_url(table)))
            .query(&[
                ("id", format!("eq.{}", id)),
                (owner.column, format!("eq.{}", owner.id)),
            ])
            .send()
            .await
            .map_err(|e| DbError::Network(format!("delete {}: {}", table, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_db_error(status, &body, "delete").into());
        }
        Ok(())
    }

    async fn select_all(
        &self,
        table: &str,
        order: Order<'_>,
        join: Option<&str>,
    ) -> Result<Vec<Value>> {
        let select = match join {
            Some(join) => format!("*,{}", join),
            None => "*".to_string(),
        };
        let direction = if order.descending { "desc" } else { "asc" };
        let order_param = format!("{}.{}", order.column, direction);

        let response = self
            .authed(self.http.get(self.table_url(table)))
            .query(&[
                ("select", select.as_str()),
                ("order", order_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DbError::Network(format!("select {}: {}", table, e)))?;

        self.read_rows(response, "select").await
    }

    async fn select_one(&self, table: &str, id: &str) -> Result<Value> {
        let response = self
            .authed(self.http.get(self.table_url(table)))
            .query(&[("id", format!("eq.{}", id)), ("select", "*".to_string())])
            .send()
            .await
            .map_err(|e| DbError::Network(format!("select {}: {}", table, e)))?;

        let mut rows = self.read_rows(response, "select").await?;
        if rows.is_empty() {
            return Err(DbError::NotFound(format!("{}/{}", table, id)).into());
        }
        Ok(rows.remove(0))
    }
}

#[async_trait]
impl ObjectStore for RestBackend {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base, self.bucket, path);

        let response = self
            .authed(self.http.post(&url))
            .header("Content-Type", "application/octet-stream")
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| UploadError::Network(format!("put {}: {}", path, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                path: path.to_string(),
                reason: format!("{}: {}", status, body),
            }
            .into());
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base, self.bucket, path
        )
    }
}
