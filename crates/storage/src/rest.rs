//! Backend for a hosted Postgres + object-storage service speaking the
//! storage REST API (`/storage/v1`) and PostgREST (`/rest/v1`).
//!
//! All requests go through a synchronous `ureq` agent inside
//! `tokio::task::spawn_blocking`. Error bodies are read rather than
//! turned into transport errors so that conflict and foreign-key
//! violations map onto the right `StorageError` variants.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StorageError;
use crate::record::{
    ChatConversationRecord, NewChatConversation, NewPickupOrder, NewWasteUpload, OrderStatus,
    PickupOrderRecord, UploadOptions, WasteUploadRecord, CHAT_CONVERSATIONS_TABLE, ORDERS_TABLE,
    WASTE_UPLOADS_TABLE,
};
use crate::traits::{BlobStore, RecordStore};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL error code for a foreign-key violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Connection settings for the REST backend.
#[derive(Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://abc.supabase.co`. No trailing slash needed.
    pub url: String,
    /// Anon or service key, sent as `apikey` and as a bearer token.
    pub api_key: String,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.url, bucket, key)
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }
}

impl std::fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConfig")
            .field("url", &self.url)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Blob and record storage over HTTP.
#[derive(Debug, Clone)]
pub struct RestBackend {
    config: RestConfig,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&RestConfig, &ureq::Agent) -> Result<T, StorageError> + Send + 'static,
    {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let agent = agent_for(&config);
            f(&config, &agent)
        })
        .await
        .map_err(|e| StorageError::Backend(format!("task join error: {}", e)))?
    }
}

fn agent_for(config: &RestConfig) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(config.timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// A response read to completion.
struct Reply {
    status: u16,
    body: Vec<u8>,
}

impl Reply {
    fn read(mut response: ureq::http::Response<ureq::Body>) -> Result<Self, StorageError> {
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| StorageError::Backend(format!("failed to read response: {}", e)))?;
        Ok(Self { status, body })
    }

    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `code` field of a PostgREST or storage error body, if any.
    fn error_code(&self) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(&self.body).ok()?;
        match value.get("code").or_else(|| value.get("statusCode"))? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| StorageError::Backend(format!("failed to parse response: {}", e)))
    }

    fn unexpected(&self, action: &str) -> StorageError {
        StorageError::Backend(format!("{} failed ({}): {}", action, self.status, self.text()))
    }
}

fn transport(e: ureq::Error) -> StorageError {
    StorageError::Backend(format!("request failed: {}", e))
}

fn insert_row<B, R>(
    config: &RestConfig,
    agent: &ureq::Agent,
    table: &str,
    row: &B,
) -> Result<R, StorageError>
where
    B: Serialize,
    R: DeserializeOwned,
{
    let response = agent
        .post(&config.table_url(table))
        .header("apikey", &config.api_key)
        .header("authorization", &format!("Bearer {}", config.api_key))
        .header("prefer", "return=representation")
        .send_json(row)
        .map_err(transport)?;
    let reply = Reply::read(response)?;

    if !reply.is_success() {
        return Err(match (reply.status, reply.error_code().as_deref()) {
            (_, Some(FOREIGN_KEY_VIOLATION)) => StorageError::RecordNotFound {
                table: table.to_string(),
                id: reply.text(),
            },
            (400, _) | (422, _) => StorageError::InvalidRecord {
                table: table.to_string(),
                message: reply.text(),
            },
            _ => reply.unexpected(&format!("insert into {}", table)),
        });
    }

    let mut rows: Vec<R> = reply.json()?;
    if rows.is_empty() {
        return Err(StorageError::Backend(format!(
            "insert into {} returned no representation",
            table
        )));
    }
    Ok(rows.remove(0))
}

fn select_rows<R: DeserializeOwned>(
    config: &RestConfig,
    agent: &ureq::Agent,
    table: &str,
    query: &[(&str, String)],
) -> Result<Vec<R>, StorageError> {
    let mut request = agent
        .get(&config.table_url(table))
        .header("apikey", &config.api_key)
        .header("authorization", &format!("Bearer {}", config.api_key))
        .query("select", "*");
    for (name, value) in query {
        request = request.query(*name, value);
    }
    let reply = Reply::read(request.call().map_err(transport)?)?;
    if !reply.is_success() {
        return Err(reply.unexpected(&format!("select from {}", table)));
    }
    reply.json()
}

#[async_trait]
impl BlobStore for RestBackend {
    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        options: UploadOptions,
    ) -> Result<(), StorageError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        tracing::debug!(bucket = %bucket, key = %key, size = bytes.len(), "uploading object");
        self.blocking(move |config, agent| {
            let response = agent
                .post(&config.object_url(&bucket, &key))
                .header("apikey", &config.api_key)
                .header("authorization", &format!("Bearer {}", config.api_key))
                .header("content-type", &options.content_type)
                .header("x-upsert", if options.upsert { "true" } else { "false" })
                .send(&bytes[..])
                .map_err(transport)?;
            let reply = Reply::read(response)?;
            if reply.is_success() {
                return Ok(());
            }
            let duplicate = reply.status == 409
                || reply.error_code().as_deref() == Some("409")
                || reply.text().contains("Duplicate");
            if duplicate {
                Err(StorageError::AlreadyExists { bucket, key })
            } else {
                Err(reply.unexpected("object upload"))
            }
        })
        .await
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.blocking(move |config, agent| {
            let response = agent
                .get(&config.object_url(&bucket, &key))
                .header("apikey", &config.api_key)
                .header("authorization", &format!("Bearer {}", config.api_key))
                .call()
                .map_err(transport)?;
            let reply = Reply::read(response)?;
            if reply.is_success() {
                return Ok(reply.body);
            }
            if reply.status == 404 || reply.error_code().as_deref() == Some("404") {
                Err(StorageError::ObjectNotFound { bucket, key })
            } else {
                Err(reply.unexpected("object download"))
            }
        })
        .await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url, bucket, key
        )
    }
}

#[async_trait]
impl RecordStore for RestBackend {
    async fn insert_waste_upload(
        &self,
        row: NewWasteUpload,
    ) -> Result<WasteUploadRecord, StorageError> {
        self.blocking(move |config, agent| insert_row(config, agent, WASTE_UPLOADS_TABLE, &row))
            .await
    }

    async fn list_waste_uploads(
        &self,
        limit: usize,
    ) -> Result<Vec<WasteUploadRecord>, StorageError> {
        self.blocking(move |config, agent| {
            let mut query = vec![("order", "uploaded_at.desc".to_string())];
            if limit > 0 {
                query.push(("limit", limit.to_string()));
            }
            select_rows(config, agent, WASTE_UPLOADS_TABLE, &query)
        })
        .await
    }

    async fn insert_chat_conversation(
        &self,
        row: NewChatConversation,
    ) -> Result<ChatConversationRecord, StorageError> {
        self.blocking(move |config, agent| {
            insert_row(config, agent, CHAT_CONVERSATIONS_TABLE, &row)
        })
        .await
    }

    async fn insert_pickup_order(
        &self,
        row: NewPickupOrder,
    ) -> Result<PickupOrderRecord, StorageError> {
        let upload_id = row.waste_upload_id.clone();
        self.blocking(move |config, agent| insert_row(config, agent, ORDERS_TABLE, &row))
            .await
            .map_err(|e| match (e, upload_id) {
                (StorageError::RecordNotFound { .. }, Some(id)) => StorageError::RecordNotFound {
                    table: WASTE_UPLOADS_TABLE.to_string(),
                    id,
                },
                (other, _) => other,
            })
    }

    async fn list_pickup_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<PickupOrderRecord>, StorageError> {
        self.blocking(move |config, agent| {
            let mut query = vec![("order", "created_at.desc".to_string())];
            if let Some(status) = status {
                query.push(("status", format!("eq.{}", status)));
            }
            select_rows(config, agent, ORDERS_TABLE, &query)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_project_url() {
        let backend = RestBackend::new(RestConfig::new("https://proj.example.co/", "anon"));
        assert_eq!(
            backend.public_url("waste-images", "waste-1.jpg"),
            "https://proj.example.co/storage/v1/object/public/waste-images/waste-1.jpg"
        );
        assert_eq!(
            backend.config().object_url("waste-images", "waste-1.jpg"),
            "https://proj.example.co/storage/v1/object/waste-images/waste-1.jpg"
        );
        assert_eq!(
            backend.config().table_url("orders"),
            "https://proj.example.co/rest/v1/orders"
        );
    }

    #[test]
    fn debug_output_hides_key() {
        let config = RestConfig::new("http://localhost", "super-secret");
        assert!(!format!("{:?}", config).contains("super-secret"));
    }
}
