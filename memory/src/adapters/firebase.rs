use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::auth::{ServiceAccountKey, ServiceAccountTokenSource};
use crate::errors::{MemoryResult, MemoryStoreError};
use crate::key::MemoryKey;
use crate::store::{MemorySnapshot, MemoryStore};
use crate::turn::ConversationTurn;

/// Firebase Realtime Database backend, spoken to over its REST API.
///
/// Reads request an ETag which becomes the snapshot revision; writes with a
/// known revision are sent with `if-match` so a concurrent update surfaces
/// as `MemoryStoreError::Conflict` instead of being overwritten.
#[derive(Debug)]
pub struct FirebaseMemoryStore {
    client: Client,
    database_url: String,
    tokens: Option<ServiceAccountTokenSource>,
}

/// Arrays come back as JSON arrays, or as index-keyed objects once they have holes.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTurns {
    List(Vec<Option<ConversationTurn>>),
    Keyed(BTreeMap<String, ConversationTurn>),
}

impl FirebaseMemoryStore {
    /// `credentials_json` is the content of a service-account key file.
    /// Without it requests are unauthenticated (emulator or open rules).
    pub fn new(database_url: &str, credentials_json: Option<&str>) -> MemoryResult<Self> {
        let database_url = database_url.trim().trim_end_matches('/').to_string();
        if database_url.is_empty() {
            return Err(MemoryStoreError::Config("Database URL is empty".to_string()));
        }

        let client = Client::new();
        let tokens = match credentials_json.map(str::trim).filter(|json| !json.is_empty()) {
            Some(json) => {
                let key = ServiceAccountKey::from_json(json)?;
                Some(ServiceAccountTokenSource::new(key, client.clone())?)
            }
            None => None,
        };

        Ok(Self {
            client,
            database_url,
            tokens,
        })
    }

    fn url_for(&self, key: &MemoryKey) -> String {
        format!("{}/{}.json", self.database_url, key.as_str())
    }

    async fn authorize(&self, request: RequestBuilder) -> MemoryResult<RequestBuilder> {
        match &self.tokens {
            Some(tokens) => {
                let token = tokens.access_token().await?;
                Ok(request.query(&[("access_token", token)]))
            }
            None => Ok(request),
        }
    }

    fn decode(value: Value) -> MemoryResult<Vec<ConversationTurn>> {
        if value.is_null() {
            return Ok(Vec::new());
        }

        let turns = match serde_json::from_value::<StoredTurns>(value)? {
            StoredTurns::List(turns) => turns.into_iter().flatten().collect(),
            StoredTurns::Keyed(map) => {
                let mut indexed: Vec<(u64, ConversationTurn)> = map
                    .into_iter()
                    .filter_map(|(index, turn)| index.parse().ok().map(|i| (i, turn)))
                    .collect();
                indexed.sort_by_key(|(index, _)| *index);
                indexed.into_iter().map(|(_, turn)| turn).collect()
            }
        };
        Ok(turns)
    }
}

async fn http_error(response: reqwest::Response) -> MemoryStoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    // Error bodies look like {"error": "..."}
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    MemoryStoreError::Http { status, message }
}

#[async_trait]
impl MemoryStore for FirebaseMemoryStore {
    async fn load(&self, key: &MemoryKey) -> MemoryResult<MemorySnapshot> {
        let request = self
            .client
            .get(self.url_for(key))
            .header("X-Firebase-ETag", "true");
        let response = self.authorize(request).await?.send().await?;

        if !response.status().is_success() {
            return Err(http_error(response).await);
        }

        let revision = response
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let value: Value = response.json().await?;
        let turns = Self::decode(value)?;

        debug!(%key, turns = turns.len(), revision = ?revision, "Loaded conversation memory");
        Ok(MemorySnapshot { turns, revision })
    }

    async fn save(
        &self,
        key: &MemoryKey,
        turns: &[ConversationTurn],
        expected_revision: Option<&str>,
    ) -> MemoryResult<()> {
        let mut request = self
            .client
            .put(self.url_for(key))
            .query(&[("print", "silent")])
            .json(turns);
        if let Some(revision) = expected_revision {
            request = request.header(reqwest::header::IF_MATCH, revision);
        }
        let response = self.authorize(request).await?.send().await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::PRECONDITION_FAILED => Err(MemoryStoreError::Conflict(key.to_string())),
            _ => Err(http_error(response).await),
        }
    }
}
