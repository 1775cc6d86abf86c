//! Document store REST client.
//!
//! Documents live under
//! `{documents_url}/projects/{project}/databases/(default)/documents`.
//! Reads use plain `GET`; all writes go through the `:commit` endpoint so a
//! write can ask the server to stamp fields with its own clock
//! (`REQUEST_TIME` transforms). Every request carries the signed-in user's
//! id token as a bearer token.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use super::{BackendError, Value, generate_random_string, parse_json, read_body};
use crate::config::BackendConfig;

/// Length of client-generated document ids.
const AUTO_ID_LENGTH: usize = 20;

/// Field map of a document.
pub type Fields = BTreeMap<String, Value>;

/// Build a field map from any serializable record.
///
/// # Errors
///
/// Returns an error if the record does not serialize to a JSON object.
pub fn fields_from<T: Serialize>(record: &T) -> Result<Fields, BackendError> {
    match serde_json::to_value(record)? {
        serde_json::Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), Value::from_json(v)))
            .collect()),
        other => Err(BackendError::Parse(serde::de::Error::custom(format!(
            "expected an object, got {other}"
        )))),
    }
}

/// A stored document.
#[derive(Debug, Clone)]
pub struct Document {
    /// Last path segment of the document name.
    pub id: String,
    pub fields: Fields,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

impl Document {
    /// The fields as a plain JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Decode the fields into a domain record.
    ///
    /// # Errors
    ///
    /// Returns an error if the fields do not match the record's shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BackendError> {
        Ok(serde_json::from_value(self.to_json())?)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Fields,
    #[serde(default)]
    create_time: Option<DateTime<Utc>>,
    #[serde(default)]
    update_time: Option<DateTime<Utc>>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        let id = raw.name.rsplit('/').next().unwrap_or_default().to_string();
        Self {
            id,
            fields: raw.fields,
            create_time: raw.create_time,
            update_time: raw.update_time,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    #[serde(default)]
    document: Option<RawDocument>,
}

/// Sort direction for [`DocumentClient::query_eq_ordered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOrder {
    Ascending,
    Descending,
}

impl QueryOrder {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ASCENDING",
            Self::Descending => "DESCENDING",
        }
    }
}

/// How a commit treats an existing document.
#[derive(Debug, Clone, Copy)]
enum WriteMode {
    /// Create or replace the whole document.
    Set,
    /// Merge the given fields; the document must exist.
    Update,
    /// Create; the document must not exist.
    Create,
}

/// Client for the document store.
#[derive(Clone)]
pub struct DocumentClient {
    inner: Arc<DocumentClientInner>,
}

struct DocumentClientInner {
    client: reqwest::Client,
    /// `projects/{project}/databases/(default)/documents`
    root: String,
    /// `{documents_url}/{root}`
    base_url: String,
}

impl DocumentClient {
    /// Create a new document client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &BackendConfig) -> Self {
        let root = format!(
            "projects/{}/databases/(default)/documents",
            config.project_id
        );
        let base_url = format!("{}/{root}", config.documents_url);
        Self {
            inner: Arc::new(DocumentClientInner {
                client,
                root,
                base_url,
            }),
        }
    }

    /// Fetch a document. Returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    #[instrument(skip(self, id_token))]
    pub async fn get(
        &self,
        collection: &str,
        id: &str,
        id_token: &SecretString,
    ) -> Result<Option<Document>, BackendError> {
        let url = format!(
            "{}/{collection}/{}",
            self.inner.base_url,
            urlencoding::encode(id)
        );
        let response = self
            .inner
            .client
            .get(&url)
            .bearer_auth(id_token.expose_secret())
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let text = read_body(response).await?;
        let raw: RawDocument = parse_json(&text)?;
        Ok(Some(raw.into()))
    }

    /// Create or overwrite `collection/id` with `fields`, stamping each name in
    /// `server_timestamps` with the server time.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    #[instrument(skip(self, fields, id_token))]
    pub async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        server_timestamps: &[&str],
        id_token: &SecretString,
    ) -> Result<(), BackendError> {
        self.commit(collection, id, fields, server_timestamps, WriteMode::Set, id_token)
            .await
    }

    /// Merge `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if the document does not exist.
    #[instrument(skip(self, fields, id_token))]
    pub async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        server_timestamps: &[&str],
        id_token: &SecretString,
    ) -> Result<(), BackendError> {
        self.commit(collection, id, fields, server_timestamps, WriteMode::Update, id_token)
            .await
    }

    /// Create a document with a generated id and return that id.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    #[instrument(skip(self, fields, id_token))]
    pub async fn create(
        &self,
        collection: &str,
        fields: Fields,
        server_timestamps: &[&str],
        id_token: &SecretString,
    ) -> Result<String, BackendError> {
        let id = generate_random_string(AUTO_ID_LENGTH);
        self.commit(collection, &id, fields, server_timestamps, WriteMode::Create, id_token)
            .await?;
        Ok(id)
    }

    /// Documents of `collection` whose `field` equals `value`, sorted by
    /// `order_by`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a result cannot be parsed.
    #[instrument(skip(self, value, id_token))]
    pub async fn query_eq_ordered(
        &self,
        collection: &str,
        field: &str,
        value: Value,
        order_by: &str,
        order: QueryOrder,
        id_token: &SecretString,
    ) -> Result<Vec<Document>, BackendError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": field },
                        "op": "EQUAL",
                        "value": value,
                    }
                },
                "orderBy": [{
                    "field": { "fieldPath": order_by },
                    "direction": order.as_str(),
                }],
            }
        });

        let url = format!("{}:runQuery", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(id_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        let text = read_body(response).await?;
        let results: Vec<QueryResult> = parse_json(&text)?;

        Ok(results
            .into_iter()
            .filter_map(|r| r.document)
            .map(Document::from)
            .collect())
    }

    async fn commit(
        &self,
        collection: &str,
        id: &str,
        fields: Fields,
        server_timestamps: &[&str],
        mode: WriteMode,
        id_token: &SecretString,
    ) -> Result<(), BackendError> {
        let name = format!("{}/{collection}/{id}", self.inner.root);
        let body = json!({ "writes": [write_json(&name, fields, server_timestamps, mode)] });

        let url = format!("{}:commit", self.inner.base_url);
        let response = self
            .inner
            .client
            .post(&url)
            .bearer_auth(id_token.expose_secret())
            .json(&body)
            .send()
            .await?;

        match read_body(response).await {
            Ok(_) => Ok(()),
            Err(BackendError::Status { status: 404, .. }) => {
                Err(BackendError::NotFound(format!("{collection}/{id}")))
            }
            Err(e) => Err(e),
        }
    }
}

/// Build one entry of a commit's `writes` array.
fn write_json(
    name: &str,
    fields: Fields,
    server_timestamps: &[&str],
    mode: WriteMode,
) -> serde_json::Value {
    let field_paths: Vec<String> = fields.keys().cloned().collect();
    let mut write = json!({
        "update": { "name": name, "fields": fields },
    });

    match mode {
        WriteMode::Set => {}
        WriteMode::Update => {
            write["updateMask"] = json!({ "fieldPaths": field_paths });
            write["currentDocument"] = json!({ "exists": true });
        }
        WriteMode::Create => {
            write["currentDocument"] = json!({ "exists": false });
        }
    }

    if !server_timestamps.is_empty() {
        let transforms: Vec<_> = server_timestamps
            .iter()
            .map(|path| json!({ "fieldPath": path, "setToServerValue": "REQUEST_TIME" }))
            .collect();
        write["updateTransforms"] = serde_json::Value::Array(transforms);
    }

    write
}
