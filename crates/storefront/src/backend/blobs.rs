//! Object storage REST client.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::{BackendError, parse_json, read_body};
use crate::config::BackendConfig;

/// Metadata of an uploaded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredObject {
    /// Full object path inside the bucket.
    pub name: String,
    pub bucket: String,
    #[serde(default)]
    pub content_type: Option<String>,
    /// Comma-separated download tokens; the first one is used in URLs.
    #[serde(default)]
    pub download_tokens: Option<String>,
}

/// Client for object storage.
#[derive(Clone)]
pub struct BlobClient {
    inner: Arc<BlobClientInner>,
}

struct BlobClientInner {
    client: reqwest::Client,
    storage_url: String,
    bucket: String,
}

impl BlobClient {
    /// Create a new storage client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &BackendConfig) -> Self {
        Self {
            inner: Arc::new(BlobClientInner {
                client,
                storage_url: config.storage_url.clone(),
                bucket: config.storage_bucket.clone(),
            }),
        }
    }

    /// Upload `bytes` to `path` in the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the upload is rejected or the response cannot be
    /// parsed.
    #[instrument(skip(self, bytes, id_token), fields(size = bytes.len()))]
    pub async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        id_token: &SecretString,
    ) -> Result<StoredObject, BackendError> {
        let mut url = Url::parse(&format!(
            "{}/b/{}/o",
            self.inner.storage_url, self.inner.bucket
        ))?;
        url.query_pairs_mut().append_pair("name", path);

        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(id_token.expose_secret())
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let text = read_body(response).await?;
        let object: StoredObject = parse_json(&text)?;
        tracing::info!(name = %object.name, "Uploaded object");
        Ok(object)
    }

    /// Public download URL for an uploaded object.
    #[must_use]
    pub fn download_url(&self, object: &StoredObject) -> String {
        let mut url = format!(
            "{}/b/{}/o/{}?alt=media",
            self.inner.storage_url,
            object.bucket,
            urlencoding::encode(&object.name)
        );
        if let Some(token) = object
            .download_tokens
            .as_deref()
            .and_then(|t| t.split(',').next())
            .filter(|t| !t.is_empty())
        {
            url.push_str("&token=");
            url.push_str(&urlencoding::encode(token));
        }
        url
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base: &str) -> BlobClient {
        let config = BackendConfig::for_base_url(base);
        BlobClient::new(reqwest::Client::new(), &config)
    }

    #[test]
    fn test_download_url_encodes_path() {
        let blobs = client("https://files.cineteca.co");
        let object = StoredObject {
            name: "avatars/uid-1/uid-1-1700-me.png".to_string(),
            bucket: "cineteca-test.appspot.com".to_string(),
            content_type: Some("image/png".to_string()),
            download_tokens: Some("tok-1,tok-2".to_string()),
        };

        assert_eq!(
            blobs.download_url(&object),
            "https://files.cineteca.co/storage/b/cineteca-test.appspot.com/o/\
             avatars%2Fuid-1%2Fuid-1-1700-me.png?alt=media&token=tok-1"
        );
    }

    #[test]
    fn test_download_url_without_token() {
        let blobs = client("https://files.cineteca.co");
        let object = StoredObject {
            name: "a.png".to_string(),
            bucket: "b".to_string(),
            content_type: None,
            download_tokens: None,
        };
        assert!(blobs.download_url(&object).ends_with("/o/a.png?alt=media"));
    }

    #[tokio::test]
    async fn test_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/storage/b/cineteca-test.appspot.com/o"))
            .and(query_param("name", "avatars/uid-1/me.png"))
            .and(header("content-type", "image/png"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "avatars/uid-1/me.png",
                "bucket": "cineteca-test.appspot.com",
                "contentType": "image/png",
                "downloadTokens": "tok-1"
            })))
            .mount(&server)
            .await;

        let object = client(&server.uri())
            .upload(
                "avatars/uid-1/me.png",
                vec![0x89, 0x50, 0x4e, 0x47],
                "image/png",
                &SecretString::from("id-token"),
            )
            .await
            .unwrap();

        assert_eq!(object.download_tokens.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_upload_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "error": {"code": 403, "message": "Permission denied."}
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .upload("a.png", vec![1], "image/png", &SecretString::from("t"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::Status { status: 403, .. }));
    }
}
