/// Object storage adapter speaking the Supabase storage REST API.
///
///  - Upload: `POST {endpoint}/storage/v1/object/{bucket}/{filename}`
///  - Public: `GET  {endpoint}/storage/v1/object/public/{bucket}/{filename}`
///
/// The bucket must be public for the returned URLs to resolve.
use async_trait::async_trait;
use bytes::Bytes;
use parcelscan_core::{AssetStore, StoreError};
use reqwest::Client;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct HttpStoreConfig {
    /// e.g. https://abcd.supabase.co
    pub endpoint: String,
    pub bucket: String,
    /// Service or anon key sent as bearer token.
    pub api_key: String,
}

pub struct HttpAssetStore {
    config: HttpStoreConfig,
    http_client: Client,
}

impl HttpAssetStore {
    pub fn new(mut config: HttpStoreConfig) -> Self {
        config.endpoint = config.endpoint.trim_end_matches('/').to_string();
        Self {
            config,
            http_client: Client::new(),
        }
    }

    fn object_url(&self, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.endpoint,
            self.config.bucket,
            urlencoding::encode(filename)
        )
    }
}

#[async_trait]
impl AssetStore for HttpAssetStore {
    fn name(&self) -> &str {
        "http"
    }

    async fn upload(
        &self,
        data: Bytes,
        filename: &str,
        content_type: &str,
    ) -> Result<String, StoreError> {
        let size = data.len();
        let resp = self
            .http_client
            .post(self.object_url(filename))
            .bearer_auth(&self.config.api_key)
            .header("apikey", &self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), filename, "Asset upload rejected");
            return Err(StoreError::Upload {
                status: status.as_u16(),
                message,
            });
        }

        info!(bucket = %self.config.bucket, filename, bytes = size, "Uploaded asset");
        Ok(self.public_url(filename))
    }

    fn public_url(&self, filename: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.endpoint,
            self.config.bucket,
            urlencoding::encode(filename)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn store(endpoint: String) -> HttpAssetStore {
        HttpAssetStore::new(HttpStoreConfig {
            endpoint,
            bucket: "scans".into(),
            api_key: "key".into(),
        })
    }

    #[test]
    fn public_url_layout() {
        let store = store("https://proj.supabase.co/".into());
        assert_eq!(
            store.public_url("parcel_1700000000000.jpg"),
            "https://proj.supabase.co/storage/v1/object/public/scans/parcel_1700000000000.jpg"
        );
    }

    #[tokio::test]
    async fn upload_posts_bytes_and_returns_public_url() {
        let app = Router::new().route(
            "/storage/v1/object/:bucket/:name",
            post(
                |Path((bucket, name)): Path<(String, String)>, headers: HeaderMap, body: axum::body::Bytes| async move {
                    assert_eq!(bucket, "scans");
                    assert_eq!(name, "parcel_1.jpg");
                    assert_eq!(headers["content-type"], "image/jpeg");
                    assert_eq!(headers["authorization"], "Bearer key");
                    assert_eq!(&body[..], b"jpeg-bytes");
                    StatusCode::OK
                },
            ),
        );
        let base = serve(app).await;
        let store = store(base.clone());

        let url = store
            .upload(Bytes::from_static(b"jpeg-bytes"), "parcel_1.jpg", "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, format!("{base}/storage/v1/object/public/scans/parcel_1.jpg"));
    }

    #[tokio::test]
    async fn conflict_is_upload_error() {
        let app = Router::new().route(
            "/storage/v1/object/:bucket/:name",
            post(|| async { (StatusCode::CONFLICT, "Duplicate") }),
        );
        let store = store(serve(app).await);

        let err = store
            .upload(Bytes::from_static(b"x"), "parcel_1.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Upload { status: 409, .. }));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        let store = store("http://127.0.0.1:1".into());
        let err = store
            .upload(Bytes::from_static(b"x"), "p.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Transport(_)));
    }
}
