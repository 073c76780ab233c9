//! Graph API client for the upload-ready ping.

use std::time::Duration;

use crate::FeedError;

/// Notifies Meta's ingestion API that a fresh artifact is ready at a pull
/// URL. Callers treat failures as best-effort (log and continue).
#[derive(Debug, Clone)]
pub struct UploadClient {
    http: reqwest::Client,
    graph_base: String,
    access_token: Option<String>,
}

impl UploadClient {
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the HTTP client cannot be built.
    pub fn new(
        graph_base: impl Into<String>,
        access_token: Option<String>,
        timeout_secs: u64,
    ) -> Result<Self, FeedError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            graph_base: graph_base.into(),
            access_token,
        })
    }

    /// POSTs `{graph_base}/{feed_id}/uploads` with the pull URL.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] on transport failure or
    /// [`FeedError::UploadRejected`] on a non-2xx response.
    pub async fn notify_upload_ready(&self, feed_id: &str, feed_url: &str) -> Result<(), FeedError> {
        let endpoint = format!("{}/{feed_id}/uploads", self.graph_base);

        let mut request = self
            .http
            .post(&endpoint)
            .json(&serde_json::json!({ "url": feed_url }));
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::UploadRejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(feed_id, "upload notification accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> UploadClient {
        UploadClient::new(server.uri(), Some("token-123".to_string()), 5)
            .expect("failed to build test UploadClient")
    }

    #[tokio::test]
    async fn posts_pull_url_to_feed_uploads_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/987654/uploads"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_json(serde_json::json!({
                "url": "https://shop.example.com/feeds/ratings_and_reviews/data?secret=abc"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server)
            .notify_upload_ready(
                "987654",
                "https://shop.example.com/feeds/ratings_and_reviews/data?secret=abc",
            )
            .await;

        assert!(result.is_ok(), "expected Ok, got: {result:?}");
    }

    #[tokio::test]
    async fn non_success_status_is_surfaced() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/987654/uploads"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .notify_upload_ready("987654", "https://x.example.com/feed")
            .await
            .expect_err("400 must be surfaced");
        assert!(matches!(err, FeedError::UploadRejected { status: 400 }));
    }
}
