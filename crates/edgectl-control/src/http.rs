//! JSON-over-HTTP control plane
//!
//! The concurrency token travels in the `ETag` response header and comes
//! back in the `If-Match` request header. Error bodies look like
//! `{"code": "...", "message": "..."}`.

use async_trait::async_trait;
use edgectl_core::{Distribution, DistributionOutput, DistributionRecord, Tags};
use reqwest::header::{ETAG, IF_MATCH};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::api::{ApiError, ApiErrorKind, ApiResult, ControlPlane};
use crate::config::ControllerConfig;
use crate::error::{ControlError, Result};

/// HTTP control-plane client
pub struct HttpControlPlane {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRequest<'a> {
    distribution_config: &'a DistributionRecord,
    tags: &'a Tags,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagsBody {
    #[serde(default)]
    tags: Tags,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UntagBody<'a> {
    tag_keys: &'a [String],
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default, alias = "Code")]
    code: Option<String>,
    #[serde(default, alias = "Message")]
    message: Option<String>,
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::timeout(e.to_string())
        } else {
            ApiError::new(ApiErrorKind::Other, e.to_string())
        }
    }
}

impl HttpControlPlane {
    /// Create a client for the API rooted at `endpoint`
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base = Url::parse(endpoint)
            .map_err(|e| ControlError::InvalidConfig(format!("endpoint '{endpoint}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(ControlError::InvalidConfig(format!(
                "endpoint '{endpoint}' cannot carry a path"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("edgectl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ControlError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base,
            token,
        })
    }

    pub fn from_config(config: &ControllerConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            config.resolved_token(),
            config.request_timeout,
        )
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn tags_url(&self, arn: &str, operation: Option<&str>) -> Url {
        let mut url = self.url(&["tagging"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("Resource", arn);
            if let Some(op) = operation {
                query.append_pair("Operation", op);
            }
        }
        url
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from(response).await)
        }
    }

    async fn distribution(&self, response: Response) -> ApiResult<DistributionOutput> {
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ApiError::new(ApiErrorKind::Other, "response carried no ETag"))?;
        let distribution: Distribution = decode(response).await?;
        Ok(DistributionOutput { distribution, etag })
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ApiError::new(ApiErrorKind::Other, format!("invalid response body: {e}"))
    })
}

async fn error_from(response: Response) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
    let (code, message) = match body {
        Some(ErrorBody { code, message }) => (code, message),
        None => (None, None),
    };
    let message = message.unwrap_or_else(|| {
        if text.is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            text
        }
    });
    ApiError::from_wire(code.as_deref(), message, status.as_u16())
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn create_distribution(
        &self,
        record: &DistributionRecord,
        tags: &Tags,
    ) -> ApiResult<DistributionOutput> {
        let body = CreateRequest {
            distribution_config: record,
            tags,
        };
        let request = self
            .request(reqwest::Method::POST, self.url(&["distribution"]))
            .json(&body);
        let response = self.send(request).await?;
        self.distribution(response).await
    }

    async fn get_distribution(&self, id: &str) -> ApiResult<DistributionOutput> {
        let request = self.request(reqwest::Method::GET, self.url(&["distribution", id]));
        let response = self.send(request).await?;
        self.distribution(response).await
    }

    async fn update_distribution(
        &self,
        id: &str,
        record: &DistributionRecord,
        if_match: &str,
    ) -> ApiResult<DistributionOutput> {
        let request = self
            .request(
                reqwest::Method::PUT,
                self.url(&["distribution", id, "config"]),
            )
            .header(IF_MATCH, if_match)
            .json(record);
        let response = self.send(request).await?;
        self.distribution(response).await
    }

    async fn delete_distribution(&self, id: &str, if_match: &str) -> ApiResult<()> {
        let request = self
            .request(reqwest::Method::DELETE, self.url(&["distribution", id]))
            .header(IF_MATCH, if_match);
        self.send(request).await?;
        Ok(())
    }

    async fn list_tags(&self, arn: &str) -> ApiResult<Tags> {
        let request = self.request(reqwest::Method::GET, self.tags_url(arn, None));
        let response = self.send(request).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(Tags::new());
        }
        let body: TagsBody = decode(response).await?;
        Ok(body.tags)
    }

    async fn tag_resource(&self, arn: &str, tags: &Tags) -> ApiResult<()> {
        let request = self
            .request(reqwest::Method::POST, self.tags_url(arn, Some("Tag")))
            .json(&TagsBody { tags: tags.clone() });
        self.send(request).await?;
        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> ApiResult<()> {
        let request = self
            .request(reqwest::Method::POST, self.tags_url(arn, Some("Untag")))
            .json(&UntagBody { tag_keys: keys });
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockControlPlane, sample_record};
    use edgectl_core::DistributionStatus;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> HttpControlPlane {
        HttpControlPlane::new(
            &format!("{}/2020-05-31", server.uri()),
            Some("token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn distribution() -> Distribution {
        MockControlPlane::new()
            .seed(sample_record(), DistributionStatus::Deployed)
            .distribution
    }

    #[tokio::test]
    async fn test_get_reads_etag_header() {
        let server = MockServer::start().await;
        let dist = distribution();

        Mock::given(method("GET"))
            .and(path(format!("/2020-05-31/distribution/{}", dist.id)))
            .and(header("Authorization", "Bearer token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(&dist)
                    .insert_header("ETag", "E2QWRUHAPOMQZL"),
            )
            .mount(&server)
            .await;

        let output = client(&server).get_distribution(&dist.id).await.unwrap();
        assert_eq!(output.etag, "E2QWRUHAPOMQZL");
        assert_eq!(output.distribution, dist);
    }

    #[tokio::test]
    async fn test_update_sends_if_match() {
        let server = MockServer::start().await;
        let dist = distribution();

        Mock::given(method("PUT"))
            .and(path(format!("/2020-05-31/distribution/{}/config", dist.id)))
            .and(header("If-Match", "E1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(&dist)
                    .insert_header("ETag", "E2"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let output = client(&server)
            .update_distribution(&dist.id, &dist.distribution_config, "E1")
            .await
            .unwrap();
        assert_eq!(output.etag, "E2");
    }

    #[tokio::test]
    async fn test_error_body_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/2020-05-31/distribution/E1"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "code": "DistributionNotDisabled",
                "message": "The distribution you are trying to delete has not been disabled."
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .delete_distribution("E1", "E0")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::DistributionNotDisabled);
        assert_eq!(err.status, Some(409));
    }

    #[tokio::test]
    async fn test_bare_status_is_classified() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2020-05-31/distribution/EGONE"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/2020-05-31/distribution/EGONE/config"))
            .respond_with(ResponseTemplate::new(412).set_body_string("stale"))
            .mount(&server)
            .await;

        let plane = client(&server);
        assert!(plane.get_distribution("EGONE").await.unwrap_err().is_not_found());

        let err = plane
            .update_distribution("EGONE", &sample_record(), "E0")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::PreconditionFailed);
        assert_eq!(err.message, "stale");
    }

    #[tokio::test]
    async fn test_transport_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2020-05-31/distribution/ESLOW"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let plane = HttpControlPlane::new(&format!("{}/2020-05-31", server.uri()), None, Duration::from_millis(100)).unwrap();
        let err = plane.get_distribution("ESLOW").await.unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_tags() {
        let server = MockServer::start().await;
        let arn = "arn:aws:cloudfront::123456789012:distribution/E1";

        Mock::given(method("GET"))
            .and(path("/2020-05-31/tagging"))
            .and(query_param("Resource", arn))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"Tags": {"env": "prod"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/2020-05-31/tagging"))
            .and(query_param("Operation", "Untag"))
            .and(body_json(serde_json::json!({"TagKeys": ["env"]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let plane = client(&server);
        let tags = plane.list_tags(arn).await.unwrap();
        assert_eq!(tags.get("env").map(String::as_str), Some("prod"));
        plane.untag_resource(arn, &["env".to_string()]).await.unwrap();
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        assert!(HttpControlPlane::new("mailto:ops@example.com", None, Duration::from_secs(1)).is_err());
        assert!(HttpControlPlane::new("::", None, Duration::from_secs(1)).is_err());
    }
}
