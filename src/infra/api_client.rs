//! Authenticated HTTP client for the design-automation REST API.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use designctl_api_types::{ApiErrorBody, AsyncRenderAccepted, RenderJob, RenderRequestBody};
use reqwest::{
    Client, Method, Response,
    header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue},
    multipart,
};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::error::InfraError;
use crate::application::orchestrator::RenderApi;

/// Bytes escaped inside one path segment: everything a URL parser would
/// treat as structure, plus `%` itself.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Join path segments into a relative API path, escaping each one.
///
/// Ids are user input; empty, `.` and `..` are refused because the URL
/// parser would resolve them (even when escaped) against the base path.
pub fn endpoint(segments: &[&str]) -> Result<String, InfraError> {
    let mut path = String::new();
    for segment in segments {
        if matches!(segment.trim(), "" | "." | "..") {
            return Err(InfraError::InvalidSegment {
                segment: (*segment).to_string(),
            });
        }
        if !path.is_empty() {
            path.push('/');
        }
        path.extend(utf8_percent_encode(segment, SEGMENT));
    }
    Ok(path)
}

/// A response body, split by content type.
#[derive(Debug, Clone)]
pub enum ApiPayload {
    Json(Value),
    Binary {
        content_type: Option<String>,
        bytes: Bytes,
    },
}

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base: Url,
    key: String,
}

impl ApiClient {
    pub fn new(base_url: &str, key: String, timeout: Duration) -> Result<Self, InfraError> {
        let base = normalize_base(base_url)?;
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()?;
        Ok(Self { client, base, key })
    }

    pub fn user_agent() -> &'static str {
        concat!("designctl/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn auth_header(&self) -> Result<HeaderValue, InfraError> {
        HeaderValue::from_str(&format!("Bearer {}", self.key))
            .map_err(|e| InfraError::configuration(format!("api key is not a valid header: {e}")))
    }

    pub fn url(&self, path: &str) -> Result<Url, InfraError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(InfraError::Url)
    }

    fn url_with_query(
        &self,
        path: &str,
        query: Option<&[(&str, String)]>,
    ) -> Result<Url, InfraError> {
        let mut url = self.url(path)?;
        if let Some(q) = query {
            url.set_query(None);
            let mut qp = url.query_pairs_mut();
            for (k, v) in q {
                qp.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<&Value>,
    ) -> Result<Response, InfraError> {
        let url = self.url_with_query(path, query)?;
        debug!(
            target = "infra::api_client",
            method = %method,
            url = %url,
            "Sending API request"
        );

        let mut req = self
            .client
            .request(method, url)
            .header(AUTHORIZATION, self.auth_header()?);
        if let Some(b) = body {
            req = req.json(b);
        }

        let resp = req.send().await?;
        Self::check(resp).await
    }

    /// Turn a non-2xx response into [`InfraError::Status`], keeping the
    /// server's error message when the body carries one.
    async fn check(resp: Response) -> Result<Response, InfraError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let bytes = resp.bytes().await.unwrap_or_default();
        let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
            .ok()
            .and_then(ApiErrorBody::into_message);
        Err(InfraError::status(status.as_u16(), message))
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
    ) -> Result<T, InfraError> {
        let resp = self.send(method, path, query, body.as_ref()).await?;
        let bytes = resp.bytes().await?;
        let slice: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &bytes
        };
        serde_json::from_slice(slice)
            .map_err(|e| InfraError::decode(format!("failed to parse body: {e}")))
    }

    pub async fn request_unit(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, String)]>,
        body: Option<Value>,
    ) -> Result<(), InfraError> {
        self.send(method, path, query, body.as_ref()).await?;
        Ok(())
    }

    /// Like [`ApiClient::request`] but accepts binary answers.
    pub async fn request_payload(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<ApiPayload, InfraError> {
        let resp = self.send(method, path, None, body.as_ref()).await?;
        Self::into_payload(resp).await
    }

    async fn into_payload(resp: Response) -> Result<ApiPayload, InfraError> {
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await?;

        let is_json = content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("application/json") || ct.ends_with("+json"));
        if is_json {
            let value = serde_json::from_slice(&bytes)
                .map_err(|e| InfraError::decode(format!("failed to parse body: {e}")))?;
            return Ok(ApiPayload::Json(value));
        }
        Ok(ApiPayload::Binary {
            content_type,
            bytes,
        })
    }

    pub async fn upload(
        &self,
        path: &str,
        file_name: &str,
        data: Vec<u8>,
        fields: &[(&str, String)],
    ) -> Result<Value, InfraError> {
        let url = self.url(path)?;
        let part = multipart::Part::bytes(data).file_name(file_name.to_string());
        let mut form = multipart::Form::new().part("file", part);
        for (name, value) in fields {
            form = form.text(name.to_string(), value.clone());
        }

        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.auth_header()?)
            .multipart(form)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| InfraError::decode(format!("failed to parse body: {e}")))
    }

    /// Fetch a rendered file. Relative URLs resolve against the API base; the
    /// key is only sent to the API's own origin.
    pub async fn download(&self, location: &str) -> Result<Bytes, InfraError> {
        let url = match Url::parse(location) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => self.url(location)?,
            Err(err) => return Err(InfraError::Url(err)),
        };

        let mut req = self.client.get(url.clone());
        if url.origin() == self.base.origin() {
            req = req.header(AUTHORIZATION, self.auth_header()?);
        }
        let resp = Self::check(req.send().await?).await?;
        Ok(resp.bytes().await?)
    }
}

fn normalize_base(base_url: &str) -> Result<Url, InfraError> {
    let mut base = Url::parse(base_url.trim())?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base)
}

fn output_location(value: &Value) -> Option<&str> {
    ["url", "outputUrl", "output_url"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
}

#[async_trait]
impl RenderApi for ApiClient {
    async fn render_binary(&self, body: &RenderRequestBody) -> Result<Bytes, InfraError> {
        let body = serde_json::to_value(body)
            .map_err(|e| InfraError::decode(format!("failed to encode render request: {e}")))?;
        match self.request_payload(Method::POST, "render", Some(body)).await? {
            ApiPayload::Binary { bytes, .. } => Ok(bytes),
            // Some deployments answer with a link to the file instead of the file.
            ApiPayload::Json(value) => match output_location(&value) {
                Some(location) => self.download(location).await,
                None => Err(InfraError::decode(
                    "render response contained neither a file nor an output URL",
                )),
            },
        }
    }

    async fn render_async(
        &self,
        body: &RenderRequestBody,
    ) -> Result<AsyncRenderAccepted, InfraError> {
        let body = serde_json::to_value(body)
            .map_err(|e| InfraError::decode(format!("failed to encode render request: {e}")))?;
        self.request(Method::POST, "render", None, Some(body)).await
    }

    async fn render_status(&self, job_id: &str) -> Result<RenderJob, InfraError> {
        let path = endpoint(&["render", job_id, "status"])?;
        self.request(Method::GET, &path, None, None).await
    }

    async fn download(&self, location: &str) -> Result<Bytes, InfraError> {
        ApiClient::download(self, location).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use designctl_api_types::{RenderFormat, RenderJobStatus};
    use httpmock::MockServer;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.base_url(), "key".into(), Duration::from_secs(5)).expect("client")
    }

    fn body() -> RenderRequestBody {
        RenderRequestBody {
            design_id: Some("d1".into()),
            template_id: None,
            format: RenderFormat::Png,
            quality: None,
            width: None,
            height: None,
            dynamic_data: None,
            is_async: false,
        }
    }

    #[test]
    fn base_path_is_preserved_when_joining() {
        let client =
            ApiClient::new("https://api.example.com/v1", "k".into(), Duration::from_secs(1))
                .expect("client");
        assert_eq!(
            client.url("designs/abc").expect("url").as_str(),
            "https://api.example.com/v1/designs/abc"
        );
    }

    #[test]
    fn endpoint_escapes_ids_into_one_segment() {
        let client =
            ApiClient::new("https://api.example.com/v1", "k".into(), Duration::from_secs(1))
                .expect("client");
        let path = endpoint(&["designs", "a/b?c#d"]).expect("path");
        assert_eq!(path, "designs/a%2Fb%3Fc%23d");
        let url = client.url(&path).expect("url");
        assert_eq!(url.path(), "/v1/designs/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn endpoint_refuses_dot_segments() {
        for id in ["..", ".", "", "  "] {
            let err = endpoint(&["designs", id, "duplicate"]).expect_err(id);
            assert!(matches!(err, InfraError::InvalidSegment { .. }), "{id:?}");
        }
        assert_eq!(endpoint(&["designs", "..x"]).expect("dots inside"), "designs/..x");
    }

    #[tokio::test]
    async fn status_ids_cannot_escape_the_render_path() {
        let server = MockServer::start();
        let escaped = server.mock(|when, then| {
            when.method("GET").path("/admin/status");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"jobId":"admin","status":"completed"}"#);
        });
        let scoped = server.mock(|when, then| {
            when.method("GET")
                .path_includes("/render/")
                .path_includes("/status");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"jobId":"j/../admin","status":"pending"}"#);
        });

        let job = client(&server)
            .render_status("j/../admin")
            .await
            .expect("status");
        assert_eq!(job.job_id, "j/../admin");
        scoped.assert_calls(1);
        escaped.assert_calls(0);
    }

    #[tokio::test]
    async fn error_message_is_taken_from_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/render");
            then.status(422)
                .header("content-type", "application/json")
                .body(r#"{"error":"design d1 has no pages"}"#);
        });

        let err = client(&server)
            .render_binary(&body())
            .await
            .expect_err("422");
        match err {
            InfraError::Status { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message.as_deref(), Some("design d1 has no pages"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_without_message_keeps_status_only() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/render/j1/status");
            then.status(503).body("upstream down");
        });

        let err = client(&server)
            .render_status("j1")
            .await
            .expect_err("503");
        assert!(matches!(
            err,
            InfraError::Status {
                status: 503,
                message: None
            }
        ));
    }

    #[tokio::test]
    async fn binary_render_returns_bytes_and_sends_bearer() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("POST")
                .path("/render")
                .header("authorization", "Bearer key")
                .json_body_includes(r#"{"designId":"d1","format":"png"}"#);
            then.status(200)
                .header("content-type", "image/png")
                .body(b"\x89PNG-bytes".as_slice());
        });

        let bytes = client(&server).render_binary(&body()).await.expect("render");
        assert_eq!(&bytes[..], b"\x89PNG-bytes");
        mock.assert();
    }

    #[tokio::test]
    async fn json_render_answer_is_followed_to_the_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("POST").path("/render");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"url":"/files/out.png"}"#);
        });
        let file = server.mock(|when, then| {
            when.method("GET").path("/files/out.png");
            then.status(200)
                .header("content-type", "image/png")
                .body("PNG");
        });

        let bytes = client(&server).render_binary(&body()).await.expect("render");
        assert_eq!(&bytes[..], b"PNG");
        file.assert();
    }

    #[tokio::test]
    async fn status_is_parsed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/render/job-7/status");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"jobId":"job-7","status":"processing","estimatedTime":4}"#);
        });

        let job = client(&server).render_status("job-7").await.expect("status");
        assert_eq!(job.status, RenderJobStatus::Processing);
        assert_eq!(job.estimated_time, Some(4));
    }

    #[tokio::test]
    async fn empty_success_body_reads_as_null() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("DELETE").path("/designs/d1");
            then.status(204);
        });

        let value: Value = client(&server)
            .request(Method::DELETE, "designs/d1", None, None)
            .await
            .expect("delete");
        assert!(value.is_null());
    }
}
