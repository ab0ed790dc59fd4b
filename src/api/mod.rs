mod pagination;
#[cfg(test)]
pub(crate) mod testing;

use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::path::PathBuf;
use url::Url;

use crate::models::*;
use pagination::next_page;

/// Django's anti-forgery form field.
pub const CSRF_FIELD: &str = "csrfmiddlewaretoken";
/// Multipart field the bulk exception endpoint reads the CSV from.
pub const FILE_FIELD: &str = "students_list";

// ─── Error types ────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum LmsError {
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Rate limited – retry after {retry_after:.1}s")]
    RateLimited { retry_after: f64 },
    #[error("Unauthorized – check your session cookie")]
    Unauthorized,
    #[error("HTTP {status}: response was not valid JSON: {}", snippet(.body))]
    MalformedResponse { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

fn snippet(body: &str) -> String {
    const MAX: usize = 120;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}

/// Decode a JSON body, reporting unparseable text instead of panicking on it.
pub fn decode_json<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, LmsError> {
    serde_json::from_str(body).map_err(|_| LmsError::MalformedResponse {
        status,
        body: body.to_string(),
    })
}

/// Turn an error response body into an `LmsError`. The LMS answers errors
/// with JSON carrying one of a few message keys.
fn error_from_body(status: u16, body: &str) -> LmsError {
    let value: serde_json::Value = match decode_json(status, body) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let message = ["developer_message", "error", "message", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        .or_else(|| {
            value
                .get("general_errors")
                .and_then(|v| v.as_array())
                .map(|errs| {
                    errs.iter()
                        .filter_map(|e| e.as_str())
                        .collect::<Vec<_>>()
                        .join("; ")
                })
        })
        .unwrap_or_else(|| value.to_string());
    LmsError::Api { status, message }
}

// ─── Multipart submission ───────────────────────────────────────────────────

/// A multipart form post: one CSV file plus the anti-forgery token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub method: String,
    pub url: String,
    pub file: PathBuf,
    pub file_name: String,
    pub csrf_token: String,
}

pub trait MultipartSubmitter {
    /// Send the form and return the raw response body.
    fn submit_multipart(
        &self,
        request: UploadRequest,
    ) -> impl Future<Output = Result<String, LmsError>> + Send;
}

// ─── Client ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LmsClient {
    client: Client,
    base_url: Url,
    session_id: String,
    csrf_token: String,
}

impl LmsClient {
    pub fn new(base_url: &str, session_id: &str, csrf_token: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid LMS URL: {base_url}"))?;

        let client = Client::builder()
            .user_agent(concat!("lms-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            session_id: session_id.to_string(),
            csrf_token: csrf_token.to_string(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, LmsError> {
        self.base_url
            .join(path)
            .with_context(|| format!("Bad LMS path: {path}"))
            .map_err(LmsError::Other)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut cookie = format!("csrftoken={}", self.csrf_token);
        if !self.session_id.is_empty() {
            cookie.push_str(&format!("; sessionid={}", self.session_id));
        }
        self.client
            .request(method, url)
            .header(header::ACCEPT, "application/json")
            .header(header::COOKIE, cookie)
            .header(header::REFERER, self.base_url.as_str())
            .header("X-CSRFToken", &self.csrf_token)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, LmsError> {
        let resp = builder.send().await?;
        Self::check_status(resp).await
    }

    async fn check_status(resp: Response) -> Result<Response, LmsError> {
        match resp.status() {
            StatusCode::UNAUTHORIZED => Err(LmsError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<f64>().ok())
                    .unwrap_or(1.0);
                Err(LmsError::RateLimited { retry_after: retry })
            }
            s if s.is_client_error() || s.is_server_error() => {
                let status = s.as_u16();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(status, "LMS request failed");
                Err(error_from_body(status, &body))
            }
            _ => Ok(resp),
        }
    }

    async fn parse_json<T: DeserializeOwned>(resp: Response) -> Result<T, LmsError> {
        let status = resp.status().as_u16();
        let body = resp.text().await?;
        decode_json(status, &body)
    }

    async fn get_all_pages<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, LmsError> {
        let mut url = self.url(path)?;
        for (k, v) in params {
            url.query_pairs_mut().append_pair(k, v);
        }

        let mut all = Vec::new();
        let mut next = Some(url);
        while let Some(url) = next.take() {
            let resp = self.send(self.request(Method::GET, url)).await?;
            let headers = resp.headers().clone();
            let page: Paginated<T> = Self::parse_json(resp).await?;
            all.extend(page.results);
            next = match next_page(&page.pagination, &headers) {
                Some(link) => Some(self.url(&link)?),
                None => None,
            };
        }
        Ok(all)
    }

    // ── Courses ─────────────────────────────────────────────────────────

    pub async fn list_courses(&self, username: &str) -> Result<Vec<Course>, LmsError> {
        let mut params = vec![("page_size", "50")];
        if !username.is_empty() {
            params.push(("username", username));
        }
        let courses: Vec<Course> = self.get_all_pages("/api/courses/v1/courses/", &params).await?;
        tracing::info!(count = courses.len(), "fetched course listing");
        Ok(courses)
    }

    // ── Course discovery ────────────────────────────────────────────────

    pub async fn search_courses(
        &self,
        query: &str,
        page_size: usize,
        page_index: usize,
    ) -> Result<SearchResponse, LmsError> {
        let url = self.url("/search/course_discovery/")?;
        let page_size = page_size.to_string();
        let page_index = page_index.to_string();
        let form = [
            ("search_string", query),
            ("page_size", page_size.as_str()),
            ("page_index", page_index.as_str()),
        ];
        let resp = self
            .send(self.request(Method::POST, url).form(&form))
            .await?;
        let results: SearchResponse = Self::parse_json(resp).await?;
        tracing::info!(query, total = results.total, "course discovery search");
        Ok(results)
    }
}

impl MultipartSubmitter for LmsClient {
    async fn submit_multipart(&self, request: UploadRequest) -> Result<String, LmsError> {
        let data = tokio::fs::read(&request.file).await.map_err(|e| {
            LmsError::Other(anyhow!("Cannot read '{}': {e}", request.file.display()))
        })?;

        let part = Part::bytes(data)
            .file_name(request.file_name.clone())
            .mime_str("text/csv")
            .map_err(|e| LmsError::Other(anyhow!("Invalid content-type: {e}")))?;
        let form = Form::new()
            .text(CSRF_FIELD, request.csrf_token.clone())
            .part(FILE_FIELD, part);

        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| LmsError::Other(anyhow!("Invalid form method {:?}: {e}", request.method)))?;
        let url = self.url(&request.url)?;

        tracing::info!(%url, file = %request.file_name, "submitting multipart form");
        let resp = self.send(self.request(method, url).multipart(form)).await?;
        Ok(resp.text().await?)
    }
}
