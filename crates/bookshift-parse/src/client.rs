//! Parse REST client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::codes;
use crate::{
    Book, DEFAULT_PAGE_SIZE, FindResponse, ParseError, Privilege, Query, RecordStore,
    SaveResponse, USER_CLASS, User,
};

const APPLICATION_ID_HEADER: &str = "X-Parse-Application-Id";
const REST_API_KEY_HEADER: &str = "X-Parse-REST-API-Key";
const MASTER_KEY_HEADER: &str = "X-Parse-Master-Key";

/// Attempts per request: initial + 3 retries with backoff.
const MAX_ATTEMPTS: u32 = 4;

/// Client for the Parse Server REST API.
pub struct ParseClient {
    http: Client,
    server_url: String,
    application_id: String,
    rest_api_key: Option<String>,
}

impl ParseClient {
    /// Create a new client for the given server URL (for example
    /// `https://parse.example.com/parse`).
    pub fn new(
        server_url: impl Into<String>,
        application_id: impl Into<String>,
    ) -> Result<Self, ParseError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;

        let server_url: String = server_url.into();

        Ok(Self {
            http,
            server_url: server_url.trim_end_matches('/').to_string(),
            application_id: application_id.into(),
            rest_api_key: None,
        })
    }

    /// Send the REST API key with every request.
    pub fn with_rest_api_key(mut self, key: impl Into<String>) -> Self {
        self.rest_api_key = Some(key.into());
        self
    }

    /// Get the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Attach the application and privilege headers.
    fn authorize(&self, request: RequestBuilder, privilege: Privilege<'_>) -> RequestBuilder {
        let mut request = request.header(APPLICATION_ID_HEADER, &self.application_id);
        if let Some(key) = &self.rest_api_key {
            request = request.header(REST_API_KEY_HEADER, key);
        }
        if let Some(master) = privilege.master_key() {
            request = request.header(MASTER_KEY_HEADER, master.expose());
        }
        request
    }

    /// Send a request, retrying transient failures with backoff.
    async fn execute<T, F>(&self, operation: &str, build: F) -> Result<T, ParseError>
    where
        T: DeserializeOwned,
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let result = match build().send().await {
                Ok(response) => self.handle_response(response).await,
                Err(e) => Err(ParseError::Http(e)),
            };

            match result {
                Err(ref e) if e.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                    let backoff_ms = 500 * (1 << attempt); // 500ms, 1s, 2s
                    warn!(
                        attempt = attempt + 1,
                        backoff_ms,
                        error = %e,
                        operation,
                        "transient error, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    attempt += 1;
                }
                _ => return result,
            }
        }
    }

    /// Handle HTTP response and parse JSON.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ParseError> {
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok());
            return Err(ParseError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            let text = response.text().await.map_err(|e| {
                ParseError::InvalidResponse(format!(
                    "request failed ({}): failed to read response: {}",
                    status, e
                ))
            })?;

            // Try to parse as a Parse error body
            if let Ok(body) = serde_json::from_str::<ParseErrorBody>(&text) {
                return Err(ParseError::Server {
                    code: body.code,
                    message: body.error,
                });
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(ParseError::Server {
                    code: codes::OBJECT_NOT_FOUND,
                    message: text,
                });
            }

            if status.is_server_error() {
                return Err(ParseError::Unavailable {
                    status: status.as_u16(),
                });
            }

            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(ParseError::Auth(format!("{}: {}", status, text)));
            }

            return Err(ParseError::InvalidResponse(format!(
                "request failed ({}): {}",
                status, text
            )));
        }

        let body = response.json().await?;
        Ok(body)
    }
}

/// Map Parse's "object not found" to a typed error for the given object.
fn not_found_as(class_name: &str, object_id: &str) -> impl FnOnce(ParseError) -> ParseError {
    move |e| match e {
        ParseError::Server { code, .. } if code == codes::OBJECT_NOT_FOUND => {
            ParseError::NotFound {
                class_name: class_name.to_string(),
                object_id: object_id.to_string(),
            }
        }
        other => other,
    }
}

#[async_trait]
impl RecordStore for ParseClient {
    async fn find(
        &self,
        query: &Query,
        after: Option<&str>,
        limit: u32,
        privilege: Privilege<'_>,
    ) -> Result<Vec<Book>, ParseError> {
        let url = format!("{}/classes/{}", self.server_url, query.class_name());
        let where_clause = serde_json::to_string(&query.where_clause(after))?;
        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        let limit = limit.to_string();

        debug!(class = %query.class_name(), where_clause = %where_clause, after = ?after, "finding objects");

        let response: FindResponse<Book> = self
            .execute("find", || {
                self.authorize(self.http.get(&url), privilege).query(&[
                    ("where", where_clause.as_str()),
                    ("order", "objectId"),
                    ("limit", limit.as_str()),
                ])
            })
            .await?;

        debug!(count = response.results.len(), "fetched page");
        Ok(response.results)
    }

    async fn fetch_user(
        &self,
        user_id: &str,
        privilege: Privilege<'_>,
    ) -> Result<User, ParseError> {
        let url = format!("{}/users/{}", self.server_url, user_id);

        self.execute("fetch_user", || {
            self.authorize(self.http.get(&url), privilege)
        })
        .await
        .map_err(not_found_as(USER_CLASS, user_id))
    }

    async fn save(
        &self,
        class_name: &str,
        book: &Book,
        privilege: Privilege<'_>,
    ) -> Result<(), ParseError> {
        let url = format!(
            "{}/classes/{}/{}",
            self.server_url, class_name, book.object_id
        );
        let body = serde_json::to_value(book.changes())?;

        let response: SaveResponse = self
            .execute("save", || {
                self.authorize(self.http.put(&url), privilege).json(&body)
            })
            .await
            .map_err(not_found_as(class_name, &book.object_id))?;

        debug!(
            class = %class_name,
            object_id = %book.object_id,
            updated_at = %response.updated_at,
            "saved object"
        );
        Ok(())
    }
}

/// Parse error response format.
#[derive(Debug, serde::Deserialize)]
struct ParseErrorBody {
    code: i64,
    error: String,
}
