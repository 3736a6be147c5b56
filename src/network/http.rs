//! REST collaborators: session validation and per-contact history.

use async_trait::async_trait;
use reqwest::header::COOKIE;

use crate::common::{ContactId, HistoryFetchError, Message};
use crate::storage::HistoryFetcher;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session_cookie: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session_cookie: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session_cookie,
        }
    }

    fn with_cookie(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_cookie {
            Some(cookie) => request.header(COOKIE, cookie),
            None => request,
        }
    }

    /// `POST /validate`. Any non-success status means the session is invalid.
    pub async fn validate_session(&self) -> Result<bool, reqwest::Error> {
        let request = self.http.post(format!("{}/validate", self.base_url));
        let response = self.with_cookie(request).send().await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl HistoryFetcher for ApiClient {
    async fn fetch_history(&self, contact_id: ContactId) -> Result<Vec<Message>, HistoryFetchError> {
        log::info!("Fetching history for contact {contact_id}");
        let request = self.http.get(format!("{}/chat/{contact_id}", self.base_url));
        let response = self.with_cookie(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HistoryFetchError::Status {
                contact_id,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Vec<Message>>().await?)
    }
}
