//! REST adapter for the group-management service

use std::collections::{BTreeSet, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DirectoryConfig;
use crate::domain::{DirectoryClient, DirectoryError, DirectoryOperation, DomainError, EmailAddress};
use crate::infrastructure::metrics::{directory_call_result, record_directory_call};

/// Upper bound on pages followed for a single listing
pub const DEFAULT_MAX_PAGES: usize = 1000;

#[derive(Debug, Deserialize)]
struct GroupPage {
    #[serde(default)]
    groups: Vec<EmailEntry>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MemberPage {
    #[serde(default)]
    members: Vec<EmailEntry>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailEntry {
    email: String,
}

#[derive(Debug, Serialize)]
struct EmailBody<'a> {
    email: &'a str,
}

/// Error payload: `{"reason": "groupNotFound"}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    reason: Option<String>,
}

fn error_reason(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.reason)
}

/// Directory client speaking JSON over HTTP
///
/// A single attempt per call; the client-level timeout surfaces as
/// [`DirectoryError::Timeout`].
#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    max_pages: usize,
}

impl HttpDirectoryClient {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DomainError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            DomainError::configuration(format!(
                "Invalid directory base URL '{}': {}",
                config.base_url, e
            ))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(DomainError::configuration(format!(
                "Directory base URL '{}' cannot have path segments",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Limit how many pages one listing may follow (at least 1)
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();

        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);

        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send one request and map a non-success reply.
    ///
    /// `expected` turns statuses the operation understands (404, 409) into
    /// their specific errors; anything it leaves alone gets the generic
    /// mapping. The call is recorded with its mapped result.
    async fn execute(
        &self,
        operation: DirectoryOperation,
        request: RequestBuilder,
        expected: impl FnOnce(StatusCode, &str) -> Option<DirectoryError>,
    ) -> Result<Response, DirectoryError> {
        let result = Self::try_execute(request, expected).await;

        record_directory_call(operation, &result);
        debug!(
            operation = %operation,
            result = directory_call_result(&result),
            "Directory call completed"
        );

        result
    }

    async fn try_execute(
        request: RequestBuilder,
        expected: impl FnOnce(StatusCode, &str) -> Option<DirectoryError>,
    ) -> Result<Response, DirectoryError> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DirectoryError::Timeout
            } else if e.is_connect() {
                DirectoryError::transport(format!("Connection failed: {}", e))
            } else {
                DirectoryError::transport(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let body: String = response
            .text()
            .await
            .unwrap_or_default()
            .chars()
            .take(500)
            .collect();

        Err(expected(status, &body)
            .unwrap_or_else(|| Self::status_error(status, retry_after_secs, body)))
    }

    /// Generic mapping for statuses the operation does not handle itself
    fn status_error(status: StatusCode, retry_after_secs: Option<u64>, body: String) -> DirectoryError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                DirectoryError::unauthorized(format!("HTTP {}: {}", status.as_u16(), body))
            }
            StatusCode::TOO_MANY_REQUESTS => DirectoryError::RateLimited { retry_after_secs },
            _ => DirectoryError::server(status.as_u16(), body),
        }
    }

    /// Follow `nextPageToken` until the listing is exhausted.
    ///
    /// A token seen twice, or more than `max_pages` pages, is reported as an
    /// invalid response instead of looping forever.
    async fn fetch_pages<P, F>(
        &self,
        operation: DirectoryOperation,
        segments: &[&str],
        not_found: impl Fn() -> DirectoryError,
        split: F,
    ) -> Result<BTreeSet<EmailAddress>, DirectoryError>
    where
        P: DeserializeOwned,
        F: Fn(P) -> (Vec<EmailEntry>, Option<String>),
    {
        let mut collected = BTreeSet::new();
        let mut seen_tokens = HashSet::new();
        let mut page_token: Option<String> = None;

        for _ in 0..self.max_pages {
            let mut url = self.url(segments);
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            let response = self
                .execute(operation, self.request(Method::GET, url), |status, _| {
                    (status == StatusCode::NOT_FOUND).then(&not_found)
                })
                .await?;

            let page: P = response.json().await.map_err(|e| {
                DirectoryError::invalid_response(format!("Failed to parse {}: {}", operation, e))
            })?;
            let (entries, next) = split(page);

            for entry in entries {
                let email = EmailAddress::parse(&entry.email).map_err(|e| {
                    DirectoryError::invalid_response(format!(
                        "Directory returned '{}': {}",
                        entry.email, e
                    ))
                })?;
                collected.insert(email);
            }

            match next {
                Some(token) if !token.is_empty() => {
                    if !seen_tokens.insert(token.clone()) {
                        return Err(DirectoryError::invalid_response(format!(
                            "{} repeated page token '{}'",
                            operation, token
                        )));
                    }
                    page_token = Some(token);
                }
                _ => return Ok(collected),
            }
        }

        Err(DirectoryError::invalid_response(format!(
            "{} exceeded {} pages",
            operation, self.max_pages
        )))
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn list_groups(&self) -> Result<BTreeSet<EmailAddress>, DirectoryError> {
        self.fetch_pages(
            DirectoryOperation::ListGroups,
            &["groups"],
            || DirectoryError::server(404, "Groups endpoint not found"),
            |page: GroupPage| (page.groups, page.next_page_token),
        )
        .await
    }

    async fn create_group(&self, address: &EmailAddress) -> Result<(), DirectoryError> {
        let request = self
            .request(Method::POST, self.url(&["groups"]))
            .json(&EmailBody {
                email: address.as_str(),
            });

        self.execute(DirectoryOperation::CreateGroup, request, |status, _| {
            (status == StatusCode::CONFLICT).then(|| DirectoryError::group_exists(address.as_str()))
        })
        .await?;

        Ok(())
    }

    async fn delete_group(&self, address: &EmailAddress) -> Result<(), DirectoryError> {
        let request = self.request(Method::DELETE, self.url(&["groups", address.as_str()]));

        self.execute(DirectoryOperation::DeleteGroup, request, |status, _| {
            (status == StatusCode::NOT_FOUND)
                .then(|| DirectoryError::group_not_found(address.as_str()))
        })
        .await?;

        Ok(())
    }

    async fn list_members(
        &self,
        address: &EmailAddress,
    ) -> Result<BTreeSet<EmailAddress>, DirectoryError> {
        self.fetch_pages(
            DirectoryOperation::ListMembers,
            &["groups", address.as_str(), "members"],
            || DirectoryError::group_not_found(address.as_str()),
            |page: MemberPage| (page.members, page.next_page_token),
        )
        .await
    }

    async fn add_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
    ) -> Result<(), DirectoryError> {
        let request = self
            .request(
                Method::POST,
                self.url(&["groups", address.as_str(), "members"]),
            )
            .json(&EmailBody {
                email: member.as_str(),
            });

        self.execute(DirectoryOperation::AddMember, request, |status, _| match status {
            StatusCode::CONFLICT => Some(DirectoryError::member_exists(
                address.as_str(),
                member.as_str(),
            )),
            StatusCode::NOT_FOUND => Some(DirectoryError::group_not_found(address.as_str())),
            _ => None,
        })
        .await?;

        Ok(())
    }

    async fn remove_member(
        &self,
        address: &EmailAddress,
        member: &EmailAddress,
    ) -> Result<(), DirectoryError> {
        let request = self.request(
            Method::DELETE,
            self.url(&["groups", address.as_str(), "members", member.as_str()]),
        );

        self.execute(DirectoryOperation::RemoveMember, request, |status, body| {
            (status == StatusCode::NOT_FOUND).then(|| match error_reason(body).as_deref() {
                Some("groupNotFound") => DirectoryError::group_not_found(address.as_str()),
                _ => DirectoryError::member_not_found(address.as_str(), member.as_str()),
            })
        })
        .await?;

        Ok(())
    }
}
