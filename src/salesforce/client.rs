//! REST client with retry and lazy authentication
//!
//! Each export run owns one `SalesforceClient`, shared immutably across
//! tasks. The OAuth session is established lazily on first use and
//! reused for every request afterward.

use super::types::{DescribeResponse, QueryApi, QueryPage, QueryResponse, TokenResponse};
use crate::config::SalesforceCredentials;
use crate::error::{is_retryable_status, Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Configuration for the Salesforce client transport
#[derive(Debug, Clone)]
pub struct SalesforceClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// Maximum transport retries per request
    pub max_retries: u32,
    /// Initial delay for exponential backoff
    pub initial_backoff: Duration,
    /// Maximum backoff delay
    pub max_backoff: Duration,
    /// REST API version segment
    pub api_version: String,
    /// User agent string
    pub user_agent: String,
}

impl Default for SalesforceClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(60),
            api_version: "v59.0".to_string(),
            user_agent: format!("sf-export/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// An authenticated session against one Salesforce instance
#[derive(Debug)]
struct Session {
    access_token: String,
    instance_url: String,
}

/// Salesforce REST client
pub struct SalesforceClient {
    http: Client,
    config: SalesforceClientConfig,
    credentials: SalesforceCredentials,
    session: OnceCell<Session>,
}

impl SalesforceClient {
    /// Create a client with the default transport configuration
    pub fn new(credentials: SalesforceCredentials) -> Self {
        Self::with_config(credentials, SalesforceClientConfig::default())
    }

    /// Create a client with a custom transport configuration
    pub fn with_config(credentials: SalesforceCredentials, config: SalesforceClientConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            config,
            credentials,
            session: OnceCell::new(),
        }
    }

    /// Get the cached session, logging in on first use
    async fn session(&self) -> Result<&Session> {
        self.session.get_or_try_init(|| self.login()).await
    }

    /// OAuth2 username-password token grant
    async fn login(&self) -> Result<Session> {
        let url = format!(
            "{}/services/oauth2/token",
            self.credentials.login_url.trim_end_matches('/')
        );
        let password = format!(
            "{}{}",
            self.credentials.password, self.credentials.security_token
        );
        let params = [
            ("grant_type", "password"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("username", self.credentials.username.as_str()),
            ("password", password.as_str()),
        ];

        debug!("Requesting access token from {url}");
        let response = self.http.post(&url).form(&params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "token request returned {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(Error::Http)?;
        info!("Authenticated against {}", token.instance_url);
        Ok(Session {
            access_token: token.access_token,
            instance_url: token.instance_url.trim_end_matches('/').to_string(),
        })
    }

    /// Make an authenticated GET request with bounded retry
    async fn get_with_retry(
        &self,
        session: &Session,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            let mut req = self.http.get(url).bearer_auth(&session.access_token);
            if !query.is_empty() {
                req = req.query(query);
            }

            match req.send().await {
                Ok(response) => {
                    let status = response.status();

                    if is_retryable_status(status.as_u16()) && attempt < max_retries {
                        let delay = self.backoff(attempt);
                        warn!(
                            "Request failed with {}, attempt {}/{}, retrying in {:?}",
                            status.as_u16(),
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }

                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::http_status(status.as_u16(), body));
                    }

                    debug!("Request succeeded: GET {url}");
                    return Ok(response);
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt < max_retries {
                        let delay = self.backoff(attempt);
                        warn!(
                            "Transport error ({e}), attempt {}/{}, retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(Error::Http(e));
                }
            }
        }
    }

    /// Calculate the exponential backoff delay for an attempt
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        std::cmp::min(self.config.initial_backoff * factor, self.config.max_backoff)
    }

    /// Resolve the queryable field names for an object type
    async fn describe(&self, session: &Session, object_type: &str) -> Result<Vec<String>> {
        let url = format!(
            "{}/services/data/{}/sobjects/{object_type}/describe",
            session.instance_url, self.config.api_version
        );
        let response = self.get_with_retry(session, &url, &[]).await?;
        let describe: DescribeResponse = response.json().await.map_err(Error::Http)?;
        Ok(describe.fields.into_iter().map(|f| f.name).collect())
    }
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("config", &self.config)
            .field("login_url", &self.credentials.login_url)
            .field("authenticated", &self.session.initialized())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl QueryApi for SalesforceClient {
    async fn open(&self, object_type: &str) -> Result<QueryPage> {
        let result: Result<QueryPage> = async {
            let session = self.session().await?;
            let fields = self.describe(session, object_type).await?;
            if fields.is_empty() {
                return Err(Error::Other("object has no queryable fields".to_string()));
            }

            // SOQL has no SELECT *; the field list comes from describe
            let soql = format!("SELECT {} FROM {object_type}", fields.join(", "));
            let url = format!(
                "{}/services/data/{}/query",
                session.instance_url, self.config.api_version
            );
            debug!("Opening query for {object_type}");
            let response = self
                .get_with_retry(session, &url, &[("q", soql.as_str())])
                .await?;
            let body: QueryResponse = response.json().await.map_err(Error::Http)?;
            Ok(body.into_page())
        }
        .await;

        result.map_err(|e| Error::remote_query(object_type, e.to_string()))
    }

    async fn next_page(&self, object_type: &str, locator: &str) -> Result<QueryPage> {
        let result: Result<QueryPage> = async {
            let session = self.session().await?;
            let url = format!("{}{locator}", session.instance_url);
            let response = self.get_with_retry(session, &url, &[]).await?;
            let body: QueryResponse = response.json().await.map_err(Error::Http)?;
            Ok(body.into_page())
        }
        .await;

        result.map_err(|e| Error::remote_query(object_type, e.to_string()))
    }
}
