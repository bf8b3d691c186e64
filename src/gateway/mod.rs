//! HTTP client for the bank API gateway
//!
//! One thin wrapper around `reqwest` with one method per upstream endpoint.
//! The gateway routes by service prefix (AUTHENTICATION-SERVICE,
//! CUSTOMER-SERVICE, ACCOUNT-SERVICE); all authenticated calls carry a bearer
//! token. Methods return the raw status and body so callers can apply their
//! own response-code branching; the session layer, not the client, decides
//! what counts as a failure.

use crate::config::LoadConfig;
use crate::error::{Error, Result};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

pub mod paths {
    pub const LOGIN: &str = "/AUTHENTICATION-SERVICE/bank/authentication/login";
    pub const PROFILE: &str = "/AUTHENTICATION-SERVICE/bank/users/profile";
    pub const CUSTOMER_CREATE: &str = "/CUSTOMER-SERVICE/bank/customers/create";
    pub const CUSTOMER_LIST: &str = "/CUSTOMER-SERVICE/bank/customers/list";
    pub const CUSTOMER_GET: &str = "/CUSTOMER-SERVICE/bank/customers/get";
    pub const ACCOUNT_FIND: &str = "/ACCOUNT-SERVICE/bank/accounts/queries/find-account";
    pub const ACCOUNT_GET: &str = "/ACCOUNT-SERVICE/bank/accounts/queries/get-account";
    pub const ACCOUNT_OPERATIONS: &str = "/ACCOUNT-SERVICE/bank/accounts/queries/all-operations";
    pub const ACCOUNT_CREATE: &str = "/ACCOUNT-SERVICE/bank/accounts/commands/create";
    pub const ACCOUNT_CREDIT: &str = "/ACCOUNT-SERVICE/bank/accounts/commands/credit";
}

/// Login request body
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response body
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
}

/// Customer creation request body
#[derive(Debug, Clone, Serialize)]
pub struct CustomerRequest {
    pub name: String,
    pub email: String,
    pub cin: String,
    pub phone: String,
    pub address: String,
}

/// Account creation request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRequest {
    pub customer_id: String,
    pub currency: String,
}

/// Credit command request body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditRequest {
    pub account_id: String,
    pub amount: f64,
}

/// Paged wrapper the customer service returns from list endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerPage {
    #[serde(default)]
    pub content: Vec<serde_json::Value>,
}

/// Raw upstream response: status plus body text.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse the body as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(Error::from)
    }

    /// Pull a string-valued `id` field out of the body, if there is one
    pub fn id_field(&self) -> Option<String> {
        self.json().ok().and_then(|v| json_id(&v))
    }

    /// The body interpreted as a bare identifier: trimmed, quotes stripped.
    /// The account service answers creation commands this way.
    pub fn body_as_identifier(&self) -> String {
        self.body.trim().trim_matches('"').to_string()
    }
}

/// Extract an `id` field from a JSON value, tolerating numeric ids.
pub fn json_id(value: &serde_json::Value) -> Option<String> {
    match value.get("id") {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// HTTP client for the bank gateway
#[derive(Debug)]
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    /// Create a new client from the run configuration
    pub fn new(config: &LoadConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let mut builder = self.http.request(method, self.url(path));
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<ApiResponse> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(ApiResponse { status, body })
    }

    /// POST login with one credential pair
    pub async fn login(&self, request: &LoginRequest) -> Result<ApiResponse> {
        self.execute(self.request(Method::POST, paths::LOGIN, None).json(request))
            .await
    }

    /// GET the authenticated user's profile
    pub async fn profile(&self, token: &str) -> Result<ApiResponse> {
        self.execute(self.request(Method::GET, paths::PROFILE, Some(token)))
            .await
    }

    /// POST a new customer
    pub async fn create_customer(&self, token: &str, request: &CustomerRequest) -> Result<ApiResponse> {
        self.execute(
            self.request(Method::POST, paths::CUSTOMER_CREATE, Some(token))
                .json(request),
        )
        .await
    }

    /// GET a page of existing customers
    pub async fn list_customers(&self, token: &str, page: u32, size: u32) -> Result<ApiResponse> {
        self.execute(
            self.request(Method::GET, paths::CUSTOMER_LIST, Some(token))
                .query(&[("page", page), ("size", size)]),
        )
        .await
    }

    /// GET one customer by id
    pub async fn get_customer(&self, token: &str, customer_id: &str) -> Result<ApiResponse> {
        let path = format!("{}/{}", paths::CUSTOMER_GET, customer_id);
        self.execute(self.request(Method::GET, &path, Some(token))).await
    }

    /// GET the account belonging to a customer
    pub async fn find_account(&self, token: &str, customer_id: &str) -> Result<ApiResponse> {
        let path = format!("{}/{}", paths::ACCOUNT_FIND, customer_id);
        self.execute(self.request(Method::GET, &path, Some(token))).await
    }

    /// POST a new account; the response body is the bare account id
    pub async fn create_account(&self, token: &str, request: &AccountRequest) -> Result<ApiResponse> {
        self.execute(
            self.request(Method::POST, paths::ACCOUNT_CREATE, Some(token))
                .json(request),
        )
        .await
    }

    /// GET one account by id
    pub async fn get_account(&self, token: &str, account_id: &str) -> Result<ApiResponse> {
        let path = format!("{}/{}", paths::ACCOUNT_GET, account_id);
        self.execute(self.request(Method::GET, &path, Some(token))).await
    }

    /// GET a page of operations on an account
    pub async fn account_operations(
        &self,
        token: &str,
        account_id: &str,
        page: u32,
        size: u32,
    ) -> Result<ApiResponse> {
        self.execute(
            self.request(Method::GET, paths::ACCOUNT_OPERATIONS, Some(token))
                .query(&[("accountId", account_id)])
                .query(&[("page", page), ("size", size)]),
        )
        .await
    }

    /// POST a credit command
    pub async fn credit_account(&self, token: &str, request: &CreditRequest) -> Result<ApiResponse> {
        self.execute(
            self.request(Method::POST, paths::ACCOUNT_CREDIT, Some(token))
                .json(request),
        )
        .await
    }
}
