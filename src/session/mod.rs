//! Simulated user session
//!
//! One session is one independent scripted actor: it authenticates, decodes
//! its token to recover an identity, resolves or creates a customer and an
//! account, then repeatedly issues weighted random queries and credit
//! commands. Every step is fail-soft: an upstream failure is logged and
//! recorded, never fatal, and a missing prerequisite skips the dependent call
//! instead of erroring.

use crate::auth::decode_token;
use crate::config::LoadConfig;
use crate::error::Result;
use crate::gateway::{
    AccountRequest, ApiResponse, CreditRequest, CustomerPage, CustomerRequest, GatewayClient,
    LoginRequest, LoginResponse,
};
use crate::metrics::MetricsRegistry;
use crate::workload::{self, bootstrap_ops as ops, Operation};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Page parameters used when listing customers during fallback resolution
const CUSTOMER_LOOKUP_PAGE: (u32, u32) = (0, 1);

/// Page parameters used when listing account operations
const OPERATIONS_PAGE: (u32, u32) = (0, 10);

/// Ephemeral per-session state. Owned by exactly one session for its whole
/// run; nothing here is ever shared between users.
#[derive(Debug, Default, Clone)]
pub struct SessionState {
    /// Bearer credential from login; never refreshed
    pub token: Option<String>,
    /// Identity decoded from the token, possibly overwritten by the profile
    pub user_id: Option<String>,
    /// Subject name decoded from the token
    pub username: Option<String>,
    /// Customer resolved via create-or-lookup
    pub customer_id: Option<String>,
    /// Account resolved via create-or-lookup
    pub account_id: Option<String>,
}

/// One simulated user.
pub struct UserSession {
    index: usize,
    gateway: Arc<GatewayClient>,
    config: Arc<LoadConfig>,
    metrics: Arc<MetricsRegistry>,
    state: SessionState,
    rng: StdRng,
}

/// Run a gateway call and measure how long it took.
async fn timed<F>(fut: F) -> (Result<ApiResponse>, Duration)
where
    F: Future<Output = Result<ApiResponse>>,
{
    let started = Instant::now();
    let result = fut.await;
    (result, started.elapsed())
}

impl UserSession {
    pub fn new(
        index: usize,
        gateway: Arc<GatewayClient>,
        config: Arc<LoadConfig>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let rng = StdRng::seed_from_u64(config.seed.wrapping_add(index as u64));
        Self {
            index,
            gateway,
            config,
            metrics,
            state: SessionState::default(),
            rng,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Draw the wait before the next iteration.
    pub fn next_wait(&mut self) -> Duration {
        workload::wait_time(&mut self.rng, self.config.wait_min, self.config.wait_max)
    }

    /// Draw the next operation from the weighted mix.
    pub fn next_operation(&mut self) -> Operation {
        workload::pick_operation(&mut self.rng)
    }

    /// Full session bootstrap: login (with fallbacks), profile, customer,
    /// account. Missing prerequisites short-circuit later steps with a
    /// warning; nothing here aborts the session.
    pub async fn bootstrap(&mut self) {
        self.login().await;

        if self.state.token.is_some() && self.state.user_id.is_some() {
            self.fetch_profile().await;
            self.resolve_customer().await;
            if self.state.customer_id.is_some() {
                self.resolve_account().await;
            }
        } else {
            warn!(
                "user {}: authentication incomplete, falling back to existing records",
                self.index
            );
            if self.state.token.is_some() {
                if self.state.customer_id.is_none() {
                    self.lookup_existing_customer().await;
                }
                if self.state.customer_id.is_some() && self.state.account_id.is_none() {
                    self.resolve_account().await;
                }
            }
        }
    }

    /// Execute one iteration of the weighted mix.
    pub async fn run_iteration(&mut self) {
        let operation = self.next_operation();
        self.execute(operation).await;
    }

    /// Execute one named operation, honoring its prerequisites.
    pub async fn execute(&mut self, operation: Operation) {
        match operation {
            Operation::GetAccount => self.get_account().await,
            Operation::GetAccountByCustomer => self.get_account_by_customer().await,
            Operation::GetCustomer => self.get_customer().await,
            Operation::AccountOperations => self.get_account_operations().await,
            Operation::CreditAccount => self.credit_account().await,
        }
    }

    // ── Bootstrap steps ──────────────────────────────────────────────

    /// Primary login. On any failure, walk the alternative credential list.
    async fn login(&mut self) {
        let creds = self.config.primary_credentials().clone();
        let request = LoginRequest {
            username: creds.username,
            password: creds.password,
        };
        let (result, latency) = timed(self.gateway.login(&request)).await;

        match result {
            Ok(resp) if resp.status.as_u16() == 200 => {
                if self.adopt_token(&resp) {
                    self.metrics.record_success(ops::LOGIN, latency);
                } else {
                    warn!("user {}: login response missing token", self.index);
                    self.metrics.record_failure(ops::LOGIN, latency);
                }
            }
            Ok(resp) => {
                warn!(
                    "user {}: login failed with status {}",
                    self.index, resp.status
                );
                self.metrics.record_failure(ops::LOGIN, latency);
                self.try_alternative_logins().await;
            }
            Err(e) => {
                warn!("user {}: login request failed: {}", self.index, e);
                self.metrics.record_failure(ops::LOGIN, latency);
                self.try_alternative_logins().await;
            }
        }
    }

    /// Walk the fallback credential pairs in order, stopping at the first
    /// success.
    async fn try_alternative_logins(&mut self) {
        let alternatives: Vec<_> = self.config.alternative_credentials().to_vec();
        for creds in alternatives {
            let request = LoginRequest {
                username: creds.username.clone(),
                password: creds.password,
            };
            let (result, latency) = timed(self.gateway.login(&request)).await;
            match result {
                Ok(resp) if resp.status.as_u16() == 200 => {
                    if self.adopt_token(&resp) {
                        info!(
                            "user {}: alternative login as '{}' succeeded",
                            self.index, creds.username
                        );
                        self.metrics.record_success(ops::ALTERNATIVE_LOGIN, latency);
                        return;
                    }
                    self.metrics.record_failure(ops::ALTERNATIVE_LOGIN, latency);
                }
                Ok(_) | Err(_) => {
                    self.metrics.record_failure(ops::ALTERNATIVE_LOGIN, latency);
                }
            }
        }
    }

    /// Store the token from a login response and decode its identity claims.
    /// Returns false when the response carries no token. A decode failure
    /// leaves the session without an identity but keeps the token.
    fn adopt_token(&mut self, resp: &ApiResponse) -> bool {
        let token = match serde_json::from_str::<LoginResponse>(&resp.body) {
            Ok(LoginResponse { token: Some(token) }) if !token.is_empty() => token,
            _ => return false,
        };

        match decode_token(&token, &self.config.token_key) {
            Ok(claims) => {
                self.state.user_id = claims.id;
                self.state.username = claims.sub;
                info!(
                    "user {}: login successful, user_id: {:?}, username: {:?}",
                    self.index, self.state.user_id, self.state.username
                );
            }
            Err(e) => {
                warn!("user {}: token decode failed: {}", self.index, e);
            }
        }
        self.state.token = Some(token);
        true
    }

    /// Best-effort profile fetch. A profile id that disagrees with the token
    /// overwrites the locally held identity.
    async fn fetch_profile(&mut self) {
        let token = match (&self.state.token, &self.state.user_id) {
            (Some(token), Some(_)) => token.clone(),
            _ => {
                warn!("user {}: skipping profile, no token or user id", self.index);
                return;
            }
        };

        let (result, latency) = timed(self.gateway.profile(&token)).await;
        match result {
            Ok(resp) if resp.status.as_u16() == 200 => match resp.json() {
                Ok(profile) => {
                    if let Some(profile_id) = crate::gateway::json_id(&profile) {
                        if Some(&profile_id) != self.state.user_id.as_ref() {
                            warn!(
                                "user {}: id mismatch, token {:?} vs profile {}",
                                self.index, self.state.user_id, profile_id
                            );
                            self.state.user_id = Some(profile_id);
                        }
                    }
                    self.metrics.record_success(ops::GET_USER_PROFILE, latency);
                }
                Err(e) => {
                    warn!("user {}: profile parse error: {}", self.index, e);
                    self.metrics.record_failure(ops::GET_USER_PROFILE, latency);
                }
            },
            Ok(resp) => {
                // Identity from the token is still usable.
                warn!(
                    "user {}: profile fetch failed with status {}",
                    self.index, resp.status
                );
                self.metrics.record_failure(ops::GET_USER_PROFILE, latency);
            }
            Err(e) => {
                warn!("user {}: profile request failed: {}", self.index, e);
                self.metrics.record_failure(ops::GET_USER_PROFILE, latency);
            }
        }
    }

    /// Create a customer with demo attributes derived from the identity; on
    /// failure, fall back to the first entry of the existing-customer list.
    async fn resolve_customer(&mut self) {
        let (token, user_id) = match (&self.state.token, &self.state.user_id) {
            (Some(token), Some(user_id)) => (token.clone(), user_id.clone()),
            _ => {
                warn!(
                    "user {}: skipping customer setup, no token or user id",
                    self.index
                );
                return;
            }
        };

        let tag: String = user_id.chars().take(8).collect();
        let request = CustomerRequest {
            name: format!("Test Customer {}", tag),
            email: format!("test{}@example.com", tag),
            cin: format!("CIN{}", tag),
            phone: "+1234567890".to_string(),
            address: "123 Test Street".to_string(),
        };

        let (result, latency) = timed(self.gateway.create_customer(&token, &request)).await;
        match result {
            Ok(resp) if matches!(resp.status.as_u16(), 200 | 201) => match resp.id_field() {
                Some(id) => {
                    info!("user {}: customer created, customer_id: {}", self.index, id);
                    self.state.customer_id = Some(id);
                    self.metrics.record_success(ops::CREATE_CUSTOMER, latency);
                }
                None => {
                    warn!("user {}: customer response missing id", self.index);
                    self.metrics.record_failure(ops::CREATE_CUSTOMER, latency);
                }
            },
            Ok(resp) => {
                info!(
                    "user {}: customer creation failed ({}), trying existing customers",
                    self.index, resp.status
                );
                self.metrics.record_failure(ops::CREATE_CUSTOMER, latency);
                self.lookup_existing_customer().await;
            }
            Err(e) => {
                warn!("user {}: customer creation request failed: {}", self.index, e);
                self.metrics.record_failure(ops::CREATE_CUSTOMER, latency);
                self.lookup_existing_customer().await;
            }
        }
    }

    /// Take the first entry of the customer list as this session's customer.
    async fn lookup_existing_customer(&mut self) {
        let token = match &self.state.token {
            Some(token) => token.clone(),
            None => {
                warn!("user {}: skipping customer list, no token", self.index);
                return;
            }
        };

        let (page, size) = CUSTOMER_LOOKUP_PAGE;
        let (result, latency) = timed(self.gateway.list_customers(&token, page, size)).await;
        match result {
            Ok(resp) if resp.status.as_u16() == 200 => {
                match serde_json::from_str::<CustomerPage>(&resp.body) {
                    Ok(page) => {
                        if let Some(id) = page.content.first().and_then(crate::gateway::json_id) {
                            info!("user {}: using existing customer {}", self.index, id);
                            self.state.customer_id = Some(id);
                        }
                        self.metrics.record_success(ops::GET_CUSTOMER_LIST, latency);
                    }
                    Err(e) => {
                        warn!("user {}: customer list parse error: {}", self.index, e);
                        self.metrics.record_failure(ops::GET_CUSTOMER_LIST, latency);
                    }
                }
            }
            Ok(resp) => {
                warn!(
                    "user {}: customer list failed with status {}",
                    self.index, resp.status
                );
                self.metrics.record_failure(ops::GET_CUSTOMER_LIST, latency);
            }
            Err(e) => {
                warn!("user {}: customer list request failed: {}", self.index, e);
                self.metrics.record_failure(ops::GET_CUSTOMER_LIST, latency);
            }
        }
    }

    /// Look the account up by customer id; create it when the lookup answers
    /// not-found. Any other failure status is recorded and not retried.
    async fn resolve_account(&mut self) {
        let (token, customer_id) = match (&self.state.token, &self.state.customer_id) {
            (Some(token), Some(customer_id)) => (token.clone(), customer_id.clone()),
            _ => {
                warn!(
                    "user {}: skipping account setup, no token or customer id",
                    self.index
                );
                return;
            }
        };

        let (result, latency) = timed(self.gateway.find_account(&token, &customer_id)).await;
        match result {
            Ok(resp) if resp.status.as_u16() == 200 => match resp.id_field() {
                Some(id) => {
                    info!("user {}: account retrieved, account_id: {}", self.index, id);
                    self.state.account_id = Some(id);
                    self.metrics.record_success(ops::FIND_ACCOUNT, latency);
                }
                None => {
                    warn!("user {}: account lookup response missing id", self.index);
                    self.metrics.record_failure(ops::FIND_ACCOUNT, latency);
                }
            },
            Ok(resp) if resp.status.as_u16() == 404 => {
                // Not-found is an expected answer here, not a failure.
                self.metrics.record_success(ops::FIND_ACCOUNT, latency);
                info!("user {}: account not found, creating one", self.index);
                self.create_account(&token, &customer_id).await;
            }
            Ok(resp) => {
                warn!(
                    "user {}: account lookup failed with status {}",
                    self.index, resp.status
                );
                self.metrics.record_failure(ops::FIND_ACCOUNT, latency);
            }
            Err(e) => {
                warn!("user {}: account lookup request failed: {}", self.index, e);
                self.metrics.record_failure(ops::FIND_ACCOUNT, latency);
            }
        }
    }

    /// Create an account with the configured currency; the response body is
    /// the bare account id.
    async fn create_account(&mut self, token: &str, customer_id: &str) {
        let request = AccountRequest {
            customer_id: customer_id.to_string(),
            currency: self.config.currency.clone(),
        };
        let (result, latency) = timed(self.gateway.create_account(token, &request)).await;
        match result {
            Ok(resp) if matches!(resp.status.as_u16(), 200 | 201) => {
                let id = resp.body_as_identifier();
                if id.is_empty() {
                    warn!("user {}: account creation returned empty body", self.index);
                    self.metrics.record_failure(ops::CREATE_ACCOUNT, latency);
                } else {
                    info!("user {}: account created, account_id: {}", self.index, id);
                    self.state.account_id = Some(id);
                    self.metrics.record_success(ops::CREATE_ACCOUNT, latency);
                }
            }
            Ok(resp) => {
                warn!(
                    "user {}: account creation failed with status {}",
                    self.index, resp.status
                );
                self.metrics.record_failure(ops::CREATE_ACCOUNT, latency);
            }
            Err(e) => {
                warn!("user {}: account creation request failed: {}", self.index, e);
                self.metrics.record_failure(ops::CREATE_ACCOUNT, latency);
            }
        }
    }

    // ── Steady-state operations ──────────────────────────────────────

    /// Prerequisite check shared by the steady-state operations. A missing
    /// field skips the call: nothing is sent and nothing is recorded.
    fn prerequisites(&self, operation: Operation, needs_account: bool) -> Option<(String, String)> {
        let token = match &self.state.token {
            Some(token) => token.clone(),
            None => {
                debug!(
                    "user {}: skipping {}, no authentication token",
                    self.index,
                    operation.name()
                );
                return None;
            }
        };
        let id = if needs_account {
            &self.state.account_id
        } else {
            &self.state.customer_id
        };
        match id {
            Some(id) => Some((token, id.clone())),
            None => {
                debug!(
                    "user {}: skipping {}, missing {}",
                    self.index,
                    operation.name(),
                    if needs_account { "account id" } else { "customer id" }
                );
                None
            }
        }
    }

    /// Record a plain status-checked response for a steady-state operation.
    fn record_simple(
        &self,
        operation: Operation,
        result: Result<ApiResponse>,
        latency: Duration,
        success_codes: &[u16],
    ) {
        match result {
            Ok(resp) if success_codes.contains(&resp.status.as_u16()) => {
                self.metrics.record_success(operation.name(), latency);
            }
            Ok(resp) => {
                debug!(
                    "user {}: {} failed with status {}",
                    self.index,
                    operation.name(),
                    resp.status
                );
                self.metrics.record_failure(operation.name(), latency);
            }
            Err(e) => {
                debug!("user {}: {} request failed: {}", self.index, operation.name(), e);
                self.metrics.record_failure(operation.name(), latency);
            }
        }
    }

    async fn get_account(&mut self) {
        let Some((token, account_id)) = self.prerequisites(Operation::GetAccount, true) else {
            return;
        };
        let (result, latency) = timed(self.gateway.get_account(&token, &account_id)).await;
        self.record_simple(Operation::GetAccount, result, latency, &[200]);
    }

    /// Fetch the account through the customer id; a successful answer
    /// refreshes the stored account id.
    async fn get_account_by_customer(&mut self) {
        let Some((token, customer_id)) =
            self.prerequisites(Operation::GetAccountByCustomer, false)
        else {
            return;
        };
        let (result, latency) = timed(self.gateway.find_account(&token, &customer_id)).await;
        let name = Operation::GetAccountByCustomer.name();
        match result {
            Ok(resp) if resp.status.as_u16() == 200 => match resp.json() {
                Ok(body) => {
                    if let Some(id) = crate::gateway::json_id(&body) {
                        self.state.account_id = Some(id);
                    }
                    self.metrics.record_success(name, latency);
                }
                Err(e) => {
                    debug!("user {}: account parse error: {}", self.index, e);
                    self.metrics.record_failure(name, latency);
                }
            },
            Ok(resp) => {
                debug!(
                    "user {}: {} failed with status {}",
                    self.index, name, resp.status
                );
                self.metrics.record_failure(name, latency);
            }
            Err(e) => {
                debug!("user {}: {} request failed: {}", self.index, name, e);
                self.metrics.record_failure(name, latency);
            }
        }
    }

    async fn get_customer(&mut self) {
        let Some((token, customer_id)) = self.prerequisites(Operation::GetCustomer, false) else {
            return;
        };
        let (result, latency) = timed(self.gateway.get_customer(&token, &customer_id)).await;
        self.record_simple(Operation::GetCustomer, result, latency, &[200]);
    }

    async fn get_account_operations(&mut self) {
        let Some((token, account_id)) = self.prerequisites(Operation::AccountOperations, true)
        else {
            return;
        };
        let (page, size) = OPERATIONS_PAGE;
        let (result, latency) =
            timed(self.gateway.account_operations(&token, &account_id, page, size)).await;
        self.record_simple(Operation::AccountOperations, result, latency, &[200]);
    }

    async fn credit_account(&mut self) {
        let Some((token, account_id)) = self.prerequisites(Operation::CreditAccount, true) else {
            return;
        };
        let request = CreditRequest {
            account_id,
            amount: workload::credit_amount(&mut self.rng),
        };
        let (result, latency) = timed(self.gateway.credit_account(&token, &request)).await;
        self.record_simple(Operation::CreditAccount, result, latency, &[200, 201]);
    }
}
