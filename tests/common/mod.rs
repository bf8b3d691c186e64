//! In-process mock of the bank gateway for integration tests.
//!
//! One warp server on an ephemeral port, answering all ten endpoints the
//! tool drives. Behavior is controlled per scenario through `MockOptions`;
//! every received request is appended to a log so tests can assert which
//! calls were (or were not) made.

use bankload::config::DEFAULT_TOKEN_KEY;
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::Mutex;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use warp::http::{Method, Response};
use warp::hyper::Body;
use warp::path::FullPath;
use warp::Filter;

#[derive(Serialize)]
struct Claims {
    id: String,
    sub: String,
    exp: u64,
}

/// Issue an HS256 token the way the authentication service does.
pub fn issue_token(id: &str, sub: &str) -> String {
    let exp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_secs()
        + 3600;
    let claims = Claims {
        id: id.to_string(),
        sub: sub.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(DEFAULT_TOKEN_KEY.as_bytes()),
    )
    .expect("HS256 encoding cannot fail")
}

/// Scenario knobs for the mock gateway.
#[derive(Clone)]
pub struct MockOptions {
    /// Credential pairs the login endpoint accepts
    pub accepted_logins: Vec<(String, String)>,
    /// Claims minted into issued tokens: (id, sub)
    pub token_identity: (String, String),
    /// Answer logins with 200 but without a token field
    pub login_without_token: bool,
    /// Answer logins with a token that fails signature verification
    pub garbage_token: bool,
    /// Status for the profile endpoint
    pub profile_status: u16,
    /// Id returned by the profile endpoint (defaults to the token identity)
    pub profile_id: Option<String>,
    /// Status for customer creation
    pub customer_create_status: u16,
    /// Id assigned to created customers
    pub customer_id: String,
    /// Customer id present in the list endpoint; None lists nothing
    pub listed_customer_id: Option<String>,
    /// Status for the account lookup while no account exists
    pub find_account_status: u16,
    /// Pre-existing account id; Some short-circuits the lookup to 200
    pub existing_account_id: Option<String>,
    /// Status for account creation
    pub account_create_status: u16,
    /// Id assigned to created accounts (returned as the bare body)
    pub new_account_id: String,
    /// Status for the credit command
    pub credit_status: u16,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            accepted_logins: vec![("testuser".to_string(), "testpass123".to_string())],
            token_identity: ("abc123".to_string(), "testuser".to_string()),
            login_without_token: false,
            garbage_token: false,
            profile_status: 200,
            profile_id: None,
            customer_create_status: 201,
            customer_id: "c1".to_string(),
            listed_customer_id: None,
            find_account_status: 404,
            existing_account_id: None,
            account_create_status: 201,
            new_account_id: "a1".to_string(),
            credit_status: 201,
        }
    }
}

struct MockState {
    options: MockOptions,
    created_account: Mutex<Option<String>>,
    requests: Mutex<Vec<String>>,
}

/// Running mock gateway.
pub struct MockBank {
    pub addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockBank {
    /// Start the mock on an ephemeral localhost port.
    pub fn start(options: MockOptions) -> Self {
        let state = Arc::new(MockState {
            options,
            created_account: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        });

        let handler_state = Arc::clone(&state);
        let route = warp::any()
            .and(warp::method())
            .and(warp::path::full())
            .and(warp::body::bytes())
            .map(
                move |method: Method, path: FullPath, body: warp::hyper::body::Bytes| {
                    handler_state.handle(&method, path.as_str(), &body)
                },
            );

        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        let _ = tokio::spawn(server);

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Snapshot of every request received so far, as "METHOD /path".
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().clone()
    }

    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests().iter().filter(|r| r.starts_with(prefix)).count()
    }
}

fn reply(status: u16, body: &str) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("static response parts are valid")
}

impl MockState {
    fn handle(&self, method: &Method, path: &str, body: &[u8]) -> Response<Body> {
        self.requests.lock().push(format!("{} {}", method, path));
        let opts = &self.options;

        if method == Method::POST && path == "/AUTHENTICATION-SERVICE/bank/authentication/login" {
            let parsed: serde_json::Value = match serde_json::from_slice(body) {
                Ok(v) => v,
                Err(_) => return reply(400, r#"{"message":"bad request"}"#),
            };
            let username = parsed["username"].as_str().unwrap_or_default();
            let password = parsed["password"].as_str().unwrap_or_default();
            let accepted = opts
                .accepted_logins
                .iter()
                .any(|(u, p)| u == username && p == password);
            if !accepted {
                return reply(401, r#"{"message":"bad credentials"}"#);
            }
            if opts.login_without_token {
                return reply(200, r#"{"message":"ok"}"#);
            }
            if opts.garbage_token {
                return reply(200, r#"{"token":"not.a.token"}"#);
            }
            let token = issue_token(&opts.token_identity.0, &opts.token_identity.1);
            return reply(200, &format!(r#"{{"token":"{}"}}"#, token));
        }

        if method == Method::GET && path == "/AUTHENTICATION-SERVICE/bank/users/profile" {
            if opts.profile_status != 200 {
                return reply(opts.profile_status, r#"{"message":"unavailable"}"#);
            }
            let id = opts
                .profile_id
                .clone()
                .unwrap_or_else(|| opts.token_identity.0.clone());
            return reply(
                200,
                &format!(r#"{{"id":"{}","username":"{}"}}"#, id, opts.token_identity.1),
            );
        }

        if method == Method::POST && path == "/CUSTOMER-SERVICE/bank/customers/create" {
            if !matches!(opts.customer_create_status, 200 | 201) {
                return reply(opts.customer_create_status, r#"{"message":"rejected"}"#);
            }
            return reply(
                opts.customer_create_status,
                &format!(r#"{{"id":"{}"}}"#, opts.customer_id),
            );
        }

        if method == Method::GET && path == "/CUSTOMER-SERVICE/bank/customers/list" {
            let content = match &opts.listed_customer_id {
                Some(id) => format!(r#"{{"content":[{{"id":"{}"}}]}}"#, id),
                None => r#"{"content":[]}"#.to_string(),
            };
            return reply(200, &content);
        }

        if method == Method::GET && path.starts_with("/CUSTOMER-SERVICE/bank/customers/get/") {
            let id = path.rsplit('/').next().unwrap_or_default();
            return reply(200, &format!(r#"{{"id":"{}","name":"Test Customer"}}"#, id));
        }

        if method == Method::GET
            && path.starts_with("/ACCOUNT-SERVICE/bank/accounts/queries/find-account/")
        {
            if let Some(id) = self.created_account.lock().clone() {
                return reply(200, &format!(r#"{{"id":"{}","currency":"USD"}}"#, id));
            }
            if let Some(id) = &opts.existing_account_id {
                return reply(200, &format!(r#"{{"id":"{}","currency":"USD"}}"#, id));
            }
            return reply(opts.find_account_status, r#"{"message":"no account"}"#);
        }

        if method == Method::POST && path == "/ACCOUNT-SERVICE/bank/accounts/commands/create" {
            if !matches!(opts.account_create_status, 200 | 201) {
                return reply(opts.account_create_status, r#"{"message":"rejected"}"#);
            }
            *self.created_account.lock() = Some(opts.new_account_id.clone());
            return reply(opts.account_create_status, &format!("\"{}\"", opts.new_account_id));
        }

        if method == Method::GET
            && path.starts_with("/ACCOUNT-SERVICE/bank/accounts/queries/get-account/")
        {
            let id = path.rsplit('/').next().unwrap_or_default();
            return reply(200, &format!(r#"{{"id":"{}","balance":1000.0}}"#, id));
        }

        if method == Method::GET && path == "/ACCOUNT-SERVICE/bank/accounts/queries/all-operations" {
            return reply(200, r#"{"content":[],"totalElements":0}"#);
        }

        if method == Method::POST && path == "/ACCOUNT-SERVICE/bank/accounts/commands/credit" {
            return reply(opts.credit_status, "");
        }

        reply(404, r#"{"message":"no such endpoint"}"#)
    }
}
