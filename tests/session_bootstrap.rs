//! Session bootstrap behavior against a mock gateway: login fallbacks, token
//! decoding, customer and account resolution, and the fail-soft short
//! circuits.

mod common;

use bankload::{GatewayClient, LoadConfig, MetricsRegistry, Operation, UserSession};
use common::{MockBank, MockOptions};
use std::sync::Arc;

const LOGIN_PATH: &str = "POST /AUTHENTICATION-SERVICE/bank/authentication/login";
const CREATE_ACCOUNT_PATH: &str = "POST /ACCOUNT-SERVICE/bank/accounts/commands/create";
const CREDIT_PATH: &str = "POST /ACCOUNT-SERVICE/bank/accounts/commands/credit";

fn make_session(bank: &MockBank) -> (UserSession, Arc<MetricsRegistry>) {
    let config = Arc::new(
        LoadConfig::builder()
            .gateway_url(bank.base_url())
            .seed(3)
            .build()
            .expect("test config is valid"),
    );
    let gateway = Arc::new(GatewayClient::new(&config).expect("client builds"));
    let metrics = Arc::new(MetricsRegistry::new());
    let session = UserSession::new(0, gateway, Arc::clone(&config), Arc::clone(&metrics));
    (session, metrics)
}

#[tokio::test]
async fn login_extracts_identity_from_token() {
    let bank = MockBank::start(MockOptions::default());
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;

    let state = session.state();
    assert_eq!(state.user_id.as_deref(), Some("abc123"));
    assert!(!state.user_id.as_deref().unwrap().is_empty());
    assert_eq!(state.username.as_deref(), Some("testuser"));
    assert_eq!(metrics.operation("login").failures(), 0);
}

#[tokio::test]
async fn failed_login_blocks_all_dependent_calls() {
    let options = MockOptions {
        accepted_logins: vec![],
        ..MockOptions::default()
    };
    let bank = MockBank::start(options);
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;

    // Primary plus the two fallback credential pairs, nothing else.
    let requests = bank.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r == LOGIN_PATH));

    assert!(session.state().token.is_none());
    assert_eq!(metrics.operation("login").failures(), 1);
    assert_eq!(metrics.operation("alternative_login").failures(), 2);
}

#[tokio::test]
async fn alternative_credentials_are_tried_in_order() {
    let options = MockOptions {
        accepted_logins: vec![("admin".to_string(), "admin".to_string())],
        ..MockOptions::default()
    };
    let bank = MockBank::start(options);
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;

    // Primary fails, the first fallback (admin) succeeds, the second is
    // never tried.
    assert_eq!(bank.request_count(LOGIN_PATH), 2);
    assert!(session.state().token.is_some());
    assert_eq!(session.state().user_id.as_deref(), Some("abc123"));
    assert_eq!(metrics.operation("alternative_login").attempts(), 1);
    assert_eq!(metrics.operation("alternative_login").failures(), 0);
}

#[tokio::test]
async fn login_response_without_token_is_a_failure_without_fallback() {
    let options = MockOptions {
        login_without_token: true,
        ..MockOptions::default()
    };
    let bank = MockBank::start(options);
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;

    // A 200 without a token is a failed login, but it is not a credential
    // rejection, so the alternatives are not consulted.
    assert_eq!(bank.request_count(LOGIN_PATH), 1);
    assert!(session.state().token.is_none());
    assert_eq!(metrics.operation("login").failures(), 1);
    assert_eq!(metrics.operation("alternative_login").attempts(), 0);
}

#[tokio::test]
async fn undecodable_token_falls_back_to_existing_records() {
    let options = MockOptions {
        garbage_token: true,
        listed_customer_id: Some("c5".to_string()),
        existing_account_id: Some("a9".to_string()),
        ..MockOptions::default()
    };
    let bank = MockBank::start(options);
    let (mut session, _metrics) = make_session(&bank);

    session.bootstrap().await;

    // The token is kept even though it decodes to nothing; the session
    // resolves customer and account from the existing records instead.
    let state = session.state();
    assert!(state.token.is_some());
    assert!(state.user_id.is_none());
    assert_eq!(state.customer_id.as_deref(), Some("c5"));
    assert_eq!(state.account_id.as_deref(), Some("a9"));
}

#[tokio::test]
async fn account_not_found_triggers_creation() {
    // Default options: the lookup answers 404 until an account is created.
    let bank = MockBank::start(MockOptions::default());
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;

    assert_eq!(session.state().account_id.as_deref(), Some("a1"));
    assert_eq!(bank.request_count(CREATE_ACCOUNT_PATH), 1);
    let create = metrics.operation("create_account");
    assert_eq!(create.attempts(), 1);
    assert_eq!(create.failures(), 0);
}

#[tokio::test]
async fn account_lookup_server_error_does_not_create() {
    let options = MockOptions {
        find_account_status: 503,
        ..MockOptions::default()
    };
    let bank = MockBank::start(options);
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;

    assert!(session.state().account_id.is_none());
    assert_eq!(bank.request_count(CREATE_ACCOUNT_PATH), 0);
    assert_eq!(metrics.operation("get_account_by_customer").failures(), 1);
}

#[tokio::test]
async fn customer_creation_failure_falls_back_to_listing() {
    let options = MockOptions {
        customer_create_status: 500,
        listed_customer_id: Some("c9".to_string()),
        ..MockOptions::default()
    };
    let bank = MockBank::start(options);
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;

    assert_eq!(session.state().customer_id.as_deref(), Some("c9"));
    assert_eq!(metrics.operation("create_customer").failures(), 1);
    assert_eq!(metrics.operation("get_customer_list").attempts(), 1);
    assert_eq!(metrics.operation("get_customer_list").failures(), 0);
}

#[tokio::test]
async fn credit_without_account_id_emits_no_request() {
    let options = MockOptions {
        find_account_status: 503,
        ..MockOptions::default()
    };
    let bank = MockBank::start(options);
    let (mut session, metrics) = make_session(&bank);

    session.bootstrap().await;
    assert!(session.state().account_id.is_none());

    session.execute(Operation::CreditAccount).await;

    assert_eq!(bank.request_count(CREDIT_PATH), 0);
    let credit = metrics.operation(Operation::CreditAccount.name());
    assert_eq!(credit.attempts(), 0);
    assert_eq!(credit.failures(), 0);
}
