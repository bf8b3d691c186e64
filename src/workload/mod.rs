//! Weighted operation mix
//!
//! The steady-state behavior of a simulated user: a weighted random pick over
//! the five query/command operations, a uniform random wait between
//! iterations, and a uniform random credit amount. All draws go through the
//! user's own seeded RNG so a fixed run seed reproduces the schedule.

use rand::Rng;
use std::time::Duration;

/// Operations a user performs after bootstrap, with their relative weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetAccount,
    GetAccountByCustomer,
    GetCustomer,
    AccountOperations,
    CreditAccount,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::GetAccount,
        Operation::GetAccountByCustomer,
        Operation::GetCustomer,
        Operation::AccountOperations,
        Operation::CreditAccount,
    ];

    /// Relative selection weight
    pub const fn weight(self) -> u32 {
        match self {
            Operation::GetAccount => 3,
            Operation::GetAccountByCustomer => 2,
            Operation::GetCustomer => 2,
            Operation::AccountOperations => 1,
            Operation::CreditAccount => 1,
        }
    }

    /// Stable name used for metrics and logging
    pub const fn name(self) -> &'static str {
        match self {
            Operation::GetAccount => "get_account",
            Operation::GetAccountByCustomer => "get_account_by_customer",
            Operation::GetCustomer => "get_customer",
            Operation::AccountOperations => "get_account_operations",
            Operation::CreditAccount => "credit_account",
        }
    }

    const fn total_weight() -> u32 {
        let mut sum = 0;
        let mut i = 0;
        while i < Operation::ALL.len() {
            sum += Operation::ALL[i].weight();
            i += 1;
        }
        sum
    }
}

/// Names of the bootstrap-phase operations, for metrics and logging.
pub mod bootstrap_ops {
    pub const LOGIN: &str = "login";
    pub const ALTERNATIVE_LOGIN: &str = "alternative_login";
    pub const GET_USER_PROFILE: &str = "get_user_profile";
    pub const CREATE_CUSTOMER: &str = "create_customer";
    pub const GET_CUSTOMER_LIST: &str = "get_customer_list";
    pub const FIND_ACCOUNT: &str = "get_account_by_customer";
    pub const CREATE_ACCOUNT: &str = "create_account";
}

/// Draw the next operation according to the weight table.
pub fn pick_operation<R: Rng>(rng: &mut R) -> Operation {
    let mut roll = rng.gen_range(0..Operation::total_weight());
    for op in Operation::ALL {
        if roll < op.weight() {
            return op;
        }
        roll -= op.weight();
    }
    // The roll is bounded by the weight sum, so the loop always returns.
    unreachable!("weighted pick exhausted the operation table")
}

/// Draw the wait between two iterations, uniform in [min, max].
pub fn wait_time<R: Rng>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let span_ms = (max - min).as_millis() as u64;
    min + Duration::from_millis(rng.gen_range(0..=span_ms))
}

/// Draw a credit amount, uniform in [10, 1000], rounded to cents.
pub fn credit_amount<R: Rng>(rng: &mut R) -> f64 {
    let amount: f64 = rng.gen_range(10.0..=1000.0);
    (amount * 100.0).round() / 100.0
}
