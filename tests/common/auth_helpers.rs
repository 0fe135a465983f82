//! Authentication test helpers
//!
//! Provides the shared test secret, known users and token generation.

use std::time::Duration;

use saas_manager::backend::auth::create_token;
use saas_manager::shared::messaging::UserId;

/// Secret every test server is configured with
pub const TEST_SECRET: &str = "integration-test-secret";

/// Test user credentials
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub name: &'static str,
    pub token: String,
}

impl TestUser {
    pub fn new(id: UserId, name: &'static str) -> Self {
        Self {
            id,
            name,
            token: generate_test_token(id, name),
        }
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn alice() -> TestUser {
    TestUser::new(1, "Alice")
}

pub fn bob() -> TestUser {
    TestUser::new(2, "Bob")
}

pub fn carol() -> TestUser {
    TestUser::new(3, "Carol")
}

/// Generate a test JWT token valid for one hour
pub fn generate_test_token(user_id: UserId, name: &str) -> String {
    create_token(TEST_SECRET, user_id, name, Duration::from_secs(3600))
        .expect("Failed to create test token")
}
