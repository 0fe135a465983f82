//! Custom assertion macros and utilities
//!
//! Provides assertion macros with more descriptive failure messages.

/// Assert that a result is ok and return the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $message:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $message, e),
        }
    };
}

/// Assert that an `online_users` list does not name a user
#[macro_export]
macro_rules! assert_offline {
    ($users:expr, $user_id:expr) => {
        assert!(
            !$users.contains(&$user_id),
            "Expected user {} to be offline, online users: {:?}",
            $user_id,
            $users
        );
    };
}
