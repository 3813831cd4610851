//! Account holder identity
//!
//! An account holder is metadata attached to an account. It holds no funds
//! and never changes after construction.

use std::fmt;

/// Immutable identity record for the owner of one or more accounts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHolder {
    last_name: String,
    first_name: String,
    credit_rating: i32,
    registration_date: String,
}

impl AccountHolder {
    /// Create a new holder record
    ///
    /// The registration date is kept as supplied; no date format is enforced.
    pub fn new(
        last_name: impl Into<String>,
        first_name: impl Into<String>,
        credit_rating: i32,
        registration_date: impl Into<String>,
    ) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            credit_rating,
            registration_date: registration_date.into(),
        }
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn credit_rating(&self) -> i32 {
        self.credit_rating
    }

    pub fn registration_date(&self) -> &str {
        &self.registration_date
    }
}

impl fmt::Display for AccountHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.last_name, self.first_name)
    }
}
