//! Error taxonomy for the membership engine.
//!
//! Every fallible engine operation returns [`MembershipResult`]. The variants
//! map one-to-one onto the outcomes a presentation layer has to word
//! differently, and [`MembershipError::code`] gives it a stable machine code
//! for each.

use thiserror::Error;

/// Reason a redemption attempt was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedeemConflict {
    /// The backing subscription has lapsed: no billing anchor and the end
    /// date is behind the reference date.
    SubscriptionExpired,
    /// The benefit was already spent this cycle.
    AlreadyRedeemed,
}

impl std::fmt::Display for RedeemConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubscriptionExpired => write!(f, "subscription expired"),
            Self::AlreadyRedeemed => write!(f, "benefit already redeemed"),
        }
    }
}

/// Engine-wide error type
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Caller input the engine cannot work with (malformed contact,
    /// impossible anchor date, missing owner)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Verification code rejected or expired
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// No record behind a verified reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single candidate's lookup failed during account ranking. Ranking
    /// absorbs these: they are logged and the account degrades to zero
    /// activity, never aborting the sibling lookups.
    #[error("Activity lookup failed for account {account_id}: {reason}")]
    PartialFailure {
        account_id: String,
        reason: String,
    },

    /// Backing store or transport failure
    #[error("Repository error: {message}")]
    Repository {
        message: String,
        retryable: bool,
    },

    /// The requested transition is not legal from the current record state
    #[error("State conflict: {0}")]
    StateConflict(RedeemConflict),
}

pub type MembershipResult<T> = Result<T, MembershipError>;

impl MembershipError {
    /// Repository failure the caller may retry.
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            retryable: true,
        }
    }

    /// Repository rejection that retrying will not fix.
    pub fn repository_permanent(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
            retryable: false,
        }
    }

    /// A port call that outran the configured deadline.
    pub fn timeout(operation: &str, secs: u64) -> Self {
        Self::Repository {
            message: format!("{} timed out after {}s", operation, secs),
            retryable: true,
        }
    }

    /// Whether the caller is invited to retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Repository {
                retryable: true,
                ..
            }
        )
    }

    /// Stable machine-readable code for the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Auth(_) => "AUTH_FAILED",
            Self::NotFound(_) => "NOT_FOUND",
            Self::PartialFailure { .. } => "PARTIAL_FAILURE",
            Self::Repository { .. } => "REPOSITORY_ERROR",
            Self::StateConflict(_) => "STATE_CONFLICT",
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
