//! Verification-code delivery port.
//!
//! The engine never generates or checks one-time passcodes itself. A
//! provider behind this trait owns code generation, delivery, expiry, and
//! matching; the engine only interprets the outcome.

use async_trait::async_trait;

use regulars_shared::MembershipResult;

use crate::contact::Contact;

/// Result of checking a submitted verification code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpOutcome {
    /// Code matched and is still within its validity window
    Approved,
    /// Code was wrong, expired, or already consumed
    Denied,
}

impl OtpOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Sends and checks one-time verification codes.
///
/// Errors from implementations should describe transport failures (provider
/// down, rejected destination). A wrong code is not an error; it comes back
/// as [`OtpOutcome::Denied`].
#[async_trait]
pub trait OtpService: Send + Sync {
    /// Send a fresh verification code over the contact's channel.
    async fn send(&self, contact: &Contact) -> MembershipResult<()>;

    /// Check a submitted code against the one most recently sent.
    async fn check(&self, contact: &Contact, code: &str) -> MembershipResult<OtpOutcome>;
}
