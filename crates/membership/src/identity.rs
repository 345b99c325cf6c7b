//! Contact-based login and account resolution.
//!
//! Members sign in with whatever contact they remember, not a password: the
//! engine sends a verification code over the detected channel, checks it, and
//! then works out which subscriber record the contact belongs to. One contact
//! can legitimately map to several accounts (families share emails, a phone
//! number gets reused at signup), so the final step ranks the candidates by
//! how much live subscription activity each carries and asks the caller to
//! pick when the answer is not obvious.

use std::sync::Arc;

use futures::future::join_all;
use time::Date;
use tracing::{debug, warn};

use regulars_shared::{MembershipError, MembershipResult, Subscriber};

use crate::config::EngineConfig;
use crate::contact::Contact;
use crate::otp::{OtpOutcome, OtpService};
use crate::repository::Repository;

// =============================================================================
// Types
// =============================================================================

/// A candidate account with its live subscription count.
#[derive(Debug, Clone)]
pub struct RankedAccount {
    pub account: Subscriber,
    /// Subscriptions current as of the ranking date. Zero when the lookup
    /// failed and the failure was absorbed.
    pub active_count: usize,
}

/// Outcome of resolving a verified contact to an account.
#[derive(Debug, Clone)]
pub enum AccountResolution {
    /// Exactly one account matched; it is selected automatically.
    Single(Subscriber),
    /// Several accounts matched, ranked by activity. The caller must ask the
    /// member to pick one before proceeding.
    NeedsSelection(Vec<RankedAccount>),
}

// =============================================================================
// Resolver
// =============================================================================

/// Orchestrates the code-verification login flow over the injected ports.
pub struct IdentityResolver<R, O> {
    repository: Arc<R>,
    otp: Arc<O>,
    config: EngineConfig,
}

impl<R: Repository, O: OtpService> IdentityResolver<R, O> {
    pub fn new(repository: Arc<R>, otp: Arc<O>, config: EngineConfig) -> Self {
        Self {
            repository,
            otp,
            config,
        }
    }

    /// Send a verification code over the contact's channel.
    pub async fn request_code(&self, contact: &Contact) -> MembershipResult<()> {
        self.config
            .bounded("send verification code", self.otp.send(contact))
            .await?;

        debug!(channel = %contact.channel(), "Verification code requested");
        Ok(())
    }

    /// Check a submitted verification code.
    ///
    /// A rejected or expired code is an `Auth` error the caller can word for
    /// the member; transport failures stay `Repository` errors.
    pub async fn verify_code(&self, contact: &Contact, code: &str) -> MembershipResult<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(MembershipError::Validation(
                "Verification code must not be empty".to_string(),
            ));
        }

        let outcome = self
            .config
            .bounded("check verification code", self.otp.check(contact, code))
            .await?;

        match outcome {
            OtpOutcome::Approved => Ok(()),
            OtpOutcome::Denied => Err(MembershipError::Auth(
                "Verification code was rejected or has expired".to_string(),
            )),
        }
    }

    /// The subscriber records behind a verified contact.
    pub async fn resolve_accounts(&self, contact: &Contact) -> MembershipResult<Vec<Subscriber>> {
        let accounts = self
            .config
            .bounded(
                "find subscribers by contact",
                self.repository.find_subscribers_by_contact(contact),
            )
            .await?;

        if accounts.is_empty() {
            return Err(MembershipError::NotFound(
                "No account exists for this contact".to_string(),
            ));
        }

        Ok(accounts)
    }

    /// Rank candidate accounts by how many current subscriptions each holds.
    ///
    /// One independent lookup runs per candidate, gathered with per-item
    /// capture: a failed lookup degrades that single account to a count of
    /// zero and is logged, never aborting or poisoning the sibling lookups.
    /// The result is sorted by count descending; candidates with equal counts
    /// keep their incoming order.
    pub async fn rank_accounts_by_activity(
        &self,
        accounts: &[Subscriber],
        today: Date,
    ) -> Vec<RankedAccount> {
        let lookups = accounts.iter().map(|account| {
            let account = account.clone();
            async move {
                let active_count = match self
                    .config
                    .bounded(
                        "count active subscriptions",
                        self.repository.list_subscriptions_by_customer(&account.id),
                    )
                    .await
                {
                    Ok(subscriptions) => subscriptions
                        .iter()
                        .filter(|subscription| subscription.is_current(today))
                        .count(),
                    Err(err) => {
                        let absorbed = MembershipError::PartialFailure {
                            account_id: account.id.to_string(),
                            reason: err.to_string(),
                        };
                        warn!(error = %absorbed, "Absorbed activity lookup failure during ranking");
                        0
                    }
                };

                RankedAccount {
                    account,
                    active_count,
                }
            }
        });

        let mut ranked = join_all(lookups).await;
        // sort_by is stable, so ties keep repository order
        ranked.sort_by(|a, b| b.active_count.cmp(&a.active_count));
        ranked
    }

    /// Resolve a verified contact to an account, or to a ranked choice.
    ///
    /// A sole candidate auto-selects; several candidates require an explicit
    /// pick by the member, so the ranked list goes back to the caller.
    pub async fn resolve(
        &self,
        contact: &Contact,
        today: Date,
    ) -> MembershipResult<AccountResolution> {
        let mut accounts = self.resolve_accounts(contact).await?;

        if accounts.len() == 1 {
            return Ok(AccountResolution::Single(accounts.remove(0)));
        }

        let ranked = self.rank_accounts_by_activity(&accounts, today).await;
        Ok(AccountResolution::NeedsSelection(ranked))
    }
}

// =============================================================================
// Tests
// =============================================================================
