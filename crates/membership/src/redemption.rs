//! Entitlement redemption.
//!
//! A benefit moves through exactly one transition in this engine:
//! `Available` to `Redeemed`. The eligibility rules live in a pure guard so
//! they can be tested against fixed clocks; the service wraps the guard
//! around the store commit and then re-reads the record the store actually
//! wrote. Resetting a benefit back to `Available` at the next billing period
//! belongs to the billing engine, not to this module.

use std::sync::Arc;

use time::OffsetDateTime;
use tracing::info;

use regulars_shared::{Benefit, MembershipError, MembershipResult, RedeemConflict, Subscription};

use crate::config::EngineConfig;
use crate::repository::Repository;

// =============================================================================
// Eligibility guard
// =============================================================================

/// Whether a benefit may be redeemed right now.
///
/// Checks run in order: a lapsed subscription wins over a spent benefit, so
/// the member hears "expired" rather than "already used" when both are true.
/// The guard never mutates anything.
pub fn check_redeemable(
    benefit: &Benefit,
    subscription: &Subscription,
    now: OffsetDateTime,
) -> MembershipResult<()> {
    if !subscription.is_current(now.date()) {
        return Err(MembershipError::StateConflict(
            RedeemConflict::SubscriptionExpired,
        ));
    }

    if benefit.status.is_redeemed() {
        return Err(MembershipError::StateConflict(
            RedeemConflict::AlreadyRedeemed,
        ));
    }

    Ok(())
}

// =============================================================================
// Service
// =============================================================================

/// Runs the redemption transition against the backing store.
pub struct RedemptionService<R> {
    repository: Arc<R>,
    config: EngineConfig,
}

impl<R: Repository> RedemptionService<R> {
    pub fn new(repository: Arc<R>, config: EngineConfig) -> Self {
        Self { repository, config }
    }

    /// Redeem `benefit` against the subscription that granted it.
    ///
    /// The store owns atomicity for the status flip: if a concurrent redeem
    /// got there first, its rejection surfaces here as a non-retryable
    /// repository error rather than a double spend. On success the record is
    /// re-read from the store and the authoritative copy returned; the local
    /// optimistic value is never trusted.
    pub async fn redeem(
        &self,
        benefit: &Benefit,
        subscription: &Subscription,
        now: OffsetDateTime,
    ) -> MembershipResult<Benefit> {
        if benefit.subscription_id != subscription.id {
            return Err(MembershipError::Validation(format!(
                "Benefit {} does not belong to subscription {}",
                benefit.id, subscription.id
            )));
        }

        check_redeemable(benefit, subscription, now)?;

        self.config
            .bounded(
                "redeem entitlement",
                self.repository.redeem_entitlement(&benefit.id, now),
            )
            .await?;

        info!(
            benefit_id = %benefit.id,
            subscription_id = %subscription.id,
            "Entitlement redeemed"
        );

        let stored = self
            .config
            .bounded(
                "reload redeemed entitlement",
                self.repository
                    .list_benefits_by_customer(&benefit.subscriber_id),
            )
            .await?
            .into_iter()
            .find(|candidate| candidate.id == benefit.id)
            .ok_or_else(|| {
                MembershipError::repository(format!(
                    "Benefit {} missing after redemption commit",
                    benefit.id
                ))
            })?;

        Ok(stored)
    }
}

// =============================================================================
// Tests
// =============================================================================
