//! Subscription lifecycle orchestration.
//!
//! Everything a member-facing surface needs to show and mutate memberships:
//! the annotated overview (role, account label, next term date per row),
//! purchase with a freshly minted join code, partial edits, cancellation by
//! end-dating, billing-card switches, and profile completion. Reads and
//! writes all go through the repository port under the engine's bounded
//! timeout.

use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::{info, warn};

use regulars_shared::{
    Benefit, MembershipError, MembershipResult, Subscriber, SubscriberId, Subscription,
    SubscriptionId,
};

use crate::config::EngineConfig;
use crate::repository::{NewSubscription, ProfileUpdate, Repository, SubscriptionPatch};
use crate::roles::{role_for, AccountType, SubscriptionRole};
use crate::terms::{term_info, TermInfo};

// =============================================================================
// Types
// =============================================================================

/// One row of a member's subscription overview, annotated for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    pub subscription: Subscription,
    pub role: SubscriptionRole,
    pub account_type: AccountType,
    pub term: TermInfo,
}

// =============================================================================
// Service
// =============================================================================

pub struct SubscriptionService<R> {
    repository: Arc<R>,
    config: EngineConfig,
}

impl<R: Repository> SubscriptionService<R> {
    pub fn new(repository: Arc<R>, config: EngineConfig) -> Self {
        Self { repository, config }
    }

    /// Raw subscription records for a subscriber.
    pub async fn subscriptions_for(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<Subscription>> {
        self.config
            .bounded(
                "list subscriptions",
                self.repository.list_subscriptions_by_customer(subscriber_id),
            )
            .await
    }

    /// Raw benefit records for a subscriber.
    pub async fn benefits_for(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<Benefit>> {
        self.config
            .bounded(
                "list benefits",
                self.repository.list_benefits_by_customer(subscriber_id),
            )
            .await
    }

    /// Every subscription the viewer may see, annotated with their role,
    /// account label, and next term date.
    ///
    /// Rows the viewer has no recognizable relationship to are dropped, never
    /// rendered with a placeholder label. A row whose term cannot be resolved
    /// (a stored anchor day the target month does not have) stays visible
    /// without a term line; one bad date must not blank the whole overview.
    pub async fn member_overview(
        &self,
        viewer_id: &SubscriberId,
        today: Date,
    ) -> MembershipResult<Vec<SubscriptionSummary>> {
        let subscriptions = self.subscriptions_for(viewer_id).await?;

        let mut rows = Vec::with_capacity(subscriptions.len());
        for subscription in subscriptions {
            let role = role_for(&subscription, viewer_id);
            let Some(account_type) = role.account_type() else {
                continue;
            };

            let term = match term_info(&subscription, today) {
                Ok(term) => term,
                Err(err) => {
                    warn!(
                        subscription_id = %subscription.id,
                        error = %err,
                        "Could not resolve billing term"
                    );
                    TermInfo::none()
                }
            };

            rows.push(SubscriptionSummary {
                subscription,
                role,
                account_type,
                term,
            });
        }

        Ok(rows)
    }

    /// Purchase a new subscription, minting its six-digit join code.
    pub async fn create(&self, new: &NewSubscription) -> MembershipResult<Subscription> {
        if let Some(day) = new.anchor_day {
            validate_anchor_day(day)?;
        }

        let code = generate_join_code();
        let subscription = self
            .config
            .bounded(
                "create subscription",
                self.repository.create_subscription(new, &code),
            )
            .await?;

        info!(
            subscription_id = %subscription.id,
            owner_id = %new.owner_id,
            location_id = %new.location_id,
            "Created subscription"
        );

        Ok(subscription)
    }

    /// Apply a partial edit and return the stored record.
    pub async fn update(
        &self,
        subscription_id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> MembershipResult<Subscription> {
        if patch.is_empty() {
            return Err(MembershipError::Validation(
                "Subscription update carries no changes".to_string(),
            ));
        }
        if let Some(day) = patch.anchor_day {
            validate_anchor_day(day)?;
        }

        let updated = self
            .config
            .bounded(
                "update subscription",
                self.repository.update_subscription(subscription_id, patch),
            )
            .await?;

        info!(subscription_id = %subscription_id, "Updated subscription");
        Ok(updated)
    }

    /// Cancel by end-dating: the term runs out on `end_date` instead of
    /// renewing, and recurring billing detaches with it.
    pub async fn cancel(
        &self,
        subscription_id: &SubscriptionId,
        end_date: Date,
    ) -> MembershipResult<()> {
        self.config
            .bounded(
                "cancel subscription",
                self.repository.cancel_subscription(subscription_id, end_date),
            )
            .await?;

        info!(
            subscription_id = %subscription_id,
            end_date = %end_date,
            "Canceled subscription"
        );
        Ok(())
    }

    /// Point the subscription's recurring billing at a different saved card.
    pub async fn update_payment_method(
        &self,
        subscription_id: &SubscriptionId,
        card_id: &str,
    ) -> MembershipResult<()> {
        self.config
            .bounded(
                "update subscription payment",
                self.repository
                    .update_subscription_payment(subscription_id, card_id),
            )
            .await?;

        info!(subscription_id = %subscription_id, "Switched subscription billing card");
        Ok(())
    }

    /// Profile-completion edits on the subscriber record.
    pub async fn complete_profile(
        &self,
        subscriber_id: &SubscriberId,
        update: &ProfileUpdate,
    ) -> MembershipResult<Subscriber> {
        if update.is_empty() {
            return Err(MembershipError::Validation(
                "Profile update carries no changes".to_string(),
            ));
        }

        let updated = self
            .config
            .bounded(
                "update profile",
                self.repository.update_profile(subscriber_id, update),
            )
            .await?;

        info!(subscriber_id = %subscriber_id, "Updated subscriber profile");
        Ok(updated)
    }
}

fn validate_anchor_day(day: u8) -> MembershipResult<()> {
    if !(1..=31).contains(&day) {
        return Err(MembershipError::Validation(format!(
            "Billing anchor day must be between 1 and 31, got {}",
            day
        )));
    }
    Ok(())
}

/// Random zero-padded six-digit join code.
fn generate_join_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

// =============================================================================
// Tests
// =============================================================================
