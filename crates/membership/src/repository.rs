//! Storage port for membership records.
//!
//! One trait fronts whatever store holds subscribers, subscriptions,
//! benefits, and locations. The engine is deliberately ignorant of the
//! backing system; implementations translate these calls into their own
//! queries and mutations and surface failures as
//! [`MembershipError::Repository`](regulars_shared::MembershipError) with an
//! honest `retryable` flag.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use regulars_shared::{
    Benefit, BenefitId, BillingFrequency, Location, LocationId, MembershipResult, PlanId,
    Subscriber, SubscriberId, Subscription, SubscriptionId, SubscriptionStatus,
};

use crate::contact::Contact;

// =============================================================================
// Write Payloads
// =============================================================================

/// Fields required to create a subscription.
///
/// The join code is passed alongside rather than inside: the engine mints
/// it, and keeping it out of this struct stops callers from smuggling in
/// their own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub owner_id: SubscriberId,
    pub plan_ids: Vec<PlanId>,
    pub location_id: LocationId,
    pub start_date: Date,
    pub frequency: BillingFrequency,
    /// Day of month the recurring charge lands on, for recurring plans
    pub anchor_day: Option<u8>,
    /// Fixed end for prepaid/gifted terms
    pub end_date: Option<Date>,
}

/// Partial update for an existing subscription. `None` means "leave alone".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionPatch {
    pub status: Option<SubscriptionStatus>,
    pub active_subscriber_ids: Option<Vec<SubscriberId>>,
    pub anchor_day: Option<u8>,
    pub end_date: Option<Date>,
    pub plan_ids: Option<Vec<PlanId>>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.active_subscriber_ids.is_none()
            && self.anchor_day.is_none()
            && self.end_date.is_none()
            && self.plan_ids.is_none()
    }
}

/// Partial update for a subscriber's profile. `None` means "leave alone".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.email.is_none() && self.phone.is_none()
    }
}

// =============================================================================
// Port
// =============================================================================

/// Storage operations the engine depends on.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Every subscription where the subscriber is owner or active member.
    async fn list_subscriptions_by_customer(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<Subscription>>;

    /// Every benefit held by the subscriber, across all their subscriptions.
    async fn list_benefits_by_customer(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<Benefit>>;

    /// Subscribers whose stored email or phone matches the contact.
    async fn find_subscribers_by_contact(
        &self,
        contact: &Contact,
    ) -> MembershipResult<Vec<Subscriber>>;

    /// Apply a partial profile update and return the stored record.
    async fn update_profile(
        &self,
        subscriber_id: &SubscriberId,
        update: &ProfileUpdate,
    ) -> MembershipResult<Subscriber>;

    /// Persist a new subscription carrying the engine-minted join code.
    async fn create_subscription(
        &self,
        new: &NewSubscription,
        code: &str,
    ) -> MembershipResult<Subscription>;

    /// Apply a partial subscription update and return the stored record.
    async fn update_subscription(
        &self,
        subscription_id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> MembershipResult<Subscription>;

    /// Mark a benefit redeemed at `redeemed_at`.
    ///
    /// Must fail with a non-retryable repository error if the benefit is
    /// already redeemed, so a lost race surfaces instead of double-spending.
    async fn redeem_entitlement(
        &self,
        benefit_id: &BenefitId,
        redeemed_at: OffsetDateTime,
    ) -> MembershipResult<()>;

    /// Cancel by setting an end date AND detaching any recurring billing
    /// agreement, so the term runs out instead of renewing.
    async fn cancel_subscription(
        &self,
        subscription_id: &SubscriptionId,
        end_date: Date,
    ) -> MembershipResult<()>;

    /// Point the subscription's recurring billing at a different saved card.
    async fn update_subscription_payment(
        &self,
        subscription_id: &SubscriptionId,
        card_id: &str,
    ) -> MembershipResult<()>;

    /// All locations in the program, for building platform-id indexes.
    async fn list_locations(&self) -> MembershipResult<Vec<Location>>;
}
