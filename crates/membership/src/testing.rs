//! In-memory port doubles.
//!
//! Deterministic implementations of the engine's ports, backed by plain
//! collections behind a mutex. Integration tests (and downstream consumers
//! developing without a live store) seed records, inject failures, and
//! inspect what the engine wrote. Nothing in this module talks to a network.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use time::{Date, OffsetDateTime};

use regulars_shared::{
    Benefit, Location, MembershipError, MembershipResult, RedemptionStatus, Subscriber,
    SubscriberId, Subscription, SubscriptionId, SubscriptionStatus,
};
use regulars_shared::BenefitId;

use crate::contact::{Contact, ContactChannel};
use crate::otp::{OtpOutcome, OtpService};
use crate::payments::{CardSummary, CardVault};
use crate::repository::{NewSubscription, ProfileUpdate, Repository, SubscriptionPatch};

// =============================================================================
// Repository
// =============================================================================

#[derive(Default)]
struct RepositoryState {
    subscribers: Vec<Subscriber>,
    subscriptions: Vec<Subscription>,
    benefits: Vec<Benefit>,
    locations: Vec<Location>,
    /// Subscribers whose subscription reads fail with a retryable error
    failing_subscription_reads: HashSet<SubscriberId>,
    redeem_calls: Vec<BenefitId>,
    payment_updates: Vec<(SubscriptionId, String)>,
    created: u32,
}

/// In-memory [`Repository`] for tests.
#[derive(Default)]
pub struct InMemoryRepository {
    state: Mutex<RepositoryState>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RepositoryState> {
        // A panicking test poisons the lock; the data is still sound for
        // whatever assertions follow.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_subscriber(&self, subscriber: Subscriber) {
        self.state().subscribers.push(subscriber);
    }

    pub fn insert_subscription(&self, subscription: Subscription) {
        self.state().subscriptions.push(subscription);
    }

    pub fn insert_benefit(&self, benefit: Benefit) {
        self.state().benefits.push(benefit);
    }

    pub fn insert_location(&self, location: Location) {
        self.state().locations.push(location);
    }

    /// Make every subscription read for `subscriber_id` fail with a
    /// retryable repository error.
    pub fn fail_subscription_reads_for(&self, subscriber_id: &SubscriberId) {
        self.state()
            .failing_subscription_reads
            .insert(subscriber_id.clone());
    }

    pub fn stored_subscription(&self, subscription_id: &SubscriptionId) -> Option<Subscription> {
        self.state()
            .subscriptions
            .iter()
            .find(|subscription| &subscription.id == subscription_id)
            .cloned()
    }

    pub fn stored_subscription_count(&self) -> usize {
        self.state().subscriptions.len()
    }

    pub fn stored_benefit(&self, benefit_id: &BenefitId) -> Option<Benefit> {
        self.state()
            .benefits
            .iter()
            .find(|benefit| &benefit.id == benefit_id)
            .cloned()
    }

    /// Every redeem attempt that reached the store, in order.
    pub fn redeem_call_count(&self) -> usize {
        self.state().redeem_calls.len()
    }

    /// Every billing-card switch that reached the store, in order.
    pub fn payment_updates(&self) -> Vec<(SubscriptionId, String)> {
        self.state().payment_updates.clone()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_subscriptions_by_customer(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<Subscription>> {
        let state = self.state();
        if state.failing_subscription_reads.contains(subscriber_id) {
            return Err(MembershipError::repository(format!(
                "Injected subscription read failure for {}",
                subscriber_id
            )));
        }

        Ok(state
            .subscriptions
            .iter()
            .filter(|subscription| {
                subscription.owner_ids.contains(subscriber_id)
                    || subscription.active_subscriber_ids.contains(subscriber_id)
            })
            .cloned()
            .collect())
    }

    async fn list_benefits_by_customer(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<Benefit>> {
        Ok(self
            .state()
            .benefits
            .iter()
            .filter(|benefit| &benefit.subscriber_id == subscriber_id)
            .cloned()
            .collect())
    }

    async fn find_subscribers_by_contact(
        &self,
        contact: &Contact,
    ) -> MembershipResult<Vec<Subscriber>> {
        Ok(self
            .state()
            .subscribers
            .iter()
            .filter(|subscriber| match contact.channel() {
                ContactChannel::Email => subscriber.email.as_deref() == Some(contact.value()),
                ContactChannel::Sms => subscriber.phone.as_deref() == Some(contact.value()),
            })
            .cloned()
            .collect())
    }

    async fn update_profile(
        &self,
        subscriber_id: &SubscriberId,
        update: &ProfileUpdate,
    ) -> MembershipResult<Subscriber> {
        let mut state = self.state();
        let subscriber = state
            .subscribers
            .iter_mut()
            .find(|subscriber| &subscriber.id == subscriber_id)
            .ok_or_else(|| {
                MembershipError::NotFound(format!("No subscriber {}", subscriber_id))
            })?;

        if let Some(display_name) = &update.display_name {
            subscriber.display_name = display_name.clone();
        }
        if let Some(email) = &update.email {
            subscriber.email = Some(email.clone());
        }
        if let Some(phone) = &update.phone {
            subscriber.phone = Some(phone.clone());
        }

        Ok(subscriber.clone())
    }

    async fn create_subscription(
        &self,
        new: &NewSubscription,
        code: &str,
    ) -> MembershipResult<Subscription> {
        let mut state = self.state();
        state.created += 1;

        let subscription = Subscription {
            id: SubscriptionId::new(format!("sub_{:04}", state.created)),
            code: code.to_string(),
            status: SubscriptionStatus::Active,
            owner_ids: vec![new.owner_id.clone()],
            active_subscriber_ids: vec![new.owner_id.clone()],
            end_date: new.end_date,
            anchor_day: new.anchor_day,
            start_date: Some(new.start_date),
            frequency: new.frequency,
            location_ref: serde_json::Value::String(new.location_id.to_string()),
            plan_ids: new.plan_ids.clone(),
        };

        state.subscriptions.push(subscription.clone());
        Ok(subscription)
    }

    async fn update_subscription(
        &self,
        subscription_id: &SubscriptionId,
        patch: &SubscriptionPatch,
    ) -> MembershipResult<Subscription> {
        let mut state = self.state();
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|subscription| &subscription.id == subscription_id)
            .ok_or_else(|| {
                MembershipError::NotFound(format!("No subscription {}", subscription_id))
            })?;

        if let Some(status) = patch.status {
            subscription.status = status;
        }
        if let Some(active) = &patch.active_subscriber_ids {
            subscription.active_subscriber_ids = active.clone();
        }
        if let Some(anchor_day) = patch.anchor_day {
            subscription.anchor_day = Some(anchor_day);
        }
        if let Some(end_date) = patch.end_date {
            subscription.end_date = Some(end_date);
        }
        if let Some(plan_ids) = &patch.plan_ids {
            subscription.plan_ids = plan_ids.clone();
        }

        Ok(subscription.clone())
    }

    async fn redeem_entitlement(
        &self,
        benefit_id: &BenefitId,
        redeemed_at: OffsetDateTime,
    ) -> MembershipResult<()> {
        let mut state = self.state();
        state.redeem_calls.push(benefit_id.clone());

        let benefit = state
            .benefits
            .iter_mut()
            .find(|benefit| &benefit.id == benefit_id)
            .ok_or_else(|| MembershipError::NotFound(format!("No benefit {}", benefit_id)))?;

        // Atomicity lives here, as it does in the real store: the first
        // committed redeem wins and every later one is rejected outright.
        if benefit.status.is_redeemed() {
            return Err(MembershipError::repository_permanent(format!(
                "Benefit {} is already redeemed",
                benefit_id
            )));
        }

        benefit.status = RedemptionStatus::Redeemed;
        benefit.last_redeemed = Some(redeemed_at);
        Ok(())
    }

    async fn cancel_subscription(
        &self,
        subscription_id: &SubscriptionId,
        end_date: Date,
    ) -> MembershipResult<()> {
        let mut state = self.state();
        let subscription = state
            .subscriptions
            .iter_mut()
            .find(|subscription| &subscription.id == subscription_id)
            .ok_or_else(|| {
                MembershipError::NotFound(format!("No subscription {}", subscription_id))
            })?;

        subscription.end_date = Some(end_date);
        subscription.anchor_day = None;
        subscription.status = SubscriptionStatus::Canceled;
        Ok(())
    }

    async fn update_subscription_payment(
        &self,
        subscription_id: &SubscriptionId,
        card_id: &str,
    ) -> MembershipResult<()> {
        let mut state = self.state();
        if !state
            .subscriptions
            .iter()
            .any(|subscription| &subscription.id == subscription_id)
        {
            return Err(MembershipError::NotFound(format!(
                "No subscription {}",
                subscription_id
            )));
        }

        state
            .payment_updates
            .push((subscription_id.clone(), card_id.to_string()));
        Ok(())
    }

    async fn list_locations(&self) -> MembershipResult<Vec<Location>> {
        Ok(self.state().locations.clone())
    }
}

// =============================================================================
// OTP
// =============================================================================

/// [`OtpService`] that accepts one fixed code.
pub struct StaticOtp {
    code: String,
    transport_failure: bool,
    sent: Mutex<Vec<String>>,
}

impl StaticOtp {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            transport_failure: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Make every send and check fail as if the provider were down.
    pub fn with_transport_failure(mut self) -> Self {
        self.transport_failure = true;
        self
    }

    /// How many codes have been sent.
    pub fn sent_count(&self) -> usize {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl OtpService for StaticOtp {
    async fn send(&self, contact: &Contact) -> MembershipResult<()> {
        if self.transport_failure {
            return Err(MembershipError::repository(
                "Verification provider unavailable",
            ));
        }

        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(contact.value().to_string());
        Ok(())
    }

    async fn check(&self, _contact: &Contact, code: &str) -> MembershipResult<OtpOutcome> {
        if self.transport_failure {
            return Err(MembershipError::repository(
                "Verification provider unavailable",
            ));
        }

        if code == self.code {
            Ok(OtpOutcome::Approved)
        } else {
            Ok(OtpOutcome::Denied)
        }
    }
}

// =============================================================================
// Card vault
// =============================================================================

#[derive(Default)]
struct VaultState {
    cards: Vec<(SubscriberId, CardSummary)>,
    saved_nonces: Vec<String>,
    minted: u32,
}

/// In-memory [`CardVault`] that mints a card per saved nonce.
#[derive(Default)]
pub struct InMemoryCardVault {
    state: Mutex<VaultState>,
}

impl InMemoryCardVault {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, VaultState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_card(&self, subscriber_id: &SubscriberId, card: CardSummary) {
        self.state().cards.push((subscriber_id.clone(), card));
    }

    /// Every nonce exchanged so far, in order.
    pub fn saved_nonces(&self) -> Vec<String> {
        self.state().saved_nonces.clone()
    }
}

#[async_trait]
impl CardVault for InMemoryCardVault {
    async fn cards_for_customer(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<CardSummary>> {
        Ok(self
            .state()
            .cards
            .iter()
            .filter(|(owner, _)| owner == subscriber_id)
            .map(|(_, card)| card.clone())
            .collect())
    }

    async fn save_card(
        &self,
        subscriber_id: &SubscriberId,
        nonce: &str,
    ) -> MembershipResult<CardSummary> {
        let mut state = self.state();
        state.minted += 1;

        let card = CardSummary {
            id: format!("card_{:04}", state.minted),
            brand: "Visa".to_string(),
            last4: "4242".to_string(),
            exp_month: 12,
            exp_year: 2030,
        };

        state.saved_nonces.push(nonce.to_string());
        state.cards.push((subscriber_id.clone(), card.clone()));
        Ok(card)
    }
}

// =============================================================================
// Tests
// =============================================================================
