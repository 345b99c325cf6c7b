//! Saved-card lookup and storage via the card vault port.
//!
//! Card numbers never pass through the engine. Members tokenize a card with
//! the payment provider's own widget; the engine only ever sees the opaque
//! nonce and the provider's card-on-file summaries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use regulars_shared::{MembershipResult, SubscriberId};

use crate::config::EngineConfig;

/// A card on file with the payment provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    /// Provider-side card id, referenced when switching billing
    pub id: String,
    pub brand: String,
    pub last4: String,
    pub exp_month: u8,
    pub exp_year: u16,
}

/// Card-on-file operations the payment provider exposes.
#[async_trait]
pub trait CardVault: Send + Sync {
    /// Cards already saved against the subscriber.
    async fn cards_for_customer(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<CardSummary>>;

    /// Exchange a tokenization nonce for a stored card.
    async fn save_card(
        &self,
        subscriber_id: &SubscriberId,
        nonce: &str,
    ) -> MembershipResult<CardSummary>;
}

/// Thin orchestration over the card vault.
pub struct PaymentMethods<P> {
    vault: Arc<P>,
    config: EngineConfig,
}

impl<P: CardVault> PaymentMethods<P> {
    pub fn new(vault: Arc<P>, config: EngineConfig) -> Self {
        Self { vault, config }
    }

    /// List the subscriber's saved cards.
    pub async fn saved_cards(
        &self,
        subscriber_id: &SubscriberId,
    ) -> MembershipResult<Vec<CardSummary>> {
        self.config
            .bounded("list saved cards", self.vault.cards_for_customer(subscriber_id))
            .await
    }

    /// Store a freshly tokenized card for the subscriber.
    ///
    /// The nonce is single-use and provider-scoped; it is not logged.
    pub async fn store_card(
        &self,
        subscriber_id: &SubscriberId,
        nonce: &str,
    ) -> MembershipResult<CardSummary> {
        let card = self
            .config
            .bounded("save card", self.vault.save_card(subscriber_id, nonce))
            .await?;

        info!(
            subscriber_id = %subscriber_id,
            card_id = %card.id,
            brand = %card.brand,
            "Saved card to vault"
        );

        Ok(card)
    }
}
