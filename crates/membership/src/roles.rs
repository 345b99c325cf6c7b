//! Role classification.
//!
//! A subscription knows who pays for it (the owner, first id on the record)
//! and who actively consumes it (the active member list). The relationship
//! between those two sets and the viewing subscriber determines what the
//! viewer is allowed to see and how their account is labeled.

use serde::{Deserialize, Serialize};

use regulars_shared::{SubscriberId, Subscription};

// =============================================================================
// Enums
// =============================================================================

/// How a viewer relates to a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionRole {
    /// Owner who is also the only active member
    OwnerSingle,
    /// Owner consuming alongside other active members
    OwnerManaged,
    /// Owner paying for a subscription they do not consume
    OwnerGifted,
    /// Active member on someone else's subscription, shared with the owner
    MemberShared,
    /// Active member whose owner stays off the member list entirely
    MemberGiftedRecipient,
    /// Viewer has no recognizable relationship to the subscription
    Unknown,
}

impl SubscriptionRole {
    pub fn is_owner(&self) -> bool {
        matches!(
            self,
            Self::OwnerSingle | Self::OwnerManaged | Self::OwnerGifted
        )
    }

    /// Whether the subscription should appear in the viewer's overview at all.
    pub fn is_displayable(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Account-type label for member-facing surfaces.
    pub fn account_type(&self) -> Option<AccountType> {
        match self {
            Self::OwnerSingle | Self::OwnerManaged | Self::OwnerGifted => {
                Some(AccountType::AccountManager)
            }
            Self::MemberShared => Some(AccountType::SharedMember),
            Self::MemberGiftedRecipient => Some(AccountType::GiftedMember),
            Self::Unknown => None,
        }
    }
}

/// Member-facing account label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    AccountManager,
    SharedMember,
    GiftedMember,
}

impl AccountType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AccountManager => "Account Manager",
            Self::SharedMember => "Shared Member",
            Self::GiftedMember => "Gifted Member",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// =============================================================================
// Classification
// =============================================================================

/// Classify the viewer's role from the raw ownership and membership ids.
///
/// The owner never appears twice: either they are on the active list
/// (consuming what they pay for) or they are not (a pure gifter).
pub fn classify_role(
    owner_id: &SubscriberId,
    active_subscriber_ids: &[SubscriberId],
    viewer_id: &SubscriberId,
) -> SubscriptionRole {
    // Records written before member tracking have an empty active list;
    // for those the owner is implicitly the sole member.
    if active_subscriber_ids.is_empty() {
        return if viewer_id == owner_id {
            SubscriptionRole::OwnerSingle
        } else {
            SubscriptionRole::Unknown
        };
    }

    let owner_active = active_subscriber_ids.contains(owner_id);

    if viewer_id == owner_id {
        if !owner_active {
            return SubscriptionRole::OwnerGifted;
        }
        if active_subscriber_ids.len() == 1 {
            return SubscriptionRole::OwnerSingle;
        }
        return SubscriptionRole::OwnerManaged;
    }

    if active_subscriber_ids.contains(viewer_id) {
        if owner_active {
            return SubscriptionRole::MemberShared;
        }
        return SubscriptionRole::MemberGiftedRecipient;
    }

    SubscriptionRole::Unknown
}

/// Classify the viewer's role on a subscription record.
///
/// A record with no owner at all is malformed; the viewer gets `Unknown`
/// rather than an error so one bad row cannot sink a whole overview.
pub fn role_for(subscription: &Subscription, viewer_id: &SubscriberId) -> SubscriptionRole {
    match subscription.owner_id() {
        Some(owner_id) => {
            classify_role(owner_id, &subscription.active_subscriber_ids, viewer_id)
        }
        None => SubscriptionRole::Unknown,
    }
}

// =============================================================================
// Tests
// =============================================================================
