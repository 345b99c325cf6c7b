//! Admin visibility scoping.
//!
//! Admin surfaces never see the whole program: a permission grant names the
//! locations an admin may look at, and everything else (subscriptions, then
//! the subscribers behind them) is filtered down from that. An admin with no
//! grant sees empty lists, not errors.

use std::collections::HashSet;

use tracing::debug;

use regulars_shared::{Location, LocationId, LocationPermissions, Subscriber, Subscription};

use crate::locations::PlatformIndex;

// =============================================================================
// Filters
// =============================================================================

/// The locations a permission grant covers.
///
/// The all-locations flag wins over any explicit list; an explicit list is
/// intersected with the roster; no list at all means no visibility.
pub fn permitted_locations(
    permissions: &LocationPermissions,
    all_locations: &[Location],
) -> Vec<Location> {
    if permissions.all_locations {
        return all_locations.to_vec();
    }

    match &permissions.allowed_location_ids {
        Some(allowed) => {
            let allowed: HashSet<&LocationId> = allowed.iter().collect();
            all_locations
                .iter()
                .filter(|location| allowed.contains(&location.id))
                .cloned()
                .collect()
        }
        None => Vec::new(),
    }
}

/// Keep the subscriptions whose platform location reference resolves to a
/// permitted canonical id.
///
/// References the index cannot resolve are dropped: a subscription pointing
/// at an unknown platform id is invisible rather than accidentally global.
pub fn filter_subscriptions(
    subscriptions: Vec<Subscription>,
    permitted_ids: &HashSet<LocationId>,
    index: &PlatformIndex,
) -> Vec<Subscription> {
    let total = subscriptions.len();
    let kept: Vec<Subscription> = subscriptions
        .into_iter()
        .filter(|subscription| {
            index
                .resolve(&subscription.location_ref)
                .map(|canonical| permitted_ids.contains(canonical))
                .unwrap_or(false)
        })
        .collect();

    debug!(
        total = total,
        kept = kept.len(),
        "Scoped subscriptions to permitted locations"
    );
    kept
}

/// Keep the subscribers referenced by at least one permitted subscription,
/// as owner or as an active member.
pub fn filter_subscribers(
    subscribers: Vec<Subscriber>,
    permitted_subscriptions: &[Subscription],
) -> Vec<Subscriber> {
    let mut referenced = HashSet::new();
    for subscription in permitted_subscriptions {
        if let Some(owner_id) = subscription.owner_id() {
            referenced.insert(owner_id);
        }
        referenced.extend(subscription.active_subscriber_ids.iter());
    }

    let total = subscribers.len();
    let kept: Vec<Subscriber> = subscribers
        .into_iter()
        .filter(|subscriber| referenced.contains(&subscriber.id))
        .collect();

    debug!(
        total = total,
        kept = kept.len(),
        "Scoped subscribers to permitted subscriptions"
    );
    kept
}

// =============================================================================
// Scope bundle
// =============================================================================

/// A permission grant resolved against the location roster, ready to filter
/// whatever an admin page fetches.
///
/// The platform index covers ALL locations, not only permitted ones, so a
/// subscription at a known-but-forbidden location is recognized and dropped
/// rather than mistaken for dirty data.
#[derive(Debug, Clone)]
pub struct VisibilityScope {
    permitted_ids: HashSet<LocationId>,
    index: PlatformIndex,
}

impl VisibilityScope {
    pub fn new(permissions: &LocationPermissions, all_locations: &[Location]) -> Self {
        let permitted_ids = permitted_locations(permissions, all_locations)
            .into_iter()
            .map(|location| location.id)
            .collect();

        Self {
            permitted_ids,
            index: PlatformIndex::build(all_locations),
        }
    }

    /// Canonical ids of the locations the grant covers.
    pub fn permitted_location_ids(&self) -> &HashSet<LocationId> {
        &self.permitted_ids
    }

    pub fn filter_subscriptions(&self, subscriptions: Vec<Subscription>) -> Vec<Subscription> {
        filter_subscriptions(subscriptions, &self.permitted_ids, &self.index)
    }

    pub fn filter_subscribers(
        &self,
        subscribers: Vec<Subscriber>,
        permitted_subscriptions: &[Subscription],
    ) -> Vec<Subscriber> {
        filter_subscribers(subscribers, permitted_subscriptions)
    }
}

// =============================================================================
// Tests
// =============================================================================
