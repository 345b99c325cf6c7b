//! Location identity mapping.
//!
//! Each physical site is known to the POS platform and the online-ordering
//! platform under their own ids, while the rest of the engine works with one
//! canonical [`LocationId`]. The index built here registers every platform id
//! a location carries and resolves subscription-side references back to the
//! canonical id, with all reads funneled through
//! [`normalize_key`](regulars_shared::normalize_key) so array-wrapped and
//! padded store values land on the same key.

use std::collections::HashMap;

use tracing::warn;

use regulars_shared::{normalize_key, Location, LocationId};

/// Lookup table from platform-specific location id to canonical id.
#[derive(Debug, Clone, Default)]
pub struct PlatformIndex {
    index: HashMap<String, LocationId>,
}

impl PlatformIndex {
    /// Build the index over every platform id the locations carry.
    ///
    /// Blank and junk-valued platform fields are skipped. A platform id
    /// claimed by two locations keeps the later registration; the collision
    /// is logged because it means the location roster itself is wrong.
    pub fn build(locations: &[Location]) -> Self {
        let mut index = HashMap::new();

        for location in locations {
            for key in location.platform_keys() {
                if let Some(previous) = index.insert(key.clone(), location.id.clone()) {
                    if previous != location.id {
                        warn!(
                            platform_id = %key,
                            previous = %previous,
                            replacement = %location.id,
                            "Platform id registered by two locations"
                        );
                    }
                }
            }
        }

        Self { index }
    }

    /// Resolve a raw subscription-side platform reference to a canonical id.
    ///
    /// The reference is normalized first; references the index has never
    /// seen come back as `None` and the caller treats the record as not
    /// visible.
    pub fn resolve(&self, raw: &serde_json::Value) -> Option<&LocationId> {
        let key = normalize_key(raw)?;
        self.index.get(&key)
    }

    /// Resolve an already-normalized platform key.
    pub fn resolve_key(&self, key: &str) -> Option<&LocationId> {
        self.index.get(key)
    }

    /// Number of platform ids registered.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn location(id: &str, square: serde_json::Value, olo: serde_json::Value) -> Location {
        Location {
            id: LocationId::new(id),
            name: format!("Location {}", id),
            square_location_id: square,
            olo_location_id: olo,
        }
    }

    #[test]
    fn test_build_registers_every_platform_field() {
        let locations = vec![
            location("loc_1", json!("SQ1"), json!("OLO1")),
            location("loc_2", json!(["SQ2"]), json!(null)),
        ];

        let index = PlatformIndex::build(&locations);
        assert_eq!(index.len(), 3);
        assert_eq!(index.resolve_key("SQ1"), Some(&LocationId::new("loc_1")));
        assert_eq!(index.resolve_key("OLO1"), Some(&LocationId::new("loc_1")));
        assert_eq!(index.resolve_key("SQ2"), Some(&LocationId::new("loc_2")));
    }

    #[test]
    fn test_build_skips_blank_and_junk_fields() {
        let locations = vec![location("loc_1", json!("   "), json!(42))];
        let index = PlatformIndex::build(&locations);
        assert!(index.is_empty());
    }

    #[test]
    fn test_resolve_normalizes_wrapped_and_padded_references() {
        let index = PlatformIndex::build(&[location("loc_1", json!("SQ1"), json!(null))]);

        assert_eq!(index.resolve(&json!("SQ1")), Some(&LocationId::new("loc_1")));
        assert_eq!(
            index.resolve(&json!(["  SQ1  "])),
            Some(&LocationId::new("loc_1"))
        );
        assert_eq!(index.resolve(&json!("unknown")), None);
        assert_eq!(index.resolve(&json!(null)), None);
    }

    #[test]
    fn test_collision_keeps_later_registration() {
        let locations = vec![
            location("loc_1", json!("SQ_SHARED"), json!(null)),
            location("loc_2", json!("SQ_SHARED"), json!(null)),
        ];

        let index = PlatformIndex::build(&locations);
        assert_eq!(index.len(), 1);
        assert_eq!(
            index.resolve_key("SQ_SHARED"),
            Some(&LocationId::new("loc_2"))
        );
    }

    #[test]
    fn test_trimmed_location_field_matches_untrimmed_reference() {
        // The quirk cuts both ways: the roster side may be padded too.
        let index = PlatformIndex::build(&[location("loc_1", json!(["  SQ9 "]), json!(null))]);
        assert_eq!(index.resolve(&json!("SQ9")), Some(&LocationId::new("loc_1")));
    }
}
