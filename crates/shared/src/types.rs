//! Common types used across the Regulars membership engine

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::fields::normalize_key;

// =============================================================================
// ID Wrappers
// =============================================================================
//
// Record ids are issued by the backing store and are opaque strings; the
// wrappers only exist so the compiler keeps them apart.

/// Subscriber (customer) record ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription record ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Benefit record ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BenefitId(pub String);

impl BenefitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BenefitId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for BenefitId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for BenefitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical location record ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocationId(pub String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LocationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for LocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Plan (benefit template) record ID wrapper
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(pub String);

impl PlanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PlanId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PlanId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// How often a subscription bills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingFrequency {
    Monthly,
    Annually,
}

impl Default for BillingFrequency {
    fn default() -> Self {
        Self::Monthly
    }
}

impl std::fmt::Display for BillingFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Monthly => write!(f, "monthly"),
            Self::Annually => write!(f, "annually"),
        }
    }
}

impl std::str::FromStr for BillingFrequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" => Ok(Self::Monthly),
            "annually" | "annual" => Ok(Self::Annually),
            _ => Err(format!("Invalid billing frequency: {}", s)),
        }
    }
}

/// Subscription lifecycle status as recorded by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Paused,
    Canceled,
}

impl Default for SubscriptionStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Parse a status from string (case insensitive)
    pub fn from_str_lossy(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "active" => Self::Active,
            "paused" => Self::Paused,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Active, // Legacy rows predate the status column
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Paused => write!(f, "paused"),
            Self::Canceled => write!(f, "canceled"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "canceled" | "cancelled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid subscription status: {}", s)),
        }
    }
}

/// Redemption state of a benefit instance
///
/// One-way within the engine: `Available -> Redeemed`. The scheduled reset
/// back to `Available` belongs to an external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Available,
    Redeemed,
}

impl Default for RedemptionStatus {
    fn default() -> Self {
        Self::Available
    }
}

impl RedemptionStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    pub fn is_redeemed(&self) -> bool {
        matches!(self, Self::Redeemed)
    }
}

impl std::fmt::Display for RedemptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Redeemed => write!(f, "redeemed"),
        }
    }
}

impl std::str::FromStr for RedemptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "redeemed" => Ok(Self::Redeemed),
            _ => Err(format!("Invalid redemption status: {}", s)),
        }
    }
}

// =============================================================================
// Store Records
// =============================================================================

/// Subscriber (customer) record
///
/// Immutable once created except for profile-completion edits to the name
/// and contact fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub display_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Subscription record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    /// Human-facing six-digit join code
    pub code: String,
    pub status: SubscriptionStatus,
    /// Linked-record list as stored; exactly one owner is expected
    #[serde(default)]
    pub owner_ids: Vec<SubscriberId>,
    /// Subscribers currently holding the membership. Empty means owner only.
    #[serde(default)]
    pub active_subscriber_ids: Vec<SubscriberId>,
    /// Fixed term end, set on cancellation or for gifted terms
    pub end_date: Option<Date>,
    /// Day of month (1-31) recurring billing lands on
    pub anchor_day: Option<u8>,
    pub start_date: Option<Date>,
    pub frequency: BillingFrequency,
    /// Platform location reference exactly as stored: scalar string or
    /// single-element array, depending on the row
    #[serde(default)]
    pub location_ref: serde_json::Value,
    #[serde(default)]
    pub plan_ids: Vec<PlanId>,
}

impl Subscription {
    /// The owning subscriber. The store keeps a linked list but exactly one
    /// owner is expected; the first entry wins.
    pub fn owner_id(&self) -> Option<&SubscriberId> {
        self.owner_ids.first()
    }

    /// Whether the subscription is current as of `today`.
    ///
    /// A billing anchor always counts as current (recurring billing is still
    /// attached); otherwise a fixed end date on or after `today` does.
    pub fn is_current(&self, today: Date) -> bool {
        self.anchor_day.is_some() || self.end_date.map(|end| end >= today).unwrap_or(false)
    }

    /// Normalized platform location key, if the record carries a usable one.
    pub fn location_key(&self) -> Option<String> {
        normalize_key(&self.location_ref)
    }
}

/// Benefit instance record
///
/// Each instance belongs to exactly one subscription and one subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    pub id: BenefitId,
    pub display_name: String,
    pub status: RedemptionStatus,
    pub last_redeemed: Option<OffsetDateTime>,
    pub frequency: BillingFrequency,
    pub subscription_id: SubscriptionId,
    pub subscriber_id: SubscriberId,
    #[serde(default)]
    pub plan_ids: Vec<PlanId>,
}

/// Canonical location record
///
/// External platforms know the same place under their own ids; each platform
/// gets its own field, stored raw (scalar or single-element array, possibly
/// blank).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    /// POS platform id as stored
    #[serde(default)]
    pub square_location_id: serde_json::Value,
    /// Online-ordering platform id as stored
    #[serde(default)]
    pub olo_location_id: serde_json::Value,
}

impl Location {
    /// Normalized platform ids, blanks and junk dropped.
    pub fn platform_keys(&self) -> Vec<String> {
        [&self.square_location_id, &self.olo_location_id]
            .into_iter()
            .filter_map(normalize_key)
            .collect()
    }
}

/// Admin location grant
///
/// Either everything, an explicit allow-list, or nothing. The default is
/// nothing: an admin with no explicit grant sees no locations.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocationPermissions {
    pub all_locations: bool,
    pub allowed_location_ids: Option<Vec<LocationId>>,
}

impl LocationPermissions {
    /// Grant covering every location.
    pub fn all() -> Self {
        Self {
            all_locations: true,
            allowed_location_ids: None,
        }
    }

    /// Grant covering exactly the given locations.
    pub fn only(ids: Vec<LocationId>) -> Self {
        Self {
            all_locations: false,
            allowed_location_ids: Some(ids),
        }
    }

    /// No visibility at all.
    pub fn none() -> Self {
        Self::default()
    }
}

// =============================================================================
// Tests
// =============================================================================
