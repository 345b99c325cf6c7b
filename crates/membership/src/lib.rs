//! Regulars Membership Engine
//!
//! This crate contains the membership lifecycle logic for the Regulars
//! loyalty program: contact-based identity resolution, role classification,
//! billing term resolution, entitlement redemption, location identity
//! mapping, and admin visibility filtering. It exposes no network surface of
//! its own; a presentation layer drives it through the services and pure
//! functions re-exported below, with the backing store, OTP provider, and
//! card vault injected through the port traits.

pub mod config;
pub mod contact;
pub mod identity;
pub mod locations;
pub mod otp;
pub mod payments;
pub mod redemption;
pub mod repository;
pub mod roles;
pub mod subscriptions;
pub mod terms;
pub mod testing;
pub mod visibility;

pub use config::{ConfigError, EngineConfig};
pub use contact::{Contact, ContactChannel};
pub use identity::{AccountResolution, IdentityResolver, RankedAccount};
pub use locations::PlatformIndex;
pub use otp::{OtpOutcome, OtpService};
pub use payments::{CardSummary, CardVault, PaymentMethods};
pub use redemption::{check_redeemable, RedemptionService};
pub use repository::{NewSubscription, ProfileUpdate, Repository, SubscriptionPatch};
pub use roles::{classify_role, role_for, AccountType, SubscriptionRole};
pub use subscriptions::{SubscriptionService, SubscriptionSummary};
pub use terms::{term_info, TermInfo, TermLabel};
pub use visibility::VisibilityScope;
