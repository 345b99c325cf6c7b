//! Integration tests for the member-facing flow
//!
//! These tests drive the engine end to end over the in-memory doubles:
//! contact verification, multi-account resolution with activity ranking,
//! the annotated subscription overview, entitlement redemption, and profile
//! completion. No network or live store is involved.

use std::sync::Arc;

use regulars_membership::testing::{InMemoryRepository, StaticOtp};
use regulars_membership::{
    AccountResolution, Contact, EngineConfig, IdentityResolver, RedemptionService,
    SubscriptionRole, SubscriptionService, TermLabel,
};
use regulars_shared::{
    Benefit, BenefitId, BillingFrequency, MembershipError, RedeemConflict, RedemptionStatus,
    Subscriber, SubscriberId, Subscription, SubscriptionId, SubscriptionStatus,
};
use time::macros::{date, datetime};

// ============================================================================
// Test Utilities
// ============================================================================

const SHARED_EMAIL: &str = "family@example.com";
const OTP_CODE: &str = "482910";

fn subscriber(id: &str, name: &str, email: &str) -> Subscriber {
    Subscriber {
        id: SubscriberId::new(id),
        display_name: name.to_string(),
        email: Some(email.to_string()),
        phone: None,
    }
}

fn base_subscription(id: &str, owner: &str) -> Subscription {
    Subscription {
        id: SubscriptionId::new(id),
        code: "115907".to_string(),
        status: SubscriptionStatus::Active,
        owner_ids: vec![SubscriberId::new(owner)],
        active_subscriber_ids: vec![SubscriberId::new(owner)],
        end_date: None,
        anchor_day: None,
        start_date: Some(date!(2024 - 01 - 15)),
        frequency: BillingFrequency::Monthly,
        location_ref: serde_json::json!("SQ_DOWNTOWN"),
        plan_ids: Vec::new(),
    }
}

fn benefit(id: &str, subscription: &str, subscriber: &str) -> Benefit {
    Benefit {
        id: BenefitId::new(id),
        display_name: "Weekly pour-over".to_string(),
        status: RedemptionStatus::Available,
        last_redeemed: None,
        frequency: BillingFrequency::Monthly,
        subscription_id: SubscriptionId::new(subscription),
        subscriber_id: SubscriberId::new(subscriber),
        plan_ids: Vec::new(),
    }
}

/// Two subscribers sharing one email: Ana owns a recurring bread share and a
/// gifted coffee membership that Ben consumes; Ana also has a lapsed
/// subscription with an unredeemed benefit left on it.
fn seeded_repository() -> Arc<InMemoryRepository> {
    let repository = Arc::new(InMemoryRepository::new());

    repository.insert_subscriber(subscriber("cus_ana", "Ana", SHARED_EMAIL));
    repository.insert_subscriber(subscriber("cus_ben", "Ben", SHARED_EMAIL));
    repository.insert_subscriber(subscriber("cus_solo", "Sol", "solo@example.com"));

    // Recurring bread share: Ana only, billed on the 15th
    let mut bread = base_subscription("sub_bread", "cus_ana");
    bread.anchor_day = Some(15);
    repository.insert_subscription(bread);

    // Gifted coffee membership: Ana pays, Ben drinks, fixed term
    let mut coffee = base_subscription("sub_coffee", "cus_ana");
    coffee.active_subscriber_ids = vec![SubscriberId::new("cus_ben")];
    coffee.end_date = Some(date!(2024 - 12 - 31));
    coffee.start_date = Some(date!(2024 - 03 - 01));
    repository.insert_subscription(coffee);

    // A lapsed term from last winter
    let mut lapsed = base_subscription("sub_lapsed", "cus_ana");
    lapsed.end_date = Some(date!(2024 - 01 - 31));
    repository.insert_subscription(lapsed);

    repository.insert_benefit(benefit("ben_coffee", "sub_coffee", "cus_ben"));
    repository.insert_benefit(benefit("ben_stale", "sub_lapsed", "cus_ana"));

    repository
}

fn identity(
    repository: Arc<InMemoryRepository>,
    otp: Arc<StaticOtp>,
) -> IdentityResolver<InMemoryRepository, StaticOtp> {
    IdentityResolver::new(repository, otp, EngineConfig::default())
}

fn subscriptions(repository: Arc<InMemoryRepository>) -> SubscriptionService<InMemoryRepository> {
    SubscriptionService::new(repository, EngineConfig::default())
}

// ============================================================================
// Test Cases: Contact Verification
// ============================================================================

#[tokio::test]
async fn test_contact_verification_round_trip() {
    // Given: a member signing in with the shared family email
    let otp = Arc::new(StaticOtp::new(OTP_CODE));
    let resolver = identity(seeded_repository(), otp.clone());
    let contact = Contact::parse(SHARED_EMAIL).unwrap();

    // When: a code is requested
    resolver.request_code(&contact).await.unwrap();
    assert_eq!(otp.sent_count(), 1, "exactly one code should go out");

    // Then: a wrong code is refused as an auth failure, the right one passes
    let denied = resolver.verify_code(&contact, "000000").await;
    assert!(
        matches!(denied, Err(MembershipError::Auth(_))),
        "wrong code must fail authentication, got: {:?}",
        denied
    );

    resolver.verify_code(&contact, OTP_CODE).await.unwrap();
}

// ============================================================================
// Test Cases: Account Resolution
// ============================================================================

#[tokio::test]
async fn test_shared_contact_resolves_to_ranked_choice() {
    // Given: the family email maps to both Ana and Ben, and Ben's activity
    // lookup fails at the store
    let repository = seeded_repository();
    repository.fail_subscription_reads_for(&SubscriberId::new("cus_ben"));

    let resolver = identity(repository, Arc::new(StaticOtp::new(OTP_CODE)));
    let contact = Contact::parse(SHARED_EMAIL).unwrap();

    // When: the contact is resolved
    let resolution = resolver.resolve(&contact, date!(2024 - 06 - 20)).await.unwrap();

    // Then: both candidates come back ranked; the failed lookup degrades
    // Ben to zero activity instead of sinking the whole resolution
    match resolution {
        AccountResolution::NeedsSelection(ranked) => {
            assert_eq!(ranked.len(), 2);
            assert_eq!(ranked[0].account.id.as_str(), "cus_ana");
            assert_eq!(
                ranked[0].active_count, 2,
                "bread share and coffee membership are both current"
            );
            assert_eq!(ranked[1].account.id.as_str(), "cus_ben");
            assert_eq!(ranked[1].active_count, 0);
        }
        other => panic!("Expected a ranked selection, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_sole_candidate_auto_selects() {
    let resolver = identity(seeded_repository(), Arc::new(StaticOtp::new(OTP_CODE)));
    let contact = Contact::parse("solo@example.com").unwrap();

    let resolution = resolver.resolve(&contact, date!(2024 - 06 - 20)).await.unwrap();
    match resolution {
        AccountResolution::Single(account) => assert_eq!(account.id.as_str(), "cus_solo"),
        other => panic!("Expected auto-selection, got: {:?}", other),
    }
}

// ============================================================================
// Test Cases: Subscription Overview
// ============================================================================

#[tokio::test]
async fn test_owner_overview_annotates_roles_and_terms() {
    // Given: Ana's three subscriptions
    let service = subscriptions(seeded_repository());

    // When: her overview is built for June 20th
    let rows = service
        .member_overview(&SubscriberId::new("cus_ana"), date!(2024 - 06 - 20))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);

    // Then: each row carries the role and term a member screen would print
    let bread = rows
        .iter()
        .find(|row| row.subscription.id.as_str() == "sub_bread")
        .unwrap();
    assert_eq!(bread.role, SubscriptionRole::OwnerSingle);
    assert_eq!(bread.account_type.label(), "Account Manager");
    assert_eq!(bread.term.label, TermLabel::NextRenewal);
    assert_eq!(bread.term.date, Some(date!(2024 - 07 - 15)));

    let coffee = rows
        .iter()
        .find(|row| row.subscription.id.as_str() == "sub_coffee")
        .unwrap();
    assert_eq!(
        coffee.role,
        SubscriptionRole::OwnerGifted,
        "Ana pays but does not consume"
    );
    assert_eq!(coffee.term.label, TermLabel::ExpiresOn);
    assert_eq!(coffee.term.date, Some(date!(2024 - 12 - 31)));

    let lapsed = rows
        .iter()
        .find(|row| row.subscription.id.as_str() == "sub_lapsed")
        .unwrap();
    assert_eq!(lapsed.term.label, TermLabel::ExpiresOn);
    assert_eq!(lapsed.term.date, Some(date!(2024 - 01 - 31)));
}

#[tokio::test]
async fn test_gift_recipient_sees_only_their_membership() {
    let service = subscriptions(seeded_repository());

    let rows = service
        .member_overview(&SubscriberId::new("cus_ben"), date!(2024 - 06 - 20))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].subscription.id.as_str(), "sub_coffee");
    assert_eq!(rows[0].role, SubscriptionRole::MemberGiftedRecipient);
    assert_eq!(rows[0].account_type.label(), "Gifted Member");
}

// ============================================================================
// Test Cases: Redemption
// ============================================================================

#[tokio::test]
async fn test_redeem_once_then_conflict_on_the_second_attempt() {
    // Given: Ben's unredeemed coffee benefit
    let repository = seeded_repository();
    let service = subscriptions(repository.clone());
    let redemption = RedemptionService::new(repository.clone(), EngineConfig::default());
    let now = datetime!(2024-06-20 09:30 UTC);

    let ben = SubscriberId::new("cus_ben");
    let coffee = repository
        .stored_subscription(&SubscriptionId::new("sub_coffee"))
        .unwrap();
    let available = service.benefits_for(&ben).await.unwrap().remove(0);
    assert!(available.status.is_available());

    // When: he redeems it
    let redeemed = redemption.redeem(&available, &coffee, now).await.unwrap();

    // Then: the returned record is the store's committed copy
    assert_eq!(redeemed.status, RedemptionStatus::Redeemed);
    assert_eq!(redeemed.last_redeemed, Some(now));

    // And: a second attempt with the fresh record is refused before the
    // store is touched again
    let fresh = service.benefits_for(&ben).await.unwrap().remove(0);
    let again = redemption
        .redeem(&fresh, &coffee, datetime!(2024-06-20 10:00 UTC))
        .await;
    assert!(matches!(
        again,
        Err(MembershipError::StateConflict(
            RedeemConflict::AlreadyRedeemed
        ))
    ));
    assert_eq!(repository.redeem_call_count(), 1);
}

#[tokio::test]
async fn test_redeem_on_lapsed_subscription_is_refused() {
    // Given: a benefit left on a term that ended in January
    let repository = seeded_repository();
    let redemption = RedemptionService::new(repository.clone(), EngineConfig::default());

    let lapsed = repository
        .stored_subscription(&SubscriptionId::new("sub_lapsed"))
        .unwrap();
    let stale = repository.stored_benefit(&BenefitId::new("ben_stale")).unwrap();

    // When: redemption is attempted in June
    let result = redemption
        .redeem(&stale, &lapsed, datetime!(2024-06-20 09:30 UTC))
        .await;

    // Then: the conflict names the expiry, and nothing was written
    assert!(matches!(
        result,
        Err(MembershipError::StateConflict(
            RedeemConflict::SubscriptionExpired
        ))
    ));
    let untouched = repository.stored_benefit(&BenefitId::new("ben_stale")).unwrap();
    assert_eq!(untouched.status, RedemptionStatus::Available);
    assert_eq!(repository.redeem_call_count(), 0);
}

// ============================================================================
// Test Cases: Profile Completion
// ============================================================================

#[tokio::test]
async fn test_completed_phone_becomes_a_login_contact() {
    // Given: Ben adds a phone number to his profile
    let repository = seeded_repository();
    let service = subscriptions(repository.clone());

    let update = regulars_membership::ProfileUpdate {
        phone: Some("+15558675309".to_string()),
        ..Default::default()
    };
    let updated = service
        .complete_profile(&SubscriberId::new("cus_ben"), &update)
        .await
        .unwrap();
    assert_eq!(updated.phone.as_deref(), Some("+15558675309"));

    // When: he later signs in with that number, formatted differently
    let resolver = identity(repository, Arc::new(StaticOtp::new(OTP_CODE)));
    let contact = Contact::parse("+1 (555) 867-5309").unwrap();
    let resolution = resolver.resolve(&contact, date!(2024 - 06 - 20)).await.unwrap();

    // Then: the phone resolves straight to his account
    match resolution {
        AccountResolution::Single(account) => assert_eq!(account.id.as_str(), "cus_ben"),
        other => panic!("Expected auto-selection by phone, got: {:?}", other),
    }
}
