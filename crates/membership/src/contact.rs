//! Contact parsing and channel detection.
//!
//! Login is contact-first: the caller hands over whatever the member typed
//! and the engine decides whether a verification code should go out by email
//! or by SMS. Anything that is neither a valid email address nor a valid
//! phone number is rejected up front.

use serde::{Deserialize, Serialize};

use regulars_shared::{MembershipError, MembershipResult};

/// Delivery channel for a verification code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactChannel {
    Email,
    Sms,
}

impl std::fmt::Display for ContactChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Sms => write!(f, "sms"),
        }
    }
}

/// A caller-supplied contact, validated and normalized.
///
/// Emails are lowercased; phone numbers keep their leading `+` and lose
/// spaces, dots, dashes, and parentheses. The raw value is deliberately not
/// printable through `Display` so it cannot leak into logs by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    value: String,
    channel: ContactChannel,
}

impl Contact {
    /// Parse raw caller input, detecting the channel.
    pub fn parse(raw: &str) -> MembershipResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(MembershipError::Validation(
                "Contact must not be empty".to_string(),
            ));
        }

        if is_valid_email(trimmed) {
            return Ok(Self {
                value: trimmed.to_lowercase(),
                channel: ContactChannel::Email,
            });
        }

        if let Some(phone) = normalize_phone(trimmed) {
            return Ok(Self {
                value: phone,
                channel: ContactChannel::Sms,
            });
        }

        Err(MembershipError::Validation(
            "Contact is neither a valid email address nor a valid phone number".to_string(),
        ))
    }

    /// Normalized contact value, suitable for store lookups.
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn channel(&self) -> ContactChannel {
        self.channel
    }
}

/// Detect the verification channel for raw contact input.
pub fn detect_channel(raw: &str) -> MembershipResult<ContactChannel> {
    Contact::parse(raw).map(|contact| contact.channel)
}

/// Validates email address format (simplified RFC 5322)
fn is_valid_email(email: &str) -> bool {
    // Length checks per RFC 5321
    if email.is_empty() || email.len() > 254 {
        return false;
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    // Local part: bounded, no leading/trailing/consecutive dots
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    if !local
        .chars()
        .all(|c| c.is_alphanumeric() || ".+-_".contains(c))
    {
        return false;
    }

    // Domain: dotted, no stray dots or hyphens at the edges
    if domain.is_empty() || domain.len() > 255 {
        return false;
    }
    if domain.starts_with('-') || domain.ends_with('-') {
        return false;
    }
    if domain.starts_with('.') || domain.ends_with('.') || domain.contains("..") {
        return false;
    }
    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return false;
    }

    // Must have an alphabetic TLD of at least 2 chars
    let domain_parts: Vec<&str> = domain.split('.').collect();
    if domain_parts.len() < 2 {
        return false;
    }
    match domain_parts.last() {
        Some(tld) => tld.len() >= 2 && tld.chars().all(|c| c.is_alphabetic()),
        None => false,
    }
}

/// Normalize a phone number, returning `None` when it is not one.
///
/// Accepts E.164 (`+` followed by up to 15 digits) and bare 10-digit
/// national numbers. Common formatting characters are stripped first.
fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')' | '.'))
        .collect();

    if let Some(digits) = cleaned.strip_prefix('+') {
        if !digits.is_empty() && digits.len() <= 15 && digits.chars().all(|c| c.is_ascii_digit())
        {
            return Some(cleaned);
        }
        return None;
    }

    if cleaned.len() == 10 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        return Some(cleaned);
    }

    None
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email() {
        let contact = Contact::parse("Member@Example.COM").unwrap();
        assert_eq!(contact.channel(), ContactChannel::Email);
        assert_eq!(contact.value(), "member@example.com");
    }

    #[test]
    fn test_parse_email_trims_padding() {
        let contact = Contact::parse("  member@example.com  ").unwrap();
        assert_eq!(contact.value(), "member@example.com");
    }

    #[test]
    fn test_parse_e164_phone() {
        let contact = Contact::parse("+1 (555) 867-5309").unwrap();
        assert_eq!(contact.channel(), ContactChannel::Sms);
        assert_eq!(contact.value(), "+15558675309");
    }

    #[test]
    fn test_parse_ten_digit_phone() {
        let contact = Contact::parse("555.867.5309").unwrap();
        assert_eq!(contact.channel(), ContactChannel::Sms);
        assert_eq!(contact.value(), "5558675309");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "   ", "not-a-contact", "member@", "@example.com", "12345"] {
            let result = Contact::parse(raw);
            assert!(
                matches!(result, Err(MembershipError::Validation(_))),
                "{:?} should be rejected, got: {:?}",
                raw,
                result
            );
        }
    }

    #[test]
    fn test_detect_channel() {
        assert_eq!(
            detect_channel("member@example.com").unwrap(),
            ContactChannel::Email
        );
        assert_eq!(detect_channel("+15558675309").unwrap(), ContactChannel::Sms);
        assert!(detect_channel("hello world").is_err());
    }

    #[test]
    fn test_email_validation_edges() {
        assert!(is_valid_email("a.b+tag@sub.example.com"));
        assert!(!is_valid_email("double..dot@example.com"));
        assert!(!is_valid_email(".leading@example.com"));
        assert!(!is_valid_email("member@example"));
        assert!(!is_valid_email("member@-example.com"));
        assert!(!is_valid_email("member@example.c"));
        assert!(!is_valid_email("member@example.123"));
        assert!(!is_valid_email("two@ats@example.com"));
    }

    #[test]
    fn test_phone_validation_edges() {
        // Too short for E.164, too long for national
        assert_eq!(normalize_phone("+"), None);
        assert_eq!(normalize_phone("+123456789012345678"), None);
        assert_eq!(normalize_phone("55586753"), None);
        assert_eq!(normalize_phone("55508675309"), None);
        // Letters hiding inside
        assert_eq!(normalize_phone("+1555CALLNOW"), None);
        // Fifteen digits after + is still fine
        assert_eq!(
            normalize_phone("+123456789012345"),
            Some("+123456789012345".to_string())
        );
    }
}
