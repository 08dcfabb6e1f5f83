//! Signature verification for inbound provider webhooks.
//!
//! Every delivery carries `base64(HMAC-SHA256(raw_body, shared_secret))`
//! in the signature header. The body is verified as the raw bytes that
//! arrived on the wire — re-serializing the JSON before hashing would
//! break verification for any payload whose key order or whitespace the
//! provider chose differently.
//!
//! Verification is constant-time via [`ring::hmac::verify`].

/// Header carrying the base64-encoded HMAC of the request body.
pub const SIGNATURE_HEADER: &str = "X-Provider-Hmac-Sha256";

/// Header carrying the originating store's domain.
pub const SHOP_DOMAIN_HEADER: &str = "X-Provider-Shop-Domain";

/// Header carrying the provider's delivery id, used for deduplication.
pub const EVENT_ID_HEADER: &str = "X-Provider-Event-Id";

/// Reasons a signature check can fail.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingSignature,
    #[error("webhook secret is not configured")]
    MissingSecret,
    #[error("invalid base64 encoding")]
    InvalidBase64,
    #[error("signature mismatch")]
    Mismatch,
}

impl From<ring::error::Unspecified> for SignatureError {
    fn from(_: ring::error::Unspecified) -> Self {
        Self::Mismatch
    }
}

/// Compute the signature the provider would attach to `payload`.
///
/// Used by tests and by the admin tooling to produce replayable
/// deliveries; the inbound path only ever verifies.
pub fn compute_signature(secret: &[u8], payload: &[u8]) -> String {
    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret);
    let tag = ring::hmac::sign(&key, payload);
    fast32::base64::RFC4648.encode(tag.as_ref())
}

/// Verify a delivery, reporting the failure reason.
pub fn check_signature(
    secret: &[u8],
    payload: &[u8],
    header_value: Option<&str>,
) -> Result<(), SignatureError> {
    let header = header_value.ok_or(SignatureError::MissingSignature)?;
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }
    let provided = fast32::base64::RFC4648
        .decode_str(header.trim())
        .map_err(|_| SignatureError::InvalidBase64)?;
    let key = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, secret);
    ring::hmac::verify(&key, payload, &provided)?;
    Ok(())
}

/// Boolean form of [`check_signature`]: never panics, never errors.
///
/// A missing header, missing secret, malformed base64, or mismatched tag
/// all yield `false`; callers that want the reason use
/// [`check_signature`] directly.
pub fn verify_signature(secret: &[u8], payload: &[u8], header_value: Option<&str>) -> bool {
    check_signature(secret, payload, header_value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"crewflow-webhook-secret";
    const PAYLOAD: &[u8] = br##"{"id":555666777,"name":"#1001"}"##;

    #[test]
    fn valid_signature_verifies() {
        let sig = compute_signature(SECRET, PAYLOAD);
        assert!(verify_signature(SECRET, PAYLOAD, Some(&sig)));
    }

    #[test]
    fn wrong_secret_fails() {
        let sig = compute_signature(SECRET, PAYLOAD);
        assert!(!verify_signature(b"other-secret", PAYLOAD, Some(&sig)));
    }

    #[test]
    fn tampered_payload_fails() {
        let sig = compute_signature(SECRET, PAYLOAD);
        assert!(!verify_signature(SECRET, br#"{"id":1}"#, Some(&sig)));
    }

    #[test]
    fn missing_header_is_false_not_a_panic() {
        assert!(!verify_signature(SECRET, PAYLOAD, None));
        assert_eq!(
            check_signature(SECRET, PAYLOAD, None),
            Err(SignatureError::MissingSignature)
        );
    }

    #[test]
    fn empty_secret_is_false() {
        let sig = compute_signature(SECRET, PAYLOAD);
        assert_eq!(
            check_signature(b"", PAYLOAD, Some(&sig)),
            Err(SignatureError::MissingSecret)
        );
    }

    #[test]
    fn malformed_base64_is_false() {
        assert_eq!(
            check_signature(SECRET, PAYLOAD, Some("!!not base64!!")),
            Err(SignatureError::InvalidBase64)
        );
    }
}
