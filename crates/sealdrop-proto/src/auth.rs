//! Dual-signature request authentication
//!
//! Every mutating request carries three headers: the identity, the signed
//! timestamp, and a classical+post-quantum signature pair over the
//! canonical request string. Verification is a strict pipeline: parse,
//! freshness, split, recompute, verify both; the first failure wins and
//! nothing downstream is trusted.

use crate::canonical::{format_timestamp, is_fresh, parse_timestamp, request_canonical};
use crate::error::AuthError;
use chrono::{DateTime, Utc};
use sealdrop_crypto::signer::HybridSignature;
use sealdrop_crypto::{b64_decode, b64_encode, CryptoError, KeyBundle};

/// Identity header
pub const HEADER_USERNAME: &str = "X-Username";

/// Signed timestamp header (ISO-8601 UTC seconds)
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";

/// `base64(classical) ‖ "||" ‖ base64(post_quantum)`
pub const HEADER_SIGNATURE: &str = "X-Signature";

/// Separator between the two signature halves
pub const SIGNATURE_SEPARATOR: &str = "||";

/// The three authentication headers of one request
#[derive(Clone, Debug)]
pub struct AuthHeaders {
    pub username: String,
    pub timestamp: String,
    pub signature: String,
}

/// Sign a request with a full bundle, producing its headers
pub fn sign_request(
    bundle: &KeyBundle,
    username: &str,
    method: &str,
    path: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<AuthHeaders, CryptoError> {
    let timestamp = format_timestamp(now);
    let canonical = request_canonical(username, &timestamp, method, path, body);
    let sig = bundle.sign_hybrid(&canonical)?;
    Ok(AuthHeaders {
        username: username.to_string(),
        timestamp,
        signature: format!(
            "{}{}{}",
            b64_encode(&sig.classical),
            SIGNATURE_SEPARATOR,
            b64_encode(&sig.post_quantum)
        ),
    })
}

/// Split the signature header into its two non-empty base64 halves
pub fn split_signature(header: &str) -> Result<(&str, &str), AuthError> {
    let mut parts = header.split(SIGNATURE_SEPARATOR);
    let (Some(classical), Some(post_quantum), None) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(AuthError::Malformed(
            "signature header must contain exactly two parts".into(),
        ));
    };
    if classical.is_empty() || post_quantum.is_empty() {
        return Err(AuthError::Malformed("empty signature part".into()));
    }
    Ok((classical, post_quantum))
}

/// Verify a request against a public bundle
///
/// Implements the server pipeline: freshness, signature split, canonical
/// string recomputation from the raw body bytes, and verification of both
/// halves. `Ok(())` is the only path to an authorized request.
pub fn verify_request(
    bundle: &KeyBundle,
    headers: &AuthHeaders,
    method: &str,
    path: &str,
    body: &[u8],
    now: DateTime<Utc>,
) -> Result<(), AuthError> {
    let timestamp = parse_timestamp(&headers.timestamp)?;
    if !is_fresh(timestamp, now) {
        return Err(AuthError::Expired);
    }

    let (classical_b64, post_quantum_b64) = split_signature(&headers.signature)?;
    let classical = b64_decode(classical_b64)
        .map_err(|_| AuthError::Malformed("signature is not base64".into()))?;
    let post_quantum = b64_decode(post_quantum_b64)
        .map_err(|_| AuthError::Malformed("signature is not base64".into()))?;

    let canonical = request_canonical(&headers.username, &headers.timestamp, method, path, body);
    let sig = HybridSignature {
        classical,
        post_quantum,
    };
    if !bundle.verify_hybrid(&canonical, &sig) {
        return Err(AuthError::SignatureInvalid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signed(bundle: &KeyBundle, now: DateTime<Utc>) -> AuthHeaders {
        sign_request(bundle, "alice", "POST", "/api/fs/upload", b"{}", now).unwrap()
    }

    #[test]
    fn sign_then_verify() {
        let bundle = KeyBundle::generate();
        let now = Utc::now();
        let headers = signed(&bundle, now);
        assert!(
            verify_request(&bundle, &headers, "POST", "/api/fs/upload", b"{}", now).is_ok()
        );
    }

    #[test]
    fn replayed_request_rejected() {
        let bundle = KeyBundle::generate();
        let now = Utc::now();
        let headers = signed(&bundle, now);
        let later = now + Duration::seconds(61);
        assert_eq!(
            verify_request(&bundle, &headers, "POST", "/api/fs/upload", b"{}", later),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn future_timestamp_rejected() {
        let bundle = KeyBundle::generate();
        let now = Utc::now();
        let headers = signed(&bundle, now + Duration::seconds(90));
        assert_eq!(
            verify_request(&bundle, &headers, "POST", "/api/fs/upload", b"{}", now),
            Err(AuthError::Expired)
        );
    }

    #[test]
    fn tampered_body_rejected() {
        let bundle = KeyBundle::generate();
        let now = Utc::now();
        let headers = signed(&bundle, now);
        assert_eq!(
            verify_request(&bundle, &headers, "POST", "/api/fs/upload", b"{ }", now),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn method_and_path_are_bound() {
        let bundle = KeyBundle::generate();
        let now = Utc::now();
        let headers = signed(&bundle, now);
        assert_eq!(
            verify_request(&bundle, &headers, "PUT", "/api/fs/upload", b"{}", now),
            Err(AuthError::SignatureInvalid)
        );
        assert_eq!(
            verify_request(&bundle, &headers, "POST", "/api/fs/delete", b"{}", now),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn wrong_bundle_rejected() {
        let bundle = KeyBundle::generate();
        let other = KeyBundle::generate();
        let now = Utc::now();
        let headers = signed(&bundle, now);
        assert_eq!(
            verify_request(&other, &headers, "POST", "/api/fs/upload", b"{}", now),
            Err(AuthError::SignatureInvalid)
        );
    }

    #[test]
    fn split_signature_shapes() {
        assert!(split_signature("aaa||bbb").is_ok());
        assert!(split_signature("aaa").is_err());
        assert!(split_signature("aaa||").is_err());
        assert!(split_signature("||bbb").is_err());
        assert!(split_signature("a||b||c").is_err());
    }

    #[test]
    fn signature_header_has_two_base64_parts() {
        let bundle = KeyBundle::generate();
        let headers = signed(&bundle, Utc::now());
        let (c, pq) = split_signature(&headers.signature).unwrap();
        assert_eq!(b64_decode(c).unwrap().len(), 64);
        assert_eq!(b64_decode(pq).unwrap().len(), 4627);
    }
}
