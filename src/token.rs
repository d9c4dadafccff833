//! Access tokens for report URLs.
//!
//! A token is the HMAC-SHA256 of a plaintext identity (a site, a channel or the
//! agency sentinel) keyed with the process secret, hex encoded and truncated to
//! [`TOKEN_LEN`] characters. Tokens are never stored: a presented token is
//! verified by recomputing the token of every currently valid identity and
//! comparing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// Number of hex characters kept from the digest (48 bits).
pub const TOKEN_LEN: usize = 12;

/// Compute the access token for an identity
///
/// # Arguments
/// * `identity` - Plaintext identity, hashed as UTF-8
/// * `secret` - Process-wide secret used as the HMAC key
///
/// # Returns
/// * `String` - The first [`TOKEN_LEN`] lowercase hex characters of the digest
///
/// # Examples
/// ```
/// use brz_report::token::{compute_token, TOKEN_LEN};
///
/// let token = compute_token("site-42", b"s3cr3t");
/// assert_eq!(token.len(), TOKEN_LEN);
/// assert_eq!(token, compute_token("site-42", b"s3cr3t"));
/// ```
pub fn compute_token(identity: &str, secret: &[u8]) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(identity.as_bytes());
    let digest = mac.finalize().into_bytes();

    // 6 bytes encode to exactly TOKEN_LEN hex characters
    hex::encode(&digest[..TOKEN_LEN / 2])
}

/// Find which candidate identity a presented token belongs to
///
/// Candidates are checked in order and the first match wins, so two identities
/// whose truncated tokens collide resolve to the one listed first.
///
/// # Arguments
/// * `token` - Token taken from the request, possibly empty or malformed
/// * `candidates` - Identities currently valid for this kind of token
/// * `secret` - Process-wide secret
///
/// # Returns
/// * `Option<&str>` - The matching candidate, or `None`
///
/// # Examples
/// ```
/// use brz_report::token::{compute_token, validate_token};
///
/// let token = compute_token("site-42", b"s3cr3t");
/// let candidates = ["site-42", "site-43"];
/// assert_eq!(validate_token(&token, &candidates, b"s3cr3t"), Some("site-42"));
/// assert_eq!(validate_token("000000000000", &candidates, b"s3cr3t"), None);
/// ```
pub fn validate_token<'a, S>(token: &str, candidates: &'a [S], secret: &[u8]) -> Option<&'a str>
where
    S: AsRef<str>,
{
    if token.is_empty() {
        return None;
    }

    candidates
        .iter()
        .map(|candidate| candidate.as_ref())
        .find(|identity| tokens_match(token, &compute_token(identity, secret)))
}

fn keyed_mac(secret: &[u8]) -> HmacSha256 {
    match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        // HMAC hashes or pads keys of any length
        Err(_) => unreachable!("HMAC-SHA256 rejected its key"),
    }
}

fn tokens_match(presented: &str, computed: &str) -> bool {
    presented.len() == computed.len() && bool::from(presented.as_bytes().ct_eq(computed.as_bytes()))
}

/// Token checks bound to one secret and one agency sentinel.
///
/// Built from the process [`Config`] and borrowed for the duration of a
/// request. It holds no mutable state and can be shared across threads.
#[derive(Clone, Copy)]
pub struct TokenValidator<'a> {
    secret: &'a [u8],
    agency_value: &'a str,
}

impl<'a> TokenValidator<'a> {
    pub fn new(secret: &'a [u8], agency_value: &'a str) -> Self {
        TokenValidator {
            secret,
            agency_value,
        }
    }

    pub fn from_config(config: &'a Config) -> Self {
        Self::new(config.secret_key.as_bytes(), &config.agency_value)
    }

    pub fn compute(&self, identity: &str) -> String {
        compute_token(identity, self.secret)
    }

    pub fn validate<'c, S: AsRef<str>>(&self, token: &str, candidates: &'c [S]) -> Option<&'c str> {
        validate_token(token, candidates, self.secret)
    }

    /// Token of the agency sentinel, which unlocks the unscoped report.
    pub fn agency_token(&self) -> String {
        self.compute(self.agency_value)
    }

    /// Whether `token` is the agency token.
    ///
    /// This is checked on its own and never through the candidate list, since
    /// the sentinel is not derived from the data.
    pub fn is_superuser(&self, token: &str) -> bool {
        !token.is_empty() && tokens_match(token, &self.agency_token())
    }
}

impl std::fmt::Debug for TokenValidator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("secret", &"<redacted>")
            .field("agency_value", &self.agency_value)
            .finish()
    }
}
