//! Signed access links.
//!
//! A link carries `org`, `exp` (unix seconds) and `sig`, where `sig` is the lowercase hex
//! HMAC-SHA256 of `"{org}|{exp}"` under the shared link secret. A link without any of the
//! three parameters opens the form for the default organization.

use chrono::Utc;
use hmac::{Hmac, Mac};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::LinkError;
use crate::models::{LinkDecision, LinkQuery, LinkStatus};

type HmacSha256 = Hmac<Sha256>;

pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

fn link_signature(organization: &str, exp: &str, secret: &[u8]) -> Result<String, LinkError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| LinkError::InvalidSecret)?;
    mac.update(format!("{organization}|{exp}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Signature for a link granting `organization` access until `expires_at`.
pub fn sign_link(organization: &str, expires_at: i64, secret: &[u8]) -> Result<String, LinkError> {
    link_signature(organization, &expires_at.to_string(), secret)
}

/// Query string (`org=..&exp=..&sig=..`) for a freshly signed link.
pub fn build_link_query(organization: &str, expires_at: i64, secret: &[u8]) -> Result<String, LinkError> {
    let sig = sign_link(organization, expires_at, secret)?;
    let org = utf8_percent_encode(organization, NON_ALPHANUMERIC);
    Ok(format!("org={org}&exp={expires_at}&sig={sig}"))
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Decides whether the form may be used. Never fails; bad input yields `valid: false`.
pub fn validate_link(query: &LinkQuery, secret: &[u8], now: i64) -> LinkDecision {
    let decision = match (present(&query.org), present(&query.exp), present(&query.sig)) {
        (None, None, None) => LinkDecision::open(),
        (Some(org), Some(exp), Some(sig)) => verify_signed(org, exp, sig, secret, now),
        _ => LinkDecision::rejected(LinkStatus::Partial),
    };

    if decision.valid {
        debug!(status = ?decision.status, organization = %decision.organization, "Access link accepted");
    } else {
        warn!(status = ?decision.status, "Access link rejected");
    }
    decision
}

fn verify_signed(org: &str, exp: &str, sig: &str, secret: &[u8], now: i64) -> LinkDecision {
    let Ok(organization) = percent_decode_str(org).decode_utf8() else {
        return LinkDecision::rejected(LinkStatus::Malformed);
    };

    let Ok(expected) = link_signature(&organization, exp, secret) else {
        return LinkDecision::rejected(LinkStatus::Malformed);
    };
    if !bool::from(expected.as_bytes().ct_eq(sig.as_bytes())) {
        return LinkDecision::rejected(LinkStatus::Tampered);
    }

    let Ok(expires_at) = exp.trim().parse::<i64>() else {
        return LinkDecision::rejected(LinkStatus::Malformed);
    };
    if now > expires_at {
        return LinkDecision::rejected(LinkStatus::Expired);
    }

    LinkDecision {
        valid: true,
        organization: organization.into_owned(),
        status: LinkStatus::Signed,
    }
}
