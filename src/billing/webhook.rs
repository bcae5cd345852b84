//! Billing webhook signature verification (spec §4.3).
//!
//! Header format: `t=<unix_seconds>,v1=<hex_hmac_sha256>`. The signed
//! payload is `"{t}.{body}"`; the signature is verified with a constant-time
//! comparison and a bounded clock-skew window, the same pairing of
//! HMAC-SHA256-over-hex and a dedicated compare step the teacher's license
//! cache uses (`license/mod.rs` `compute_hmac`/`verify_hmac`), generalized
//! from a local integrity check to an inbound authenticity check.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Reject a webhook whose timestamp is further than this from now in either
/// direction (spec §4.3: "±5 minute clock skew window").
const MAX_SKEW_SECS: i64 = 5 * 60;

#[derive(Debug, PartialEq, Eq)]
pub enum VerifyError {
    MalformedHeader,
    ClockSkew,
    BadSignature,
}

/// Verifies a `Nerve-Signature`-style header against `body` using `secret`.
pub fn verify(header: &str, body: &str, secret: &str) -> Result<(), VerifyError> {
    let (timestamp, signature) = parse_header(header)?;

    let now = Utc::now().timestamp();
    if (now - timestamp).abs() > MAX_SKEW_SECS {
        return Err(VerifyError::ClockSkew);
    }

    let signed_payload = format!("{timestamp}.{body}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_payload.as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(VerifyError::BadSignature)
    }
}

fn parse_header(header: &str) -> Result<(i64, &str), VerifyError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        let (key, value) = part.split_once('=').ok_or(VerifyError::MalformedHeader)?;
        match key.trim() {
            "t" => timestamp = value.trim().parse::<i64>().ok(),
            "v1" => signature = Some(value.trim()),
            _ => {}
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(s)) => Ok((t, s)),
        _ => Err(VerifyError::MalformedHeader),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, body: &str) -> String {
        let signed_payload = format!("{timestamp}.{body}");
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_a_freshly_signed_payload() {
        let now = Utc::now().timestamp();
        let body = r#"{"type":"invoice.paid"}"#;
        let sig = sign("whsec_test", now, body);
        let header = format!("t={now},v1={sig}");
        assert!(verify(&header, body, "whsec_test").is_ok());
    }

    #[test]
    fn rejects_a_tampered_body() {
        let now = Utc::now().timestamp();
        let body = r#"{"type":"invoice.paid"}"#;
        let sig = sign("whsec_test", now, body);
        let header = format!("t={now},v1={sig}");
        assert_eq!(
            verify(&header, r#"{"type":"invoice.voided"}"#, "whsec_test"),
            Err(VerifyError::BadSignature)
        );
    }

    #[test]
    fn rejects_timestamps_outside_the_skew_window() {
        let stale = Utc::now().timestamp() - MAX_SKEW_SECS - 10;
        let body = "{}";
        let sig = sign("whsec_test", stale, body);
        let header = format!("t={stale},v1={sig}");
        assert_eq!(verify(&header, body, "whsec_test"), Err(VerifyError::ClockSkew));
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(verify("garbage", "{}", "whsec_test"), Err(VerifyError::MalformedHeader));
    }
}
