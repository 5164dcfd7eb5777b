//! Slack request signing (`v0` scheme).
//!
//! `X-Slack-Signature` is `v0=` + hex(HMAC-SHA256(signing_secret,
//! "v0:{timestamp}:{raw body}")). Requests older than five minutes are refused
//! to stop replays.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const MAX_SKEW_SECS: i64 = 60 * 5;

const VERSION: &str = "v0";

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing or malformed signature headers")]
    Missing,
    #[error("request timestamp outside the allowed window")]
    Stale,
    #[error("signature mismatch")]
    Mismatch,
}

#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
}

impl SignatureVerifier {
    pub fn new(signing_secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: signing_secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).map_err(|_| SignatureError::Mismatch)?;
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }

    /// Header value Slack would send for this body.
    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let mac = self.mac(timestamp, body)?;
        Ok(format!(
            "{VERSION}={}",
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    /// Check the two headers against the raw body, with `now` in Unix seconds.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let (Some(timestamp), Some(signature)) = (timestamp, signature) else {
            return Err(SignatureError::Missing);
        };
        let sent_at = timestamp
            .trim()
            .parse::<i64>()
            .map_err(|_| SignatureError::Missing)?;
        if now.abs_diff(sent_at) > MAX_SKEW_SECS.unsigned_abs() {
            return Err(SignatureError::Stale);
        }

        let Some(hex_sig) = signature.trim().strip_prefix("v0=") else {
            return Err(SignatureError::Mismatch);
        };
        let expected = hex::decode(hex_sig).map_err(|_| SignatureError::Mismatch)?;

        self.mac(timestamp.trim(), body)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_531_420_618;

    // Worked example from Slack's request-signing documentation.
    const DOC_SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const DOC_BODY: &str = "token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&team_domain=testteamnow&channel_id=G8PSS9T3V&channel_name=foobar&user_id=U2CERLKJA&user_name=roadrunner&command=%2Fwebhook-collect&text=&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2FT1DC2JH3J%2F397700885554%2F96rGlfmibIGlgcZRskXaIFfN&trigger_id=398738663015.47445629121.803a0bc887a14d10d2c447fce8b6703c";
    const DOC_SIGNATURE: &str =
        "v0=a2114d57b48eac39b9ad189dd8316235a7b4a8d21a10bd27519666489c69b503";

    #[test]
    fn matches_slack_documentation_example() {
        let v = SignatureVerifier::new(DOC_SECRET);
        let ts = NOW.to_string();
        assert_eq!(v.sign(&ts, DOC_BODY.as_bytes()).unwrap(), DOC_SIGNATURE);
        assert!(v
            .verify(Some(&ts), Some(DOC_SIGNATURE), DOC_BODY.as_bytes(), NOW)
            .is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let v = SignatureVerifier::new("secret");
        let ts = NOW.to_string();
        let sig = v.sign(&ts, b"{\"a\":1}").unwrap();

        assert_eq!(
            v.verify(Some(&ts), Some(&sig), b"{\"a\":2}", NOW),
            Err(SignatureError::Mismatch)
        );
        let other = SignatureVerifier::new("other");
        assert_eq!(
            other.verify(Some(&ts), Some(&sig), b"{\"a\":1}", NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_stale_or_future_timestamps() {
        let v = SignatureVerifier::new("secret");
        let old = (NOW - MAX_SKEW_SECS - 1).to_string();
        let sig = v.sign(&old, b"x").unwrap();
        assert_eq!(
            v.verify(Some(&old), Some(&sig), b"x", NOW),
            Err(SignatureError::Stale)
        );

        let edge = (NOW - MAX_SKEW_SECS).to_string();
        let sig = v.sign(&edge, b"x").unwrap();
        assert!(v.verify(Some(&edge), Some(&sig), b"x", NOW).is_ok());

        let future = (NOW + MAX_SKEW_SECS + 1).to_string();
        let sig = v.sign(&future, b"x").unwrap();
        assert_eq!(
            v.verify(Some(&future), Some(&sig), b"x", NOW),
            Err(SignatureError::Stale)
        );

        // Extreme header values must not overflow the skew arithmetic.
        for extreme in [
            i64::MIN.to_string(),
            "-9223372036854775000".to_string(),
            i64::MAX.to_string(),
        ] {
            assert_eq!(
                v.verify(Some(extreme.as_str()), Some("v0=00"), b"x", 1_700_000_000),
                Err(SignatureError::Stale)
            );
        }
    }

    #[test]
    fn rejects_missing_or_garbled_headers() {
        let v = SignatureVerifier::new("secret");
        let ts = NOW.to_string();
        assert_eq!(
            v.verify(None, Some("v0=00"), b"x", NOW),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            v.verify(Some(&ts), None, b"x", NOW),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            v.verify(Some("yesterday"), Some("v0=00"), b"x", NOW),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            v.verify(Some(&ts), Some("v1=abcd"), b"x", NOW),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            v.verify(Some(&ts), Some("v0=not-hex"), b"x", NOW),
            Err(SignatureError::Mismatch)
        );
    }
}
