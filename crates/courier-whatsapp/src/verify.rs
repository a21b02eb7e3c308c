//! Webhook subscription handshake.
//!
//! The provider sends `hub.mode`, `hub.verify_token`, and `hub.challenge`
//! query parameters; the challenge is echoed back only when the mode is the
//! literal `subscribe` and the token matches the configured value.

/// Outcome of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Mode and token matched; echo this challenge with 200.
    Verified(String),
    /// Both parameters present but mode or token mismatched.
    Forbidden,
    /// Mode or token missing.
    BadRequest,
}

/// Check the handshake parameters against the configured verify token.
pub fn verify_subscription(
    mode: Option<&str>,
    token: Option<&str>,
    challenge: Option<&str>,
    expected: &str,
) -> VerifyOutcome {
    match (mode, token) {
        (Some(mode), Some(token)) => {
            if mode == "subscribe" && token == expected {
                VerifyOutcome::Verified(challenge.unwrap_or_default().to_string())
            } else {
                VerifyOutcome::Forbidden
            }
        }
        _ => VerifyOutcome::BadRequest,
    }
}
