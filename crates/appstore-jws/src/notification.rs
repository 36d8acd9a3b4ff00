//! Signed App Store server notifications (version 2)
//!
//! Apple posts `{"signedPayload": "<token>"}`. The payload's `data` object may
//! itself carry signed `signedTransactionInfo` and `signedRenewalInfo` tokens;
//! each is verified with the same verifier and replaced by its decoded claims.

use serde_json::Value;
use tracing::{debug, warn};

use crate::{Claims, JwsError, Result, TokenVerifier};

/// Envelope field carrying the signed notification
pub const SIGNED_PAYLOAD: &str = "signedPayload";

/// Nested signed fields and the names their decoded claims are stored under
const NESTED_TOKENS: [(&str, &str); 2] = [
    ("signedTransactionInfo", "transactionInfo"),
    ("signedRenewalInfo", "renewalInfo"),
];

/// A verified notification with its nested tokens decoded
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedNotification {
    payload: Claims,
}

impl DecodedNotification {
    /// The full decoded payload
    #[must_use]
    pub fn payload(&self) -> &Claims {
        &self.payload
    }

    /// Consume into the decoded payload
    #[must_use]
    pub fn into_payload(self) -> Claims {
        self.payload
    }

    /// `notificationType`, e.g. `DID_RENEW`
    #[must_use]
    pub fn notification_type(&self) -> Option<&str> {
        self.str_field("notificationType")
    }

    /// `subtype`, e.g. `BILLING_RECOVERY`
    #[must_use]
    pub fn subtype(&self) -> Option<&str> {
        self.str_field("subtype")
    }

    /// `notificationUUID`
    #[must_use]
    pub fn notification_uuid(&self) -> Option<&str> {
        self.str_field("notificationUUID")
    }

    /// `version`
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.str_field("version")
    }

    /// `signedDate` in milliseconds since the Unix epoch
    #[must_use]
    pub fn signed_date(&self) -> Option<i64> {
        self.payload.get("signedDate").and_then(Value::as_i64)
    }

    /// The `data` object
    #[must_use]
    pub fn data(&self) -> Option<&Claims> {
        self.payload.get("data").and_then(Value::as_object)
    }

    /// Decoded `data.transactionInfo`
    #[must_use]
    pub fn transaction_info(&self) -> Option<&Claims> {
        self.data()?.get("transactionInfo")?.as_object()
    }

    /// Decoded `data.renewalInfo`
    #[must_use]
    pub fn renewal_info(&self) -> Option<&Claims> {
        self.data()?.get("renewalInfo")?.as_object()
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.payload.get(name).and_then(Value::as_str)
    }
}

/// Verify and decode a raw notification body
///
/// # Errors
/// Returns [`JwsError::MalformedNotification`] if the body is not a JSON
/// object with a string `signedPayload`. Verification failures of the outer or
/// nested tokens are returned unchanged.
pub fn decode_notification(raw: &str, verifier: &TokenVerifier) -> Result<DecodedNotification> {
    let envelope: Claims = serde_json::from_str(raw).map_err(|e| JwsError::MalformedNotification {
        reason: format!("body is not a JSON object: {e}"),
    })?;

    let signed = envelope
        .get(SIGNED_PAYLOAD)
        .and_then(Value::as_str)
        .ok_or_else(|| JwsError::MalformedNotification {
            reason: format!("missing string `{SIGNED_PAYLOAD}`"),
        })?;

    let mut payload = verifier.verify(signed)?;

    if let Some(Value::Object(data)) = payload.get_mut("data") {
        for (signed_field, decoded_field) in NESTED_TOKENS {
            let token = match data.get(signed_field) {
                Some(Value::String(token)) if !token.is_empty() => token.clone(),
                _ => continue,
            };

            let decoded = verifier.verify(&token).inspect_err(|e| {
                warn!(field = signed_field, error = %e, "Nested notification token rejected");
            })?;

            data.remove(signed_field);
            data.insert(decoded_field.to_string(), Value::Object(decoded));
        }
    }

    let notification = DecodedNotification { payload };
    debug!(
        notification_type = notification.notification_type().unwrap_or_default(),
        uuid = notification.notification_uuid().unwrap_or_default(),
        "Notification decoded"
    );
    Ok(notification)
}
