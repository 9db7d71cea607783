//! Stripe API payloads, limited to the fields billing reads.

use serde::{Deserialize, Deserializer};

/// Payment intent status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripePaymentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    /// Statuses billing never asks for, e.g. `requires_capture`.
    #[serde(other)]
    Unknown,
}

/// Charge status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripeChargeStatus {
    Succeeded,
    Pending,
    Failed,
}

/// Refund status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StripeRefundStatus {
    Succeeded,
    Pending,
    RequiresAction,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeCharge {
    pub id: String,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub payment_method_details: serde_json::Value,
    pub status: StripeChargeStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeCharges {
    #[serde(default)]
    pub data: Vec<StripeCharge>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeMetadata {
    #[serde(default, deserialize_with = "flag")]
    pub is_automatic: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: StripePaymentStatus,
    #[serde(default)]
    pub charges: StripeCharges,
    #[serde(default)]
    pub metadata: StripeMetadata,
}

impl StripePaymentIntent {
    /// Most recent charge attempt, if any.
    pub fn latest_charge(&self) -> Option<&StripeCharge> {
        self.charges.data.first()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeRefund {
    pub id: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub payment_intent: Option<String>,
    pub status: StripeRefundStatus,
}

/// `{"error": {...}}` envelope of non-2xx answers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeErrorEnvelope {
    #[serde(default)]
    pub error: StripeErrorBody,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
    /// Present on declines of confirmed intents.
    pub payment_intent: Option<serde_json::Value>,
}

/// Metadata values come back as strings (`"0"`/`"1"`).
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Number(n) => n != 0,
        Flag::Text(s) => matches!(s.as_str(), "1" | "true" | "True"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_intent_with_string_metadata_flag() {
        let intent: StripePaymentIntent = serde_json::from_value(json!({
            "id": "pi_1",
            "client_secret": "pi_1_secret",
            "status": "requires_payment_method",
            "charges": {"data": [{
                "id": "ch_1",
                "payment_method": "pm_1",
                "payment_method_details": {"type": "card"},
                "status": "failed"
            }]},
            "metadata": {"is_automatic": "1"}
        }))
        .unwrap();

        assert!(intent.metadata.is_automatic);
        assert_eq!(intent.status, StripePaymentStatus::RequiresPaymentMethod);
        assert_eq!(intent.latest_charge().unwrap().status, StripeChargeStatus::Failed);
    }

    #[test]
    fn missing_charges_and_metadata_default() {
        let intent: StripePaymentIntent = serde_json::from_value(json!({
            "id": "pi_2",
            "client_secret": null,
            "status": "requires_capture"
        }))
        .unwrap();

        assert_eq!(intent.status, StripePaymentStatus::Unknown);
        assert!(!intent.metadata.is_automatic);
        assert!(intent.latest_charge().is_none());
    }

    #[test]
    fn parses_error_envelope() {
        let envelope: StripeErrorEnvelope = serde_json::from_value(json!({
            "error": {"code": "resource_already_exists", "message": "Customer already exists."}
        }))
        .unwrap();

        assert_eq!(envelope.error.code.as_deref(), Some("resource_already_exists"));
        assert!(envelope.error.payment_intent.is_none());
    }
}
