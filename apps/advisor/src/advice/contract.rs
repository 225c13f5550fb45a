//! The response contract between the model and everything downstream.
//!
//! Model output is checked structurally on the raw JSON value first, then
//! decoded into `AdviceResponse`. Nothing past the gateway ever sees an
//! untyped map.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// A validated model reply. Exactly one variant, selected by `message_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum AdviceResponse {
    Question(QuestionReply),
    Advice(AdviceBundle),
}

/// The model needs more information before it can advise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionReply {
    pub personal_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

/// A complete advice bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceBundle {
    pub personal_message: String,
    pub product_recommendation: ProductRecommendation,
    pub health_advice: HealthAdvice,
    #[serde(default)]
    pub severity_warning: bool,
    /// Article ids, as cited by the model.
    #[serde(default)]
    pub related_blogs: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecommendation {
    pub product_id: i64,
    #[serde(default)]
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthAdvice {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thermal_advice: Option<ThermalAdvice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_advice: Option<String>,
    #[serde(default)]
    pub lifestyle_tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub frequency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalAdvice {
    pub method: ThermalMethod,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub duration: String,
}

/// Written with the Dutch values the prompt asks for; English accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThermalMethod {
    #[serde(rename = "koelen", alias = "cool")]
    Cool,
    #[serde(rename = "verwarmen", alias = "heat")]
    Heat,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

pub const MESSAGE_TYPES: &[&str] = &["question", "advice"];

/// Why a model reply was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractViolation {
    #[error("content is not valid JSON: {0}")]
    NotJson(String),

    #[error("content is not a JSON object")]
    NotAnObject,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid message_type: {0}")]
    InvalidMessageType(String),

    #[error("advice response missing {0}")]
    IncompleteAdvice(&'static str),

    #[error("content does not match the response schema: {0}")]
    Decode(String),
}

fn is_absent(object: &serde_json::Map<String, Value>, field: &str) -> bool {
    object.get(field).map_or(true, Value::is_null)
}

/// Structural checks on the raw reply. Null counts as absent.
///
/// 1. `message_type` and `personal_message` present
/// 2. `message_type` is `"question"` or `"advice"`
/// 3. advice replies carry `product_recommendation` and `health_advice`
pub fn validate_contract(value: &Value) -> Result<(), ContractViolation> {
    let object = value.as_object().ok_or(ContractViolation::NotAnObject)?;

    for field in ["message_type", "personal_message"] {
        if is_absent(object, field) {
            return Err(ContractViolation::MissingField(field));
        }
    }

    let message_type = match &object["message_type"] {
        Value::String(s) => s.as_str(),
        other => return Err(ContractViolation::InvalidMessageType(other.to_string())),
    };
    if !MESSAGE_TYPES.contains(&message_type) {
        return Err(ContractViolation::InvalidMessageType(message_type.to_string()));
    }

    if message_type == "advice" {
        for field in ["product_recommendation", "health_advice"] {
            if is_absent(object, field) {
                return Err(ContractViolation::IncompleteAdvice(field));
            }
        }
    }

    Ok(())
}

/// Parses, validates and decodes the model's inner JSON text.
pub fn decode_advice_response(content: &str) -> Result<AdviceResponse, ContractViolation> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| ContractViolation::NotJson(e.to_string()))?;
    validate_contract(&value)?;
    serde_json::from_value(value).map_err(|e| ContractViolation::Decode(e.to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
