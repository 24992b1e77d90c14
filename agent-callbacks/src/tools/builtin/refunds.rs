//! Refund assistant tools: purchase history lookup, eligibility and refund processing

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::title_case;
use crate::error::ToolError;
use crate::tools::registry::Tool;
use crate::tools::types::{parse_params, PropertySchema, ToolContext, ToolDefinition};

pub const ELIGIBLE_SHIPPING_METHODS: [&str; 1] = ["INSURED"];
pub const ELIGIBLE_REASONS: [&str; 2] = ["DAMAGED", "NEVER_ARRIVED"];

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseItem {
    pub product_name: &'static str,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurchaseRecord {
    pub order_id: &'static str,
    pub date: &'static str,
    pub items: Vec<PurchaseItem>,
    pub shipping_method: &'static str,
    pub total_amount: f64,
}

static PURCHASE_HISTORY: Lazy<HashMap<&'static str, Vec<PurchaseRecord>>> = Lazy::new(|| {
    HashMap::from([
        (
            "Erike",
            vec![PurchaseRecord {
                order_id: "NAT001-20250415",
                date: "2025-04-15",
                items: vec![
                    PurchaseItem { product_name: "Perfume Kaiak Feminino 100ml", quantity: 1, price: 89.90 },
                    PurchaseItem { product_name: "Creme Hidratante Tododia Algodão 400ml", quantity: 1, price: 32.90 },
                ],
                shipping_method: "STANDARD",
                total_amount: 122.80,
            }],
        ),
        (
            "Massini",
            vec![PurchaseRecord {
                order_id: "NAT002-20250610",
                date: "2025-06-03",
                items: vec![
                    PurchaseItem { product_name: "Desodorante Natura Homem Humor 75ml", quantity: 1, price: 45.90 },
                    PurchaseItem { product_name: "Shampoo Plant Cachos Intensos 300ml", quantity: 1, price: 28.90 },
                ],
                shipping_method: "INSURED",
                total_amount: 74.80,
            }],
        ),
    ])
});

/// Orders of a customer, looked up by title-cased name
pub fn purchase_history(purchaser: &str) -> &'static [PurchaseRecord] {
    let name = title_case(purchaser.trim());
    PURCHASE_HISTORY
        .get(name.as_str())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

pub fn is_refund_eligible(reason: &str, shipping_method: &str) -> bool {
    let reason = reason.trim().to_uppercase();
    let shipping = shipping_method.trim().to_uppercase();
    ELIGIBLE_SHIPPING_METHODS.contains(&shipping.as_str()) && ELIGIBLE_REASONS.contains(&reason.as_str())
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    purchaser: String,
}

pub struct PurchaseHistoryTool;

#[async_trait]
impl Tool for PurchaseHistoryTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("get_purchase_history", "Retrieve the purchase history of a customer")
            .param("purchaser", PropertySchema::string("Customer name"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: HistoryParams = parse_params(params)?;
        let history = purchase_history(&params.purchaser);
        if history.is_empty() {
            log::warn!("[TOOLS] No purchase history found for: {}", params.purchaser);
        } else {
            log::info!("[TOOLS] Found {} purchase(s) for {}", history.len(), params.purchaser);
        }
        serde_json::to_value(history).map_err(|e| ToolError::Remote(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct EligibilityParams {
    reason: String,
    shipping_method: String,
}

/// Insured orders that arrived damaged or never arrived qualify
pub struct RefundEligibilityTool;

#[async_trait]
impl Tool for RefundEligibilityTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "check_refund_eligibility",
            "Check whether a refund request is eligible based on reason and shipping method",
        )
        .param(
            "reason",
            PropertySchema::string("Refund reason").with_enum(&["DAMAGED", "NEVER_ARRIVED", "LATE", "OTHER"]),
            true,
        )
        .param("shipping_method", PropertySchema::string("Shipping method used for the order"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: EligibilityParams = parse_params(params)?;
        let eligible = is_refund_eligible(&params.reason, &params.shipping_method);
        log::info!(
            "[TOOLS] Refund eligibility - reason: {}, shipping: {}, eligible: {}",
            params.reason,
            params.shipping_method,
            eligible
        );
        Ok(json!(eligible))
    }
}

#[derive(Debug, Deserialize)]
struct RefundParams {
    amount: f64,
    order_id: String,
}

pub struct ProcessRefundTool;

#[async_trait]
impl Tool for ProcessRefundTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("process_refund", "Process a refund for the given amount and order")
            .param("amount", PropertySchema::number("Refund amount in BRL"), true)
            .param("order_id", PropertySchema::string("Order to refund"), true)
    }

    async fn execute(&self, params: Value, _context: &ToolContext<'_>) -> Result<Value, ToolError> {
        let params: RefundParams = parse_params(params)?;
        if !params.amount.is_finite() || params.amount <= 0.0 {
            return Err(ToolError::InvalidParameters(format!(
                "refund amount must be positive, got {}",
                params.amount
            )));
        }
        let cents = (params.amount * 100.0).round() as i64;
        let refund_id = format!("REF-{}-{}", params.order_id, cents);
        log::info!("[TOOLS] Refund processed - ID: {}", refund_id);
        Ok(Value::String(format!(
            "✅ Refund {} completed successfully! R${:.2} will be credited to your account within 2 business days.",
            refund_id, params.amount
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtin::test_state;

    #[test]
    fn test_purchase_history_normalizes_name() {
        let history = purchase_history("  massini ");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].order_id, "NAT002-20250610");
        assert!(purchase_history("Nobody").is_empty());
    }

    #[test]
    fn test_eligibility_rules() {
        assert!(is_refund_eligible("damaged", "insured"));
        assert!(is_refund_eligible(" NEVER_ARRIVED", "INSURED "));
        assert!(!is_refund_eligible("DAMAGED", "STANDARD"));
        assert!(!is_refund_eligible("LATE", "INSURED"));
    }

    #[tokio::test]
    async fn test_tools() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);

        let history = PurchaseHistoryTool
            .execute(json!({"purchaser": "erike"}), &context)
            .await
            .unwrap();
        assert_eq!(history[0]["shipping_method"], "STANDARD");
        assert_eq!(history[0]["items"].as_array().unwrap().len(), 2);

        let unknown = PurchaseHistoryTool
            .execute(json!({"purchaser": "ghost"}), &context)
            .await
            .unwrap();
        assert_eq!(unknown, json!([]));

        let eligible = RefundEligibilityTool
            .execute(json!({"reason": "DAMAGED", "shipping_method": "INSURED"}), &context)
            .await
            .unwrap();
        assert_eq!(eligible, json!(true));

        let refund = ProcessRefundTool
            .execute(json!({"amount": 74.80, "order_id": "NAT002-20250610"}), &context)
            .await
            .unwrap();
        assert_eq!(
            refund,
            "✅ Refund REF-NAT002-20250610-7480 completed successfully! R$74.80 will be credited to your account within 2 business days."
        );
    }

    #[tokio::test]
    async fn test_non_positive_refund_is_invalid() {
        let state = test_state();
        let context = ToolContext::new("call_1", &state);
        let err = ProcessRefundTool
            .execute(json!({"amount": 0, "order_id": "X"}), &context)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidParameters(_)));
    }
}
