//! Deterministic auditor model for the restaurant reviewer

use async_trait::async_trait;

use crate::audit::{audit_request, AuditVerdict};
use crate::error::ModelError;
use crate::model::{ModelClient, ModelRequest, ModelResponse};

/// Reviews shorter than this are always rewritten
const MIN_REVIEW_CHARS: usize = 200;

/// Grades restaurant reviews: a review is accepted when it is long enough and talks about
/// the service; otherwise a balanced review is written from the restaurant details found
/// in the original text.
pub struct ReviewAuditorModel;

impl ReviewAuditorModel {
    fn field<'a>(review: &'a str, label: &str) -> Option<&'a str> {
        review
            .lines()
            .find_map(|line| line.trim().strip_prefix(label))
            .map(str::trim)
    }

    pub fn verdict(review: &str) -> AuditVerdict {
        if review.chars().count() >= MIN_REVIEW_CHARS && review.contains("Service:") {
            return AuditVerdict::approved("Review is specific and balanced");
        }

        let restaurant = Self::field(review, "Restaurant:").unwrap_or("this restaurant");
        let cuisine = Self::field(review, "Cuisine:").unwrap_or("house");
        let specialties = Self::field(review, "Specialties:").unwrap_or("the daily specials");
        let location = Self::field(review, "Location:")
            .map(|l| format!(" in {}", l))
            .unwrap_or_default();

        let revised = format!(
            "⭐ Review of {restaurant}{location} - 4/5

Food: The {cuisine} menu is well executed, with {specialties} as clear highlights.
Service: Attentive and friendly staff who were happy to explain the menu.
Atmosphere: Comfortable and welcoming, suited to casual dinners and special occasions alike.
Room for improvement: Waiting times at peak hours could be shorter.

Recommended for diners looking for well-prepared {cuisine} food."
        );
        AuditVerdict::revised(
            revised,
            "Added specific details about food, service and atmosphere with a balanced rating",
        )
    }
}

#[async_trait]
impl ModelClient for ReviewAuditorModel {
    fn name(&self) -> &str {
        "review_auditor"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse, ModelError> {
        let prefix = audit_request("");
        let review = request
            .last_user_message()
            .map(|m| m.strip_prefix(prefix.as_str()).unwrap_or(m))
            .unwrap_or_default();
        let reply = serde_json::to_string(&Self::verdict(review))
            .map_err(|e| ModelError::Other(e.to_string()))?;
        Ok(ModelResponse::text(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_review_is_rewritten_from_details() {
        let verdict = ReviewAuditorModel::verdict(
            "📝 Review notes:\n\nRestaurant: Sushi Zen\nCuisine: Japanese\nPrice Range: $$$\nLocation: Uptown\nSpecialties: sashimi, rolls, sake",
        );
        let revised = verdict.revision().unwrap();
        assert!(revised.starts_with("⭐ Review of Sushi Zen in Uptown - 4/5"));
        assert!(revised.contains("with sashimi, rolls, sake as clear highlights"));
    }

    #[test]
    fn test_detailed_review_is_approved() {
        let review = format!("Service: excellent. {}", "The pasta was rich and well seasoned. ".repeat(6));
        assert_eq!(ReviewAuditorModel::verdict(&review).revision(), None);
    }
}
