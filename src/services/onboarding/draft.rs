//! The in-memory registration draft and per-step validation.

use serde::Serialize;
use serde_json::{json, Value};

use super::uploads::{UploadKind, UploadTracker};
use crate::api::models::{PaymentRequest, ProviderSignup};
use crate::services::location_service::{infer_city_state, ResolvedLocation};
use crate::utils::validation::{
    require, validate_email, validate_password, validate_phone, ValidationError,
};

/// Wizard steps, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    PersonalInfo,
    ServiceDetails,
    Documents,
    Subscription,
    Payment,
}

impl Step {
    pub const ALL: [Step; 5] = [
        Step::PersonalInfo,
        Step::ServiceDetails,
        Step::Documents,
        Step::Subscription,
        Step::Payment,
    ];

    /// 1-based, as the progress endpoint numbers them.
    pub fn number(self) -> u8 {
        match self {
            Step::PersonalInfo => 1,
            Step::ServiceDetails => 2,
            Step::Documents => 3,
            Step::Subscription => 4,
            Step::Payment => 5,
        }
    }

    pub fn next(self) -> Option<Step> {
        match self {
            Step::PersonalInfo => Some(Step::ServiceDetails),
            Step::ServiceDetails => Some(Step::Documents),
            Step::Documents => Some(Step::Subscription),
            Step::Subscription => Some(Step::Payment),
            Step::Payment => None,
        }
    }

    pub fn prev(self) -> Option<Step> {
        match self {
            Step::PersonalInfo => None,
            Step::ServiceDetails => Some(Step::PersonalInfo),
            Step::Documents => Some(Step::ServiceDetails),
            Step::Subscription => Some(Step::Documents),
            Step::Payment => Some(Step::Subscription),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::PersonalInfo => "Personal information",
            Step::ServiceDetails => "Service details",
            Step::Documents => "Documents & brand images",
            Step::Subscription => "Subscription plan",
            Step::Payment => "Payment",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalInfo {
    pub full_name: String,
    pub business_name: String,
    pub email: String,
    pub phone: String,
    pub alternative_phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl PersonalInfo {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.full_name, "Full name")?;
        require(&self.business_name, "Business name")?;
        validate_email(&self.email)?;
        validate_phone(&self.phone, "phone number")?;
        if !self.alternative_phone.trim().is_empty() {
            validate_phone(&self.alternative_phone, "alternative phone number")?;
        }
        validate_password(&self.password, &self.confirm_password)
    }

    pub fn signup_request(&self, referral_code: &str) -> ProviderSignup {
        let optional = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };

        ProviderSignup {
            full_name: self.full_name.trim().to_string(),
            business_name: self.business_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            alternative_phone: optional(&self.alternative_phone),
            password: self.password.clone(),
            referral_code: optional(referral_code),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDetails {
    pub category: String,
    pub subcategories: Vec<String>,
    pub bio: String,
    pub location_city: String,
    pub location_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl ServiceDetails {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.category.trim().is_empty() {
            return Err(ValidationError::MissingCategory);
        }
        if self.location_city.trim().is_empty() || self.location_state.trim().is_empty() {
            return Err(ValidationError::MissingLocation);
        }
        Ok(())
    }

    /// Fill the location fields from the location picker's result.
    pub fn apply_location(&mut self, location: &ResolvedLocation) {
        match location {
            ResolvedLocation::Detected(record) => {
                self.location_city = record.city.clone();
                self.location_state = record.state.clone();
                self.latitude = Some(record.latitude);
                self.longitude = Some(record.longitude);
            }
            ResolvedLocation::Area(label) => {
                let (city, state) = infer_city_state(label);
                self.location_city = city;
                self.location_state = state;
                self.latitude = None;
                self.longitude = None;
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct OnboardingDraft {
    pub personal: PersonalInfo,
    pub service: ServiceDetails,
    pub uploads: UploadTracker,
    pub subscription_plan_id: Option<String>,
    pub payment_reference: Option<String>,
    pub referral_code: String,
}

impl OnboardingDraft {
    pub fn service_payload(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(&self.service)
    }

    pub fn uploads_payload(&self) -> Value {
        json!({
            "documents": self.uploads.attached(UploadKind::Document),
            "brandImages": self.uploads.attached(UploadKind::BrandImage),
        })
    }

    pub fn subscription_payload(&self) -> Value {
        json!({ "subscriptionPlanId": self.subscription_plan_id })
    }

    /// The details payment needs, re-checked since they were captured on
    /// earlier steps.
    pub fn payment_request(&self) -> Result<PaymentRequest, ValidationError> {
        let personal = &self.personal;
        for (value, field) in [
            (&personal.full_name, "Full name"),
            (&personal.email, "Email"),
            (&personal.business_name, "Business name"),
            (&self.service.category, "Service category"),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::PaymentDetailsMissing(field));
            }
        }

        Ok(PaymentRequest {
            email: personal.email.trim().to_string(),
            full_name: personal.full_name.trim().to_string(),
            business_name: personal.business_name.trim().to_string(),
            category: self.service.category.trim().to_string(),
            plan_id: self.subscription_plan_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::location_service::LocationRecord;

    fn valid_personal() -> PersonalInfo {
        PersonalInfo {
            full_name: "Ada Obi".to_string(),
            business_name: "Sparkle Homes".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+234 801 234 5678".to_string(),
            alternative_phone: String::new(),
            password: "abc123".to_string(),
            confirm_password: "abc123".to_string(),
        }
    }

    #[test]
    fn test_step_order() {
        let mut step = Step::PersonalInfo;
        let mut numbers = vec![step.number()];
        while let Some(next) = step.next() {
            assert_eq!(next.prev(), Some(step));
            step = next;
            numbers.push(step.number());
        }
        assert_eq!(numbers, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_personal_password_mismatch() {
        let personal = PersonalInfo {
            confirm_password: "abc124".to_string(),
            ..valid_personal()
        };
        assert_eq!(personal.validate(), Err(ValidationError::PasswordMismatch));
    }

    #[test]
    fn test_alternative_phone_checked_only_when_given() {
        assert!(valid_personal().validate().is_ok());
        let personal = PersonalInfo {
            alternative_phone: "12".to_string(),
            ..valid_personal()
        };
        assert!(matches!(
            personal.validate(),
            Err(ValidationError::InvalidPhone(_))
        ));
    }

    #[test]
    fn test_signup_request_drops_blank_optionals() {
        let request = valid_personal().signup_request("  ");
        assert_eq!(request.alternative_phone, None);
        assert_eq!(request.referral_code, None);
        assert_eq!(
            valid_personal().signup_request("VALID1").referral_code.as_deref(),
            Some("VALID1")
        );
    }

    #[test]
    fn test_service_details_validation() {
        let mut service = ServiceDetails::default();
        assert_eq!(service.validate(), Err(ValidationError::MissingCategory));

        service.category = "Cleaning".to_string();
        assert_eq!(service.validate(), Err(ValidationError::MissingLocation));

        service.apply_location(&ResolvedLocation::Area("Lekki, Lagos".to_string()));
        assert!(service.validate().is_ok());
        assert_eq!(service.location_city, "Lekki");
        assert_eq!(service.latitude, None);

        service.apply_location(&ResolvedLocation::Detected(LocationRecord::fallback()));
        assert_eq!(service.location_state, "Lagos");
        assert_eq!(service.latitude, Some(6.5244));
    }

    #[test]
    fn test_payment_request_rechecks_details() {
        let mut draft = OnboardingDraft {
            personal: valid_personal(),
            ..OnboardingDraft::default()
        };
        assert_eq!(
            draft.payment_request().unwrap_err(),
            ValidationError::PaymentDetailsMissing("Service category")
        );

        draft.service.category = "Cleaning".to_string();
        let request = draft.payment_request().unwrap();
        assert_eq!(request.business_name, "Sparkle Homes");
    }
}
