//! Request and response types for the backend API.
//!
//! Response shapes the backend is inconsistent about (ids that are sometimes
//! numbers, names that are sometimes objects, portfolio images in three
//! layouts) are normalized here, so controllers only ever see one shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(i64),
}

fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(id) => id,
        IdRepr::Number(id) => id.to_string(),
    })
}

/// A name that arrives either bare or as `{ "name": ... }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NameRepr {
    Bare(String),
    Object { name: String },
}

impl From<NameRepr> for String {
    fn from(repr: NameRepr) -> Self {
        match repr {
            NameRepr::Bare(name) | NameRepr::Object { name } => name,
        }
    }
}

fn deserialize_names<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let names = Option::<Vec<NameRepr>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(names.into_iter().map(String::from).collect())
}

// ----------------------------------------------------------------------------
// Users and auth
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Customer,
    Provider,
}

impl UserType {
    /// Map a backend role string onto the two app flavours.
    pub fn from_role(role: &str) -> Self {
        match role.trim().to_lowercase().as_str() {
            "provider" | "service_provider" | "serviceprovider" | "vendor" => UserType::Provider,
            _ => UserType::Customer,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserType::Customer => "Customer",
            UserType::Provider => "Service provider",
        }
    }
}

/// The signed-in user record. Fields the client does not use are kept in
/// `extra` so the record round-trips through the session store unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, alias = "role", skip_serializing_if = "Option::is_none")]
    pub user_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn kind(&self) -> UserType {
        self.user_type
            .as_deref()
            .map(UserType::from_role)
            .unwrap_or_default()
    }

    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthPayload {
    #[serde(alias = "accessToken", alias = "access_token")]
    pub token: String,
    pub user: User,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub user_type: UserType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignInRequest {
    pub id_token: String,
    pub client_id: String,
    pub user_type: UserType,
}

// ----------------------------------------------------------------------------
// Provider registration
// ----------------------------------------------------------------------------

/// Step-1 body: creates the provider account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSignup {
    pub full_name: String,
    pub business_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_phone: Option<String>,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral_code: Option<String>,
}

/// A file picked on this device, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub name: String,
    pub mime_type: String,
}

impl LocalFile {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = super::guess_mime(&path).to_string();
        Self {
            path,
            name,
            mime_type,
        }
    }
}

/// Body of `PUT /providers/register/progress`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    pub step: u8,
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    #[serde(alias = "fileUrl", alias = "secure_url", alias = "location")]
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Referrer {
    #[serde(default, alias = "businessName", alias = "referrerBusinessName")]
    pub business_name: String,
    #[serde(default, alias = "fullName", alias = "name", skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferralCheck {
    #[serde(default, alias = "isValid")]
    pub valid: bool,
    #[serde(default)]
    pub referrer: Option<Referrer>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub email: String,
    pub full_name: String,
    pub business_name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentInit {
    #[serde(alias = "authorizationUrl")]
    pub authorization_url: String,
    pub reference: String,
    #[serde(default, alias = "accessCode")]
    pub access_code: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[serde(alias = "successful", alias = "paid")]
    Success,
    #[serde(alias = "abandoned", alias = "cancelled")]
    Failed,
    #[serde(other)]
    Pending,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentVerification {
    pub status: PaymentStatus,
}

// ----------------------------------------------------------------------------
// Catalog
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Subcategory {
    #[serde(default, alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
}

/// Popular subcategories come back as bare names or `{name}` objects.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct NameList(#[serde(deserialize_with = "deserialize_names")] pub Vec<String>);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    #[serde(alias = "_id", deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(alias = "amount")]
    pub price: f64,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default)]
    pub benefits: Vec<String>,
}

fn default_interval() -> String {
    "monthly".to_string()
}

impl SubscriptionPlan {
    pub fn summary(&self) -> String {
        format!("{} - NGN {:.2} / {}", self.name, self.price, self.interval)
    }
}

// ----------------------------------------------------------------------------
// Provider profile
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[serde(alias = "approved")]
    Verified,
    Rejected,
    #[default]
    #[serde(other)]
    Pending,
}

impl VerificationStatus {
    pub fn label(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "Pending review",
            VerificationStatus::Verified => "Verified",
            VerificationStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageRef {
    Url(String),
    Object {
        #[serde(alias = "fileUrl", alias = "imageUrl")]
        url: String,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImageListRepr {
    Flat(Vec<ImageRef>),
    Nested { images: Vec<ImageRef> },
}

/// Image URLs, accepted as `["u"]`, `[{"url": "u"}]` or `{"images": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "ImageListRepr")]
pub struct ImageList(pub Vec<String>);

impl From<ImageListRepr> for ImageList {
    fn from(repr: ImageListRepr) -> Self {
        let refs = match repr {
            ImageListRepr::Flat(refs) | ImageListRepr::Nested { images: refs } => refs,
        };
        ImageList(
            refs.into_iter()
                .map(|r| match r {
                    ImageRef::Url(url) | ImageRef::Object { url } => url,
                })
                .filter(|url| !url.trim().is_empty())
                .collect(),
        )
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderProfileDto {
    #[serde(default)]
    business_name: String,
    #[serde(default)]
    category: Option<NameRepr>,
    #[serde(default, deserialize_with = "deserialize_names")]
    subcategories: Vec<String>,
    #[serde(default)]
    bio: Option<String>,
    #[serde(default, alias = "city")]
    location_city: Option<String>,
    #[serde(default, alias = "state")]
    location_state: Option<String>,
    #[serde(default)]
    latitude: Option<f64>,
    #[serde(default)]
    longitude: Option<f64>,
    #[serde(default)]
    verification_status: VerificationStatus,
    #[serde(default)]
    portfolio: Option<ImageList>,
    #[serde(default, alias = "brandImages")]
    brand_image_documents: Option<ImageList>,
}

/// A provider's public business profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "ProviderProfileDto")]
pub struct ProviderProfile {
    pub business_name: String,
    pub category: String,
    pub subcategories: Vec<String>,
    pub bio: String,
    pub location_city: String,
    pub location_state: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub verification_status: VerificationStatus,
    pub portfolio: Vec<String>,
}

impl From<ProviderProfileDto> for ProviderProfile {
    fn from(dto: ProviderProfileDto) -> Self {
        // Brand image documents are the canonical portfolio when present
        let portfolio = match (dto.brand_image_documents, dto.portfolio) {
            (Some(brand), _) if !brand.0.is_empty() => brand.0,
            (_, Some(portfolio)) => portfolio.0,
            _ => Vec::new(),
        };

        Self {
            business_name: dto.business_name,
            category: dto.category.map(String::from).unwrap_or_default(),
            subcategories: dto.subcategories,
            bio: dto.bio.unwrap_or_default(),
            location_city: dto.location_city.unwrap_or_default(),
            location_state: dto.location_state.unwrap_or_default(),
            latitude: dto.latitude,
            longitude: dto.longitude,
            verification_status: dto.verification_status,
            portfolio,
        }
    }
}

/// Body of `PUT /providers/profile`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub business_name: String,
    pub category: String,
    pub subcategories: Vec<String>,
    pub bio: String,
    pub location_city: String,
    pub location_state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub portfolio: Vec<String>,
}

impl From<&ProviderProfile> for ProfileUpdate {
    fn from(profile: &ProviderProfile) -> Self {
        Self {
            business_name: profile.business_name.clone(),
            category: profile.category.clone(),
            subcategories: profile.subcategories.clone(),
            bio: profile.bio.clone(),
            location_city: profile.location_city.clone(),
            location_state: profile.location_state.clone(),
            latitude: profile.latitude,
            longitude: profile.longitude,
            portfolio: profile.portfolio.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile_from(value: Value) -> ProviderProfile {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_portfolio_as_plain_strings() {
        let profile = profile_from(json!({
            "businessName": "Sparkle Homes",
            "portfolio": ["https://cdn/1.jpg", "https://cdn/2.jpg"]
        }));
        assert_eq!(profile.portfolio, vec!["https://cdn/1.jpg", "https://cdn/2.jpg"]);
    }

    #[test]
    fn test_portfolio_as_url_objects() {
        let profile = profile_from(json!({
            "portfolio": [{"url": "https://cdn/1.jpg"}, {"fileUrl": "https://cdn/2.jpg"}]
        }));
        assert_eq!(profile.portfolio, vec!["https://cdn/1.jpg", "https://cdn/2.jpg"]);
    }

    #[test]
    fn test_portfolio_as_nested_images() {
        let profile = profile_from(json!({
            "portfolio": {"images": ["https://cdn/1.jpg", {"url": "https://cdn/2.jpg"}]}
        }));
        assert_eq!(profile.portfolio, vec!["https://cdn/1.jpg", "https://cdn/2.jpg"]);
    }

    #[test]
    fn test_brand_image_documents_win_over_portfolio() {
        let profile = profile_from(json!({
            "portfolio": ["https://cdn/old.jpg"],
            "brandImageDocuments": [{"url": "https://cdn/brand.jpg"}]
        }));
        assert_eq!(profile.portfolio, vec!["https://cdn/brand.jpg"]);

        let empty_brand = profile_from(json!({
            "portfolio": ["https://cdn/old.jpg"],
            "brandImageDocuments": []
        }));
        assert_eq!(empty_brand.portfolio, vec!["https://cdn/old.jpg"]);
    }

    #[test]
    fn test_profile_category_and_status_shapes() {
        let profile = profile_from(json!({
            "category": {"name": "Cleaning"},
            "subcategories": ["Deep Cleaning", {"name": "Laundry"}],
            "verificationStatus": "approved",
            "city": "Ikeja",
            "state": "Lagos"
        }));
        assert_eq!(profile.category, "Cleaning");
        assert_eq!(profile.subcategories, vec!["Deep Cleaning", "Laundry"]);
        assert_eq!(profile.verification_status, VerificationStatus::Verified);
        assert_eq!(profile.location_city, "Ikeja");

        let unknown = profile_from(json!({"verificationStatus": "in_review"}));
        assert_eq!(unknown.verification_status, VerificationStatus::Pending);
    }

    #[test]
    fn test_user_keeps_unknown_fields() {
        let user: User = serde_json::from_value(json!({
            "_id": 42,
            "email": "ada@example.com",
            "name": "Ada",
            "role": "provider",
            "avatar": "https://cdn/a.png"
        }))
        .unwrap();

        assert_eq!(user.id, "42");
        assert_eq!(user.kind(), UserType::Provider);
        assert_eq!(user.display_name(), "Ada");
        assert_eq!(user.extra.get("avatar"), Some(&json!("https://cdn/a.png")));

        let round_trip: User = serde_json::from_str(&serde_json::to_string(&user).unwrap()).unwrap();
        assert_eq!(round_trip, user);
    }

    #[test]
    fn test_payment_status_variants() {
        let parse = |s: &str| serde_json::from_value::<PaymentStatus>(json!(s)).unwrap();
        assert_eq!(parse("success"), PaymentStatus::Success);
        assert_eq!(parse("abandoned"), PaymentStatus::Failed);
        assert_eq!(parse("ongoing"), PaymentStatus::Pending);
    }

    #[test]
    fn test_name_list_shapes() {
        let names: NameList =
            serde_json::from_value(json!(["Deep Cleaning", {"name": "Laundry"}])).unwrap();
        assert_eq!(names.0, vec!["Deep Cleaning", "Laundry"]);
    }
}
