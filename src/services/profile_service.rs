//! Provider profile editor.
//!
//! Holds the profile as loaded (the snapshot) and a working copy. Inputs
//! are read-only until edit mode is on; adding or removing portfolio images
//! and subcategories switches it on by itself. Saving is skipped entirely
//! when the working copy still equals the snapshot.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::models::{LocalFile, ProfileUpdate, ProviderProfile};
use crate::api::{ApiClient, ApiError, ApiResult};
use crate::services::location_service::{infer_city_state, ResolvedLocation};
use crate::utils::validation::{normalize_label, require, ValidationError};

/// Most portfolio images a provider may show.
pub const MAX_PORTFOLIO: usize = 8;

/// Server calls the profile editor needs.
///
/// Implemented by [`ApiClient`]; tests supply an in-memory fake.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    /// Fetch the signed-in provider's profile.
    async fn fetch_profile(&self) -> ApiResult<ProviderProfile>;
    /// Send the editable fields back to the server.
    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<()>;
    /// Upload one image; returns its remote URL.
    async fn upload_portfolio_image(&self, file: &LocalFile) -> ApiResult<String>;
    /// Subcategories other providers commonly pick for `category`.
    async fn popular_subcategories(&self, category: &str) -> ApiResult<Vec<String>>;
}

#[async_trait]
impl ProfileBackend for ApiClient {
    async fn fetch_profile(&self) -> ApiResult<ProviderProfile> {
        ApiClient::fetch_profile(self).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<()> {
        ApiClient::update_profile(self, update).await
    }

    async fn upload_portfolio_image(&self, file: &LocalFile) -> ApiResult<String> {
        Ok(ApiClient::upload_portfolio_image(self, file).await?.url)
    }

    async fn popular_subcategories(&self, category: &str) -> ApiResult<Vec<String>> {
        ApiClient::popular_subcategories(self, category).await
    }
}

/// Errors raised by [`ProfileEditor`].
#[derive(Debug, Error)]
pub enum ProfileError {
    /// Local input check failed; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The server refused the request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A mutation was attempted before [`ProfileEditor::load`].
    #[error("The profile has not been loaded yet")]
    NotLoaded,
    /// A text field was changed outside edit mode.
    #[error("Tap Edit to change your profile")]
    ReadOnly,
}

impl ProfileError {
    /// Text suitable for an alert. Server messages are passed through.
    pub fn user_message(&self) -> String {
        match self {
            ProfileError::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Result of [`ProfileEditor::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing differed from the loaded profile; no request was made.
    NoChanges,
    /// The update was accepted and the snapshot replaced.
    Saved,
}

/// Editor for the provider profile.
///
/// Keeps the loaded profile as a snapshot next to a working copy. Every
/// mutation goes to the working copy; [`ProfileEditor::has_changes`]
/// compares the two, and [`ProfileEditor::save`] sends the working copy
/// only when they differ.
///
/// # Example
///
/// ```rust,ignore
/// let mut editor = ProfileEditor::new(api.clone());
/// editor.load().await?;
/// editor.start_edit()?;
/// editor.set_bio("Ten years of deep cleaning")?;
/// editor.save().await?;
/// ```
pub struct ProfileEditor<B> {
    backend: B,
    snapshot: Option<ProviderProfile>,
    working: ProviderProfile,
    editing: bool,
    popular_subcategories: Vec<String>,
}

impl<B: ProfileBackend> ProfileEditor<B> {
    /// Create an editor with nothing loaded.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            snapshot: None,
            working: ProviderProfile::default(),
            editing: false,
            popular_subcategories: Vec::new(),
        }
    }

    /// Fetch the profile and take the snapshot changes are measured against.
    pub async fn load(&mut self) -> Result<&ProviderProfile, ProfileError> {
        let profile = self.backend.fetch_profile().await?;
        debug!(
            "Loaded profile with {} portfolio image(s)",
            profile.portfolio.len()
        );
        self.snapshot = Some(profile.clone());
        self.working = profile;
        self.editing = false;
        Ok(&self.working)
    }

    /// Whether [`Self::load`] has succeeded at least once.
    pub fn is_loaded(&self) -> bool {
        self.snapshot.is_some()
    }

    /// The working copy, including unsaved changes.
    pub fn profile(&self) -> &ProviderProfile {
        &self.working
    }

    /// Whether text fields accept changes.
    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Suggestions for the selected category, empty until one is chosen.
    pub fn popular_subcategories(&self) -> &[String] {
        &self.popular_subcategories
    }

    /// Whether the working copy differs from the last loaded or saved
    /// profile. Always `false` before a load.
    pub fn has_changes(&self) -> bool {
        self.snapshot
            .as_ref()
            .is_some_and(|snapshot| *snapshot != self.working)
    }

    /// Switch on edit mode.
    ///
    /// # Errors
    ///
    /// [`ProfileError::NotLoaded`] before the first load.
    pub fn start_edit(&mut self) -> Result<(), ProfileError> {
        self.ensure_loaded()?;
        self.editing = true;
        Ok(())
    }

    /// Drop unsaved changes and leave edit mode.
    pub fn cancel_edit(&mut self) {
        if let Some(snapshot) = &self.snapshot {
            self.working = snapshot.clone();
        }
        self.editing = false;
    }

    fn ensure_loaded(&self) -> Result<(), ProfileError> {
        if self.is_loaded() {
            Ok(())
        } else {
            Err(ProfileError::NotLoaded)
        }
    }

    fn ensure_editing(&self) -> Result<(), ProfileError> {
        self.ensure_loaded()?;
        if self.editing {
            Ok(())
        } else {
            Err(ProfileError::ReadOnly)
        }
    }

    /// Replace the business name. Requires edit mode.
    pub fn set_business_name(&mut self, name: &str) -> Result<(), ProfileError> {
        self.ensure_editing()?;
        self.working.business_name = name.to_string();
        Ok(())
    }

    /// Replace the bio. Requires edit mode.
    pub fn set_bio(&mut self, bio: &str) -> Result<(), ProfileError> {
        self.ensure_editing()?;
        self.working.bio = bio.to_string();
        Ok(())
    }

    /// Set the service area.
    ///
    /// A detected location carries its coordinates along. A typed area is
    /// split into city and state and clears any earlier coordinates.
    ///
    /// # Arguments
    ///
    /// * `location` - The place picked in the location search.
    pub fn set_location(&mut self, location: &ResolvedLocation) -> Result<(), ProfileError> {
        self.ensure_editing()?;
        match location {
            ResolvedLocation::Detected(record) => {
                self.working.location_city = record.city.clone();
                self.working.location_state = record.state.clone();
                self.working.latitude = Some(record.latitude);
                self.working.longitude = Some(record.longitude);
            }
            ResolvedLocation::Area(label) => {
                let (city, state) = infer_city_state(label);
                self.working.location_city = city;
                self.working.location_state = state;
                // A typed area has no position; drop the previous one.
                self.working.latitude = None;
                self.working.longitude = None;
            }
        }
        Ok(())
    }

    /// Switch category and fetch its popular subcategories.
    ///
    /// The suggestion list is best-effort: a failed fetch leaves it empty.
    ///
    /// # Returns
    ///
    /// The popular subcategories for the new category.
    pub async fn select_category(&mut self, category: &str) -> Result<&[String], ProfileError> {
        self.ensure_editing()?;
        self.working.category = category.trim().to_string();

        self.popular_subcategories = match self.backend.popular_subcategories(category.trim()).await
        {
            Ok(names) => names,
            Err(e) => {
                warn!("Could not load popular subcategories: {}", e);
                Vec::new()
            }
        };
        Ok(&self.popular_subcategories)
    }

    fn subcategory_index(&self, name: &str) -> Option<usize> {
        let wanted = normalize_label(name);
        self.working
            .subcategories
            .iter()
            .position(|existing| normalize_label(existing) == wanted)
    }

    /// Add a subcategory, rejecting case/whitespace duplicates.
    pub fn add_subcategory(&mut self, name: &str) -> Result<(), ProfileError> {
        self.ensure_loaded()?;
        require(name, "Subcategory")?;
        if self.subcategory_index(name).is_some() {
            return Err(ValidationError::DuplicateSubcategory(name.trim().to_string()).into());
        }
        self.working.subcategories.push(name.trim().to_string());
        self.editing = true;
        Ok(())
    }

    /// Remove a subcategory, matching case- and whitespace-insensitively.
    ///
    /// # Returns
    ///
    /// `true` if something was removed.
    pub fn remove_subcategory(&mut self, name: &str) -> Result<bool, ProfileError> {
        self.ensure_loaded()?;
        match self.subcategory_index(name) {
            Some(index) => {
                self.working.subcategories.remove(index);
                self.editing = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Add when absent, remove when present.
    ///
    /// # Returns
    ///
    /// `true` if the subcategory is now selected.
    pub fn toggle_subcategory(&mut self, name: &str) -> Result<bool, ProfileError> {
        if self.remove_subcategory(name)? {
            Ok(false)
        } else {
            self.add_subcategory(name)?;
            Ok(true)
        }
    }

    /// Upload and append a portfolio image. Refused before any upload when
    /// the portfolio is already full.
    pub async fn add_portfolio_image(&mut self, file: &LocalFile) -> Result<(), ProfileError> {
        self.ensure_loaded()?;
        if self.working.portfolio.len() >= MAX_PORTFOLIO {
            return Err(ValidationError::PortfolioFull(MAX_PORTFOLIO).into());
        }

        let url = self.backend.upload_portfolio_image(file).await?;
        info!("Added portfolio image {}", file.name);
        self.working.portfolio.push(url);
        self.editing = true;
        Ok(())
    }

    /// Remove the portfolio image at `index`.
    ///
    /// # Returns
    ///
    /// The removed URL, or `None` when `index` is out of range.
    pub fn remove_portfolio_image(&mut self, index: usize) -> Result<Option<String>, ProfileError> {
        self.ensure_loaded()?;
        if index >= self.working.portfolio.len() {
            return Ok(None);
        }
        self.editing = true;
        Ok(Some(self.working.portfolio.remove(index)))
    }

    /// Persist the working copy. Without changes this only leaves edit
    /// mode. On success the snapshot becomes the saved profile; on failure
    /// edit mode and the changes are kept.
    pub async fn save(&mut self) -> Result<SaveOutcome, ProfileError> {
        self.ensure_loaded()?;
        if !self.has_changes() {
            self.editing = false;
            return Ok(SaveOutcome::NoChanges);
        }

        self.backend
            .update_profile(&ProfileUpdate::from(&self.working))
            .await?;
        self.snapshot = Some(self.working.clone());
        self.editing = false;
        info!("Profile saved");
        Ok(SaveOutcome::Saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::location_service::LocationRecord;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeBackend {
        profile: ProviderProfile,
        requests: AtomicUsize,
        updates: AtomicUsize,
        fail_popular: bool,
    }

    #[async_trait]
    impl ProfileBackend for FakeBackend {
        async fn fetch_profile(&self) -> ApiResult<ProviderProfile> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(self.profile.clone())
        }

        async fn update_profile(&self, _update: &ProfileUpdate) -> ApiResult<()> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            self.updates.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn upload_portfolio_image(&self, file: &LocalFile) -> ApiResult<String> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://cdn.example.com/{}", file.name))
        }

        async fn popular_subcategories(&self, _category: &str) -> ApiResult<Vec<String>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            if self.fail_popular {
                return Err(ApiError::Rejected("nope".to_string()));
            }
            Ok(vec!["Deep Cleaning".to_string(), "Laundry".to_string()])
        }
    }

    fn profile() -> ProviderProfile {
        ProviderProfile {
            business_name: "Sparkle Homes".to_string(),
            category: "Cleaning".to_string(),
            subcategories: vec!["deep cleaning".to_string()],
            portfolio: vec!["https://cdn.example.com/1.jpg".to_string()],
            ..ProviderProfile::default()
        }
    }

    async fn loaded(profile: ProviderProfile) -> ProfileEditor<FakeBackend> {
        let mut editor = ProfileEditor::new(FakeBackend {
            profile,
            ..FakeBackend::default()
        });
        editor.load().await.unwrap();
        editor
    }

    fn requests(editor: &ProfileEditor<FakeBackend>) -> usize {
        editor.backend.requests.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_fields_read_only_until_edit() {
        let mut editor = loaded(profile()).await;
        assert!(matches!(
            editor.set_bio("We clean"),
            Err(ProfileError::ReadOnly)
        ));

        editor.start_edit().unwrap();
        editor.set_bio("We clean").unwrap();
        assert!(editor.has_changes());
    }

    #[tokio::test]
    async fn test_save_without_changes_makes_no_request() {
        let mut editor = loaded(profile()).await;
        editor.start_edit().unwrap();
        let before = requests(&editor);

        assert_eq!(editor.save().await.unwrap(), SaveOutcome::NoChanges);
        assert!(!editor.is_editing());
        assert_eq!(requests(&editor), before);
    }

    #[tokio::test]
    async fn test_save_resets_snapshot() {
        let mut editor = loaded(profile()).await;
        editor.start_edit().unwrap();
        editor.set_business_name("Sparkle Homes Ltd").unwrap();

        assert_eq!(editor.save().await.unwrap(), SaveOutcome::Saved);
        assert!(!editor.has_changes());
        assert_eq!(editor.backend.updates.load(Ordering::SeqCst), 1);
        // No re-fetch after saving
        assert_eq!(editor.backend.requests.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancel_restores_snapshot() {
        let mut editor = loaded(profile()).await;
        editor.start_edit().unwrap();
        editor.set_business_name("Other").unwrap();
        editor.cancel_edit();

        assert_eq!(editor.profile().business_name, "Sparkle Homes");
        assert!(!editor.has_changes());
    }

    #[tokio::test]
    async fn test_duplicate_subcategory_rejected() {
        let mut editor = loaded(profile()).await;
        let err = editor.add_subcategory("  Deep   Cleaning ").unwrap_err();

        assert!(matches!(
            err,
            ProfileError::Validation(ValidationError::DuplicateSubcategory(_))
        ));
        assert_eq!(editor.profile().subcategories, vec!["deep cleaning"]);
        assert!(!editor.is_editing());
    }

    #[tokio::test]
    async fn test_subcategory_changes_turn_on_edit_mode() {
        let mut editor = loaded(profile()).await;
        assert!(editor.toggle_subcategory("Laundry").unwrap());
        assert!(editor.is_editing());
        assert!(!editor.toggle_subcategory("laundry").unwrap());
        assert_eq!(editor.profile().subcategories, vec!["deep cleaning"]);
    }

    #[tokio::test]
    async fn test_portfolio_ceiling() {
        let mut full = profile();
        full.portfolio = (0..MAX_PORTFOLIO)
            .map(|i| format!("https://cdn.example.com/{i}.jpg"))
            .collect();
        let mut editor = loaded(full).await;
        let before = requests(&editor);

        let err = editor
            .add_portfolio_image(&LocalFile::from_path("/tmp/ninth.jpg"))
            .await
            .unwrap_err();

        assert_eq!(err.user_message(), "You can add at most 8 portfolio images");
        assert_eq!(editor.profile().portfolio.len(), MAX_PORTFOLIO);
        assert_eq!(requests(&editor), before);
    }

    #[tokio::test]
    async fn test_portfolio_upload_turns_on_edit_mode() {
        let mut editor = loaded(profile()).await;
        editor
            .add_portfolio_image(&LocalFile::from_path("/tmp/new.jpg"))
            .await
            .unwrap();

        assert!(editor.is_editing());
        assert_eq!(editor.profile().portfolio.len(), 2);
        assert_eq!(
            editor.remove_portfolio_image(0).unwrap().as_deref(),
            Some("https://cdn.example.com/1.jpg")
        );
        assert_eq!(editor.remove_portfolio_image(5).unwrap(), None);
    }

    #[tokio::test]
    async fn test_category_fetches_popular_subcategories() {
        let mut editor = loaded(profile()).await;
        editor.start_edit().unwrap();
        let popular = editor.select_category("Cleaning").await.unwrap().to_vec();
        assert_eq!(popular, vec!["Deep Cleaning", "Laundry"]);

        let mut failing = ProfileEditor::new(FakeBackend {
            profile: profile(),
            fail_popular: true,
            ..FakeBackend::default()
        });
        failing.load().await.unwrap();
        failing.start_edit().unwrap();
        assert!(failing.select_category("Plumbing").await.unwrap().is_empty());
        assert_eq!(failing.profile().category, "Plumbing");
    }

    #[tokio::test]
    async fn test_area_location_drops_detected_coordinates() {
        let mut editor = loaded(profile()).await;
        editor.start_edit().unwrap();
        editor
            .set_location(&ResolvedLocation::Detected(LocationRecord::fallback()))
            .unwrap();
        assert_eq!(editor.profile().latitude, Some(6.5244));

        editor
            .set_location(&ResolvedLocation::Area("Wuse, Abuja".to_string()))
            .unwrap();
        let update = ProfileUpdate::from(editor.profile());
        assert_eq!(update.location_city, "Wuse");
        assert_eq!(update.location_state, "Abuja");
        assert_eq!(update.latitude, None);
        assert_eq!(update.longitude, None);
    }

    #[tokio::test]
    async fn test_mutations_need_a_loaded_profile() {
        let mut editor = ProfileEditor::new(FakeBackend::default());
        assert!(matches!(
            editor.add_subcategory("Laundry"),
            Err(ProfileError::NotLoaded)
        ));
        assert!(matches!(editor.save().await, Err(ProfileError::NotLoaded)));
    }
}
