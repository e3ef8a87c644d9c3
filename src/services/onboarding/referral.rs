//! Debounced referral-code lookup. Advisory only: the result is shown to
//! the user but never blocks registration.

use std::time::Duration;
use tracing::{debug, warn};

use super::OnboardingBackend;
use crate::api::models::Referrer;
use crate::config::ReferralConfig;
use crate::utils::latest::{LatestRequest, Ticket};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ReferralStatus {
    /// Untouched, too short, or the lookup could not complete.
    #[default]
    Unchecked,
    Valid(Referrer),
    Invalid,
}

#[derive(Debug, Clone)]
pub struct ReferralValidator {
    min_length: usize,
    debounce: Duration,
    latest: LatestRequest,
}

impl ReferralValidator {
    pub fn new(config: &ReferralConfig) -> Self {
        Self {
            min_length: config.min_length,
            debounce: Duration::from_millis(config.debounce_ms),
            latest: LatestRequest::new(),
        }
    }

    pub fn is_checkable(&self, code: &str) -> bool {
        code.trim().chars().count() >= self.min_length
    }

    /// Supersede any lookup in flight.
    pub fn begin(&self) -> Ticket {
        self.latest.issue()
    }

    pub fn is_latest(&self, ticket: Ticket) -> bool {
        self.latest.is_current(ticket)
    }

    /// Wait out the debounce window, then look the code up. `None` means a
    /// newer edit superseded this lookup and its result must be ignored.
    pub async fn run<B>(&self, backend: &B, ticket: Ticket, code: &str) -> Option<ReferralStatus>
    where
        B: OnboardingBackend + ?Sized,
    {
        let code = code.trim();
        if !self.is_checkable(code) {
            return self.is_latest(ticket).then_some(ReferralStatus::Unchecked);
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_latest(ticket) {
            return None;
        }

        debug!("Validating referral code");
        let status = match backend.validate_referral(code).await {
            Ok(check) if check.valid => ReferralStatus::Valid(check.referrer.unwrap_or_default()),
            Ok(_) => ReferralStatus::Invalid,
            Err(e) if e.is_rejection() => ReferralStatus::Invalid,
            Err(e) => {
                warn!("Referral lookup failed: {}", e);
                ReferralStatus::Unchecked
            }
        };

        self.is_latest(ticket).then_some(status)
    }
}
