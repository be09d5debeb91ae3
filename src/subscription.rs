//! Subscription status, the membership gate and billing redirects.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capabilities::{ApiError, ApiResult};
use crate::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Monthly,
    Annual,
    Other(String),
}

impl From<&str> for SubscriptionTier {
    fn from(value: &str) -> Self {
        match value {
            "monthly" => Self::Monthly,
            "annual" => Self::Annual,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPhase {
    Active,
    Cancelled,
    Expired,
    Trialing,
    Other(String),
}

impl From<&str> for SubscriptionPhase {
    fn from(value: &str) -> Self {
        match value {
            "active" => Self::Active,
            "cancelled" => Self::Cancelled,
            "expired" => Self::Expired,
            "trialing" => Self::Trialing,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatusResponse {
    pub has_active_subscription: bool,
    #[serde(default)]
    pub subscription_tier: Option<String>,
    #[serde(default)]
    pub subscription_status: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub has_active_subscription: bool,
    pub tier: Option<SubscriptionTier>,
    pub status: Option<SubscriptionPhase>,
    pub expires_at: Option<String>,
}

impl SubscriptionStatus {
    pub fn none() -> Self {
        Self::default()
    }
}

impl From<SubscriptionStatusResponse> for SubscriptionStatus {
    fn from(r: SubscriptionStatusResponse) -> Self {
        Self {
            has_active_subscription: r.has_active_subscription,
            tier: r.subscription_tier.as_deref().map(SubscriptionTier::from),
            status: r.subscription_status.as_deref().map(SubscriptionPhase::from),
            expires_at: r.expires_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StripeProduct {
    pub id: String,
    pub name: String,
    pub price_id: String,
    /// Minor currency units.
    pub amount: u64,
    pub currency: String,
    pub interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProductsResponse {
    #[serde(default)]
    pub products: Vec<StripeProduct>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub price_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    #[serde(default)]
    pub session_id: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalResponse {
    pub portal_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CancelResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Updated,
    /// The stored credentials are stale; the session must end.
    LogoutRequired,
    Failed(String),
}

pub const STATUS_CHECK_FAILED: &str = "Failed to check subscription status";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SubscriptionState {
    status: Option<SubscriptionStatus>,
    checking: bool,
    error: Option<String>,
    products: Vec<StripeProduct>,
    checkout_in_flight: bool,
    checkout_url: Option<String>,
    portal_url: Option<String>,
    cancelling: bool,
}

impl SubscriptionState {
    pub fn status(&self) -> Option<&SubscriptionStatus> {
        self.status.as_ref()
    }

    pub fn is_checking(&self) -> bool {
        self.checking
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn products(&self) -> &[StripeProduct] {
        &self.products
    }

    pub fn checkout_url(&self) -> Option<&str> {
        self.checkout_url.as_deref()
    }

    pub fn portal_url(&self) -> Option<&str> {
        self.portal_url.as_deref()
    }

    pub fn is_checkout_in_flight(&self) -> bool {
        self.checkout_in_flight
    }

    pub fn is_cancelling(&self) -> bool {
        self.cancelling
    }

    /// Shown only once the status is known and there is no active plan.
    pub fn should_show_membership_gate(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| !s.has_active_subscription)
    }

    /// Returns whether a status request should go out. Signed-out users
    /// have no subscription by definition.
    pub fn begin_check(&mut self, authenticated: bool) -> bool {
        self.error = None;
        if !authenticated {
            self.status = Some(SubscriptionStatus::none());
            self.checking = false;
            return false;
        }
        self.checking = true;
        true
    }

    pub fn apply_status(&mut self, result: ApiResult<SubscriptionStatusResponse>) -> StatusOutcome {
        self.checking = false;
        match result {
            Ok(response) => {
                let status = SubscriptionStatus::from(response);
                info!(active = status.has_active_subscription, "subscription status received");
                self.status = Some(status);
                StatusOutcome::Updated
            }
            Err(e) if e.is_unauthorized() => {
                warn!("subscription check rejected credentials");
                self.status = None;
                StatusOutcome::LogoutRequired
            }
            Err(e) if e.is_not_found() => {
                debug!("no subscription record");
                self.status = Some(SubscriptionStatus::none());
                StatusOutcome::Updated
            }
            Err(e) => {
                warn!(error = %e, "subscription check failed");
                self.status = None;
                self.error = Some(STATUS_CHECK_FAILED.to_string());
                StatusOutcome::Failed(STATUS_CHECK_FAILED.to_string())
            }
        }
    }

    pub fn apply_products(&mut self, result: ApiResult<ProductsResponse>) -> ApiResult<usize> {
        let response = result.map_err(|e| {
            warn!(error = %e, "failed to fetch products");
            e
        })?;
        self.products = response.products;
        Ok(self.products.len())
    }

    /// `Ok(None)` while another checkout is pending.
    pub fn begin_checkout(&mut self, price_id: &str) -> Result<Option<CheckoutRequest>, ValidationError> {
        let price_id = price_id.trim();
        if price_id.is_empty() {
            return Err(ValidationError::MissingPriceId);
        }
        if self.checkout_in_flight {
            return Ok(None);
        }
        self.checkout_in_flight = true;
        Ok(Some(CheckoutRequest {
            price_id: price_id.to_string(),
        }))
    }

    /// The checkout request never left the core.
    pub fn checkout_failed(&mut self) {
        self.checkout_in_flight = false;
    }

    pub fn apply_checkout(&mut self, result: ApiResult<CheckoutResponse>) -> ApiResult<()> {
        self.checkout_in_flight = false;
        let response = result.map_err(|e| {
            warn!(error = %e, "failed to create checkout session");
            e
        })?;
        debug!(session = response.session_id.as_str(), "checkout session created");
        self.checkout_url = Some(response.url);
        Ok(())
    }

    pub fn apply_portal(&mut self, result: ApiResult<PortalResponse>) -> ApiResult<()> {
        let response = result.map_err(|e| {
            warn!(error = %e, "failed to get billing portal");
            e
        })?;
        self.portal_url = Some(response.portal_url);
        Ok(())
    }

    pub fn begin_cancel(&mut self) -> bool {
        if self.cancelling {
            return false;
        }
        self.cancelling = true;
        true
    }

    pub fn apply_cancel(&mut self, result: ApiResult<CancelResponse>) -> ApiResult<String> {
        self.cancelling = false;
        let response = result.map_err(|e| {
            warn!(error = %e, "failed to cancel subscription");
            e
        })?;
        if let Some(status) = self.status.as_mut() {
            status.status = Some(SubscriptionPhase::Cancelled);
        }
        info!("subscription cancelled");
        Ok(response.message)
    }

    /// The shell has followed the pending redirect.
    pub fn redirect_handled(&mut self) -> bool {
        let had = self.checkout_url.is_some() || self.portal_url.is_some();
        self.checkout_url = None;
        self.portal_url = None;
        had
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active() -> SubscriptionStatusResponse {
        SubscriptionStatusResponse {
            has_active_subscription: true,
            subscription_tier: Some("annual".into()),
            subscription_status: Some("active".into()),
            expires_at: Some("2027-01-01T00:00:00Z".into()),
        }
    }

    #[test]
    fn test_gate_hidden_until_known() {
        let state = SubscriptionState::default();
        assert!(!state.should_show_membership_gate());
    }

    #[test]
    fn test_signed_out_shows_gate_without_request() {
        let mut state = SubscriptionState::default();
        assert!(!state.begin_check(false));
        assert!(state.should_show_membership_gate());
    }

    #[test]
    fn test_active_hides_gate() {
        let mut state = SubscriptionState::default();
        assert!(state.begin_check(true));
        assert_eq!(state.apply_status(Ok(active())), StatusOutcome::Updated);
        assert!(!state.should_show_membership_gate());
        let status = state.status().unwrap();
        assert_eq!(status.tier, Some(SubscriptionTier::Annual));
        assert_eq!(status.status, Some(SubscriptionPhase::Active));
    }

    #[test]
    fn test_not_found_means_no_subscription() {
        let mut state = SubscriptionState::default();
        state.begin_check(true);
        assert_eq!(state.apply_status(Err(ApiError::NotFound)), StatusOutcome::Updated);
        assert!(state.should_show_membership_gate());
    }

    #[test]
    fn test_unauthorized_requires_logout() {
        let mut state = SubscriptionState::default();
        state.begin_check(true);
        assert_eq!(state.apply_status(Err(ApiError::Unauthorized)), StatusOutcome::LogoutRequired);
        assert!(state.status().is_none());
    }

    #[test]
    fn test_other_errors_hide_gate() {
        let mut state = SubscriptionState::default();
        state.begin_check(true);
        let outcome = state.apply_status(Err(ApiError::Server(502)));
        assert_eq!(outcome, StatusOutcome::Failed(STATUS_CHECK_FAILED.into()));
        assert!(!state.should_show_membership_gate());
        assert_eq!(state.error(), Some(STATUS_CHECK_FAILED));
    }

    #[test]
    fn test_unknown_wire_values_kept() {
        let json = r#"{"hasActiveSubscription": true, "subscriptionTier": "lifetime", "subscriptionStatus": "past_due"}"#;
        let parsed: SubscriptionStatusResponse = serde_json::from_str(json).unwrap();
        let status = SubscriptionStatus::from(parsed);
        assert_eq!(status.tier, Some(SubscriptionTier::Other("lifetime".into())));
        assert_eq!(status.status, Some(SubscriptionPhase::Other("past_due".into())));
    }

    #[test]
    fn test_checkout_single_flight() {
        let mut state = SubscriptionState::default();
        assert_eq!(state.begin_checkout("  "), Err(ValidationError::MissingPriceId));
        let request = state.begin_checkout("price_123").unwrap().unwrap();
        assert_eq!(serde_json::to_string(&request).unwrap(), r#"{"priceId":"price_123"}"#);
        assert_eq!(state.begin_checkout("price_123"), Ok(None));

        state
            .apply_checkout(Ok(CheckoutResponse {
                session_id: "cs_1".into(),
                url: "https://pay.example/cs_1".into(),
            }))
            .unwrap();
        assert_eq!(state.checkout_url(), Some("https://pay.example/cs_1"));
        assert!(!state.is_checkout_in_flight());
        assert!(state.redirect_handled());
        assert!(state.checkout_url().is_none());
    }

    #[test]
    fn test_checkout_failed_allows_another_attempt() {
        let mut state = SubscriptionState::default();
        state.begin_checkout("price_123").unwrap().unwrap();
        state.checkout_failed();
        assert!(!state.is_checkout_in_flight());
        assert!(state.checkout_url().is_none());
        assert!(state.begin_checkout("price_123").unwrap().is_some());
    }

    #[test]
    fn test_portal_wire_is_snake_case() {
        let parsed: PortalResponse = serde_json::from_str(r#"{"portal_url": "https://portal"}"#).unwrap();
        let mut state = SubscriptionState::default();
        state.apply_portal(Ok(parsed)).unwrap();
        assert_eq!(state.portal_url(), Some("https://portal"));
    }

    #[test]
    fn test_cancel_marks_cancelled() {
        let mut state = SubscriptionState::default();
        state.begin_check(true);
        state.apply_status(Ok(active()));
        assert!(state.begin_cancel());
        assert!(!state.begin_cancel());
        state
            .apply_cancel(Ok(CancelResponse {
                status: "ok".into(),
                message: "Subscription cancelled".into(),
            }))
            .unwrap();
        assert_eq!(state.status().unwrap().status, Some(SubscriptionPhase::Cancelled));
        assert!(!state.is_cancelling());
    }

    #[test]
    fn test_products() {
        let json = r#"{"products": [{"id": "prod_1", "name": "Monthly", "priceId": "price_m", "amount": 999, "currency": "usd", "interval": "month"}]}"#;
        let parsed: ProductsResponse = serde_json::from_str(json).unwrap();
        let mut state = SubscriptionState::default();
        assert_eq!(state.apply_products(Ok(parsed)), Ok(1));
        assert_eq!(state.products()[0].price_id, "price_m");
    }
}
