use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::company::{BranchId, CompanyId};
use crate::domain::product::ProductId;
use crate::domain::schedule::{DayWindow, HourWindow};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PreOrderId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuyOrderId(pub String);

/// Negotiation state of a pre-order. `Pending` is the only non-terminal
/// state: whichever trigger (provider response or timeout) lands first moves
/// the row to its terminal state, and late triggers are no-ops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreOrderStatus {
    Pending,
    Accepted,
    PartiallyAccepted,
    Rejected,
    Timeout,
    Exhausted,
}

impl PreOrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::PartiallyAccepted => "partially-accepted",
            Self::Rejected => "rejected",
            Self::Timeout => "timeout",
            Self::Exhausted => "exhausted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "partially-accepted" => Some(Self::PartiallyAccepted),
            "rejected" => Some(Self::Rejected),
            "timeout" => Some(Self::Timeout),
            "exhausted" => Some(Self::Exhausted),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// Pure status table for a provider response: `(accepted nonempty, rejected
/// nonempty)` decides the outcome. Both empty means nothing was acted upon
/// and the pre-order stays pending (`None`).
pub fn derive_response_status(
    accepted_nonempty: bool,
    rejected_nonempty: bool,
) -> Option<PreOrderStatus> {
    match (accepted_nonempty, rejected_nonempty) {
        (true, false) => Some(PreOrderStatus::Accepted),
        (true, true) => Some(PreOrderStatus::PartiallyAccepted),
        (false, true) => Some(PreOrderStatus::Rejected),
        (false, false) => None,
    }
}

/// Buyer-chosen policy for sourcing a substitute after a rejection. Values
/// outside the known set are preserved verbatim and select nothing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplacementCriterion {
    BestPriceSameUnit,
    SamePriceSameUnit,
    SameProductAnotherUnit,
    #[serde(untagged)]
    Other(String),
}

impl ReplacementCriterion {
    pub fn as_str(&self) -> &str {
        match self {
            Self::BestPriceSameUnit => "best-price-same-unit",
            Self::SamePriceSameUnit => "same-price-same-unit",
            Self::SameProductAnotherUnit => "same-product-another-unit",
            Self::Other(value) => value,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "best-price-same-unit" => Self::BestPriceSameUnit,
            "same-price-same-unit" => Self::SamePriceSameUnit,
            "same-product-another-unit" => Self::SameProductAnotherUnit,
            _ => Self::Other(value.trim().to_string()),
        }
    }
}

impl Default for ReplacementCriterion {
    fn default() -> Self {
        Self::BestPriceSameUnit
    }
}

/// The frozen search parameters a pre-order was created with, reused verbatim
/// when sourcing replacements. Immutable once saved; `with_overrides` is the
/// only sanctioned way to derive a variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreOrderCriteria {
    pub branch_id: Option<BranchId>,
    pub day_window: DayWindow,
    pub hour_window: HourWindow,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub base_measurement_unit: Option<String>,
    pub is_pick_up: bool,
    pub pick_up_lat: Option<f64>,
    pub pick_up_lng: Option<f64>,
    pub pick_up_radius_km: Option<f64>,
    pub replacement_criteria: ReplacementCriterion,
}

/// Partial override of a criteria snapshot, used by the replacement search to
/// pin the rejected product's identity without mutating the stored row.
#[derive(Clone, Debug, Default)]
pub struct CriteriaOverrides {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub base_measurement_unit: Option<String>,
}

impl PreOrderCriteria {
    pub fn with_overrides(&self, overrides: CriteriaOverrides) -> Self {
        let mut derived = self.clone();
        if let Some(name) = overrides.name {
            derived.name = Some(name);
        }
        if let Some(brand) = overrides.brand {
            derived.brand = Some(brand);
        }
        if overrides.base_measurement_unit.is_some() {
            derived.base_measurement_unit =
                self.base_measurement_unit.clone().or(overrides.base_measurement_unit);
        }
        derived
    }
}

/// One line of a buyer's cart before it is split per provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product_id: ProductId,
    pub provider_id: CompanyId,
    pub quantity: u32,
}

/// One buyer-to-one-provider negotiation instance. `instance` counts how many
/// times the logical cart line has been re-sourced; `response_deadline` is set
/// at creation and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreOrder {
    pub id: PreOrderId,
    pub sequence: i64,
    pub buyer_user_id: String,
    pub status: PreOrderStatus,
    pub instance: u32,
    pub response_deadline: DateTime<Utc>,
    pub client_company_id: CompanyId,
    pub provider_company_id: CompanyId,
    pub buy_order_id: Option<BuyOrderId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PreOrder {
    pub fn can_transition_to(&self, next: PreOrderStatus) -> bool {
        self.status == PreOrderStatus::Pending && next.is_terminal()
    }

    pub fn transition_to(&mut self, next: PreOrderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }
        Err(DomainError::InvalidPreOrderTransition { from: self.status, to: next })
    }
}

/// A pre-order line item carrying the requested quantity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreOrderProduct {
    pub pre_order_id: PreOrderId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// The firm order produced from a pre-order's accepted lines; one-to-one with
/// its originating pre-order. Its construction is owned by the surrounding
/// order layer, not this engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuyOrder {
    pub id: BuyOrderId,
    pub pre_order_id: PreOrderId,
    pub created_at: DateTime<Utc>,
}

/// A pre-order together with its owned criteria snapshot and line items, the
/// unit the store persists and loads atomically.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreOrderAggregate {
    pub pre_order: PreOrder,
    pub criteria: PreOrderCriteria,
    pub lines: Vec<PreOrderProduct>,
}

/// What woke the resolver up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseTrigger {
    ProviderResponse,
    Timeout,
}

impl ResponseTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProviderResponse => "provider-response",
            Self::Timeout => "timeout",
        }
    }
}
