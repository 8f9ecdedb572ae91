pub mod config;
pub mod domain;
pub mod errors;
pub mod geo;
pub mod pricing;
pub mod search;

mod text;

pub use chrono;

pub use domain::company::{Branch, BranchId, Company, CompanyId, DropZone, PickUpPoint};
pub use domain::job::{JobId, JobKind, JobState, ScheduledJob};
pub use domain::preorder::{
    derive_response_status, BuyOrder, BuyOrderId, CartLineItem, CriteriaOverrides, PreOrder,
    PreOrderAggregate, PreOrderCriteria, PreOrderId, PreOrderProduct, PreOrderStatus,
    ReplacementCriterion, ResponseTrigger,
};
pub use domain::product::{Product, ProductId};
pub use domain::schedule::{DayWindow, HourWindow, ScheduleWindow, Weekday};
pub use domain::unit::{normalize_unit, Unit};
pub use errors::DomainError;
pub use geo::{GeoPoint, GeoPolygon};
pub use pricing::{classify_unit, price_per_base_unit, UnitFamily};
pub use search::availability::{
    match_listings, PickUpQuery, ProductCandidate, ProviderListing, SearchCriteria,
};
pub use search::replacement::select_substitute;
