use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use abasto_core::domain::company::{Branch, BranchId, Company, CompanyId};
use abasto_core::domain::job::{JobId, ScheduledJob};
use abasto_core::domain::preorder::{PreOrderAggregate, PreOrderId, PreOrderStatus};
use abasto_core::domain::product::{Product, ProductId};
use abasto_core::domain::unit::Unit;
use abasto_core::search::availability::ProviderListing;

pub mod company;
pub mod jobs;
pub mod memory;
pub mod preorder;
pub mod product;
pub mod unit;

pub use company::SqlCompanyRepository;
pub use jobs::SqlJobQueue;
pub use memory::{
    InMemoryCompanyRepository, InMemoryJobQueue, InMemoryPreOrderRepository,
    InMemoryProductRepository, InMemoryUnitRepository,
};
pub use preorder::SqlPreOrderRepository;
pub use product::SqlProductRepository;
pub use unit::SqlUnitRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError>;
    async fn find_by_user(&self, user_id: &str) -> Result<Option<Company>, RepositoryError>;
    async fn find_branch(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError>;
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
    async fn save(&self, product: Product) -> Result<(), RepositoryError>;
    /// Every candidate product not owned by `excluded`, each carrying its
    /// owning company's drop zones and pick-up points.
    async fn listings_excluding(
        &self,
        excluded: &CompanyId,
    ) -> Result<Vec<ProviderListing>, RepositoryError>;
}

#[async_trait]
pub trait UnitRepository: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Unit>, RepositoryError>;
    async fn save(&self, unit: Unit) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait PreOrderRepository: Send + Sync {
    async fn next_sequence(&self) -> Result<i64, RepositoryError>;
    async fn create(&self, aggregate: &PreOrderAggregate) -> Result<(), RepositoryError>;
    async fn find_aggregate(
        &self,
        id: &PreOrderId,
    ) -> Result<Option<PreOrderAggregate>, RepositoryError>;
    /// Compare-and-swap on status: applies `status` only while the row is
    /// still `pending` and reports whether the swap happened. Late triggers
    /// see `false` and must treat the call as a no-op.
    async fn set_status_if_pending(
        &self,
        id: &PreOrderId,
        status: PreOrderStatus,
    ) -> Result<bool, RepositoryError>;
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: ScheduledJob) -> Result<(), RepositoryError>;
    /// Pending jobs whose `run_at` has passed, oldest first.
    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, RepositoryError>;
    async fn complete(&self, id: &JobId) -> Result<(), RepositoryError>;
    /// Burns one attempt; the job fails terminally once the budget is spent.
    async fn fail(&self, id: &JobId) -> Result<(), RepositoryError>;
    async fn cancel_for_pre_order(&self, pre_order_id: &PreOrderId)
        -> Result<(), RepositoryError>;
}

pub(crate) fn parse_u32(column: &str, value: i64) -> Result<u32, RepositoryError> {
    u32::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected non-negative u32): {value}"
        ))
    })
}

pub(crate) fn parse_u8(column: &str, value: i64) -> Result<u8, RepositoryError> {
    u8::try_from(value).map_err(|_| {
        RepositoryError::Decode(format!(
            "invalid value for `{column}` (expected 0..=255): {value}"
        ))
    })
}

pub(crate) fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}

pub(crate) fn parse_decimal(
    column: &str,
    value: String,
) -> Result<rust_decimal::Decimal, RepositoryError> {
    value.parse().map_err(|error| {
        RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})"))
    })
}
