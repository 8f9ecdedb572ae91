//! In-memory repository implementations for tests and local experiments.
//! They mirror the SQL implementations' observable behavior, including the
//! pending-only status swap and the job attempt budget.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use abasto_core::domain::company::{Branch, BranchId, Company, CompanyId, DropZone, PickUpPoint};
use abasto_core::domain::job::{JobId, JobState, ScheduledJob};
use abasto_core::domain::preorder::{PreOrderAggregate, PreOrderId, PreOrderStatus};
use abasto_core::domain::product::{Product, ProductId};
use abasto_core::domain::unit::Unit;
use abasto_core::search::availability::ProviderListing;

use super::{
    CompanyRepository, JobQueue, PreOrderRepository, ProductRepository, RepositoryError,
    UnitRepository,
};

#[derive(Default)]
pub struct InMemoryCompanyRepository {
    companies: RwLock<HashMap<String, Company>>,
    branches: RwLock<HashMap<String, Branch>>,
}

impl InMemoryCompanyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_company(&self, company: Company) {
        self.companies.write().await.insert(company.id.0.clone(), company);
    }

    pub async fn insert_branch(&self, branch: Branch) {
        self.branches.write().await.insert(branch.id.0.clone(), branch);
    }
}

#[async_trait::async_trait]
impl CompanyRepository for InMemoryCompanyRepository {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self.companies.read().await.get(&id.0).cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<Company>, RepositoryError> {
        Ok(self
            .companies
            .read()
            .await
            .values()
            .find(|company| company.owner_user_id == user_id)
            .cloned())
    }

    async fn find_branch(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError> {
        Ok(self.branches.read().await.get(&id.0).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryProductRepository {
    products: RwLock<HashMap<String, Product>>,
    drop_zones: RwLock<HashMap<String, Vec<DropZone>>>,
    pick_up_points: RwLock<HashMap<String, Vec<PickUpPoint>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_drop_zones(&self, company_id: &CompanyId, zones: Vec<DropZone>) {
        self.drop_zones.write().await.insert(company_id.0.clone(), zones);
    }

    pub async fn set_pick_up_points(&self, company_id: &CompanyId, points: Vec<PickUpPoint>) {
        self.pick_up_points.write().await.insert(company_id.0.clone(), points);
    }
}

#[async_trait::async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id.0).cloned())
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        self.products.write().await.insert(product.id.0.clone(), product);
        Ok(())
    }

    async fn listings_excluding(
        &self,
        excluded: &CompanyId,
    ) -> Result<Vec<ProviderListing>, RepositoryError> {
        let drop_zones = self.drop_zones.read().await;
        let pick_up_points = self.pick_up_points.read().await;
        let mut listings: Vec<ProviderListing> = self
            .products
            .read()
            .await
            .values()
            .filter(|product| product.company_id != *excluded)
            .map(|product| ProviderListing {
                drop_zones: drop_zones.get(&product.company_id.0).cloned().unwrap_or_default(),
                pick_up_points: pick_up_points
                    .get(&product.company_id.0)
                    .cloned()
                    .unwrap_or_default(),
                product: product.clone(),
            })
            .collect();
        listings.sort_by(|a, b| a.product.id.0.cmp(&b.product.id.0));
        Ok(listings)
    }
}

#[derive(Default)]
pub struct InMemoryUnitRepository {
    units: RwLock<HashMap<String, Unit>>,
}

impl InMemoryUnitRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UnitRepository for InMemoryUnitRepository {
    async fn list_all(&self) -> Result<Vec<Unit>, RepositoryError> {
        let mut units: Vec<Unit> = self.units.read().await.values().cloned().collect();
        units.sort_by(|a, b| a.standard_name.cmp(&b.standard_name));
        Ok(units)
    }

    async fn save(&self, unit: Unit) -> Result<(), RepositoryError> {
        self.units.write().await.insert(unit.standard_name.clone(), unit);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryPreOrderRepository {
    aggregates: RwLock<HashMap<String, PreOrderAggregate>>,
}

impl InMemoryPreOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<PreOrderAggregate> {
        let mut aggregates: Vec<PreOrderAggregate> =
            self.aggregates.read().await.values().cloned().collect();
        aggregates.sort_by_key(|aggregate| aggregate.pre_order.sequence);
        aggregates
    }
}

#[async_trait::async_trait]
impl PreOrderRepository for InMemoryPreOrderRepository {
    async fn next_sequence(&self) -> Result<i64, RepositoryError> {
        let highest = self
            .aggregates
            .read()
            .await
            .values()
            .map(|aggregate| aggregate.pre_order.sequence)
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    async fn create(&self, aggregate: &PreOrderAggregate) -> Result<(), RepositoryError> {
        self.aggregates
            .write()
            .await
            .insert(aggregate.pre_order.id.0.clone(), aggregate.clone());
        Ok(())
    }

    async fn find_aggregate(
        &self,
        id: &PreOrderId,
    ) -> Result<Option<PreOrderAggregate>, RepositoryError> {
        Ok(self.aggregates.read().await.get(&id.0).cloned())
    }

    async fn set_status_if_pending(
        &self,
        id: &PreOrderId,
        status: PreOrderStatus,
    ) -> Result<bool, RepositoryError> {
        let mut aggregates = self.aggregates.write().await;
        match aggregates.get_mut(&id.0) {
            Some(aggregate) if aggregate.pre_order.status == PreOrderStatus::Pending => {
                aggregate.pre_order.status = status;
                aggregate.pre_order.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct InMemoryJobQueue {
    jobs: RwLock<Vec<ScheduledJob>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<ScheduledJob> {
        self.jobs.read().await.clone()
    }
}

#[async_trait::async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: ScheduledJob) -> Result<(), RepositoryError> {
        self.jobs.write().await.push(job);
        Ok(())
    }

    async fn due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, RepositoryError> {
        let mut due: Vec<ScheduledJob> = self
            .jobs
            .read()
            .await
            .iter()
            .filter(|job| job.state == JobState::Pending && job.run_at <= now)
            .cloned()
            .collect();
        due.sort_by_key(|job| (job.run_at, job.created_at));
        Ok(due)
    }

    async fn complete(&self, id: &JobId) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.iter_mut().find(|job| job.id == *id) {
            job.state = JobState::Done;
        }
        Ok(())
    }

    async fn fail(&self, id: &JobId) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs
            .iter_mut()
            .find(|job| job.id == *id && job.state == JobState::Pending)
        {
            job.attempts_left = job.attempts_left.saturating_sub(1);
            if job.attempts_left == 0 {
                job.state = JobState::Failed;
            }
        }
        Ok(())
    }

    async fn cancel_for_pre_order(
        &self,
        pre_order_id: &PreOrderId,
    ) -> Result<(), RepositoryError> {
        let mut jobs = self.jobs.write().await;
        for job in jobs
            .iter_mut()
            .filter(|job| job.pre_order_id == *pre_order_id && job.state == JobState::Pending)
        {
            job.state = JobState::Done;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use abasto_core::domain::job::{JobId, JobKind, JobState, ScheduledJob};
    use abasto_core::domain::preorder::PreOrderId;

    use super::InMemoryJobQueue;
    use crate::repositories::JobQueue;

    fn job(id: &str, run_at: chrono::DateTime<Utc>) -> ScheduledJob {
        ScheduledJob {
            id: JobId(id.to_string()),
            kind: JobKind::Timeout,
            pre_order_id: PreOrderId("po-1".to_string()),
            instance: 1,
            run_at,
            attempts_left: 1,
            state: JobState::Pending,
            created_at: run_at,
        }
    }

    #[tokio::test]
    async fn memory_queue_matches_sql_queue_semantics() {
        let queue = InMemoryJobQueue::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 4, 12, 0, 0).unwrap();

        queue.enqueue(job("j-future", now + Duration::hours(1))).await.unwrap();
        queue.enqueue(job("j-ripe", now - Duration::minutes(1))).await.unwrap();

        let due = queue.due(now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id.0, "j-ripe");

        queue.fail(&JobId("j-ripe".to_string())).await.unwrap();
        assert!(queue.due(now).await.unwrap().is_empty());

        queue.cancel_for_pre_order(&PreOrderId("po-1".to_string())).await.unwrap();
        let future_job =
            queue.all().await.into_iter().find(|job| job.id.0 == "j-future").unwrap();
        assert_eq!(future_job.state, JobState::Done);
    }
}
