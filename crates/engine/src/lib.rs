//! Negotiation engine: cart fan-out, response resolution, availability
//! search, replacement sourcing and the delayed-job worker, wired over the
//! repository traits in `abasto-db`.

use std::sync::Arc;
use std::time::Duration;

use abasto_core::config::AppConfig;
use abasto_db::repositories::{
    SqlCompanyRepository, SqlJobQueue, SqlPreOrderRepository, SqlProductRepository,
    SqlUnitRepository,
};
use abasto_db::DbPool;

pub mod errors;
pub mod notify;
pub mod orchestrator;
pub mod replacement;
pub mod resolver;
pub mod search;
pub mod worker;

pub use errors::EngineError;
pub use notify::{BuyOrderPendingEvent, Notifier, PreOrderCreatedEvent, TracingNotifier};
pub use orchestrator::{PreOrderOrchestrator, ProviderGroupOutcome};
pub use replacement::ReplacementSelector;
pub use resolver::ResponseResolver;
pub use search::{SearchHit, SearchOutcome, SearchService};
pub use worker::{JobWorker, TickSummary};

/// Fully wired negotiation services over the SQL repositories.
pub struct Engine {
    pub orchestrator: Arc<PreOrderOrchestrator>,
    pub resolver: Arc<ResponseResolver>,
    pub search: Arc<SearchService>,
    pub worker: JobWorker,
}

/// Build the engine from a connected pool, logging through [`TracingNotifier`].
pub fn build_engine(pool: DbPool, config: &AppConfig) -> Engine {
    let companies = Arc::new(SqlCompanyRepository::new(pool.clone()));
    let products = Arc::new(SqlProductRepository::new(pool.clone()));
    let units = Arc::new(SqlUnitRepository::new(pool.clone()));
    let pre_orders = Arc::new(SqlPreOrderRepository::new(pool.clone()));
    let jobs = Arc::new(SqlJobQueue::new(pool));
    let notifier = Arc::new(TracingNotifier);

    let search =
        Arc::new(SearchService::new(companies.clone(), products.clone(), units.clone()));
    let selector = Arc::new(ReplacementSelector::new(search.clone(), products, units));
    let orchestrator = Arc::new(PreOrderOrchestrator::new(
        companies,
        pre_orders.clone(),
        jobs.clone(),
        notifier.clone(),
        config.negotiation.clone(),
    ));
    let resolver = Arc::new(ResponseResolver::new(
        pre_orders.clone(),
        jobs.clone(),
        orchestrator.clone(),
        selector,
        notifier,
        config.negotiation.clone(),
    ));
    let worker = JobWorker::new(
        jobs,
        pre_orders,
        resolver.clone(),
        Duration::from_secs(config.negotiation.worker_poll_secs),
    );

    Engine { orchestrator, resolver, search, worker }
}
