use std::sync::Arc;

use abasto_core::domain::company::{Company, CompanyId};
use abasto_core::domain::preorder::PreOrderCriteria;
use abasto_core::domain::unit::normalize_unit;
use abasto_core::search::availability::{
    match_listings, PickUpQuery, ProductCandidate, SearchCriteria,
};
use abasto_db::repositories::{CompanyRepository, ProductRepository, UnitRepository};

use crate::errors::EngineError;

/// Base unit assumed when the buyer's criteria carry none.
const DEFAULT_BASE_UNIT: &str = "gramos";

/// One ranked result, optionally expanded with the selling company.
#[derive(Clone, Debug)]
pub struct SearchHit {
    pub candidate: ProductCandidate,
    pub company: Option<Company>,
}

#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub count: usize,
    pub hits: Vec<SearchHit>,
}

/// Availability search over provider listings: geographic coverage, schedule
/// overlap, text filters and price-per-base-unit ranking.
pub struct SearchService {
    companies: Arc<dyn CompanyRepository>,
    products: Arc<dyn ProductRepository>,
    units: Arc<dyn UnitRepository>,
}

impl SearchService {
    pub fn new(
        companies: Arc<dyn CompanyRepository>,
        products: Arc<dyn ProductRepository>,
        units: Arc<dyn UnitRepository>,
    ) -> Self {
        Self { companies, products, units }
    }

    /// Run the search for `company`, excluding its own listings.
    /// `include_company` expands each hit with the selling company row.
    pub async fn search_products(
        &self,
        company: &CompanyId,
        criteria: &PreOrderCriteria,
        include_company: bool,
    ) -> Result<SearchOutcome, EngineError> {
        let candidates = self.candidates(company, criteria).await?;

        let mut hits = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let seller = if include_company {
                self.companies.find_by_id(&candidate.company_id).await?
            } else {
                None
            };
            hits.push(SearchHit { candidate, company: seller });
        }

        tracing::debug!(
            event_name = "negotiation.search.completed",
            company_id = %company.0,
            hit_count = hits.len(),
            "availability search completed"
        );
        Ok(SearchOutcome { count: hits.len(), hits })
    }

    /// Ranked candidates without company expansion. The replacement selector
    /// feeds these straight into substitute selection.
    pub(crate) async fn candidates(
        &self,
        company: &CompanyId,
        criteria: &PreOrderCriteria,
    ) -> Result<Vec<ProductCandidate>, EngineError> {
        let search_criteria = self.build_criteria(criteria).await?;
        let listings = self.products.listings_excluding(company).await?;
        Ok(match_listings(company, &listings, &search_criteria))
    }

    async fn build_criteria(
        &self,
        criteria: &PreOrderCriteria,
    ) -> Result<SearchCriteria, EngineError> {
        let branch_location = match &criteria.branch_id {
            Some(branch_id) => {
                let branch = self
                    .companies
                    .find_branch(branch_id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("branch", &branch_id.0))?;
                Some(branch.address)
            }
            None => None,
        };

        let pick_up = if criteria.is_pick_up {
            match (criteria.pick_up_lat, criteria.pick_up_lng, criteria.pick_up_radius_km) {
                (Some(latitude), Some(longitude), Some(radius_km)) => {
                    Some(PickUpQuery { latitude, longitude, radius_km })
                }
                _ => {
                    tracing::warn!(
                        event_name = "negotiation.search.pick_up_coordinates_missing",
                        "pick-up requested without coordinates, skipping pick-up path"
                    );
                    None
                }
            }
        } else {
            None
        };

        let raw_unit =
            criteria.base_measurement_unit.clone().unwrap_or_else(|| DEFAULT_BASE_UNIT.to_string());
        let units = self.units.list_all().await?;
        let base_measurement_unit = normalize_unit(&raw_unit, &units).unwrap_or(raw_unit);

        Ok(SearchCriteria {
            branch_location,
            day_window: criteria.day_window,
            hour_window: criteria.hour_window,
            name: criteria.name.clone(),
            brand: criteria.brand.clone(),
            base_measurement_unit,
            pick_up,
        })
    }
}
