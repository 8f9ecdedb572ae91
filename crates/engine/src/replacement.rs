use std::sync::Arc;

use abasto_core::domain::company::CompanyId;
use abasto_core::domain::preorder::{CartLineItem, CriteriaOverrides, PreOrderCriteria};
use abasto_core::domain::product::ProductId;
use abasto_core::domain::unit::normalize_unit;
use abasto_core::search::replacement::select_substitute;
use abasto_db::repositories::{ProductRepository, UnitRepository};

use crate::errors::EngineError;
use crate::search::SearchService;

/// Finds a substitute cart line for a rejected pre-order line by re-running
/// the availability search with the rejected product's identity pinned.
pub struct ReplacementSelector {
    search: Arc<SearchService>,
    products: Arc<dyn ProductRepository>,
    units: Arc<dyn UnitRepository>,
}

impl ReplacementSelector {
    pub fn new(
        search: Arc<SearchService>,
        products: Arc<dyn ProductRepository>,
        units: Arc<dyn UnitRepository>,
    ) -> Self {
        Self { search, products, units }
    }

    /// The best-ranked substitute for the rejected product, or `None` when no
    /// candidate satisfies the pre-order's replacement criterion.
    pub async fn find_best_substitute(
        &self,
        client_company_id: &CompanyId,
        rejected_product_id: &ProductId,
        quantity: u32,
        criteria: &PreOrderCriteria,
    ) -> Result<Option<CartLineItem>, EngineError> {
        let rejected = self
            .products
            .find_by_id(rejected_product_id)
            .await?
            .ok_or_else(|| EngineError::not_found("product", &rejected_product_id.0))?;

        let units = self.units.list_all().await?;
        let base_unit = normalize_unit(&rejected.measurement_unit, &units)
            .unwrap_or_else(|| rejected.measurement_unit.clone());

        // The stored snapshot's base unit wins; the rejected product only
        // fills the gaps.
        let derived = criteria.with_overrides(CriteriaOverrides {
            name: Some(rejected.name.clone()),
            brand: Some(rejected.brand.clone()),
            base_measurement_unit: Some(base_unit),
        });

        let candidates = self.search.candidates(client_company_id, &derived).await?;
        let substitute = select_substitute(
            &rejected,
            quantity,
            &criteria.replacement_criteria,
            &candidates,
        );

        if let Some(line) = &substitute {
            tracing::info!(
                event_name = "negotiation.replacement.selected",
                rejected_product_id = %rejected_product_id.0,
                substitute_product_id = %line.product_id.0,
                provider_company_id = %line.provider_id.0,
                "substitute selected"
            );
        } else {
            tracing::info!(
                event_name = "negotiation.replacement.none_available",
                rejected_product_id = %rejected_product_id.0,
                "no substitute satisfies the replacement criterion"
            );
        }
        Ok(substitute)
    }
}
