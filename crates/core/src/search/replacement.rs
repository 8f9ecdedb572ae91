//! Substitute ranking for rejected line items.
//!
//! Works over an availability result that is already sorted cheapest-first:
//! the first candidate passing the buyer's replacement criterion wins.

use crate::domain::preorder::{CartLineItem, ReplacementCriterion};
use crate::domain::product::Product;
use crate::search::availability::ProductCandidate;
use crate::text;

/// Picks the single best substitute for a rejected product among ordered
/// candidates. The rejected product itself never qualifies; the original
/// quantity is carried over; an unrecognized criterion selects nothing.
pub fn select_substitute(
    rejected: &Product,
    quantity: u32,
    criterion: &ReplacementCriterion,
    candidates: &[ProductCandidate],
) -> Option<CartLineItem> {
    let rejected_unit = text::fold(&rejected.measurement_unit);

    candidates
        .iter()
        .filter(|candidate| candidate.product.id != rejected.id)
        .find(|candidate| {
            let candidate_unit = text::fold(&candidate.product.measurement_unit);
            match criterion {
                ReplacementCriterion::BestPriceSameUnit => true,
                ReplacementCriterion::SamePriceSameUnit => {
                    candidate_unit == rejected_unit && candidate.product.price <= rejected.price
                }
                ReplacementCriterion::SameProductAnotherUnit => candidate_unit != rejected_unit,
                ReplacementCriterion::Other(_) => false,
            }
        })
        .map(|candidate| CartLineItem {
            product_id: candidate.product.id.clone(),
            provider_id: candidate.company_id.clone(),
            quantity,
        })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::domain::company::CompanyId;
    use crate::domain::preorder::ReplacementCriterion;
    use crate::domain::product::{Product, ProductId};
    use crate::search::availability::ProductCandidate;

    use super::select_substitute;

    fn product(id: &str, company: &str, unit: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId(id.to_string()),
            gtin: format!("779{id}"),
            name: "Harina 000".to_string(),
            brand: "Molinos".to_string(),
            measurement_unit: unit.to_string(),
            conversion_factor: 1.0,
            price: Decimal::new(price_cents, 2),
            company_id: CompanyId(company.to_string()),
            net_content: None,
            family: None,
            segment: None,
        }
    }

    fn candidate(id: &str, company: &str, unit: &str, price_cents: i64) -> ProductCandidate {
        let product = product(id, company, unit, price_cents);
        let company_id = product.company_id.clone();
        ProductCandidate {
            product,
            company_id,
            is_pickup: false,
            price_per_base_unit: price_cents as f64 / 100.0,
        }
    }

    #[test]
    fn best_price_takes_the_first_candidate_that_is_not_the_rejected_product() {
        let rejected = product("p-rej", "c-orig", "kg", 300);
        // Ordered cheapest-first; the cheapest IS the rejected product.
        let candidates = vec![
            candidate("p-rej", "c-orig", "kg", 200),
            candidate("p-alt", "c-alt", "kg", 250),
        ];

        let pick = select_substitute(
            &rejected,
            7,
            &ReplacementCriterion::BestPriceSameUnit,
            &candidates,
        )
        .expect("a substitute exists");
        assert_eq!(pick.product_id.0, "p-alt");
        assert_eq!(pick.provider_id.0, "c-alt");
        // P5: quantity is carried over, not re-derived.
        assert_eq!(pick.quantity, 7);
    }

    #[test]
    fn same_price_same_unit_requires_unit_match_and_price_cap() {
        let rejected = product("p-rej", "c-orig", "kg", 300);
        let candidates = vec![
            candidate("p-cheaper-other-unit", "c-1", "litro", 100),
            candidate("p-dearer-same-unit", "c-2", "kg", 400),
            candidate("p-ok", "c-3", "KG", 300),
        ];

        let pick = select_substitute(
            &rejected,
            2,
            &ReplacementCriterion::SamePriceSameUnit,
            &candidates,
        )
        .expect("a qualifying candidate exists");
        assert_eq!(pick.product_id.0, "p-ok");
    }

    #[test]
    fn same_product_another_unit_requires_a_different_unit() {
        let rejected = product("p-rej", "c-orig", "kg", 300);
        let candidates = vec![
            candidate("p-same-unit", "c-1", "KG", 100),
            candidate("p-other-unit", "c-2", "gramos", 150),
        ];

        let pick = select_substitute(
            &rejected,
            1,
            &ReplacementCriterion::SameProductAnotherUnit,
            &candidates,
        )
        .expect("a qualifying candidate exists");
        assert_eq!(pick.product_id.0, "p-other-unit");
    }

    #[test]
    fn unknown_criterion_selects_nothing() {
        let rejected = product("p-rej", "c-orig", "kg", 300);
        let candidates = vec![candidate("p-alt", "c-1", "kg", 100)];
        let pick = select_substitute(
            &rejected,
            1,
            &ReplacementCriterion::Other("mystery".to_string()),
            &candidates,
        );
        assert!(pick.is_none());
    }

    #[test]
    fn no_candidates_yields_none() {
        let rejected = product("p-rej", "c-orig", "kg", 300);
        assert!(select_substitute(
            &rejected,
            1,
            &ReplacementCriterion::BestPriceSameUnit,
            &[]
        )
        .is_none());
    }
}
