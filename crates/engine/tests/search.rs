//! Availability search service: branch resolution, unit canonicalization and
//! company expansion over the in-memory repositories.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use abasto_core::domain::company::{Branch, BranchId, Company, CompanyId, DropZone, PickUpPoint};
use abasto_core::domain::preorder::{PreOrderCriteria, ReplacementCriterion};
use abasto_core::domain::product::{Product, ProductId};
use abasto_core::domain::schedule::{DayWindow, HourWindow, ScheduleWindow, Weekday};
use abasto_core::domain::unit::Unit;
use abasto_core::geo::{GeoPoint, GeoPolygon};
use abasto_db::repositories::{
    InMemoryCompanyRepository, InMemoryProductRepository, InMemoryUnitRepository,
    ProductRepository, UnitRepository,
};
use abasto_engine::{EngineError, SearchService};

fn product(id: &str, company: &str, unit: &str, factor: f64, price_cents: i64) -> Product {
    Product {
        id: ProductId(id.to_string()),
        gtin: format!("779{id}"),
        name: "Azúcar común".to_string(),
        brand: "Ledesma".to_string(),
        measurement_unit: unit.to_string(),
        conversion_factor: factor,
        price: Decimal::new(price_cents, 2),
        company_id: CompanyId(company.to_string()),
        net_content: None,
        family: None,
        segment: None,
    }
}

fn monday_zone(id: &str) -> DropZone {
    DropZone {
        id: id.to_string(),
        zone: GeoPolygon::new(vec![
            GeoPoint::new(-35.0, -59.0),
            GeoPoint::new(-35.0, -58.0),
            GeoPoint::new(-34.0, -58.0),
            GeoPoint::new(-34.0, -59.0),
        ]),
        schedules: vec![ScheduleWindow { weekday: Weekday::Monday, hour_start: 8, hour_end: 18 }],
    }
}

fn criteria(branch: Option<&str>) -> PreOrderCriteria {
    let start = Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap();
    PreOrderCriteria {
        branch_id: branch.map(|id| BranchId(id.to_string())),
        day_window: DayWindow { start, end: start },
        hour_window: HourWindow { start: 9, end: 12 },
        name: None,
        brand: None,
        base_measurement_unit: Some("kg".to_string()),
        is_pick_up: false,
        pick_up_lat: None,
        pick_up_lng: None,
        pick_up_radius_km: None,
        replacement_criteria: ReplacementCriterion::BestPriceSameUnit,
    }
}

async fn service() -> (SearchService, Arc<InMemoryCompanyRepository>) {
    let companies = Arc::new(InMemoryCompanyRepository::new());
    companies
        .insert_company(Company {
            id: CompanyId("comp-buyer".to_string()),
            name: "Almacén Centro".to_string(),
            owner_user_id: "u-buyer".to_string(),
        })
        .await;
    companies
        .insert_company(Company {
            id: CompanyId("comp-p1".to_string()),
            name: "Distribuidora Paraná".to_string(),
            owner_user_id: "u-p1".to_string(),
        })
        .await;
    companies
        .insert_company(Company {
            id: CompanyId("comp-p2".to_string()),
            name: "Distribuidora Litoral".to_string(),
            owner_user_id: "u-p2".to_string(),
        })
        .await;
    companies
        .insert_branch(Branch {
            id: BranchId("branch-1".to_string()),
            company_id: CompanyId("comp-buyer".to_string()),
            name: "Sucursal Centro".to_string(),
            address: GeoPoint::new(-34.6, -58.4),
        })
        .await;

    let products = Arc::new(InMemoryProductRepository::new());
    // 1 kg at 2.00 vs 500 g at 0.90: the gram package is cheaper per kg.
    products.save(product("prod-kg", "comp-p1", "kg", 1.0, 200)).await.unwrap();
    products.save(product("prod-g", "comp-p2", "gramos", 500.0, 90)).await.unwrap();
    products
        .set_drop_zones(&CompanyId("comp-p1".to_string()), vec![monday_zone("zone-p1")])
        .await;
    products
        .set_drop_zones(&CompanyId("comp-p2".to_string()), vec![monday_zone("zone-p2")])
        .await;

    let units = Arc::new(InMemoryUnitRepository::new());
    units.save(Unit::new("kilogramos", vec!["kg", "kilo"])).await.unwrap();

    (SearchService::new(companies.clone(), products, units), companies)
}

#[tokio::test]
async fn hits_rank_by_price_per_base_unit_across_packagings() {
    let (service, _) = service().await;

    let outcome = service
        .search_products(&CompanyId("comp-buyer".to_string()), &criteria(Some("branch-1")), false)
        .await
        .unwrap();

    assert_eq!(outcome.count, 2);
    assert_eq!(outcome.hits[0].candidate.product.id.0, "prod-g");
    assert!((outcome.hits[0].candidate.price_per_base_unit - 1.8).abs() < 1e-9);
    assert_eq!(outcome.hits[1].candidate.product.id.0, "prod-kg");
    assert!((outcome.hits[1].candidate.price_per_base_unit - 2.0).abs() < 1e-9);
    assert!(outcome.hits.iter().all(|hit| hit.company.is_none()));
}

#[tokio::test]
async fn include_company_expands_each_hit_with_the_seller() {
    let (service, _) = service().await;

    let outcome = service
        .search_products(&CompanyId("comp-buyer".to_string()), &criteria(Some("branch-1")), true)
        .await
        .unwrap();

    let sellers: Vec<String> = outcome
        .hits
        .iter()
        .map(|hit| hit.company.as_ref().expect("seller expanded").name.clone())
        .collect();
    assert_eq!(sellers, vec!["Distribuidora Litoral", "Distribuidora Paraná"]);
}

#[tokio::test]
async fn missing_branch_is_not_found() {
    let (service, _) = service().await;

    let result = service
        .search_products(
            &CompanyId("comp-buyer".to_string()),
            &criteria(Some("branch-ghost")),
            false,
        )
        .await;
    assert!(matches!(result, Err(EngineError::NotFound { .. })));
}

#[tokio::test]
async fn pick_up_without_coordinates_falls_back_to_no_results() {
    let (service, _) = service().await;

    let mut criteria = criteria(None);
    criteria.is_pick_up = true;

    // No branch and no usable pick-up point: nothing qualifies, no error.
    let outcome = service
        .search_products(&CompanyId("comp-buyer".to_string()), &criteria, false)
        .await
        .unwrap();
    assert_eq!(outcome.count, 0);
}

#[tokio::test]
async fn pick_up_radius_matches_nearby_points() {
    let companies = Arc::new(InMemoryCompanyRepository::new());
    companies
        .insert_company(Company {
            id: CompanyId("comp-p1".to_string()),
            name: "Distribuidora Paraná".to_string(),
            owner_user_id: "u-p1".to_string(),
        })
        .await;
    let products = Arc::new(InMemoryProductRepository::new());
    products.save(product("prod-kg", "comp-p1", "kg", 1.0, 200)).await.unwrap();
    products
        .set_pick_up_points(
            &CompanyId("comp-p1".to_string()),
            vec![PickUpPoint {
                id: "pp-1".to_string(),
                location: GeoPoint::new(-34.61, -58.41),
                schedules: vec![ScheduleWindow {
                    weekday: Weekday::Monday,
                    hour_start: 8,
                    hour_end: 18,
                }],
            }],
        )
        .await;
    let units = Arc::new(InMemoryUnitRepository::new());
    units.save(Unit::new("kilogramos", vec!["kg"])).await.unwrap();
    let service = SearchService::new(companies, products, units);

    let mut criteria = criteria(None);
    criteria.is_pick_up = true;
    criteria.pick_up_lat = Some(-34.6);
    criteria.pick_up_lng = Some(-58.4);
    criteria.pick_up_radius_km = Some(5.0);

    let outcome = service
        .search_products(&CompanyId("comp-buyer".to_string()), &criteria, false)
        .await
        .unwrap();
    assert_eq!(outcome.count, 1);
    assert!(outcome.hits[0].candidate.is_pickup);
}

#[tokio::test]
async fn day_window_spanning_a_single_day_keeps_only_that_weekday() {
    let (service, _) = service().await;

    // 2024-03-05 is a Tuesday; the zones only open on Monday.
    let start = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
    let mut criteria = criteria(Some("branch-1"));
    criteria.day_window = DayWindow { start, end: start + Duration::hours(6) };

    let outcome = service
        .search_products(&CompanyId("comp-buyer".to_string()), &criteria, false)
        .await
        .unwrap();
    assert_eq!(outcome.count, 0);
}
