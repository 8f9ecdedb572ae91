//! Geographic + schedule availability matching.
//!
//! Pure logic over already-loaded provider listings: the store hands over
//! every candidate product with its owner's drop zones and pick-up points,
//! and this module decides which of them are actually reachable within the
//! requested delivery window, prices them per base unit, and ranks them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::company::{CompanyId, DropZone, PickUpPoint};
use crate::domain::product::Product;
use crate::domain::schedule::{DayWindow, HourWindow, Weekday};
use crate::geo::GeoPoint;
use crate::pricing::price_per_base_unit;

/// Pick-up constraint: collectable within `radius_km` of the given point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickUpQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

/// Resolved search parameters. `branch_location` is the requesting branch's
/// address (drop-zone path); `pick_up` enables the radius path.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchCriteria {
    pub branch_location: Option<GeoPoint>,
    pub day_window: DayWindow,
    pub hour_window: HourWindow,
    pub name: Option<String>,
    pub brand: Option<String>,
    pub base_measurement_unit: String,
    pub pick_up: Option<PickUpQuery>,
}

/// A provider product with the geography of its owning company.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderListing {
    pub product: Product,
    pub drop_zones: Vec<DropZone>,
    pub pick_up_points: Vec<PickUpPoint>,
}

/// A surviving candidate, annotated with its comparable price. `is_pickup` is
/// set only when the candidate qualified exclusively through the pick-up path.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductCandidate {
    pub product: Product,
    pub company_id: CompanyId,
    pub is_pickup: bool,
    pub price_per_base_unit: f64,
}

/// Filters and ranks listings per the availability rules: excludes the
/// caller's own company, requires a qualifying drop-zone or pick-up window,
/// deduplicates by `(product, company)`, applies name/brand substring
/// filters, prices each survivor per base unit (dropping incomparable ones)
/// and sorts ascending by that price.
pub fn match_listings(
    excluded_company: &CompanyId,
    listings: &[ProviderListing],
    criteria: &SearchCriteria,
) -> Vec<ProductCandidate> {
    let weekdays = criteria.day_window.weekdays();

    // Dedup by (product, company): a drop-zone hit wins over a pick-up hit.
    let mut qualified: HashMap<(String, String), bool> = HashMap::new();
    let mut products: HashMap<(String, String), &Product> = HashMap::new();

    for listing in listings {
        let product = &listing.product;
        if &product.company_id == excluded_company {
            continue;
        }

        let via_drop_zone = criteria.branch_location.as_ref().is_some_and(|address| {
            drop_zone_qualifies(&listing.drop_zones, address, &weekdays, &criteria.hour_window)
        });
        let via_pick_up = criteria.pick_up.as_ref().is_some_and(|query| {
            pick_up_qualifies(&listing.pick_up_points, query, &weekdays, &criteria.hour_window)
        });
        if !via_drop_zone && !via_pick_up {
            continue;
        }

        let key = (product.id.0.clone(), product.company_id.0.clone());
        let is_pickup = !via_drop_zone;
        qualified
            .entry(key.clone())
            .and_modify(|flag| *flag = *flag && is_pickup)
            .or_insert(is_pickup);
        products.entry(key).or_insert(product);
    }

    let mut candidates: Vec<ProductCandidate> = qualified
        .into_iter()
        .filter_map(|(key, is_pickup)| {
            let product = *products.get(&key)?;
            if !text_filter_matches(&product.name, criteria.name.as_deref())
                || !text_filter_matches(&product.brand, criteria.brand.as_deref())
            {
                return None;
            }
            let price = price_per_base_unit(
                &product.measurement_unit,
                product.price,
                product.conversion_factor,
                &criteria.base_measurement_unit,
            )?;
            Some(ProductCandidate {
                product: product.clone(),
                company_id: product.company_id.clone(),
                is_pickup,
                price_per_base_unit: price,
            })
        })
        .collect();

    candidates.sort_by(|a, b| a.price_per_base_unit.total_cmp(&b.price_per_base_unit));
    candidates
}

fn drop_zone_qualifies(
    drop_zones: &[DropZone],
    branch_address: &GeoPoint,
    weekdays: &[Weekday],
    hours: &HourWindow,
) -> bool {
    drop_zones.iter().any(|zone| {
        zone.zone.contains(branch_address)
            && zone.schedules.iter().any(|slot| slot.matches(weekdays, hours))
    })
}

fn pick_up_qualifies(
    points: &[PickUpPoint],
    query: &PickUpQuery,
    weekdays: &[Weekday],
    hours: &HourWindow,
) -> bool {
    let origin = GeoPoint::new(query.latitude, query.longitude);
    points.iter().any(|point| {
        point.location.distance_km(&origin) <= query.radius_km
            && point.schedules.iter().any(|slot| slot.matches(weekdays, hours))
    })
}

fn text_filter_matches(value: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(needle) if !needle.trim().is_empty() => {
            value.to_lowercase().contains(&needle.trim().to_lowercase())
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use rust_decimal::Decimal;

    use crate::domain::company::{CompanyId, DropZone, PickUpPoint};
    use crate::domain::product::{Product, ProductId};
    use crate::domain::schedule::{DayWindow, HourWindow, ScheduleWindow, Weekday};
    use crate::geo::{GeoPoint, GeoPolygon};

    use super::{match_listings, PickUpQuery, ProviderListing, SearchCriteria};

    fn ts(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value).expect("valid rfc3339").with_timezone(&Utc)
    }

    fn monday_slot() -> ScheduleWindow {
        ScheduleWindow { weekday: Weekday::Monday, hour_start: 8, hour_end: 18 }
    }

    fn city_zone() -> DropZone {
        DropZone {
            id: "dz-1".to_string(),
            zone: GeoPolygon::new(vec![
                GeoPoint::new(-35.0, -59.0),
                GeoPoint::new(-35.0, -57.0),
                GeoPoint::new(-33.0, -57.0),
                GeoPoint::new(-33.0, -59.0),
            ]),
            schedules: vec![monday_slot()],
        }
    }

    fn product(id: &str, company: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId(id.to_string()),
            gtin: format!("779{id}"),
            name: "Harina 000".to_string(),
            brand: "Molinos".to_string(),
            measurement_unit: "kg".to_string(),
            conversion_factor: 1.0,
            price: Decimal::new(price_cents, 2),
            company_id: CompanyId(company.to_string()),
            net_content: None,
            family: None,
            segment: None,
        }
    }

    fn criteria() -> SearchCriteria {
        SearchCriteria {
            // Inside city_zone().
            branch_location: Some(GeoPoint::new(-34.6, -58.4)),
            // Monday 2026-03-02.
            day_window: DayWindow { start: ts("2026-03-02T00:00:00Z"), end: ts("2026-03-02T23:00:00Z") },
            hour_window: HourWindow { start: 9, end: 12 },
            name: None,
            brand: None,
            base_measurement_unit: "kg".to_string(),
            pick_up: None,
        }
    }

    fn listing(product: Product) -> ProviderListing {
        ProviderListing { product, drop_zones: vec![city_zone()], pick_up_points: vec![] }
    }

    #[test]
    fn ranks_candidates_ascending_by_price_per_base_unit() {
        let listings = vec![
            listing(product("p-dear", "c-1", 500)),
            listing(product("p-cheap", "c-2", 200)),
            listing(product("p-mid", "c-3", 350)),
        ];
        let buyer = CompanyId("c-buyer".to_string());

        let candidates = match_listings(&buyer, &listings, &criteria());
        let ids: Vec<&str> =
            candidates.iter().map(|c| c.product.id.0.as_str()).collect();
        assert_eq!(ids, vec!["p-cheap", "p-mid", "p-dear"]);
        assert!(candidates.iter().all(|c| !c.is_pickup));
    }

    #[test]
    fn excludes_the_buyers_own_inventory() {
        let buyer = CompanyId("c-1".to_string());
        let listings = vec![listing(product("p-own", "c-1", 100)), listing(product("p", "c-2", 300))];

        let candidates = match_listings(&buyer, &listings, &criteria());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].product.id.0, "p");
    }

    #[test]
    fn drops_products_outside_the_zone_or_window() {
        let mut far_zone = listing(product("p-far", "c-1", 100));
        far_zone.drop_zones[0].zone = GeoPolygon::new(vec![
            GeoPoint::new(10.0, 10.0),
            GeoPoint::new(10.0, 11.0),
            GeoPoint::new(11.0, 11.0),
        ]);

        let mut wrong_day = listing(product("p-day", "c-2", 100));
        wrong_day.drop_zones[0].schedules =
            vec![ScheduleWindow { weekday: Weekday::Friday, hour_start: 8, hour_end: 18 }];

        let mut wrong_hours = listing(product("p-hours", "c-3", 100));
        wrong_hours.drop_zones[0].schedules =
            vec![ScheduleWindow { weekday: Weekday::Monday, hour_start: 14, hour_end: 18 }];

        let buyer = CompanyId("c-buyer".to_string());
        let candidates =
            match_listings(&buyer, &[far_zone, wrong_day, wrong_hours], &criteria());
        assert!(candidates.is_empty());
    }

    #[test]
    fn unclassifiable_unit_drops_only_that_candidate() {
        // Scenario E: one "lb" product disappears, siblings are unaffected.
        let mut pounds = product("p-lb", "c-1", 100);
        pounds.measurement_unit = "lb".to_string();

        let buyer = CompanyId("c-buyer".to_string());
        let candidates = match_listings(
            &buyer,
            &[listing(pounds), listing(product("p-kg", "c-2", 300))],
            &criteria(),
        );
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].product.id.0, "p-kg");
    }

    #[test]
    fn pick_up_path_flags_candidates_and_respects_radius() {
        let nearby = PickUpPoint {
            id: "pp-1".to_string(),
            location: GeoPoint::new(-34.61, -58.41),
            schedules: vec![monday_slot()],
        };
        let far = PickUpPoint {
            id: "pp-2".to_string(),
            location: GeoPoint::new(-31.0, -64.0),
            schedules: vec![monday_slot()],
        };

        let reachable = ProviderListing {
            product: product("p-near", "c-1", 100),
            drop_zones: vec![],
            pick_up_points: vec![nearby],
        };
        let unreachable = ProviderListing {
            product: product("p-far", "c-2", 100),
            drop_zones: vec![],
            pick_up_points: vec![far],
        };

        let mut criteria = criteria();
        criteria.branch_location = None;
        criteria.pick_up =
            Some(PickUpQuery { latitude: -34.6, longitude: -58.4, radius_km: 5.0 });

        let buyer = CompanyId("c-buyer".to_string());
        let candidates = match_listings(&buyer, &[reachable, unreachable], &criteria);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].product.id.0, "p-near");
        assert!(candidates[0].is_pickup);
    }

    #[test]
    fn drop_zone_hit_wins_the_pickup_flag_when_both_paths_qualify() {
        let both = ProviderListing {
            product: product("p-both", "c-1", 100),
            drop_zones: vec![city_zone()],
            pick_up_points: vec![PickUpPoint {
                id: "pp".to_string(),
                location: GeoPoint::new(-34.6, -58.4),
                schedules: vec![monday_slot()],
            }],
        };

        let mut criteria = criteria();
        criteria.pick_up =
            Some(PickUpQuery { latitude: -34.6, longitude: -58.4, radius_km: 5.0 });

        let buyer = CompanyId("c-buyer".to_string());
        let candidates = match_listings(&buyer, &[both], &criteria);
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].is_pickup);
    }

    #[test]
    fn name_and_brand_post_filters_are_case_insensitive_substrings() {
        let mut other = product("p-other", "c-2", 100);
        other.name = "Azucar".to_string();
        let listings = vec![listing(product("p-flour", "c-1", 100)), listing(other)];
        let buyer = CompanyId("c-buyer".to_string());

        let mut by_name = criteria();
        by_name.name = Some("harina".to_string());
        let candidates = match_listings(&buyer, &listings, &by_name);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].product.id.0, "p-flour");

        let mut by_brand = criteria();
        by_brand.brand = Some("MOLI".to_string());
        assert_eq!(match_listings(&buyer, &listings, &by_brand).len(), 2);
    }
}
