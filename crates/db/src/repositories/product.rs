use std::collections::HashMap;

use sqlx::{sqlite::SqliteRow, Row};

use abasto_core::domain::company::{CompanyId, DropZone, PickUpPoint};
use abasto_core::domain::product::{Product, ProductId};
use abasto_core::domain::schedule::{ScheduleWindow, Weekday};
use abasto_core::geo::{GeoPoint, GeoPolygon};
use abasto_core::search::availability::ProviderListing;

use super::{parse_decimal, parse_u8, ProductRepository, RepositoryError};
use crate::DbPool;

pub struct SqlProductRepository {
    pool: DbPool,
}

impl SqlProductRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn drop_zones_by_company(
        &self,
        excluded: &CompanyId,
    ) -> Result<HashMap<String, Vec<DropZone>>, RepositoryError> {
        let zone_rows = sqlx::query(
            "SELECT id, company_id, zone_json FROM drop_zone WHERE company_id != ?",
        )
        .bind(&excluded.0)
        .fetch_all(&self.pool)
        .await?;

        let schedule_rows = sqlx::query(
            "SELECT s.drop_zone_id, s.weekday, s.hour_start, s.hour_end
             FROM drop_zone_schedule s
             JOIN drop_zone z ON z.id = s.drop_zone_id
             WHERE z.company_id != ?",
        )
        .bind(&excluded.0)
        .fetch_all(&self.pool)
        .await?;

        let mut schedules: HashMap<String, Vec<ScheduleWindow>> = HashMap::new();
        for row in schedule_rows {
            let zone_id: String = row.try_get("drop_zone_id")?;
            schedules.entry(zone_id).or_default().push(schedule_from_row(&row, "weekday")?);
        }

        let mut by_company: HashMap<String, Vec<DropZone>> = HashMap::new();
        for row in zone_rows {
            let id: String = row.try_get("id")?;
            let company_id: String = row.try_get("company_id")?;
            let zone_json: String = row.try_get("zone_json")?;
            let vertices: Vec<GeoPoint> = serde_json::from_str(&zone_json).map_err(|error| {
                RepositoryError::Decode(format!("invalid drop zone polygon `{id}`: {error}"))
            })?;
            let zone = DropZone {
                schedules: schedules.remove(&id).unwrap_or_default(),
                id,
                zone: GeoPolygon::new(vertices),
            };
            by_company.entry(company_id).or_default().push(zone);
        }
        Ok(by_company)
    }

    async fn pick_up_points_by_company(
        &self,
        excluded: &CompanyId,
    ) -> Result<HashMap<String, Vec<PickUpPoint>>, RepositoryError> {
        let point_rows = sqlx::query(
            "SELECT id, company_id, location_lat, location_lng
             FROM pick_up_point WHERE company_id != ?",
        )
        .bind(&excluded.0)
        .fetch_all(&self.pool)
        .await?;

        let schedule_rows = sqlx::query(
            "SELECT s.pick_up_point_id, s.weekday, s.hour_start, s.hour_end
             FROM pick_up_point_schedule s
             JOIN pick_up_point p ON p.id = s.pick_up_point_id
             WHERE p.company_id != ?",
        )
        .bind(&excluded.0)
        .fetch_all(&self.pool)
        .await?;

        let mut schedules: HashMap<String, Vec<ScheduleWindow>> = HashMap::new();
        for row in schedule_rows {
            let point_id: String = row.try_get("pick_up_point_id")?;
            schedules.entry(point_id).or_default().push(schedule_from_row(&row, "weekday")?);
        }

        let mut by_company: HashMap<String, Vec<PickUpPoint>> = HashMap::new();
        for row in point_rows {
            let id: String = row.try_get("id")?;
            let company_id: String = row.try_get("company_id")?;
            let point = PickUpPoint {
                schedules: schedules.remove(&id).unwrap_or_default(),
                id,
                location: GeoPoint::new(
                    row.try_get("location_lat")?,
                    row.try_get("location_lng")?,
                ),
            };
            by_company.entry(company_id).or_default().push(point);
        }
        Ok(by_company)
    }
}

#[async_trait::async_trait]
impl ProductRepository for SqlProductRepository {
    async fn find_by_id(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, gtin, name, brand, measurement_unit, conversion_factor, price,
                    company_id, net_content, family, segment
             FROM product WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(product_from_row).transpose()
    }

    async fn save(&self, product: Product) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO product (
                id, gtin, name, brand, measurement_unit, conversion_factor, price,
                company_id, net_content, family, segment
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                gtin = excluded.gtin,
                name = excluded.name,
                brand = excluded.brand,
                measurement_unit = excluded.measurement_unit,
                conversion_factor = excluded.conversion_factor,
                price = excluded.price,
                company_id = excluded.company_id,
                net_content = excluded.net_content,
                family = excluded.family,
                segment = excluded.segment",
        )
        .bind(&product.id.0)
        .bind(&product.gtin)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.measurement_unit)
        .bind(product.conversion_factor)
        .bind(product.price.to_string())
        .bind(&product.company_id.0)
        .bind(product.net_content.map(|value| value.to_string()))
        .bind(product.family.as_deref())
        .bind(product.segment.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn listings_excluding(
        &self,
        excluded: &CompanyId,
    ) -> Result<Vec<ProviderListing>, RepositoryError> {
        let product_rows = sqlx::query(
            "SELECT id, gtin, name, brand, measurement_unit, conversion_factor, price,
                    company_id, net_content, family, segment
             FROM product WHERE company_id != ?
             ORDER BY id",
        )
        .bind(&excluded.0)
        .fetch_all(&self.pool)
        .await?;

        let drop_zones = self.drop_zones_by_company(excluded).await?;
        let pick_up_points = self.pick_up_points_by_company(excluded).await?;

        product_rows
            .into_iter()
            .map(|row| {
                let product = product_from_row(row)?;
                let company_key = product.company_id.0.clone();
                Ok(ProviderListing {
                    product,
                    drop_zones: drop_zones.get(&company_key).cloned().unwrap_or_default(),
                    pick_up_points: pick_up_points
                        .get(&company_key)
                        .cloned()
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn product_from_row(row: SqliteRow) -> Result<Product, RepositoryError> {
    let net_content: Option<String> = row.try_get("net_content")?;
    Ok(Product {
        id: ProductId(row.try_get("id")?),
        gtin: row.try_get("gtin")?,
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        measurement_unit: row.try_get("measurement_unit")?,
        conversion_factor: row.try_get("conversion_factor")?,
        price: parse_decimal("price", row.try_get("price")?)?,
        company_id: CompanyId(row.try_get("company_id")?),
        net_content: net_content.map(|value| parse_decimal("net_content", value)).transpose()?,
        family: row.try_get("family")?,
        segment: row.try_get("segment")?,
    })
}

fn schedule_from_row(row: &SqliteRow, weekday_column: &str) -> Result<ScheduleWindow, RepositoryError> {
    let weekday_raw: String = row.try_get(weekday_column)?;
    let weekday = Weekday::parse(&weekday_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown weekday `{weekday_raw}`"))
    })?;
    Ok(ScheduleWindow {
        weekday,
        hour_start: parse_u8("hour_start", row.try_get("hour_start")?)?,
        hour_end: parse_u8("hour_end", row.try_get("hour_end")?)?,
    })
}
