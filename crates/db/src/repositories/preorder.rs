use sqlx::{sqlite::SqliteRow, Row};

use abasto_core::domain::company::{BranchId, CompanyId};
use abasto_core::domain::preorder::{
    BuyOrderId, PreOrder, PreOrderAggregate, PreOrderCriteria, PreOrderId, PreOrderProduct,
    PreOrderStatus, ReplacementCriterion,
};
use abasto_core::domain::product::ProductId;
use abasto_core::domain::schedule::{DayWindow, HourWindow};

use super::{parse_timestamp, parse_u32, parse_u8, PreOrderRepository, RepositoryError};
use crate::DbPool;

pub struct SqlPreOrderRepository {
    pool: DbPool,
}

impl SqlPreOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PreOrderRepository for SqlPreOrderRepository {
    async fn next_sequence(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COALESCE(MAX(sequence), 0) + 1 AS next FROM pre_order")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("next")?)
    }

    async fn create(&self, aggregate: &PreOrderAggregate) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let pre_order = &aggregate.pre_order;

        sqlx::query(
            "INSERT INTO pre_order (
                id, sequence, buyer_user_id, status, instance, response_deadline,
                client_company_id, provider_company_id, buy_order_id, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&pre_order.id.0)
        .bind(pre_order.sequence)
        .bind(&pre_order.buyer_user_id)
        .bind(pre_order.status.as_str())
        .bind(i64::from(pre_order.instance))
        .bind(pre_order.response_deadline.to_rfc3339())
        .bind(&pre_order.client_company_id.0)
        .bind(&pre_order.provider_company_id.0)
        .bind(pre_order.buy_order_id.as_ref().map(|id| id.0.as_str()))
        .bind(pre_order.created_at.to_rfc3339())
        .bind(pre_order.updated_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        let criteria = &aggregate.criteria;
        sqlx::query(
            "INSERT INTO pre_order_criteria (
                pre_order_id, branch_id, day_window_start, day_window_end,
                hour_window_start, hour_window_end, name, brand, base_measurement_unit,
                is_pick_up, pick_up_lat, pick_up_lng, pick_up_radius_km, replacement_criteria
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&pre_order.id.0)
        .bind(criteria.branch_id.as_ref().map(|id| id.0.as_str()))
        .bind(criteria.day_window.start.to_rfc3339())
        .bind(criteria.day_window.end.to_rfc3339())
        .bind(i64::from(criteria.hour_window.start))
        .bind(i64::from(criteria.hour_window.end))
        .bind(criteria.name.as_deref())
        .bind(criteria.brand.as_deref())
        .bind(criteria.base_measurement_unit.as_deref())
        .bind(criteria.is_pick_up)
        .bind(criteria.pick_up_lat)
        .bind(criteria.pick_up_lng)
        .bind(criteria.pick_up_radius_km)
        .bind(criteria.replacement_criteria.as_str())
        .execute(&mut *tx)
        .await?;

        for line in &aggregate.lines {
            sqlx::query(
                "INSERT INTO pre_order_product (pre_order_id, product_id, quantity)
                 VALUES (?, ?, ?)",
            )
            .bind(&line.pre_order_id.0)
            .bind(&line.product_id.0)
            .bind(i64::from(line.quantity))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_aggregate(
        &self,
        id: &PreOrderId,
    ) -> Result<Option<PreOrderAggregate>, RepositoryError> {
        let Some(order_row) = sqlx::query(
            "SELECT id, sequence, buyer_user_id, status, instance, response_deadline,
                    client_company_id, provider_company_id, buy_order_id, created_at, updated_at
             FROM pre_order WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let criteria_row = sqlx::query(
            "SELECT branch_id, day_window_start, day_window_end, hour_window_start,
                    hour_window_end, name, brand, base_measurement_unit, is_pick_up,
                    pick_up_lat, pick_up_lng, pick_up_radius_km, replacement_criteria
             FROM pre_order_criteria WHERE pre_order_id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            RepositoryError::Decode(format!("pre-order `{}` has no criteria row", id.0))
        })?;

        let line_rows = sqlx::query(
            "SELECT pre_order_id, product_id, quantity
             FROM pre_order_product WHERE pre_order_id = ? ORDER BY id",
        )
        .bind(&id.0)
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .into_iter()
            .map(|row| {
                Ok(PreOrderProduct {
                    pre_order_id: PreOrderId(row.try_get("pre_order_id")?),
                    product_id: ProductId(row.try_get("product_id")?),
                    quantity: parse_u32("quantity", row.try_get("quantity")?)?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(PreOrderAggregate {
            pre_order: pre_order_from_row(&order_row)?,
            criteria: criteria_from_row(&criteria_row)?,
            lines,
        }))
    }

    async fn set_status_if_pending(
        &self,
        id: &PreOrderId,
        status: PreOrderStatus,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE pre_order SET status = ?, updated_at = ?
             WHERE id = ? AND status = 'pending'",
        )
        .bind(status.as_str())
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

fn pre_order_from_row(row: &SqliteRow) -> Result<PreOrder, RepositoryError> {
    let status_raw: String = row.try_get("status")?;
    let status = PreOrderStatus::parse(&status_raw).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown pre-order status `{status_raw}`"))
    })?;
    let buy_order_id: Option<String> = row.try_get("buy_order_id")?;
    Ok(PreOrder {
        id: PreOrderId(row.try_get("id")?),
        sequence: row.try_get("sequence")?,
        buyer_user_id: row.try_get("buyer_user_id")?,
        status,
        instance: parse_u32("instance", row.try_get("instance")?)?,
        response_deadline: parse_timestamp("response_deadline", row.try_get("response_deadline")?)?,
        client_company_id: CompanyId(row.try_get("client_company_id")?),
        provider_company_id: CompanyId(row.try_get("provider_company_id")?),
        buy_order_id: buy_order_id.map(BuyOrderId),
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
        updated_at: parse_timestamp("updated_at", row.try_get("updated_at")?)?,
    })
}

fn criteria_from_row(row: &SqliteRow) -> Result<PreOrderCriteria, RepositoryError> {
    let branch_id: Option<String> = row.try_get("branch_id")?;
    let replacement_raw: String = row.try_get("replacement_criteria")?;
    Ok(PreOrderCriteria {
        branch_id: branch_id.map(BranchId),
        day_window: DayWindow {
            start: parse_timestamp("day_window_start", row.try_get("day_window_start")?)?,
            end: parse_timestamp("day_window_end", row.try_get("day_window_end")?)?,
        },
        hour_window: HourWindow {
            start: parse_u8("hour_window_start", row.try_get("hour_window_start")?)?,
            end: parse_u8("hour_window_end", row.try_get("hour_window_end")?)?,
        },
        name: row.try_get("name")?,
        brand: row.try_get("brand")?,
        base_measurement_unit: row.try_get("base_measurement_unit")?,
        is_pick_up: row.try_get("is_pick_up")?,
        pick_up_lat: row.try_get("pick_up_lat")?,
        pick_up_lng: row.try_get("pick_up_lng")?,
        pick_up_radius_km: row.try_get("pick_up_radius_km")?,
        replacement_criteria: ReplacementCriterion::parse(&replacement_raw),
    })
}
