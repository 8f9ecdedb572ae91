use sqlx::Executor;

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SEED_COMPANY_IDS: &[&str] =
    &["comp-almacen-centro", "comp-dist-parana", "comp-dist-litoral"];

const SEED_PRODUCT_IDS: &[&str] = &[
    "prod-parana-azucar",
    "prod-parana-harina",
    "prod-parana-aceite",
    "prod-litoral-azucar",
    "prod-litoral-harina",
    "prod-litoral-yerba",
];

const SEED_DROP_ZONE_IDS: &[&str] = &["zone-parana-caba", "zone-litoral-caba"];

const SEED_UNIT_NAMES: &[&str] = &["kilogramos", "gramos", "litros", "unidades"];

/// Deterministic demo dataset: one buyer company with a branch in central
/// Buenos Aires and two providers whose drop zones cover it, plus the
/// canonical unit dictionary. Loading it twice leaves the same rows.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;
        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        Ok(SeedResult {
            companies: SEED_COMPANY_IDS.len(),
            products: SEED_PRODUCT_IDS.len(),
            drop_zones: SEED_DROP_ZONE_IDS.len(),
            units: SEED_UNIT_NAMES.len(),
        })
    }

    /// Verify the seeded rows exist with the shape the demo flows expect.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let company_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM company WHERE id IN {}",
            sql_array_from_ids(SEED_COMPANY_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("companies", company_count == SEED_COMPANY_IDS.len() as i64));

        let product_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM product WHERE id IN {}",
            sql_array_from_ids(SEED_PRODUCT_IDS)
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("products", product_count == SEED_PRODUCT_IDS.len() as i64));

        let branch_exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM branch
             WHERE id = 'branch-centro-01' AND company_id = 'comp-almacen-centro')",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("buyer-branch", branch_exists == 1));

        for zone_id in SEED_DROP_ZONE_IDS {
            let scheduled: i64 = sqlx::query_scalar(
                "SELECT COUNT(1) FROM drop_zone_schedule WHERE drop_zone_id = ?",
            )
            .bind(zone_id)
            .fetch_one(pool)
            .await?;
            checks.push(("drop-zone-schedules", scheduled > 0));
        }

        let aliased_units: i64 = sqlx::query_scalar(
            "SELECT COUNT(DISTINCT standard_name) FROM unit_alias
             WHERE standard_name IN (SELECT standard_name FROM unit)",
        )
        .fetch_one(pool)
        .await?;
        checks.push(("unit-aliases", aliased_units >= 3));

        let all_present = checks.iter().all(|(_, ok)| *ok);
        Ok(VerificationResult { all_present, checks })
    }

    /// Remove the seeded rows from a test database.
    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        let mut tx = pool.begin().await?;
        let companies = sql_array_from_ids(SEED_COMPANY_IDS);

        sqlx::query(&format!(
            "DELETE FROM drop_zone_schedule WHERE drop_zone_id IN
             (SELECT id FROM drop_zone WHERE company_id IN {companies})"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!(
            "DELETE FROM pick_up_point_schedule WHERE pick_up_point_id IN
             (SELECT id FROM pick_up_point WHERE company_id IN {companies})"
        ))
        .execute(&mut *tx)
        .await?;
        sqlx::query(&format!("DELETE FROM drop_zone WHERE company_id IN {companies}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM pick_up_point WHERE company_id IN {companies}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM product WHERE company_id IN {companies}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM branch WHERE company_id IN {companies}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("DELETE FROM company WHERE id IN {companies}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "DELETE FROM unit WHERE standard_name IN {}",
            sql_array_from_ids(SEED_UNIT_NAMES)
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SeedResult {
    pub companies: usize,
    pub products: usize,
    pub drop_zones: usize,
    pub units: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted = ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(",");
    format!("({quoted})")
}
