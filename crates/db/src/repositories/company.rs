use sqlx::{sqlite::SqliteRow, Row};

use abasto_core::domain::company::{Branch, BranchId, Company, CompanyId};
use abasto_core::geo::GeoPoint;

use super::{CompanyRepository, RepositoryError};
use crate::DbPool;

pub struct SqlCompanyRepository {
    pool: DbPool,
}

impl SqlCompanyRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CompanyRepository for SqlCompanyRepository {
    async fn find_by_id(&self, id: &CompanyId) -> Result<Option<Company>, RepositoryError> {
        let row = sqlx::query("SELECT id, name, owner_user_id FROM company WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.map(company_from_row).transpose()
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<Company>, RepositoryError> {
        let row =
            sqlx::query("SELECT id, name, owner_user_id FROM company WHERE owner_user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(company_from_row).transpose()
    }

    async fn find_branch(&self, id: &BranchId) -> Result<Option<Branch>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, company_id, name, address_lat, address_lng FROM branch WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(branch_from_row).transpose()
    }
}

fn company_from_row(row: SqliteRow) -> Result<Company, RepositoryError> {
    Ok(Company {
        id: CompanyId(row.try_get("id")?),
        name: row.try_get("name")?,
        owner_user_id: row.try_get("owner_user_id")?,
    })
}

fn branch_from_row(row: SqliteRow) -> Result<Branch, RepositoryError> {
    Ok(Branch {
        id: BranchId(row.try_get("id")?),
        company_id: CompanyId(row.try_get("company_id")?),
        name: row.try_get("name")?,
        address: GeoPoint::new(row.try_get("address_lat")?, row.try_get("address_lng")?),
    })
}
