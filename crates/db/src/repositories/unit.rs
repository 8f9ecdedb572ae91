use sqlx::Row;

use abasto_core::domain::unit::Unit;

use super::{RepositoryError, UnitRepository};
use crate::DbPool;

pub struct SqlUnitRepository {
    pool: DbPool,
}

impl SqlUnitRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UnitRepository for SqlUnitRepository {
    async fn list_all(&self) -> Result<Vec<Unit>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT u.standard_name, a.alias
             FROM unit u
             LEFT JOIN unit_alias a ON a.standard_name = u.standard_name
             ORDER BY u.standard_name, a.alias",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut units: Vec<Unit> = Vec::new();
        for row in rows {
            let standard_name: String = row.try_get("standard_name")?;
            let alias: Option<String> = row.try_get("alias")?;
            match units.last_mut() {
                Some(unit) if unit.standard_name == standard_name => {
                    if let Some(alias) = alias {
                        unit.aliases.push(alias);
                    }
                }
                _ => units.push(Unit {
                    standard_name,
                    aliases: alias.into_iter().collect(),
                }),
            }
        }
        Ok(units)
    }

    async fn save(&self, unit: Unit) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO unit (standard_name) VALUES (?) ON CONFLICT DO NOTHING")
            .bind(&unit.standard_name)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM unit_alias WHERE standard_name = ?")
            .bind(&unit.standard_name)
            .execute(&mut *tx)
            .await?;
        for alias in &unit.aliases {
            sqlx::query("INSERT INTO unit_alias (alias, standard_name) VALUES (?, ?)")
                .bind(alias)
                .bind(&unit.standard_name)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
