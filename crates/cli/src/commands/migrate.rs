use crate::commands::CommandResult;
use abasto_db::{connect_with_settings, migrations};

pub fn run() -> CommandResult {
    super::execute("migrate", |config| async move {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let outcome = migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8));
        pool.close().await;
        outcome?;

        Ok("applied pending migrations".to_string())
    })
}
