use crate::commands::CommandResult;
use abasto_db::{connect_with_settings, migrations, DemoSeedDataset};

pub fn run() -> CommandResult {
    super::execute("seed", |config| async move {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        let outcome = load_and_verify(&pool).await;
        pool.close().await;
        outcome
    })
}

async fn load_and_verify(pool: &abasto_db::DbPool) -> Result<String, super::RunFailure> {
    migrations::run_pending(pool).await.map_err(|error| ("migration", error.to_string(), 5u8))?;

    let seeded = DemoSeedDataset::load(pool)
        .await
        .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

    let verification = DemoSeedDataset::verify(pool)
        .await
        .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

    if !verification.all_present {
        let failed_checks = verification
            .checks
            .iter()
            .filter_map(|(check, passed)| (!passed).then_some(*check))
            .collect::<Vec<_>>();
        let message = if failed_checks.is_empty() {
            "Some seed data failed to load".to_string()
        } else {
            format!("Seed verification failed for checks: {}", failed_checks.join(", "))
        };
        return Err(("seed_verification", message, 6u8));
    }

    Ok(format!(
        "demo dataset loaded: {} companies, {} products, {} drop zones, {} units",
        seeded.companies, seeded.products, seeded.drop_zones, seeded.units
    ))
}
