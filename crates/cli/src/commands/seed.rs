use crate::commands::CommandResult;
use agora_core::config::{AppConfig, LoadOptions};
use agora_db::{connect_with_settings, migrations, DemoSeedDataset};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let seed_result = DemoSeedDataset::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;

        let verification = DemoSeedDataset::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string(), 6u8))?;

        let run_result: Result<SeedOutput, (&'static str, String, u8)> =
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
                Err(("seed_verification", message, 6u8))
            } else {
                Ok(SeedOutput { submissions: seed_result.submissions_seeded })
            };

        pool.close().await;
        run_result
    });

    match result {
        Ok(output) => {
            let submission_descriptions: Vec<String> = output
                .submissions
                .iter()
                .map(|s| format!("  - {}: {} ({})", s.kind, s.submission_id, s.description))
                .collect();
            let message = format!(
                "Demo dataset loaded with one submission per lifecycle stage:\n{}",
                submission_descriptions.join("\n")
            );
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

struct SeedOutput {
    submissions: Vec<agora_db::SubmissionSeedInfo>,
}
