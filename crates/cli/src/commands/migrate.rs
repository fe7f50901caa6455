use signoff_core::config::LoadOptions;
use signoff_db::migrations;

use crate::commands::{build_runtime, connect, load_config, CommandResult, Failure};

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(failure) => return failure.into_result("migrate"),
    };
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return failure.into_result("migrate"),
    };

    let result = runtime.block_on(async {
        let pool = connect(&config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| Failure::new("migration", error.to_string(), 5))?;
        let applied = migrations::applied_count(&pool)
            .await
            .map_err(|error| Failure::new("db_connectivity", error.to_string(), 4))?;
        pool.close().await;
        Ok::<i64, Failure>(applied)
    });

    match result {
        Ok(applied) => CommandResult::success(
            "migrate",
            format!("applied pending migrations ({applied} total)"),
        ),
        Err(failure) => failure.into_result("migrate"),
    }
}
