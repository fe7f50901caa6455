pub mod clear;
pub mod config;
pub mod decide;
pub mod doctor;
pub mod list;
pub mod migrate;
pub mod request;
pub mod watch;

use std::sync::Arc;

use serde::Serialize;
use signoff_core::config::{AppConfig, LoadOptions};
use signoff_core::errors::{ApplicationError, InterfaceError};
use signoff_core::store::ApprovalStore;
use signoff_db::{connect_with_settings, migrations, DbPool, SqliteProfileStorage};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandEnvelope {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::with_status(command, "ok", message)
    }

    /// Exit-code-zero outcome that is neither a plain success nor an error.
    pub fn with_status(command: &str, status: &str, message: impl Into<String>) -> Self {
        let payload = CommandEnvelope {
            command: command.to_string(),
            status: status.to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandEnvelope {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn text(output: impl Into<String>) -> Self {
        Self { exit_code: 0, output: output.into() }
    }
}

fn serialize_payload(payload: CommandEnvelope) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\
             \"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// A command that could not complete, with the class and exit code it reports.
#[derive(Debug)]
pub(crate) struct Failure {
    pub error_class: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl Failure {
    pub fn new(error_class: &'static str, message: impl Into<String>, exit_code: u8) -> Self {
        Self { error_class, message: message.into(), exit_code }
    }

    pub fn into_result(self, command: &str) -> CommandResult {
        CommandResult::failure(command, self.error_class, self.message, self.exit_code)
    }
}

impl From<ApplicationError> for Failure {
    fn from(error: ApplicationError) -> Self {
        let error = InterfaceError::from(error);
        let exit_code = match error {
            InterfaceError::BadRequest { .. } => 6,
            InterfaceError::ServiceUnavailable { .. } => 4,
            InterfaceError::Internal { .. } => 3,
        };
        Self::new(error.error_class(), error.message(), exit_code)
    }
}

pub(crate) fn load_config(options: &LoadOptions) -> Result<AppConfig, Failure> {
    AppConfig::load(options.clone()).map_err(|error| {
        Failure::new("config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn build_runtime() -> Result<tokio::runtime::Runtime, Failure> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        Failure::new("runtime_init", format!("failed to initialize async runtime: {error}"), 3)
    })
}

pub(crate) async fn connect(config: &AppConfig) -> Result<DbPool, Failure> {
    connect_with_settings(
        &config.storage.url,
        config.storage.max_connections,
        config.storage.timeout_secs,
    )
    .await
    .map_err(|error| Failure::new("db_connectivity", error.to_string(), 4))
}

/// Everything a command needs to work with one profile's approvals.
pub(crate) struct Session {
    pub pool: DbPool,
    pub storage: Arc<SqliteProfileStorage>,
    pub store: Arc<ApprovalStore>,
}

impl Session {
    pub async fn open(config: &AppConfig) -> Result<Self, Failure> {
        let pool = connect(config).await?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| Failure::new("migration", error.to_string(), 5))?;

        let storage = SqliteProfileStorage::open(pool.clone(), config.storage.profile.clone())
            .await
            .map_err(|error| Failure::new("storage", error.to_string(), 4))?;
        let storage = Arc::new(storage);
        let store = Arc::new(ApprovalStore::new(storage.clone()));

        Ok(Self { pool, storage, store })
    }

    pub async fn close(self) {
        drop(self.store);
        drop(self.storage);
        self.pool.close().await;
    }
}

/// Loads config, opens a session on a fresh runtime and runs `body` to completion.
pub(crate) fn with_session<F, Fut>(
    command: &str,
    options: &LoadOptions,
    body: F,
) -> CommandResult
where
    F: FnOnce(AppConfig, Arc<ApprovalStore>, Arc<SqliteProfileStorage>) -> Fut,
    Fut: std::future::Future<Output = Result<CommandResult, Failure>>,
{
    let config = match load_config(options) {
        Ok(config) => config,
        Err(failure) => return failure.into_result(command),
    };
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => return failure.into_result(command),
    };

    let result = runtime.block_on(async {
        let session = Session::open(&config).await?;
        let outcome = body(config, session.store.clone(), session.storage.clone()).await;
        session.close().await;
        outcome
    });

    result.unwrap_or_else(|failure| failure.into_result(command))
}
