use serde::Serialize;
use signoff_core::config::{AppConfig, LoadOptions};
use signoff_db::migrations;

use crate::commands::{build_runtime, connect, Session};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\
                 \"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!("configuration loaded for profile `{}`", config.storage.profile),
            });
            checks.extend(check_storage(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            let reason = "configuration did not load";
            checks.push(DoctorCheck::skipped("storage_connectivity", reason));
            checks.push(DoctorCheck::skipped("migrations", reason));
            checks.push(DoctorCheck::skipped("approval_store", reason));
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Connectivity, migration state and a read of the profile's approvals, in that order.
fn check_storage(config: &AppConfig) -> Vec<DoctorCheck> {
    let runtime = match build_runtime() {
        Ok(runtime) => runtime,
        Err(failure) => {
            return vec![
                DoctorCheck {
                    name: "storage_connectivity",
                    status: CheckStatus::Fail,
                    details: failure.message,
                },
                DoctorCheck::skipped("migrations", "the async runtime did not start"),
                DoctorCheck::skipped("approval_store", "the async runtime did not start"),
            ];
        }
    };

    runtime.block_on(async {
        let pool = match connect(config).await {
            Ok(pool) => pool,
            Err(failure) => {
                return vec![
                    DoctorCheck {
                        name: "storage_connectivity",
                        status: CheckStatus::Fail,
                        details: format!("failed to connect to storage: {}", failure.message),
                    },
                    DoctorCheck::skipped("migrations", "storage is unreachable"),
                    DoctorCheck::skipped("approval_store", "storage is unreachable"),
                ];
            }
        };

        let mut checks = vec![DoctorCheck {
            name: "storage_connectivity",
            status: CheckStatus::Pass,
            details: format!("connected using `{}`", config.storage.url),
        }];

        let applied = migrations::applied_count(&pool).await;
        pool.close().await;
        match applied {
            Ok(count) if count > 0 => checks.push(DoctorCheck {
                name: "migrations",
                status: CheckStatus::Pass,
                details: format!("{count} migration(s) applied"),
            }),
            Ok(_) => {
                checks.push(DoctorCheck {
                    name: "migrations",
                    status: CheckStatus::Fail,
                    details: "no migrations applied; run `signoff migrate`".to_string(),
                });
                checks.push(DoctorCheck::skipped("approval_store", "the schema is missing"));
                return checks;
            }
            Err(error) => {
                checks.push(DoctorCheck {
                    name: "migrations",
                    status: CheckStatus::Fail,
                    details: format!("failed to read migration state: {error}"),
                });
                checks.push(DoctorCheck::skipped("approval_store", "the schema is unknown"));
                return checks;
            }
        }

        checks.push(check_approval_store(config).await);
        checks
    })
}

async fn check_approval_store(config: &AppConfig) -> DoctorCheck {
    let session = match Session::open(config).await {
        Ok(session) => session,
        Err(failure) => {
            return DoctorCheck {
                name: "approval_store",
                status: CheckStatus::Fail,
                details: failure.message,
            }
        }
    };

    let listed = session.store.list().await;
    session.close().await;
    match listed {
        Ok(items) => {
            let pending = items.iter().filter(|item| item.is_pending()).count();
            DoctorCheck {
                name: "approval_store",
                status: CheckStatus::Pass,
                details: format!(
                    "profile `{}` holds {} approval(s), {pending} pending",
                    config.storage.profile,
                    items.len()
                ),
            }
        }
        Err(error) => DoctorCheck {
            name: "approval_store",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
