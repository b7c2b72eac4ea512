//! # Corte de Caja
//!
//! Computes, closes and views store days from the command line. Output is
//! JSON on stdout; logs go to stderr.
//!
//! ## Usage
//! ```bash
//! # Live report for one day (nothing stored)
//! corte compute 2026-03-10
//!
//! # Freeze the day (fails if already closed)
//! corte close 2026-03-10 --user u-admin
//!
//! # Stored document, or an error while the day is pending
//! corte view 2026-03-10
//!
//! # Sum of closed days
//! corte period 2026-03-01 2026-03-31
//!
//! # Inventory report / close, stock at the end of a day, overdue sweep
//! corte inventory 2026-03-10
//! corte close-inventory 2026-03-10
//! corte stock 2026-03-10
//! corte sweep
//! ```
//!
//! The tenant comes from `--tenant`, else `tenant_id` in `quilate.toml` or
//! `QUILATE_TENANT_ID`.

use std::env;
use std::process::ExitCode;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::error;
use tracing_subscriber::EnvFilter;

use quilate_core::{Actor, ValidationError};
use quilate_db::{Database, DbError, Engine, QuilateConfig};

const USAGE: &str = "\
Usage: corte <COMMAND> [ARGS] [OPTIONS]

Commands:
  compute <date> [to]        Live sales report
  close <date>               Close the sales day
  view <date>                Stored sales closure
  period <from> <to>         Sum of closed days
  inventory <date> [to]      Live inventory report
  close-inventory <date>     Close the inventory day
  view-inventory <date>      Stored inventory closure
  stock <date>               Stock at the end of a day
  sweep                      Move overdue layaways and orders to vencido

Options:
  -t, --tenant <ID>          Tenant (default: from config)
  -u, --user <ID>            Acting user for closes and sweeps (default: corte)
  -h, --help                 Show this help message";

#[derive(Debug)]
struct Args {
    command: String,
    dates: Vec<NaiveDate>,
    tenant: Option<String>,
    user: String,
}

fn parse_args(raw: &[String]) -> Result<Option<Args>, String> {
    let mut command = None;
    let mut dates = Vec::new();
    let mut tenant = None;
    let mut user = "corte".to_string();

    let mut i = 1;
    while i < raw.len() {
        match raw[i].as_str() {
            "--help" | "-h" => return Ok(None),
            "--tenant" | "-t" => {
                i += 1;
                tenant = Some(raw.get(i).ok_or("--tenant needs a value")?.clone());
            }
            "--user" | "-u" => {
                i += 1;
                user = raw.get(i).ok_or("--user needs a value")?.clone();
            }
            other if command.is_none() => command = Some(other.to_string()),
            other => {
                let date = NaiveDate::parse_from_str(other, "%Y-%m-%d")
                    .map_err(|_| format!("not a date (YYYY-MM-DD): {}", other))?;
                dates.push(date);
            }
        }
        i += 1;
    }

    match command {
        Some(command) => Ok(Some(Args {
            command,
            dates,
            tenant,
            user,
        })),
        None => Ok(None),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), DbError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(engine: &Engine, tenant: &str, args: &Args) -> Result<(), DbError> {
    let actor = Actor::new(args.user.clone());
    let day = |n: usize| {
        args.dates.get(n).copied().ok_or_else(|| {
            DbError::from(ValidationError::Required {
                field: "date".to_string(),
            })
        })
    };

    match args.command.as_str() {
        "compute" => {
            let from = day(0)?;
            let to = args.dates.get(1).copied().unwrap_or(from);
            print_json(&engine.compute_report(tenant, from, to).await?)
        }
        "close" => print_json(&engine.close_day(tenant, day(0)?, &actor).await?),
        "view" => print_json(&engine.view_day(tenant, day(0)?).await?),
        "period" => print_json(&engine.view_period(tenant, day(0)?, day(1)?).await?),
        "inventory" => {
            let from = day(0)?;
            let to = args.dates.get(1).copied().unwrap_or(from);
            print_json(&engine.inventory_report(tenant, from, to).await?)
        }
        "close-inventory" => print_json(&engine.close_inventory_day(tenant, day(0)?, &actor).await?),
        "view-inventory" => print_json(&engine.view_inventory_day(tenant, day(0)?).await?),
        "stock" => print_json(&engine.historical_stock(tenant, day(0)?).await?),
        "sweep" => print_json(&engine.sweep_overdue(tenant, &actor).await?),
        other => Err(ValidationError::InvalidFormat {
            field: "command".to_string(),
            reason: format!("unknown command {}", other),
        }
        .into()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,quilate=debug,sqlx=warn")),
        )
        .init();

    let raw: Vec<String> = env::args().collect();
    let args = match parse_args(&raw) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            return ExitCode::from(2);
        }
    };

    let config = match QuilateConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    let Some(tenant) = args.tenant.clone().or_else(|| config.tenant_id.clone()) else {
        eprintln!("No tenant: pass --tenant or set tenant_id in quilate.toml\n\n{}", USAGE);
        return ExitCode::from(2);
    };

    let db_config = match config.db_config() {
        Ok(db_config) => db_config,
        Err(e) => {
            error!(error = %e, "Database path unavailable");
            return ExitCode::FAILURE;
        }
    };
    let engine = match Database::new(db_config).await.and_then(|db| Engine::new(db, config.engine)) {
        Ok(engine) => engine,
        Err(e) => {
            error!(error = %e, "Could not open the database");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&engine, &tenant, &args).await;
    engine.database().close().await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e.kind().map(|k| k.operator_message()).unwrap_or("Error interno");
            eprintln!("{}: {}", message, e);
            ExitCode::FAILURE
        }
    }
}
