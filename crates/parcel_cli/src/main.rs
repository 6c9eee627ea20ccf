//! `parcel` command-line entry point.
//!
//! # Responsibility
//! - Map flags and environment variables onto core configuration.
//! - Drive `ParcelService` use-cases against a SQLite file.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use parcel_core::db::open_db;
use parcel_core::{
    core_version, default_log_level, init_logging, ClientId, Parcel, ParcelNumber, ParcelService,
    SqliteParcelRepository,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Register and track parcels stored in a SQLite database"
)]
struct Cli {
    #[arg(
        long,
        env = "PARCEL_DB_PATH",
        default_value = "tracker.db",
        value_name = "PATH",
        help = "SQLite database file; created when missing"
    )]
    db: PathBuf,

    #[arg(
        long,
        env = "PARCEL_LOG_DIR",
        value_name = "DIR",
        help = "Absolute directory for rolling log files; logging is off when unset"
    )]
    log_dir: Option<String>,

    #[arg(
        long,
        env = "PARCEL_LOG_LEVEL",
        value_name = "LEVEL",
        requires = "log_dir",
        help = "trace|debug|info|warn|error (default depends on build mode); needs --log-dir"
    )]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new parcel in `registered` status.
    Register {
        #[arg(long)]
        client: ClientId,
        #[arg(long)]
        address: String,
    },
    /// Print one parcel.
    Show { number: ParcelNumber },
    /// Print all parcels of a client.
    List {
        #[arg(long)]
        client: ClientId,
    },
    /// Advance a parcel to its next delivery status.
    NextStatus { number: ParcelNumber },
    /// Change the address of a parcel that is still registered.
    SetAddress {
        number: ParcelNumber,
        address: String,
    },
    /// Delete a parcel that is still registered.
    Delete { number: ParcelNumber },
    /// Walk one client through register, re-address, send and delete.
    Demo {
        #[arg(long, default_value_t = 1)]
        client: ClientId,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            bail!("failed to initialize logging: {err}");
        }
    }
    log::info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    let conn =
        open_db(&cli.db).with_context(|| format!("failed to open `{}`", cli.db.display()))?;
    let repo = SqliteParcelRepository::try_new(&conn)?;
    let service = ParcelService::new(repo);

    match cli.command {
        Command::Register { client, address } => {
            let parcel = service.register(client, address)?;
            println!("{}", describe(&parcel));
        }
        Command::Show { number } => {
            println!("{}", describe(&service.parcel(number)?));
        }
        Command::List { client } => print_client_parcels(&service, client)?,
        Command::NextStatus { number } => match service.next_status(number)? {
            Some(status) => println!("parcel #{number}: status changed to {status}"),
            None => println!("parcel #{number}: status unchanged"),
        },
        Command::SetAddress { number, address } => {
            if !service.change_address(number, &address)? {
                println!("parcel #{number}: not registered, address unchanged");
            }
            println!("{}", describe(&service.parcel(number)?));
        }
        Command::Delete { number } => {
            if service.delete(number)? {
                println!("parcel #{number}: deleted");
            } else {
                println!("parcel #{number}: not registered, kept");
            }
        }
        Command::Demo { client } => run_demo(&service, client)?,
    }

    Ok(())
}

fn run_demo(service: &ParcelService<SqliteParcelRepository<'_>>, client: ClientId) -> Result<()> {
    let parcel = service.register(client, "Pskov, Voennaya st. 65")?;
    let number = parcel
        .number
        .context("registered parcel has no number")?;
    println!("registered {}", describe(&parcel));

    if service.change_address(number, "Saratov, Verkhnyaya st. 3")? {
        println!("changed address of parcel #{number}");
    }

    if let Some(status) = service.next_status(number)? {
        println!("parcel #{number} is now {status}");
    }
    print_client_parcels(service, client)?;

    if !service.delete(number)? {
        println!("parcel #{number} already sent, not deleted");
    }
    let fresh = service.register(client, "Pskov, Voennaya st. 65")?;
    if let Some(fresh_number) = fresh.number {
        service.delete(fresh_number)?;
    }
    print_client_parcels(service, client)?;
    Ok(())
}

fn print_client_parcels(
    service: &ParcelService<SqliteParcelRepository<'_>>,
    client: ClientId,
) -> Result<()> {
    let parcels = service.client_parcels(client)?;
    println!("client {client}: {} parcel(s)", parcels.len());
    for parcel in &parcels {
        println!("  {}", describe(parcel));
    }
    Ok(())
}

fn describe(parcel: &Parcel) -> String {
    let number = parcel
        .number
        .map_or_else(|| "-".to_string(), |number| number.to_string());
    format!(
        "#{number} client={} status={} address={:?} created_at={}",
        parcel.client, parcel.status, parcel.address, parcel.created_at
    )
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_level_without_log_dir_is_rejected() {
        let result = Cli::try_parse_from(["parcel", "--log-level", "info", "list", "--client", "1"]);
        assert!(result.is_err());
    }

    #[test]
    fn log_level_with_log_dir_is_accepted() {
        let cli = Cli::try_parse_from([
            "parcel",
            "--log-dir",
            "/tmp/parcel-logs",
            "--log-level",
            "debug",
            "list",
            "--client",
            "1",
        ])
        .unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_dir.as_deref(), Some("/tmp/parcel-logs"));
    }
}
