mod config;
mod seed;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing, shutdown_tracing};
use products_hr::{DepartmentStore, HierarchyService, PositionStore, SeaOrmHrStore};
use serde::Serialize;
use tracing::info;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "hr-admin", version, about = "HR organisation data admin")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Insert demo departments and positions. Existing codes are left alone.
    Seed,
    /// Print departments as JSON.
    Departments {
        #[arg(long, value_name = "YYYY-MM-DD", help = "Only departments effective on this date")]
        on: Option<NaiveDate>,
    },
    /// Print positions as JSON.
    Positions {
        #[arg(long, value_name = "CODE", help = "Restrict to one department")]
        department: Option<String>,
    },
    /// Print the active department tree as JSON.
    Tree,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(ObsConfig::from_env("hr-admin"))?;
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let outcome = run(cli.command, &config).await;
    shutdown_tracing();
    outcome
}

async fn run(command: Command, config: &AppConfig) -> Result<()> {
    match command {
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Seed => {
            let store = open_store(config).await?;
            seed::run(&store, config).await
        }
        Command::Departments { on } => {
            let store = open_store(config).await?;
            let departments = match on {
                Some(date) => store.departments_effective_on(date).await?,
                None => store.active_departments().await?,
            };
            print_json(&departments)
        }
        Command::Positions { department } => {
            let store = open_store(config).await?;
            let positions = match department {
                Some(code) => {
                    let Some(found) = store.department_by_code(&code).await? else {
                        bail!("no department with code {code:?}");
                    };
                    store.positions_in_department(found.id).await?
                }
                None => store.active_positions().await?,
            };
            print_json(&positions)
        }
        Command::Tree => {
            let store = open_store(config).await?;
            let tree = HierarchyService::new(&store).department_tree().await?;
            print_json(&tree)
        }
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

async fn open_store(config: &AppConfig) -> Result<SeaOrmHrStore> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, config.allow_dirty).await?;
    Ok(SeaOrmHrStore::new(pool))
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        bail!("pending migrations detected; run `hr-admin migrate up` or set HR_ALLOW_DIRTY=1");
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}
