//! Storekeep CLI - Database migrations and order management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run order database migrations
//! storekeep migrate
//!
//! # Show states, statuses and defaults
//! storekeep statuses --file statuses.yaml
//!
//! # Work with an order as a given actor
//! storekeep order --actor 1 --permission view_all_orders show 42
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `statuses` - Inspect the order status registry
//! - `order` - Show, update, cancel or delete orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use storekeep_core::{OrderId, Permission, UserId};
use storekeep_orders::config::{LogFormat, OrdersConfig};
use storekeep_orders::db::{self, PgOrderStore};
use storekeep_orders::state::{AppState, load_registry};
use storekeep_orders::{Actor, telemetry};

mod commands;

#[derive(Parser)]
#[command(name = "storekeep")]
#[command(author, version, about = "Storekeep CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print order states, statuses and defaults
    Statuses {
        /// Custom statuses YAML file (default: `ORDER_STATUSES_FILE`)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Manage orders
    Order {
        #[command(flatten)]
        actor: ActorArgs,

        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Args)]
struct ActorArgs {
    /// User id to act as (0 is anonymous)
    #[arg(long, global = true, default_value_t = 0)]
    actor: i32,

    /// Permission granted to the actor (repeatable)
    #[arg(long = "permission", global = true)]
    permissions: Vec<Permission>,
}

impl ActorArgs {
    fn actor(&self) -> Actor {
        Actor::new(UserId::new(self.actor), self.permissions.iter().copied())
    }
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show an order as JSON
    Show { id: i32 },
    /// Move an order to another status
    Status { id: i32, status: String },
    /// Cancel an order
    Cancel { id: i32 },
    /// Delete an order
    Delete { id: i32 },
}

#[tokio::main]
async fn main() {
    let config = OrdersConfig::from_env();
    let format = config.as_ref().map_or(LogFormat::Text, |config| config.log_format);
    telemetry::init_tracing(format);

    let result = match config {
        Ok(config) => run(Cli::parse(), config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: OrdersConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run(&config).await?,
        Commands::Statuses { file } => commands::statuses::run(&config, file)?,
        Commands::Order { actor, action } => {
            let state = connect(config).await?;
            let orders = state.orders();
            let actor = actor.actor();
            match action {
                OrderAction::Show { id } => commands::orders::show(orders, &actor, OrderId::new(id)).await?,
                OrderAction::Status { id, status } => {
                    commands::orders::set_status(orders, &actor, OrderId::new(id), &status).await?;
                }
                OrderAction::Cancel { id } => commands::orders::cancel(orders, &actor, OrderId::new(id)).await?,
                OrderAction::Delete { id } => commands::orders::delete(orders, &actor, OrderId::new(id)).await?,
            }
        }
    }
    Ok(())
}

async fn connect(config: OrdersConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let pool = db::create_pool(config.require_database_url()?).await?;
    let registry = Arc::new(load_registry(&config)?);
    let store = Arc::new(PgOrderStore::new(pool, Arc::clone(&registry)));
    Ok(AppState::with_registry(config, registry, store)?)
}
