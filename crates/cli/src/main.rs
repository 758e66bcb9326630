//! Nexus Market CLI - Command-line storefront.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (prompts for the password when --password is omitted)
//! nm-cli login mira
//!
//! # Browse
//! nm-cli products list --shop 2
//! nm-cli shops list
//!
//! # Build a cart and check out
//! nm-cli cart add 12
//! nm-cli cart show
//! nm-cli checkout
//!
//! # Order history
//! nm-cli orders
//! ```
//!
//! # Commands
//!
//! - `login` / `logout` / `whoami` / `register` - Account session
//! - `products` / `shops` - Catalog browsing and seller product management
//! - `cart` - Persistent cart
//! - `checkout` - Submit the cart as orders
//! - `orders` - Order history
//!
//! Configuration is read from the environment (see
//! [`nexus_market_client::config`]).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use nexus_market_client::{ClientConfig, Marketplace};
use nexus_market_core::{OrderId, OrderStatus, ProductId, Role, TenantId};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "nm-cli")]
#[command(author, version, about = "Nexus Market command-line storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        /// Account username
        username: String,

        /// Password (prompted on stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Create an account
    Register {
        /// Account username
        username: String,

        /// Contact email
        #[arg(short, long)]
        email: String,

        /// Password (prompted on stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Account role (`customer` or `owner`)
        #[arg(short, long, default_value = "customer")]
        role: Role,
    },
    /// Browse and manage products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Browse and open shops
    Shops {
        #[command(subcommand)]
        action: ShopAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place orders for everything in the cart
    Checkout,
    /// Show order history
    Orders {
        #[command(subcommand)]
        action: Option<OrderAction>,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        /// Only products from this shop
        #[arg(short, long)]
        shop: Option<TenantId>,
    },
    /// Show one product
    Show {
        /// Product ID
        id: ProductId,
    },
    /// Add a product to your shop (sellers)
    Create {
        /// Product name
        #[arg(short, long)]
        name: String,

        /// Unit price, e.g. 18.50
        #[arg(short, long)]
        price: String,

        /// Units in stock
        #[arg(short, long, default_value_t = 0)]
        stock: i64,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Change a product in your shop (sellers)
    Update {
        /// Product ID
        id: ProductId,

        /// New name
        #[arg(short, long)]
        name: Option<String>,

        /// New unit price
        #[arg(short, long)]
        price: Option<String>,

        /// New stock level
        #[arg(short, long)]
        stock: Option<i64>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Remove a product from your shop (sellers)
    Delete {
        /// Product ID
        id: ProductId,
    },
}

#[derive(Subcommand)]
enum ShopAction {
    /// List shops
    List,
    /// Show one shop and its products
    Show {
        /// Shop ID
        id: TenantId,
    },
    /// Open a shop owned by the signed-in account
    Create {
        /// Shop name
        #[arg(short, long)]
        name: String,

        /// Unique subdomain
        #[arg(short, long)]
        subdomain: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Add one unit of a product
    Add {
        /// Product ID
        id: ProductId,
    },
    /// Remove one unit of a product
    Dec {
        /// Product ID
        id: ProductId,
    },
    /// Remove a product entirely
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Empty the cart
    Clear,
    /// Show the cart
    Show,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Move a shop order to a new status (sellers)
    SetStatus {
        /// Order ID
        id: OrderId,

        /// New status (pending, paid, shipped, delivered, completed, cancelled)
        status: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Install the tracing subscriber. Logs go to stderr so command output on
/// stdout stays clean.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nexus_market_client=info,nexus_market_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Configuration error: {e}");
            std::process::exit(2);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<(), CommandError> {
    let market = Marketplace::open(config)?;

    match cli.command {
        Commands::Login { username, password } => {
            commands::account::login(&market, &username, password).await?;
        }
        Commands::Logout => commands::account::logout(&market),
        Commands::Whoami => commands::account::whoami(&market),
        Commands::Register {
            username,
            email,
            password,
            role,
        } => {
            commands::account::register(&market, username, email, password, role).await?;
        }
        Commands::Products { action } => match action {
            ProductAction::List { shop } => commands::catalog::list_products(&market, shop).await?,
            ProductAction::Show { id } => commands::catalog::show_product(&market, id).await?,
            ProductAction::Create {
                name,
                price,
                stock,
                description,
            } => {
                commands::catalog::create_product(&market, name, &price, stock, description)
                    .await?;
            }
            ProductAction::Update {
                id,
                name,
                price,
                stock,
                description,
            } => {
                commands::catalog::update_product(
                    &market,
                    id,
                    commands::catalog::ProductChanges {
                        name,
                        price,
                        stock,
                        description,
                    },
                )
                .await?;
            }
            ProductAction::Delete { id } => commands::catalog::delete_product(&market, id).await?,
        },
        Commands::Shops { action } => match action {
            ShopAction::List => commands::catalog::list_shops(&market).await?,
            ShopAction::Show { id } => commands::catalog::show_shop(&market, id).await?,
            ShopAction::Create { name, subdomain } => {
                commands::catalog::create_shop(&market, name, subdomain).await?;
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Add { id } => commands::cart::add(&market, id).await?,
            CartAction::Dec { id } => commands::cart::decrement(&market, id),
            CartAction::Remove { id } => commands::cart::remove(&market, id),
            CartAction::Clear => commands::cart::clear(&market),
            CartAction::Show => commands::cart::show(&market),
        },
        Commands::Checkout => commands::cart::checkout(&market).await?,
        Commands::Orders { action } => match action {
            None => commands::orders::list(&market).await?,
            Some(OrderAction::SetStatus { id, status }) => {
                let status = parse_status(&status)?;
                commands::orders::set_status(&market, id, status).await?;
            }
        },
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<OrderStatus, CommandError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "paid" => Ok(OrderStatus::Paid),
        "shipped" => Ok(OrderStatus::Shipped),
        "delivered" => Ok(OrderStatus::Delivered),
        "completed" => Ok(OrderStatus::Completed),
        "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
        _ => Err(CommandError::InvalidInput(format!(
            "unknown order status '{raw}'"
        ))),
    }
}
