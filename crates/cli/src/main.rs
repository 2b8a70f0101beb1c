//! Cartify CLI - browse, shop and manage a Cartify marketplace account.
//!
//! # Usage
//!
//! ```bash
//! # Check the API is up
//! cartify health
//!
//! # Sign in (password from the environment or stdin, never argv)
//! CARTIFY_PASSWORD=... cartify login -e ada@example.com
//! pass show cartify | cartify login -e ada@example.com --password-stdin
//!
//! # Browse and fill the cart
//! cartify products --search ankara
//! cartify cart add 64f1c2 -q 2
//! cartify cart sync --policy server-wins
//!
//! # Place the order
//! cartify checkout --street "12 Marina" --city "Lagos Island" --state Lagos --phone 08030000000
//! ```
//!
//! # Commands
//!
//! - `health` - Probe the API
//! - `login` / `logout` / `whoami` - Session management
//! - `products` / `product` - Catalog
//! - `cart` - Local cart, mirrored to the server when signed in
//! - `orders` / `checkout` - Orders
//! - `payouts` - Seller wallet and withdrawals
//! - `messages` - Conversations

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use secrecy::ExposeSecret;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cartify_client::{Cartify, FileStorage, ReconcilePolicy};

mod commands;
mod settings;

use settings::Settings;

#[derive(Parser)]
#[command(name = "cartify")]
#[command(author, version, about = "Cartify marketplace CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the API health endpoint
    Health,
    /// Sign in and store the session
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Read the password from stdin instead of `CARTIFY_PASSWORD`
        #[arg(long)]
        password_stdin: bool,
    },
    /// Sign out and clear the stored session and cart
    Logout,
    /// Show the signed-in user
    Whoami {
        /// Re-fetch the user from the server
        #[arg(long)]
        refresh: bool,
    },
    /// List products
    Products {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(long)]
        page: Option<u32>,
    },
    /// Show one product
    Product {
        /// Product ID
        id: String,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// List or cancel orders
    Orders {
        #[command(subcommand)]
        action: Option<OrderAction>,
    },
    /// Place an order for everything in the cart
    Checkout {
        #[arg(long)]
        street: String,

        #[arg(long)]
        city: String,

        #[arg(long)]
        state: String,

        #[arg(long)]
        lga: Option<String>,

        #[arg(long)]
        phone: String,

        /// Payment method (`card`, `transfer`, `wallet`)
        #[arg(long, default_value = "card")]
        payment: String,
    },
    /// Seller wallet and payouts
    Payouts {
        #[command(subcommand)]
        action: Option<PayoutAction>,
    },
    /// Conversations and messages
    Messages {
        #[command(subcommand)]
        action: Option<MessageAction>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the local cart
    Show,
    /// Add a product
    Add {
        /// Product ID
        id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Set {
        /// Product ID
        id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Product ID
        id: String,
    },
    /// Empty the cart
    Clear,
    /// Reconcile the local cart with the server
    Sync {
        /// Which side wins when they differ
        #[arg(long, value_enum)]
        policy: PolicyArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Replace the local cart with the server's
    ServerWins,
    /// Push the local cart to the server
    KeepLocal,
}

impl From<PolicyArg> for ReconcilePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::ServerWins => Self::ServerWins,
            PolicyArg::KeepLocal => Self::KeepLocal,
        }
    }
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders
    List,
    /// Show one order
    Show { id: String },
    /// Cancel a pending or confirmed order
    Cancel { id: String },
}

#[derive(Subcommand)]
enum PayoutAction {
    /// Show wallet balance and payout history
    List,
    /// Request a withdrawal
    Request {
        #[arg(long)]
        amount: Decimal,

        #[arg(long)]
        bank_name: String,

        #[arg(long)]
        account_number: String,

        #[arg(long)]
        account_name: String,
    },
}

#[derive(Subcommand)]
enum MessageAction {
    /// List conversations
    List,
    /// Show a conversation's messages
    Show { conversation: String },
    /// Send a message
    Send { conversation: String, text: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.expose_secret(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: settings
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let _sentry_guard = init_sentry(&settings);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartify=info,cartify_client=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, settings).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let storage = Arc::new(FileStorage::open(&settings.storage_path));
    let cartify = Cartify::new(settings.client, storage)?;

    match cli.command {
        Commands::Health => commands::session::health(&cartify).await?,
        Commands::Login {
            email,
            password_stdin,
        } => {
            let password = commands::session::read_password(
                password_stdin,
                std::env::var("CARTIFY_PASSWORD").ok(),
                std::io::stdin().lock(),
            )?;
            commands::session::login(&cartify, &email, &password).await?;
        }
        Commands::Logout => commands::session::logout(&cartify).await,
        Commands::Whoami { refresh } => commands::session::whoami(&cartify, refresh).await?,
        Commands::Products {
            search,
            category,
            page,
        } => commands::shop::products(&cartify, search, category, page).await?,
        Commands::Product { id } => commands::shop::product(&cartify, &id).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::shop::show_cart(&cartify),
            CartAction::Add { id, quantity } => {
                commands::shop::add_to_cart(&cartify, &id, quantity).await?;
            }
            CartAction::Set { id, quantity } => {
                commands::shop::set_quantity(&cartify, &id, quantity).await?;
            }
            CartAction::Remove { id } => commands::shop::remove_from_cart(&cartify, &id).await?,
            CartAction::Clear => commands::shop::clear_cart(&cartify).await?,
            CartAction::Sync { policy } => {
                commands::shop::sync_cart(&cartify, policy.into()).await?;
            }
        },
        Commands::Orders { action } => match action.unwrap_or(OrderAction::List) {
            OrderAction::List => commands::shop::orders(&cartify).await?,
            OrderAction::Show { id } => commands::shop::order(&cartify, &id).await?,
            OrderAction::Cancel { id } => commands::shop::cancel_order(&cartify, &id).await?,
        },
        Commands::Checkout {
            street,
            city,
            state,
            lga,
            phone,
            payment,
        } => {
            let address = cartify_client::api::types::Address {
                street,
                city,
                state,
                lga,
                phone,
            };
            commands::shop::checkout(&cartify, address, &payment).await?;
        }
        Commands::Payouts { action } => match action.unwrap_or(PayoutAction::List) {
            PayoutAction::List => commands::seller::payouts(&cartify).await?,
            PayoutAction::Request {
                amount,
                bank_name,
                account_number,
                account_name,
            } => {
                let bank = cartify_core::BankAccount {
                    bank_name,
                    account_number,
                    account_name,
                };
                commands::seller::request_payout(&cartify, amount, bank).await?;
            }
        },
        Commands::Messages { action } => match action.unwrap_or(MessageAction::List) {
            MessageAction::List => commands::messages::conversations(&cartify).await?,
            MessageAction::Show { conversation } => {
                commands::messages::show(&cartify, &conversation).await?;
            }
            MessageAction::Send { conversation, text } => {
                commands::messages::send(&cartify, &conversation, &text).await?;
            }
        },
    }
    Ok(())
}
