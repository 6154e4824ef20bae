//! Catering CLI - order catering from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (password is read from stdin when --password is omitted)
//! catering login -e budi@example.com
//!
//! # Browse the menu and fill the cart
//! catering menu list --category "Nasi Box"
//! catering cart add 3
//! catering cart inc 3
//!
//! # Place the order for a date and confirm payment
//! catering checkout --date 2025-03-14
//! catering pay 42 --method transfer --address "Jl. Merdeka 1"
//!
//! # Look back
//! catering history
//! catering order 42 --contact
//! ```
//!
//! # Environment Variables
//!
//! See [`catering_client::config`]. Logging is controlled via `RUST_LOG`
//! (default: `catering_client=info,catering_cli=info`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use catering_client::{CancelToken, CateringClient, ClientConfig, ClientError};
use catering_core::{MenuItemId, OrderId, PaymentMethod};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "catering")]
#[command(author, version, about = "Catering ordering client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(short = 'n', long)]
        full_name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short = 't', long)]
        phone: String,

        /// Password (read from stdin if omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Sign out; the next start stays signed out
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Show or edit the profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Browse the menu
    Menu {
        #[command(subcommand)]
        action: MenuAction,
    },
    /// Edit the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Turn the cart into an order
    Checkout {
        /// Catering date (YYYY-MM-DD); defaults to the day after tomorrow
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Confirm payment details for a pending order
    Pay {
        order_id: i64,

        /// `cash`, `transfer` or `ewallet`
        #[arg(short, long)]
        method: PaymentMethod,

        #[arg(short, long)]
        address: String,

        #[arg(short, long, default_value = "")]
        notes: String,
    },
    /// Show payment fields and lines of an order
    Summary { order_id: i64 },
    /// List past orders, newest first
    History,
    /// Show one order
    Order {
        order_id: i64,

        /// Print the WhatsApp link for asking the caterer about it
        #[arg(short, long)]
        contact: bool,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Show the profile
    Show,
    /// Update full name and phone
    Update {
        #[arg(short = 'n', long)]
        full_name: String,

        #[arg(short = 't', long, default_value = "")]
        phone: String,
    },
}

#[derive(Subcommand)]
enum MenuAction {
    /// Home screen categories
    Categories,
    /// Featured available items
    Featured,
    /// Menu items, optionally of one category
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// One menu item
    Show { id: i64 },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a menu item
    Add { id: i64 },
    /// Increase a line's quantity by one
    Inc { id: i64 },
    /// Decrease a line's quantity by one (never below one)
    Dec { id: i64 },
    /// Remove a line
    Remove { id: i64 },
    /// Empty the cart
    Clear,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("catering_client=info,catering_cli=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        commands::print_alert(&e.alert());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = ClientConfig::from_env()?;
    let client = CateringClient::connect(&config).await?;

    // Ctrl-C cancels the running request instead of killing mid-write.
    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(&client, &email, password).await?;
        }
        Commands::Signup {
            full_name,
            email,
            phone,
            password,
        } => commands::account::signup(&client, full_name, email, phone, password).await?,
        Commands::Logout => commands::account::logout(&client).await,
        Commands::Whoami => commands::account::whoami(&client),
        Commands::Profile { action } => match action {
            ProfileAction::Show => commands::account::show_profile(&client).await?,
            ProfileAction::Update { full_name, phone } => {
                commands::account::update_profile(&client, full_name, phone).await?;
            }
        },
        Commands::Menu { action } => match action {
            MenuAction::Categories => commands::menu::categories(&client, &cancel).await?,
            MenuAction::Featured => commands::menu::featured(&client, &cancel).await?,
            MenuAction::List { category } => {
                commands::menu::list(&client, category.as_deref(), &cancel).await?;
            }
            MenuAction::Show { id } => {
                commands::menu::show(&client, MenuItemId::new(id), &cancel).await?;
            }
        },
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&client).await,
            CartAction::Add { id } => {
                commands::cart::add(&client, MenuItemId::new(id), &cancel).await?;
            }
            CartAction::Inc { id } => commands::cart::change(&client, MenuItemId::new(id), 1).await,
            CartAction::Dec { id } => {
                commands::cart::change(&client, MenuItemId::new(id), -1).await;
            }
            CartAction::Remove { id } => commands::cart::remove(&client, MenuItemId::new(id)).await,
            CartAction::Clear => commands::cart::clear(&client).await,
        },
        Commands::Checkout { date } => commands::orders::checkout(&client, date, &cancel).await?,
        Commands::Pay {
            order_id,
            method,
            address,
            notes,
        } => {
            commands::orders::pay(&client, OrderId::new(order_id), method, address, notes, &cancel)
                .await?;
        }
        Commands::Summary { order_id } => {
            commands::orders::summary(&client, OrderId::new(order_id), &cancel).await?;
        }
        Commands::History => commands::orders::history(&client, &cancel).await?,
        Commands::Order { order_id, contact } => {
            commands::orders::detail(&client, OrderId::new(order_id), contact, &cancel).await?;
        }
    }
    Ok(())
}
