//! Kosh CLI - Personal finance tracker
//!
//! Usage:
//!   kosh init                         Initialize database
//!   kosh import --file statement.csv --account hdfc
//!   kosh process --file statement.pdf --account hdfc
//!   kosh detect                       Detect recurring charges
//!   kosh subscriptions                List subscriptions

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Import {
            file,
            account,
            format,
            allow_duplicates,
            date_col,
            description_col,
            amount_col,
            type_col,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_import(
                &db,
                &config,
                &file,
                &account,
                &format,
                allow_duplicates,
                kosh_core::CsvColumnMap {
                    date: date_col,
                    description: description_col,
                    amount: amount_col,
                    transaction_type: type_col,
                },
            )
        }
        Commands::Process {
            file,
            account,
            password,
            allow_duplicates,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_process(
                &db,
                &config,
                &file,
                &account,
                password.as_deref(),
                allow_duplicates,
            )
            .await
        }
        Commands::Detect { account, dry_run } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_detect(&db, &config, account.as_deref(), dry_run)
        }
        Commands::Subscriptions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(SubscriptionsAction::List) => commands::cmd_subscriptions_list(&db),
                Some(SubscriptionsAction::Confirm { id }) => {
                    commands::cmd_subscriptions_confirm(&db, id)
                }
                Some(SubscriptionsAction::Pause { id }) => commands::cmd_subscriptions_set_status(
                    &db,
                    id,
                    kosh_core::models::SubscriptionStatus::Paused,
                ),
                Some(SubscriptionsAction::Resume { id }) => commands::cmd_subscriptions_set_status(
                    &db,
                    id,
                    kosh_core::models::SubscriptionStatus::Active,
                ),
                Some(SubscriptionsAction::Cancel { id }) => commands::cmd_subscriptions_set_status(
                    &db,
                    id,
                    kosh_core::models::SubscriptionStatus::Cancelled,
                ),
                Some(SubscriptionsAction::Delete { id }) => {
                    commands::cmd_subscriptions_delete(&db, id)
                }
            }
        }
        Commands::Metrics { account } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_metrics(&db, account.as_deref())
        }
        Commands::Merchants { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(MerchantsAction::List { limit: 20 }) => {
                    commands::cmd_merchants_list(&db, 20)
                }
                Some(MerchantsAction::List { limit }) => commands::cmd_merchants_list(&db, limit),
                Some(MerchantsAction::Merge { into, sources }) => {
                    commands::cmd_merchants_merge(&db, into, &sources)
                }
            }
        }
        Commands::Accounts => commands::cmd_accounts(&cli.db, cli.no_encrypt),
        Commands::Transactions { limit, account } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_transactions_list(&db, limit, account.as_deref())
        }
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt).await,
        Commands::Backup { output } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_backup(&db, &output)
        }
        Commands::Restore { file, clear } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_restore(&db, &file, clear)
        }
        Commands::Export {
            output,
            from,
            to,
            account,
        } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_export(
                &db,
                output.as_deref(),
                from.as_deref(),
                to.as_deref(),
                account.as_deref(),
            )
        }
    }
}
