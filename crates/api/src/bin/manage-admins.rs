// SPDX-FileCopyrightText: 2025 Aaron Dewes <aaron@nirvati.org>
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{error::Error, sync::Arc};

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use teammatch_api::{
    admins::{AdminAccount, AdminProvisioner, DEFAULT_ROLE},
    config::AppConfig,
    db,
    identity::PgCredentialStore,
    model::Admin,
    store::PgProfileStore,
};

/// Manage admin accounts.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all admins.
    List,
    /// Create an admin, or update the password of an existing one.
    Create(AccountArgs),
    /// Remove an admin by id or email.
    Remove { admin: String },
    /// Remove every admin, then create a single new one.
    ReplaceAll(AccountArgs),
}

#[derive(Args)]
struct AccountArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name: String,
    #[arg(long, env = "ADMIN_PASSWORD")]
    password: String,
    #[arg(long, default_value = DEFAULT_ROLE)]
    role: String,
}

impl From<AccountArgs> for AdminAccount {
    fn from(args: AccountArgs) -> Self {
        AdminAccount {
            email: args.email,
            name: args.name,
            password: args.password,
            role: args.role,
        }
    }
}

fn print_admin(admin: &Admin) {
    println!(
        "{}  {}  {} ({})",
        admin.id, admin.email, admin.name, admin.role
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let pool = db::connect_pool(&config.database_url).await?;
    let admins = AdminProvisioner::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(PgProfileStore::new(pool)),
    );

    match cli.command {
        Command::List => {
            let all = admins.list().await?;
            if all.is_empty() {
                println!("No admins.");
            }
            all.iter().for_each(print_admin);
        }
        Command::Create(args) => {
            let admin = admins.create(args.into()).await?;
            print_admin(&admin);
        }
        Command::Remove { admin } => {
            let removed = admins.remove(&admin).await?;
            println!("Removed {}", removed.email);
        }
        Command::ReplaceAll(args) => {
            let (removed, created) = admins.replace_all(args.into()).await?;
            for admin in &removed {
                println!("Removed {}", admin.email);
            }
            print_admin(&created);
        }
    }
    Ok(())
}
