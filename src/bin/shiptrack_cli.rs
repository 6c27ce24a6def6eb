use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use shiptrack_api::{
    auth::{session::SessionHub, user::UserRole},
    config::{self, AppConfig},
    db::{self, DbPool},
    services::users::{CreateUserRequest, UserResponse, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let context = CliContext::initialize().await?;

    match cli.command {
        Commands::Migrate => handle_migrate(&context).await?,
        Commands::CreateUser(args) => handle_create_user(&context, args, cli.json).await?,
        Commands::ListUsers => handle_list_users(&context, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "shiptrack", about = "Shiptrack operator CLI", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Create a confirmed account
    CreateUser(CreateUserArgs),
    /// List accounts
    ListUsers,
}

#[derive(Args)]
struct CreateUserArgs {
    #[arg(long, help = "Display name for the account")]
    name: String,
    #[arg(long, help = "Email address for the account")]
    email: String,
    #[arg(long, help = "Password for the account (at least 6 characters)")]
    password: String,
    #[arg(long, default_value = "operator", help = "Role: admin or operator")]
    role: UserRole,
}

struct CliContext {
    config: AppConfig,
    db: Arc<DbPool>,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;

        Ok(Self {
            config,
            db: Arc::new(db_pool),
        })
    }

    fn user_service(&self) -> UserService {
        UserService::new(self.db.clone(), None, SessionHub::init())
    }
}

async fn handle_migrate(context: &CliContext) -> Result<()> {
    db::run_migrations(&context.db)
        .await
        .context("failed to run migrations")?;
    println!("Migrations applied to {}", context.config.database_url);
    Ok(())
}

async fn handle_create_user(context: &CliContext, args: CreateUserArgs, json: bool) -> Result<()> {
    let request = CreateUserRequest {
        name: args.name,
        email: args.email,
        password: args.password,
        role: Some(args.role),
    };

    let user = context
        .user_service()
        .create(request)
        .await
        .context("failed to create user")?;

    if json {
        print_json(&user)?;
    } else {
        println!("Created user:");
        render_user(&user);
    }
    Ok(())
}

async fn handle_list_users(context: &CliContext, json: bool) -> Result<()> {
    let users = context
        .user_service()
        .list()
        .await
        .context("failed to list users")?;

    if json {
        print_json(&users)?;
    } else if users.is_empty() {
        println!("No users found");
    } else {
        for user in &users {
            render_user(user);
        }
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_user(user: &UserResponse) {
    println!(
        "- {} <{}> • {} • {} • id {}",
        user.name,
        user.email,
        user.role,
        if user.active { "active" } else { "inactive" },
        user.id
    );
}
