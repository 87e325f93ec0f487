use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use uadm::account;
use uadm::common::config::AdminConfig;
use uadm::directory::cli::UserCommands;
use uadm::directory::commands::handle_user_command;
use uadm::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

/// uadm main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,

    /// Backend host, overriding the configured api_url
    #[arg(long, global = true)]
    host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log in to the backend and persist the session
    Login {
        /// Username to log in as (prompted when omitted)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// Drop the persisted session
    Logout,

    /// Register a new account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
    },

    /// Show the logged-in identity and its directory permissions
    Whoami,

    /// User directory commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    let format = match cli.format {
        FormatArg::Text => ui::OutputFormat::Text,
        FormatArg::Json => ui::OutputFormat::Json,
    };
    ui::init(format, true);

    let mut config = AdminConfig::load()?;
    if let Some(host) = cli.host {
        config.api_url = host.trim_end_matches('/').to_string();
    }

    if ui::is_debug_enabled() {
        ui::emit(
            ui::Level::Debug,
            "config.host",
            &format!("Using backend at {}", config.api_url),
            None,
        );
    }

    match cli.command {
        Commands::Login { username } => account::handle_login(username, &config).await,
        Commands::Logout => account::handle_logout(),
        Commands::Register {
            username,
            first_name,
            last_name,
            email,
        } => account::handle_register(username, first_name, last_name, email, &config).await,
        Commands::Whoami => account::handle_whoami(),
        Commands::User { command } => handle_user_command(command, &config).await,
    }
}
