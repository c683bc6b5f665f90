use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use github_fork_update::github::AuthStrategy;
use github_fork_update::remote::split_full_name;
use github_fork_update::{version, Config, ForkRemote, ForkSync, GitHubClient};

#[derive(Parser)]
#[command(name = "github-fork-update")]
#[command(about = "Merge upstream changes into every fork you own")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// GitHub Auth Token
    #[arg(long, global = true)]
    auth: Option<String>,

    /// Configuration file path (defaults to XDG config location)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Log Debug
    #[arg(long, global = true)]
    debug: bool,

    /// Show Verbose Logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge upstream into every fork (default)
    Sync {
        /// Sync forks of this user instead of the authenticated user
        #[arg(long)]
        user: Option<String>,
    },

    /// List forks without merging anything
    List {
        /// List forks of this user instead of the authenticated user
        #[arg(long)]
        user: Option<String>,
    },

    /// List organizations a user belongs to
    Orgs {
        /// List organizations of this user instead of the authenticated user
        #[arg(long)]
        user: Option<String>,
    },

    /// List every fork of a repository
    Forks {
        /// Repository as OWNER/NAME
        #[arg(long)]
        repo: String,
    },

    /// Manage authentication
    Auth {
        #[command(subcommand)]
        auth_command: AuthCommands,
    },
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Show authentication status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(cli.debug, &config)?;

    info!("Starting github-fork-update v{}", env!("CARGO_PKG_VERSION"));

    let report = version::report(cli.verbose, cli.debug);
    if !report.is_empty() {
        print!("{}", report);
    }

    let (strategy, token) = GitHubClient::resolve_token(cli.auth.as_deref(), &config)?;
    info!("Using authentication strategy: {:?}", strategy);

    let client = GitHubClient::new(&token, config.github.api_url.as_deref())?;

    match cli.command {
        None => cmd_sync(&client, None, cli.verbose, cli.debug, &config).await,
        Some(Commands::Sync { user }) => {
            cmd_sync(&client, user, cli.verbose, cli.debug, &config).await
        }
        Some(Commands::List { user }) => cmd_list(&client, user, &config).await,
        Some(Commands::Orgs { user }) => cmd_orgs(&client, user, &config).await,
        Some(Commands::Forks { repo }) => cmd_forks(&client, &repo).await,
        Some(Commands::Auth { auth_command }) => cmd_auth(auth_command, &client, strategy).await,
    }
}

/// Initialize logging to stderr; stdout carries only report lines
fn init_logging(debug: bool, config: &Config) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .context("Invalid logging.level in configuration")?
    };

    let layer = fmt::layer().with_writer(std::io::stderr);

    match config.logging.format.as_str() {
        "full" => tracing_subscriber::registry()
            .with(layer)
            .with(filter)
            .init(),
        _ => tracing_subscriber::registry()
            .with(layer.compact())
            .with(filter)
            .init(),
    }

    Ok(())
}

/// Load configuration from specified path or default location
fn load_config(config_path: Option<&std::path::Path>) -> Result<Config> {
    match config_path {
        Some(path) => Config::load(path),
        None => Config::load_or_default(),
    }
}

/// Merge upstream into every fork
async fn cmd_sync(
    client: &GitHubClient,
    user: Option<String>,
    verbose: bool,
    debug: bool,
    config: &Config,
) -> Result<()> {
    let identity = user.unwrap_or_else(|| config.github.username.clone());
    let sync = ForkSync::new(client, config.sync_options(verbose, debug));
    let mut stdout = std::io::stdout();

    let summary = match config.run_timeout() {
        Some(limit) => tokio::time::timeout(limit, sync.sync_forks(&identity, &mut stdout))
            .await
            .with_context(|| format!("Fork sync timed out after {}s", limit.as_secs()))??,
        None => sync.sync_forks(&identity, &mut stdout).await?,
    };

    stdout.flush()?;

    info!(
        "Processed {} repositories: {} forks updated, {} already up to date",
        summary.repositories_seen, summary.forks_updated, summary.forks_up_to_date
    );

    Ok(())
}

/// List forks that a sync would touch
async fn cmd_list(client: &GitHubClient, user: Option<String>, config: &Config) -> Result<()> {
    let identity = user.unwrap_or_else(|| config.github.username.clone());
    let sync = ForkSync::new(client, config.sync_options(false, false));

    let forks = sync.list_forks(&identity).await?;

    println!("Forks ({}):", forks.len());
    for fork in forks {
        println!("  {} ({})", fork.full_name(), fork.default_branch);
    }

    Ok(())
}

/// List organizations of a user
async fn cmd_orgs(client: &GitHubClient, user: Option<String>, config: &Config) -> Result<()> {
    let identity = user.unwrap_or_else(|| config.github.username.clone());

    let orgs = client
        .all_organizations(&identity)
        .await
        .context("ListOrganizations error")?;

    println!("Organizations ({}):", orgs.len());
    for org in orgs {
        println!("  {}", org);
    }

    Ok(())
}

/// List forks of one repository
async fn cmd_forks(client: &GitHubClient, repo: &str) -> Result<()> {
    let (owner, name) = split_full_name(repo)
        .with_context(|| format!("Expected OWNER/NAME, got {:?}", repo))?;

    let forks = client
        .all_forks(owner, name)
        .await
        .with_context(|| format!("ListForks error: repo '{}'", repo))?;

    println!("Forks of {} ({}):", repo, forks.len());
    for fork in forks {
        println!("  {} ({})", fork.full_name(), fork.default_branch);
    }

    Ok(())
}

/// Handle authentication commands
async fn cmd_auth(
    auth_command: AuthCommands,
    client: &GitHubClient,
    strategy: AuthStrategy,
) -> Result<()> {
    match auth_command {
        AuthCommands::Status => {
            let login = client
                .get_user("")
                .await
                .context("Authentication failed")?;

            println!("Authentication successful");
            println!("   Username: {}", login);
            println!("   Source:   {:?}", strategy);
            Ok(())
        }
    }
}
