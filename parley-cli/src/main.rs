//! CLI entry point for parley

mod view;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::{Input, Password};
use parley_auth::{AuthError, AuthGateway, AuthService, LoginForm, SignupForm};
use parley_channels::{ChannelLease, RealtimeChannel, SocketChannel};
use parley_chat::{ChatController, ChatOptions, ChatUpdate};
use parley_core::config::{expand_home, Config, ConfigLoader};
use parley_core::logging::init_logging;
use parley_core::session::{FileStore, SessionGuard, SessionStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Terminal client for authenticated realtime chat")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Log in with an existing account
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Create an account and log in
    Signup {
        #[arg(short, long)]
        username: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the current session
    Status,
    /// Open the chat room
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    if let Commands::Init = cli.command {
        return run_init(&config_loader);
    }

    let config = config_loader.load().context("failed to load configuration")?;
    let _log_guard = init_logging(&config.logging);

    let store = open_store(&config);
    match cli.command {
        Commands::Init => Ok(()),
        Commands::Login { email } => run_login(&config, store, email).await,
        Commands::Signup { username, email } => run_signup(&config, store, username, email).await,
        Commands::Logout => run_logout(&config, store),
        Commands::Status => run_status(store),
        Commands::Chat => run_chat(&config, store).await,
    }
}

fn open_store(config: &Config) -> SessionStore {
    let dir = expand_home(&config.storage.dir);
    SessionStore::new(Arc::new(FileStore::new(dir)), &config.storage.key_prefix)
}

fn auth_service(config: &Config, store: SessionStore) -> Result<AuthService> {
    let gateway = AuthGateway::new(&config.auth)?;
    let ttl = config.session.ttl()?;
    Ok(AuthService::new(gateway, SessionGuard::new(store), ttl))
}

fn run_init(loader: &ConfigLoader) -> Result<()> {
    let path = loader.config_path();
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }
    loader.save(&Config::default())?;
    println!("{} Wrote {}", style("✓").green(), path.display());
    Ok(())
}

async fn run_login(config: &Config, store: SessionStore, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = Password::new().with_prompt("Password").interact()?;

    let service = auth_service(config, store)?;
    info!("Logging in as {}", email);
    let record = service
        .login(&LoginForm::new(email, password))
        .await
        .map_err(report_auth_error)?;

    println!(
        "{} Logged in as {}",
        style("✓").green(),
        style(record.display_name()).bold()
    );
    Ok(())
}

async fn run_signup(
    config: &Config,
    store: SessionStore,
    username: Option<String>,
    email: Option<String>,
) -> Result<()> {
    let username = match username {
        Some(username) => username,
        None => Input::new().with_prompt("Username").interact_text()?,
    };
    let email = match email {
        Some(email) => email,
        None => Input::new().with_prompt("Email").interact_text()?,
    };
    let password = Password::new().with_prompt("Password").interact()?;
    let confirm_password = Password::new().with_prompt("Confirm password").interact()?;

    let service = auth_service(config, store)?;
    let form = SignupForm {
        username,
        email,
        password,
        confirm_password,
    };
    let record = service.signup(&form).await.map_err(report_auth_error)?;

    println!(
        "{} Account created, logged in as {}",
        style("✓").green(),
        style(record.display_name()).bold()
    );
    Ok(())
}

fn report_auth_error(err: AuthError) -> anyhow::Error {
    match err {
        AuthError::Invalid(errors) => {
            for field in &errors.0 {
                eprintln!("  {} {}: {}", style("✗").red(), field.field, field.message);
            }
            anyhow::anyhow!("the form has invalid fields")
        }
        AuthError::Rejected { message, .. } => anyhow::anyhow!(message),
        other => {
            error!("Authentication failed: {}", other);
            anyhow::Error::new(other)
        }
    }
}

fn run_logout(config: &Config, store: SessionStore) -> Result<()> {
    auth_service(config, store)?.logout()?;
    println!("{} Logged out", style("✓").green());
    Ok(())
}

fn run_status(store: SessionStore) -> Result<()> {
    let guard = SessionGuard::new(store.clone());
    match guard.current() {
        Ok(record) => {
            println!("Logged in as {}", style(record.display_name()).bold());
            println!("  user id: {}", record.user_id());
            if let Some(expires) = record.expires_at {
                println!("  expires: {}", expires.to_rfc3339());
            }
        }
        Err(e) => println!("{} {}", style("Not logged in:").yellow(), e),
    }
    println!("  {}", describe_history(&store));
    Ok(())
}

fn describe_history(store: &SessionStore) -> String {
    match store.load_messages() {
        Ok(Some(messages)) => format!("stored messages: {}", messages.len()),
        Ok(None) => "stored messages: none".to_string(),
        Err(e) => format!("{} {}", style("message history unreadable:").red(), e),
    }
}

async fn run_chat(config: &Config, store: SessionStore) -> Result<()> {
    let session = match SessionGuard::new(store.clone()).current() {
        Ok(session) => session,
        Err(e) => bail!("{} (run `parley login` first)", e),
    };

    let channel = Arc::new(SocketChannel::new(&config.realtime));
    channel
        .connect()
        .await
        .with_context(|| format!("failed to connect to {}", config.realtime.url))?;
    let lease = ChannelLease::new(channel);

    let options = ChatOptions::from_config(&config.chat, &config.realtime);
    let mut controller = ChatController::mount(store, lease, &session, options)?;

    println!(
        "{} as {} (type /quit to leave)",
        style("Chat").bold().blue(),
        style(session.display_name()).bold()
    );
    for (message, ownership) in controller.rendered() {
        view::print_message(message, ownership);
    }

    let (out_tx, out_rx) = mpsc::channel::<String>(32);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();

    let input = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim() == "/quit" {
                break;
            }
            if out_tx.send(line).await.is_err() {
                break;
            }
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(update) = update_rx.recv().await {
            match update {
                ChatUpdate::Appended { message, ownership } => {
                    view::print_message(&message, ownership)
                }
                ChatUpdate::SendFailed { reason } => {
                    eprintln!("{} {}", style("not sent:").red(), reason)
                }
                ChatUpdate::Rejected { .. } => {}
            }
        }
    });

    let result = controller.run(out_rx, update_tx).await;
    input.abort();
    let _ = printer.await;
    controller.unmount();

    result?;
    Ok(())
}
