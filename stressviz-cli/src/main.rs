//! Stressviz CLI - account commands for the stress visualizer
//!
//! Drives the local directory and session store the way the sign-up, sign-in
//! and navigation screens do: validate the form, call the store, report the
//! outcome.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use stressviz_auth::{
    AuthError, AuthOptions, AuthService, FileStore, LoginForm, MemoryStore, RegistrationForm,
};
use stressviz_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success,
    performance::measure_async, AuthState, KeyValueStore, LoggingConfig, StorageBackend,
    StressvizConfig, StressvizResult,
};
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "stressviz")]
#[command(about = "Local accounts for the stress visualizer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the storage directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Skip the simulated request delay
    #[arg(long)]
    no_latency: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and sign in
    Register {
        /// Full name
        #[arg(long)]
        name: String,

        /// Email address
        #[arg(long)]
        email: String,

        /// Password
        #[arg(long)]
        password: String,

        /// Password again
        #[arg(long)]
        confirm_password: String,
    },

    /// Sign in to an existing account
    Login {
        /// Email address
        #[arg(long)]
        email: String,

        /// Password
        #[arg(long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in account
    Whoami {
        /// Print the account as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show whether anyone is signed in
    Status,

    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Initialize default configuration
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logging_config = LoggingConfig::default();
    if cli.verbose {
        logging_config.level = "debug".to_string();
        logging_config.filter_directives = vec![
            "stressviz=debug".to_string(),
            "stressviz_core=debug".to_string(),
            "stressviz_auth=debug".to_string(),
        ];
    }
    init_logging(&logging_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    debug!("Starting stressviz CLI v{}", env!("CARGO_PKG_VERSION"));

    // `config` may be creating or repairing the file, so it loads on its own
    if let Commands::Config {
        show,
        init,
        validate,
    } = cli.command
    {
        return handle_config(show, init, validate, cli.config.as_ref());
    }

    let config = load_config(cli.config.as_ref())?;
    config.validate()?;
    let auth = build_service(&config, cli.data_dir, cli.no_latency)?;

    let result = match cli.command {
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let form = RegistrationForm::new(&name, &email, &password, &confirm_password);
            handle_register(&auth, form, config.auth.min_password_length).await
        }
        Commands::Login { email, password } => {
            handle_login(&auth, LoginForm::new(&email, &password)).await
        }
        Commands::Logout => handle_logout(&auth),
        Commands::Whoami { json } => handle_whoami(&auth, json),
        Commands::Status => {
            match auth.auth_state() {
                AuthState::Authenticated(user) => println!("🟢 Signed in as {}", user.email),
                AuthState::Anonymous => println!("⚪ Not signed in"),
            }
            Ok(())
        }
        Commands::Config { .. } => unreachable!("handled above"),
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(config_path: Option<&PathBuf>) -> StressvizResult<StressvizConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return StressvizConfig::from_file(path);
    }

    // Try to load from default locations
    let default_paths = [
        dirs::config_dir().map(|d| d.join("stressviz").join("config.toml")),
        dirs::home_dir().map(|d| d.join(".stressviz").join("config.toml")),
        Some(PathBuf::from("stressviz.toml")),
    ];

    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return StressvizConfig::from_file(path);
        }
    }

    debug!("No configuration file found, using defaults");
    Ok(StressvizConfig::default())
}

fn open_storage(
    config: &StressvizConfig,
    data_dir: Option<PathBuf>,
) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match config.storage.backend {
        StorageBackend::File => {
            let dir = data_dir.unwrap_or_else(|| {
                config
                    .storage
                    .resolve_data_dir(dirs::home_dir().as_deref())
            });
            let store = FileStore::open(&dir)
                .with_context(|| format!("Failed to open storage at {}", dir.display()))?;
            Ok(Arc::new(store))
        }
        StorageBackend::Memory => {
            warn!("Memory backend selected; accounts are discarded when the command exits");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_service(
    config: &StressvizConfig,
    data_dir: Option<PathBuf>,
    no_latency: bool,
) -> anyhow::Result<AuthService> {
    let storage = open_storage(config, data_dir)?;

    let mut options = AuthOptions::from(&config.auth);
    if no_latency {
        options = options.with_latency(Duration::ZERO);
    }

    let auth = AuthService::new(storage, options);
    auth.on_session_change(|change| {
        debug!(kind = ?change.kind, signed_in = change.is_signed_in(), "Session changed");
    });
    Ok(auth)
}

/// Message shown for a failed submission; storage trouble gets a generic line
fn failure_message(error: &AuthError, fallback: &str) -> String {
    if error.is_storage_failure() {
        fallback.to_string()
    } else {
        error.to_string()
    }
}

async fn handle_register(
    auth: &AuthService,
    form: RegistrationForm,
    min_password_length: usize,
) -> anyhow::Result<()> {
    log_operation_start!("register");

    if auth.options().latency > Duration::ZERO {
        println!("⏳ Creating account...");
    }

    match measure_async("register", form.submit(auth, min_password_length)).await {
        Ok(user) => {
            log_operation_success!("register", user_id = %user.id);
            println!("✅ Welcome, {}! You are signed in as {}", user.name, user.email);
            Ok(())
        }
        Err(e) => {
            log_operation_error!("register", e);
            Err(anyhow::anyhow!(failure_message(&e, "Failed to register")))
        }
    }
}

async fn handle_login(auth: &AuthService, form: LoginForm) -> anyhow::Result<()> {
    log_operation_start!("login");

    if auth.options().latency > Duration::ZERO {
        println!("⏳ Signing in...");
    }

    match measure_async("login", form.submit(auth)).await {
        Ok(user) => {
            log_operation_success!("login", user_id = %user.id);
            println!("✅ Welcome back, {}!", user.name);
            Ok(())
        }
        Err(e) => {
            log_operation_error!("login", e);
            Err(anyhow::anyhow!(failure_message(&e, "Failed to login")))
        }
    }
}

fn handle_logout(auth: &AuthService) -> anyhow::Result<()> {
    let was_signed_in = auth.is_authenticated();
    auth.logout()?;

    if was_signed_in {
        println!("👋 Signed out");
    } else {
        println!("⚪ Not signed in");
    }
    Ok(())
}

fn handle_whoami(auth: &AuthService, json: bool) -> anyhow::Result<()> {
    match auth.get_current_user() {
        Some(user) if json => println!("{}", serde_json::to_string_pretty(&user)?),
        Some(user) => {
            println!("👤 {}", user.name);
            println!("📧 {}", user.email);
            println!("🆔 {}", user.id);
        }
        None if json => println!("null"),
        None => println!("⚪ Not signed in"),
    }
    Ok(())
}

fn handle_config(
    show: bool,
    init: bool,
    validate: bool,
    config_path: Option<&PathBuf>,
) -> anyhow::Result<()> {
    if init {
        let path = config_path.cloned().unwrap_or_else(get_config_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        StressvizConfig::default().save_to_file(&path)?;
        println!("✅ Configuration initialized at: {:?}", path);
    }

    if show {
        let config = load_config(config_path)?;
        println!("📋 Current configuration:");
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if validate {
        let config = load_config(config_path)?;
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => anyhow::bail!("Configuration validation failed: {}", e),
        }
    }

    Ok(())
}

/// Get the default configuration file path
fn get_config_path() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|d| d.join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stressviz")
        .join("config.toml")
}
