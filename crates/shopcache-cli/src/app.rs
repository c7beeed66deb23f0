use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use shopcache_core::auth::{CredentialStore, Session, SessionData};
use shopcache_core::{ApiClient, CacheMirror, Config, DataStore, Feed, PreloadStatus, ResourceKey};

use crate::render::{self, ProgressPrinter};

/// Environment variables that skip the interactive login prompts
const USERNAME_ENV: &str = "SHOPCACHE_USERNAME";
const PASSWORD_ENV: &str = "SHOPCACHE_PASSWORD";

/// Where the password for a login came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PasswordOrigin {
    Environment,
    Keychain,
    Prompt,
}

/// What the prompt loop should do after a command
enum Flow {
    Continue,
    Quit,
}

pub struct App {
    config: Config,
    session: Session,
    api: ApiClient,
    store: DataStore,
}

impl App {
    /// Cache directory for session, marker and log files
    pub fn resolve_cache_dir() -> PathBuf {
        Config::cache_dir().unwrap_or_else(|_| PathBuf::from(".shopcache"))
    }

    /// Expects tracing to be initialized so load failures are logged.
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        let config = Config::load().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        });

        let mut session = Session::new(cache_dir);
        if let Err(e) = session.load() {
            warn!(error = %e, "Failed to load session");
        }

        let mut api = ApiClient::new(&config.api_base_url())?;
        if let Some(token) = session.token() {
            api.set_token(token);
        }
        let store = Self::build_store(&api, &session, &config);

        Ok(Self {
            config,
            session,
            api,
            store,
        })
    }

    /// The store's source carries the bearer token, so each login gets a fresh store.
    fn build_store(api: &ApiClient, session: &Session, config: &Config) -> DataStore {
        DataStore::new(
            Arc::new(api.clone()),
            session.preload_marker(),
            config.store_config(),
        )
    }

    pub fn api_base_url(&self) -> String {
        self.api.base_url().to_string()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_valid()
    }

    /// Whether a preload already finished during this login session
    pub fn already_preloaded(&self) -> bool {
        self.session.preload_marker().is_set()
    }

    // =========================================================================
    // Login / logout
    // =========================================================================

    pub async fn login_interactive(&mut self) -> Result<()> {
        let email = match std::env::var(USERNAME_ENV).ok().filter(|s| !s.is_empty()) {
            Some(email) => email,
            None => prompt_line("Email", self.config.last_username.as_deref())?,
        };
        if email.is_empty() {
            anyhow::bail!("Email required");
        }

        let (password, origin) = self.resolve_password(&email)?;
        match self.attempt_login(&email, &password).await {
            Ok(()) => {
                if origin == PasswordOrigin::Prompt && confirm("Remember password in keychain?")? {
                    if let Err(e) = CredentialStore::for_account(&email).save(&password) {
                        warn!(error = %e, "Failed to store credentials");
                    }
                }
                Ok(())
            }
            Err(e) => {
                if origin == PasswordOrigin::Keychain {
                    // Stale keychain entry; prompt next time
                    if let Err(e) = CredentialStore::for_account(&email).forget() {
                        warn!(error = %e, "Failed to remove stale keychain entry");
                    }
                }
                Err(e)
            }
        }
    }

    fn resolve_password(&self, email: &str) -> Result<(String, PasswordOrigin)> {
        if let Some(password) = std::env::var(PASSWORD_ENV).ok().filter(|s| !s.is_empty()) {
            return Ok((password, PasswordOrigin::Environment));
        }
        match CredentialStore::for_account(email).password() {
            Ok(Some(password)) => return Ok((password, PasswordOrigin::Keychain)),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Keychain unavailable, prompting for password"),
        }
        let password = rpassword::prompt_password("Password: ").context("Failed to read password")?;
        Ok((password, PasswordOrigin::Prompt))
    }

    async fn attempt_login(&mut self, email: &str, password: &str) -> Result<()> {
        if password.is_empty() {
            anyhow::bail!("Email and password required");
        }

        let login = match self.api.authenticate(email, password).await {
            Ok(login) => login,
            Err(e) => {
                error!(error = %e, "Login failed");
                let text = format!("{:#}", e).to_lowercase();
                let user_message = if text.contains("401") || text.contains("unauthorized") {
                    "Invalid email or password".to_string()
                } else if text.contains("network") || text.contains("connect") {
                    "Unable to connect to server. Check your internet connection.".to_string()
                } else if text.contains("timeout") || text.contains("timed out") {
                    "Connection timed out. Please try again.".to_string()
                } else {
                    format!("Login failed: {}", e)
                };
                return Err(e.context(user_message));
            }
        };

        // Whatever the previous login cached must not leak into this one
        self.store.reset();

        self.api.set_token(&login.token);
        self.session
            .update(SessionData::new(login.token, login.user, email))?;
        if let Err(e) = self.session.save() {
            warn!(error = %e, "Failed to save session");
        }

        self.config.last_username = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        self.store = Self::build_store(&self.api, &self.session, &self.config);
        if let Some(user) = self.session.user() {
            info!(role = ?user.role, "Login successful");
            eprintln!("Logged in as {} ({}).", user.name, user.role.display_name());
        }
        Ok(())
    }

    pub fn logout(&mut self, forget_password: bool) {
        let email = self.session.data.as_ref().map(|d| d.email.clone());

        self.store.reset();
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        if forget_password {
            if let Some(email) = email.or_else(|| self.config.last_username.clone()) {
                if let Err(e) = CredentialStore::for_account(&email).forget() {
                    warn!(error = %e, "Failed to delete stored credentials");
                }
            }
        }
        info!("Logged out");
    }

    // =========================================================================
    // Preload
    // =========================================================================

    /// Run a preload, printing each step as it settles.
    pub async fn preload(&mut self) {
        let Some(user) = self.session.user().cloned() else {
            eprintln!("Not logged in.");
            return;
        };

        eprintln!("Loading data for {}...", user.role.display_name());
        let mut rx = self.store.subscribe();
        rx.borrow_and_update();
        let mut printer = ProgressPrinter::default();

        let run = self.store.run(&user);
        tokio::pin!(run);
        let snapshot = loop {
            tokio::select! {
                snapshot = &mut run => break snapshot,
                changed = rx.changed() => match changed {
                    Ok(()) => printer.show(&rx.borrow_and_update()),
                    Err(_) => break (&mut run).await,
                },
            }
        };
        printer.show(&snapshot);
        render::print_summary(&snapshot);
    }

    // =========================================================================
    // Prompt
    // =========================================================================

    pub async fn run_prompt(&mut self) -> Result<()> {
        eprintln!("Type `help` for commands.");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            eprint!("shopcache> ");
            let _ = std::io::stderr().flush();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match self.handle_command(line).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => eprintln!("Error: {:#}", e),
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, line: &str) -> Result<Flow> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();

        match command {
            "help" | "?" => print_help(),
            "status" => render::print_status(&self.store),
            "steps" => render::print_checklist(&self.store.snapshot()),
            "get" | "refresh" if reads_blocked(self.store.status(), self.store.is_preloaded()) => {
                eprintln!("Data is not ready. Type `retry` to run the preload again, or `logout`.");
            }
            "get" => {
                let key = parse_key(args.first())?;
                let as_json = args.iter().any(|a| *a == "--json");
                self.show(key, as_json).await?;
            }
            "refresh" => {
                let key = parse_key(args.first())?;
                let data = self.store.refresh(key).await?;
                eprintln!("{}: {} record(s) refreshed.", key.label(), data.len());
            }
            "preload" | "retry" => self.preload().await,
            "logout" => {
                self.logout(false);
                eprintln!("Logged out.");
                return Ok(Flow::Quit);
            }
            "quit" | "exit" => return Ok(Flow::Quit),
            other => eprintln!("Unknown command: {}. Type `help`.", other),
        }
        Ok(Flow::Continue)
    }

    async fn show(&self, key: ResourceKey, as_json: bool) -> Result<()> {
        let mirror = CacheMirror::mount(&self.store, &[key], self.session.user()).await;
        let Some(data) = mirror.get(key) else {
            eprintln!("{}: nothing to show.", key.label());
            return Ok(());
        };

        if as_json {
            println!("{}", serde_json::to_string_pretty(&data.to_json()?)?);
            return Ok(());
        }

        let origin = match mirror.feed() {
            Feed::Cached => format!("cached, updated {}", self.store.entry(key).age_display()),
            Feed::Uncached => "fetched directly".to_string(),
        };
        eprintln!("{} ({} record(s), {})", key.label(), data.len(), origin);
        for line in render::dataset_lines(data)? {
            println!("  {}", line);
        }
        Ok(())
    }
}

/// Reads wait for readiness once a run has started. Before any run
/// (`Idle`) views may still fetch directly.
fn reads_blocked(status: PreloadStatus, is_preloaded: bool) -> bool {
    !is_preloaded && status != PreloadStatus::Idle
}

fn parse_key(arg: Option<&&str>) -> Result<ResourceKey> {
    let name = arg.ok_or_else(|| anyhow::anyhow!("Missing resource name"))?;
    name.parse::<ResourceKey>().map_err(anyhow::Error::msg)
}

fn print_help() {
    eprintln!("Commands:");
    eprintln!("  status                  Run state and every cached resource");
    eprintln!("  steps                   Checklist of the last preload");
    eprintln!("  get <resource> [--json] Show a resource");
    eprintln!("  refresh <resource>      Re-fetch one resource");
    eprintln!("  preload | retry         Run the preload again");
    eprintln!("  logout                  Clear the session and cache");
    eprintln!("  quit                    Exit");
    let names: Vec<&str> = ResourceKey::ALL.iter().map(|k| k.as_str()).collect();
    eprintln!();
    eprintln!("Resources: {}", names.join(", "));
}

fn prompt_line(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => eprint!("{} [{}]: ", label, default),
        None => eprint!("{}: ", label),
    }
    std::io::stderr().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let input = input.trim();
    if input.is_empty() {
        Ok(default.unwrap_or_default().to_string())
    } else {
        Ok(input.to_string())
    }
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt_line(&format!("{} [y/N]", question), None)?;
    Ok(matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes"))
}
