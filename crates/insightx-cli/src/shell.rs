//! Line-oriented interactive shell.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use insightx_core::auth::token;
use insightx_core::export::{self, ReportData, ReportFormat};
use insightx_core::insights;
use insightx_core::utils::format_bytes;
use insightx_core::{ApiClient, ApiError, Config, ExpiryWatcher, SessionEndReason, SessionEvent};

use crate::render;

const HELP: &str = "\
Commands:
  login [email]                      Log in (prompts for the password)
  register                           Create an account
  logout                             End the session
  whoami                             Show the logged-in user
  datasets                           List your datasets
  upload <path>                      Upload a CSV or Excel file
  preview <id>                       Show the first rows of a dataset
  delete <id>                        Delete a dataset
  summary <id>                       Column profiles and statistics
  correlation <id>                   Strong correlations
  outliers <id>                      Outlier analysis
  refresh <id>                       Recompute analytics on the server
  insights <id>                      Narrative insights
  export <id> <html|csv|xlsx|json> [dir]
                                     Write a report (print the HTML one for PDF)
  help                               Show this help
  quit                               Exit
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login(Option<String>),
    Register,
    Logout,
    Whoami,
    Datasets,
    Upload(PathBuf),
    Preview(String),
    Delete(String),
    Summary(String),
    Correlation(String),
    Outliers(String),
    Refresh(String),
    Insights(String),
    Export {
        dataset_id: String,
        format: ReportFormat,
        dir: Option<PathBuf>,
    },
    Help,
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines parse to `None`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        let one = |usage: &str| -> Result<String, String> {
            match args.as_slice() {
                [arg] => Ok(arg.to_string()),
                _ => Err(format!("Usage: {}", usage)),
            }
        };
        let none = |command: Command| -> Result<Command, String> {
            if args.is_empty() {
                Ok(command)
            } else {
                Err(format!("`{}` takes no arguments", name))
            }
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "login" => match args.as_slice() {
                [] => Command::Login(None),
                [email] => Command::Login(Some(email.to_string())),
                _ => return Err("Usage: login [email]".to_string()),
            },
            "register" | "signup" => none(Command::Register)?,
            "logout" => none(Command::Logout)?,
            "whoami" => none(Command::Whoami)?,
            "datasets" | "ls" => none(Command::Datasets)?,
            "upload" => {
                // Paths may contain spaces
                if args.is_empty() {
                    return Err("Usage: upload <path>".to_string());
                }
                Command::Upload(PathBuf::from(args.join(" ")))
            }
            "preview" => Command::Preview(one("preview <id>")?),
            "delete" | "rm" => Command::Delete(one("delete <id>")?),
            "summary" => Command::Summary(one("summary <id>")?),
            "correlation" => Command::Correlation(one("correlation <id>")?),
            "outliers" => Command::Outliers(one("outliers <id>")?),
            "refresh" => Command::Refresh(one("refresh <id>")?),
            "insights" => Command::Insights(one("insights <id>")?),
            "export" => match args.as_slice() {
                [id, format] | [id, format, _] => Command::Export {
                    dataset_id: id.to_string(),
                    format: format.parse()?,
                    dir: args.get(2).map(PathBuf::from),
                },
                _ => return Err("Usage: export <id> <html|csv|xlsx|json> [dir]".to_string()),
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("Unknown command '{}'. Type `help` for a list.", other)),
        };
        Ok(Some(command))
    }

    fn needs_session(&self) -> bool {
        !matches!(
            self,
            Command::Login(_) | Command::Register | Command::Whoami | Command::Help | Command::Quit
        )
    }
}

fn session_notice(reason: SessionEndReason) -> Option<&'static str> {
    match reason {
        SessionEndReason::LoggedOut => None,
        SessionEndReason::Expired => Some("Your session has expired. Please log in again."),
        SessionEndReason::Unauthorized | SessionEndReason::RefreshFailed => {
            Some("Your session is no longer valid. Please log in again.")
        }
    }
}

pub struct Shell {
    client: ApiClient,
    watcher: ExpiryWatcher,
    config: Config,
    events: broadcast::Receiver<SessionEvent>,
    input: Lines<BufReader<Stdin>>,
}

impl Shell {
    pub fn new(client: ApiClient, watcher: ExpiryWatcher, config: Config) -> Self {
        let events = client.store().subscribe();
        Self {
            client,
            watcher,
            config,
            events,
            input: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    /// Read commands until `quit` or end of input.
    pub async fn run(&mut self) -> Result<()> {
        println!("InsightX client ({}). Type `help` for commands.", self.client.base_url());
        loop {
            prompt("insightx> ")?;
            let line = tokio::select! {
                line = self.input.next_line() => line.context("Failed to read input")?,
                event = self.events.recv() => {
                    self.on_event(event);
                    continue;
                }
            };
            let Some(line) = line else {
                println!();
                return Ok(());
            };

            let command = match Command::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(message) => {
                    println!("{}", message);
                    continue;
                }
            };
            if command == Command::Quit {
                return Ok(());
            }

            // Catch an expiry between watcher ticks before acting on it
            self.watcher.check_now();
            self.drain_events();

            if command.needs_session() && !self.client.store().is_session_valid() {
                println!("Not logged in. Use `login` first.");
                continue;
            }
            if let Err(e) = self.dispatch(command).await {
                println!("Error: {}", e);
            }
            self.drain_events();
        }
    }

    fn on_event(&self, event: Result<SessionEvent, RecvError>) {
        match event {
            Ok(SessionEvent::Ended(reason)) => {
                debug!(%reason, "Session ended");
                if let Some(notice) = session_notice(reason) {
                    println!("\n{}", notice);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed session events"),
            // The store lives as long as the client, so this never closes
            Err(RecvError::Closed) => {}
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.on_event(Ok(event));
        }
    }

    async fn dispatch(&mut self, command: Command) -> Result<(), ApiError> {
        match command {
            Command::Login(email) => self.login(email).await?,
            Command::Register => self.register().await?,
            Command::Logout => {
                self.client.logout().await;
                println!("Logged out.");
            }
            Command::Whoami => self.whoami(),
            Command::Datasets => {
                let list = self.client.list_datasets().await?;
                print!("{}", render::datasets(&list));
            }
            Command::Upload(path) => {
                if let Ok(metadata) = tokio::fs::metadata(&path).await {
                    println!("Uploading {} ({})...", path.display(), format_bytes(metadata.len()));
                }
                let uploaded = self.client.upload_dataset(&path).await?;
                println!(
                    "Uploaded {} ({} rows, {} columns). Dataset id: {}",
                    uploaded.filename, uploaded.rows, uploaded.columns, uploaded.dataset_id
                );
            }
            Command::Preview(id) => {
                let preview = self.client.dataset_preview(&id).await?;
                print!("{}", render::preview(&preview));
            }
            Command::Delete(id) => {
                let answer = self.read_line(&format!("Delete dataset {}? [y/N] ", id)).await?;
                if answer.is_some_and(|a| a.trim().eq_ignore_ascii_case("y")) {
                    let response = self.client.delete_dataset(&id).await?;
                    println!("{}", non_empty(&response.message, "Dataset deleted."));
                } else {
                    println!("Cancelled.");
                }
            }
            Command::Summary(id) => {
                let analytics = self.client.analytics_summary(&id).await?;
                print!("{}", render::summary(&analytics));
            }
            Command::Correlation(id) => {
                let analysis = self.client.correlation_analysis(&id).await?;
                print!("{}", render::correlation(&analysis));
            }
            Command::Outliers(id) => {
                let analysis = self.client.outlier_analysis(&id).await?;
                print!("{}", render::outliers(&analysis));
            }
            Command::Refresh(id) => {
                let analytics = self.client.refresh_analytics(&id).await?;
                println!("Analytics recomputed.");
                print!("{}", render::summary(&analytics));
            }
            Command::Insights(id) => {
                let dashboard = self.client.dataset_dashboard(&id).await?;
                print!("{}", render::insights(&insights::generate_for_dashboard(&dashboard)));
            }
            Command::Export {
                dataset_id,
                format,
                dir,
            } => self.export(&dataset_id, format, dir).await?,
            Command::Help => print!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    /// Log in with `email`, or prompt for it (defaulting to the last one used).
    pub async fn login(&mut self, email: Option<String>) -> Result<(), ApiError> {
        let email = match email {
            Some(email) => email,
            None => {
                let label = match self.config.last_email {
                    Some(ref last) => format!("Email [{}]: ", last),
                    None => "Email: ".to_string(),
                };
                let entered = self.read_line(&label).await?.unwrap_or_default();
                match (entered.trim(), self.config.last_email.as_ref()) {
                    ("", Some(last)) => last.clone(),
                    (entered, _) => entered.to_string(),
                }
            }
        };
        let password = read_password("Password: ").await?;

        let response = self.client.login(&email, &password).await?;
        println!("Logged in as {}.", response.user.display_name());

        let email = email.trim().to_lowercase();
        if self.config.last_email.as_deref() != Some(email.as_str()) {
            if let Err(e) = self.config.remember_email(&email) {
                warn!(error = %e, "Failed to save config");
            }
        }
        Ok(())
    }

    async fn register(&mut self) -> Result<(), ApiError> {
        let name = self.read_line("Name: ").await?.unwrap_or_default();
        let email = self.read_line("Email: ").await?.unwrap_or_default();
        let password = read_password("Password: ").await?;
        let confirm = read_password("Confirm password: ").await?;
        if password != confirm {
            return Err(ApiError::Validation("Passwords do not match".to_string()));
        }

        let response = self.client.register(&name, &email, &password).await?;
        println!(
            "{} You can now `login {}`.",
            non_empty(&response.message, "Account created."),
            email.trim().to_lowercase()
        );
        Ok(())
    }

    fn whoami(&self) {
        let store = self.client.store();
        match (store.get_user(), store.get_access_token()) {
            (Some(user), Some(access)) => {
                let expiry = token::expires_at(&access)
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string());
                println!("{} (session expires {})", user.display_name(), expiry);
            }
            _ => println!("Not logged in."),
        }
    }

    async fn export(
        &self,
        dataset_id: &str,
        format: ReportFormat,
        dir: Option<PathBuf>,
    ) -> Result<(), ApiError> {
        let (dashboard, preview) = futures::try_join!(
            self.client.dataset_dashboard(dataset_id),
            self.client.dataset_preview(dataset_id),
        )?;
        let generated = insights::generate_for_dashboard(&dashboard);

        let filename = dashboard
            .summary
            .summary
            .filename
            .clone()
            .unwrap_or_else(|| non_empty(&preview.filename, dataset_id).to_string());
        let data = ReportData::new(&filename, &dashboard.summary)
            .with_preview(&preview)
            .with_insights(&generated);
        let dir = dir.unwrap_or_else(|| self.config.export_dir());

        match export::export_report(&data, format, &dir, &export::default_stem(&filename)) {
            Ok(path) => {
                println!("Report written to {}", path.display());
                if format == ReportFormat::Html {
                    println!("Open it in a browser and print to save as PDF.");
                }
                Ok(())
            }
            Err(e) => Err(ApiError::Unknown(e.to_string())),
        }
    }

    /// Prompt and read one line. `None` at end of input.
    async fn read_line(&mut self, label: &str) -> Result<Option<String>, ApiError> {
        prompt(label).map_err(|e| ApiError::Unknown(e.to_string()))?;
        self.input
            .next_line()
            .await
            .map_err(|e| ApiError::Unknown(format!("Failed to read input: {}", e)))
    }
}

fn prompt(label: &str) -> Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(label.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

async fn read_password(label: &'static str) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || rpassword::prompt_password(label))
        .await
        .map_err(|e| ApiError::Unknown(e.to_string()))?
        .map_err(|e| ApiError::Unknown(format!("Failed to read password: {}", e)))
}

fn non_empty<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.trim().is_empty() {
        fallback
    } else {
        text
    }
}
