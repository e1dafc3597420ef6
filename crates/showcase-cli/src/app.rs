//! Application state for the showcase CLI.
//!
//! `App` owns the configuration, the session manager and the content API
//! client, and implements one handler per subcommand.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use showcase_core::api::http_client;
use showcase_core::auth::UserProfile;
use showcase_core::models::{ImageUpload, Introduce, IntroduceUpdate, NewIntroduce, Status};
use showcase_core::{ApiClient, AuthApi, Config, Credentials, SessionEvent, SessionManager};

/// Text of the blocking expiry notice.
const EXPIRY_NOTICE: &str = "Your session has expired. Please log in again.";

pub struct App {
    config: Config,
    session: SessionManager,
    api: ApiClient,
}

impl App {
    /// Build the clients and restore any stored session.
    pub fn new(config: Config) -> Result<Self> {
        let store = config.open_store()?;
        let client = http_client(config.request_timeout())
            .context("Failed to build HTTP client")?;

        let session = SessionManager::new(
            store,
            Arc::new(AuthApi::new(client.clone(), &config.api_url)),
            config.session_options(),
        );
        let api = ApiClient::new(client, &config.api_url, session.clone());

        let restored = session.initialize();
        debug!(restored, "Session initialized");

        Ok(Self {
            config,
            session,
            api,
        })
    }

    // ===== Session commands =====

    pub async fn login(&mut self, username: Option<String>) -> Result<()> {
        let username = match username {
            Some(username) => username,
            None => self.prompt_username()?,
        };
        if username.is_empty() {
            anyhow::bail!("Username required");
        }
        let password = rpassword::prompt_password("Password: ")?;

        println!("Authenticating...");
        let state = self
            .session
            .login(&Credentials::new(username.clone(), password))
            .await?;

        self.config.last_username = Some(username);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        let roles = state
            .user_info
            .map(|profile| profile.roles.join(", "))
            .unwrap_or_default();
        println!("Login successful!");
        if !roles.is_empty() {
            println!("Roles: {}", roles);
        }
        Ok(())
    }

    fn prompt_username(&self) -> Result<String> {
        match self.config.last_username {
            Some(ref last_user) => print!("Username [{}]: ", last_user),
            None => print!("Username: "),
        }
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(resolve_username(&input, self.config.last_username.as_deref()))
    }

    pub async fn logout(&mut self) -> Result<()> {
        let mut events = self.session.subscribe();
        self.session.logout().await;
        if let Ok(SessionEvent::Redirect { location }) = events.try_recv() {
            debug!(location = %location, "Logout redirect");
        }
        println!("Logged out.");
        Ok(())
    }

    pub fn status(&self) -> Result<()> {
        if !self.session.is_authenticated() {
            println!("Not logged in.");
            return Ok(());
        }
        let user = self.session.current_user().unwrap_or_default();
        println!("Logged in as {}", display_name(&user));
        if !user.roles.is_empty() {
            println!("Roles: {}", user.roles.join(", "));
        }
        Ok(())
    }

    pub fn whoami(&self) -> Result<()> {
        let user = self
            .session
            .current_user()
            .ok_or_else(|| anyhow::anyhow!("Not logged in"))?;
        println!("{}", serde_json::to_string_pretty(&user)?);
        Ok(())
    }

    pub fn has_role(&self, role: &str) -> Result<()> {
        if self.session.has_role(role) {
            println!("yes");
            Ok(())
        } else {
            anyhow::bail!("User does not hold role '{}'", role)
        }
    }

    /// Stay attached while the monitor runs. On expiry the notice is shown
    /// and its single action, re-login, is taken.
    pub async fn watch(&mut self) -> Result<()> {
        if !self.session.is_authenticated() {
            anyhow::bail!("Not logged in");
        }
        let mut events = self.session.subscribe();
        println!("Watching session (Ctrl+C to stop)...");

        let mut stdout = io::stdout();
        if run_watch(&self.session, &mut events, &mut stdout).await?.is_some() {
            println!("Run `showcase login` to start a new session.");
        }

        info!("Watch finished");
        Ok(())
    }

    // ===== Content commands =====

    pub async fn list(&self) -> Result<()> {
        let introduces = self.api.fetch_introduces().await?;
        if introduces.is_empty() {
            println!("No cards.");
        }
        for introduce in &introduces {
            print_row(introduce);
        }
        Ok(())
    }

    pub async fn search(&self, query: &str) -> Result<()> {
        let results = self.api.search_introduces(query).await;
        if results.is_empty() {
            println!("No cards match '{}'.", query);
        }
        for introduce in &results {
            print_row(introduce);
        }
        Ok(())
    }

    pub async fn show(&self, id: &str) -> Result<()> {
        let introduce = self.api.fetch_introduce(id).await?;
        print_detail(&introduce);
        Ok(())
    }

    pub async fn download_image(&self, id: &str, output: &Path) -> Result<()> {
        let image = self.api.fetch_image(id).await?;
        let bytes = image.bytes()?;
        std::fs::write(output, &bytes)
            .with_context(|| format!("Failed to write image to {}", output.display()))?;
        println!("Wrote {} bytes to {}", bytes.len(), output.display());
        Ok(())
    }

    pub async fn create(&self, introduce: &NewIntroduce, image: Option<PathBuf>) -> Result<()> {
        let upload = image.map(ImageUpload::from_path).transpose()?;
        let created = self.api.create_introduce(introduce, upload).await?;
        println!("Created {}", created.id);
        print_detail(&created);
        Ok(())
    }

    pub async fn update(
        &self,
        id: &str,
        update: &IntroduceUpdate,
        image: Option<PathBuf>,
    ) -> Result<()> {
        let upload = image.map(ImageUpload::from_path).transpose()?;
        let updated = self.api.update_introduce(id, update, upload).await?;
        println!("Updated {}", updated.id);
        print_detail(&updated);
        Ok(())
    }

    pub async fn set_status(&self, id: &str, status: Status) -> Result<()> {
        let updated = self.api.update_introduce_status(id, status).await?;
        println!(
            "{} is now {}",
            updated.id,
            updated.status.unwrap_or(status)
        );
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let deleted = self.api.delete_introduce(id).await?;
        println!("Deleted {} ({})", deleted.id, deleted.display_title());
        Ok(())
    }
}

/// Handle session events until the session redirects to login.
///
/// The expiry notice is written to `out` and answered with `relogin`,
/// which in turn produces the redirect. Returns the redirect location, or
/// `None` if the session went away first.
async fn run_watch<W: Write>(
    session: &SessionManager,
    events: &mut broadcast::Receiver<SessionEvent>,
    out: &mut W,
) -> Result<Option<String>> {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Expired) => {
                writeln!(out, "{}", EXPIRY_NOTICE)?;
                session.relogin().await;
            }
            Ok(SessionEvent::Redirect { location }) => {
                writeln!(out, "Redirecting to {}", location)?;
                return Ok(Some(location));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Missed session events");
            }
            Err(RecvError::Closed) => return Ok(None),
        }
    }
}

/// Blank input falls back to the last username used.
fn resolve_username(input: &str, last_username: Option<&str>) -> String {
    match (input.trim(), last_username) {
        ("", Some(last_user)) => last_user.to_string(),
        (input, _) => input.to_string(),
    }
}

fn display_name(user: &UserProfile) -> String {
    ["preferred_username", "username", "name", "email"]
        .iter()
        .find_map(|key| user.attribute(key).and_then(|v| v.as_str()))
        .unwrap_or("(unknown user)")
        .to_string()
}

fn format_row(introduce: &Introduce) -> String {
    let row = format!(
        "{:<26} {:<8} {}",
        introduce.id,
        introduce.status.unwrap_or_default().as_str(),
        introduce.display_title(),
    );
    match introduce.tag.as_deref().filter(|tag| !tag.is_empty()) {
        Some(tag) => format!("{} [{}]", row, tag),
        None => row,
    }
}

fn print_row(introduce: &Introduce) {
    println!("{}", format_row(introduce));
}

fn print_detail(introduce: &Introduce) {
    println!("Title:       {}", introduce.display_title());
    println!("Status:      {}", introduce.status.unwrap_or_default());
    if let Some(ref tag) = introduce.tag {
        println!("Tag:         {}", tag);
    }
    if let Some(ref description) = introduce.description {
        println!("Description: {}", description);
    }
    if let Some(ref url) = introduce.url {
        println!("URL:         {}", url);
    }
    if let Some(ref image_id) = introduce.image_id {
        println!("Image:       {}", image_id);
    }
    if let Some(created) = introduce.created_at() {
        println!("Created:     {}", created.format("%Y-%m-%d %H:%M"));
    }
    if let Some(updated) = introduce.updated_at() {
        println!("Modified:    {}", updated.format("%Y-%m-%d %H:%M"));
    }
}
