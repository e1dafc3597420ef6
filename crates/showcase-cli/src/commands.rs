//! CLI commands

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use showcase_core::models::{IntroduceUpdate, NewIntroduce, Status};

use crate::app::App;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and keep the session
    Login {
        /// Username (defaults to the last one used)
        #[arg(short, long)]
        username: Option<String>,
    },

    /// End the session
    Logout,

    /// Show whether a session is active
    Status,

    /// Print the logged-in user's profile
    Whoami,

    /// Check whether the logged-in user holds a role
    HasRole { role: String },

    /// List all introduce cards
    List,

    /// Search cards by title
    Search { query: String },

    /// Show a single card
    Show { id: String },

    /// Download a card image
    Image {
        id: String,

        /// Where to write the image
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Create a card
    Create {
        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        url: String,

        #[arg(long, default_value = "ACTIVE")]
        status: Status,

        /// Image file to attach
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Update a card; only the given fields change
    Update {
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        tag: Option<String>,

        #[arg(long)]
        url: Option<String>,

        #[arg(long, default_value = "ACTIVE")]
        status: Status,

        /// Replacement image file
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Activate or deactivate a card
    SetStatus { id: String, status: Status },

    /// Delete a card
    Delete { id: String },

    /// Stay attached and report when the session expires
    Watch,
}

impl Commands {
    pub async fn execute(self, app: &mut App) -> Result<()> {
        match self {
            Commands::Login { username } => app.login(username).await,
            Commands::Logout => app.logout().await,
            Commands::Status => app.status(),
            Commands::Whoami => app.whoami(),
            Commands::HasRole { role } => app.has_role(&role),
            Commands::List => app.list().await,
            Commands::Search { query } => app.search(&query).await,
            Commands::Show { id } => app.show(&id).await,
            Commands::Image { id, output } => app.download_image(&id, &output).await,
            Commands::Create {
                title,
                description,
                tag,
                url,
                status,
                image,
            } => {
                let introduce = NewIntroduce {
                    title,
                    description,
                    tag,
                    url,
                    status,
                };
                app.create(&introduce, image).await
            }
            Commands::Update {
                id,
                title,
                description,
                tag,
                url,
                status,
                image,
            } => {
                let update = IntroduceUpdate {
                    title,
                    description,
                    tag,
                    url,
                    status,
                };
                app.update(&id, &update, image).await
            }
            Commands::SetStatus { id, status } => app.set_status(&id, status).await,
            Commands::Delete { id } => app.delete(&id).await,
            Commands::Watch => app.watch().await,
        }
    }
}
