use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use quillboard_api::ApiClient;
use quillboard_core::{Config, FileTokenStore, PostTypeDirectory, Role};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "quillboard")]
#[command(version, about = "Command-line client for the Quillboard admin API", long_about = None)]
struct Cli {
    /// Override the API base URL from config
    #[arg(long, env = "QUILLBOARD_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in and persist the session tokens
    Login {
        /// Account email
        email: String,
        /// Password; prompted on stdin when omitted
        #[arg(long, env = "QUILLBOARD_PASSWORD")]
        password: Option<String>,
    },
    /// Sign out and drop the persisted session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Story operations
    #[command(subcommand)]
    Stories(StoryCommands),
    /// Post type operations
    #[command(subcommand)]
    PostTypes(PostTypeCommands),
    /// Role operations
    #[command(subcommand)]
    Roles(RoleCommands),
    /// Check API health
    Health,
}

#[derive(clap::Subcommand)]
enum StoryCommands {
    /// List stories
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Show one story
    Show {
        /// Story id
        id: i64,
    },
    /// Full-text story search
    Search {
        /// Search query
        query: String,
    },
}

#[derive(clap::Subcommand)]
enum PostTypeCommands {
    /// List post types
    List {
        /// Include inactive post types
        #[arg(long)]
        all: bool,
    },
}

#[derive(clap::Subcommand)]
enum RoleCommands {
    /// List roles
    List,
}

fn build_client(config: &Config, api_url: Option<String>) -> anyhow::Result<ApiClient> {
    let base_url = api_url.unwrap_or_else(|| config.api.base_url.clone());
    let store = Arc::new(FileTokenStore::open()?);
    let timeout = Duration::from_secs(config.api.timeout_secs);

    let client = ApiClient::with_options(base_url, store, Some(timeout)).on_session_expired(|| {
        eprintln!("Session expired. Run `quillboard login` to sign in again.");
    });
    Ok(client)
}

fn read_password() -> anyhow::Result<String> {
    eprint!("Password: ");
    std::io::stderr().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quillboard=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let client = build_client(&config, cli.api_url)?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => read_password()?,
            };
            let session = client.login(&email, &password).await?;
            match session.user.and_then(|u| u.name) {
                Some(name) => println!("Signed in as {} <{}>", name, email),
                None => println!("Signed in as {}", email),
            }
        }
        Commands::Logout => {
            client.logout().await?;
            println!("Signed out.");
        }
        Commands::Whoami => {
            let profile = client.profile().await?;
            println!("{} <{}>", profile.name.as_deref().unwrap_or("(no name)"), profile.email);
            if let Some(role) = profile.role_info {
                let role = Role::from(role);
                println!("Role: {} (level {})", role.display_name, role.level);
            }
        }
        Commands::Stories(command) => run_stories(&client, command).await?,
        Commands::PostTypes(command) => {
            let directory = PostTypeDirectory::new(client, &config.cache);
            run_post_types(&directory, command).await?;
        }
        Commands::Roles(RoleCommands::List) => {
            let roles = client.list_roles(false).await?;
            for role in roles.into_iter().map(Role::from) {
                let flag = if role.is_active { "" } else { " (inactive)" };
                println!("{:>3}  {}{}", role.level, role.display_name, flag);
            }
        }
        Commands::Health => {
            let health = client.health().await?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
    }

    Ok(())
}

async fn run_stories(client: &ApiClient, command: StoryCommands) -> anyhow::Result<()> {
    match command {
        StoryCommands::List { page, limit } => {
            let stories = client.list_stories(page, limit, None).await?;
            println!("{} stories total (page {})", stories.total, page);
            for story in stories.data {
                println!("{:>6}  {}  [{}]", story.id, story.title, story.status.as_deref().unwrap_or("draft"));
            }
        }
        StoryCommands::Show { id } => {
            let story = client.get_story(id).await?;
            println!("{}", story.title);
            if let Some(excerpt) = story.excerpt {
                println!("{}", excerpt);
            }
            if let Some(published) = story.published_at {
                println!("Published: {}", published.format("%Y-%m-%d %H:%M"));
            }
        }
        StoryCommands::Search { query } => {
            let stories = client.search_stories(&query).await?;
            for story in stories {
                println!("{:>6}  {}", story.id, story.title);
            }
        }
    }
    Ok(())
}

async fn run_post_types(
    directory: &PostTypeDirectory,
    command: PostTypeCommands,
) -> anyhow::Result<()> {
    match command {
        PostTypeCommands::List { all } => {
            let post_types = directory.all(all).await?;
            for post_type in post_types {
                let flag = if post_type.is_active { "" } else { " (inactive)" };
                println!("{}  ({}){}", post_type.name, post_type.slug, flag);
            }
        }
    }
    Ok(())
}
