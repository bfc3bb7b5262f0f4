mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use guardian_core::{
    AiVerifier, AuthenticatedUser, BucketStorage, Category, FileStore, GoogleIdentity,
    IdentityProvider, InlineStorage, LinearRatingPolicy, OfflineVerifier, ProfileRepository,
    ProofStorage, ProofVerifier, RefreshUseCase, Settings, StaticIdentity, SupabaseStore, TaskFlow,
    TaskRepository, WeeklyStatRepository, WriteBehind,
};
use uuid::Uuid;

const ENV_GOOGLE_TOKEN: &str = "GUARDIAN_GOOGLE_TOKEN";

#[derive(Parser)]
#[command(name = "guardian")]
#[command(about = "Track tasks with photo proof, weekly goals and streaks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        title: String,
        /// Planned effort in hours
        #[arg(long)]
        hours: f64,
        /// study or work
        #[arg(long, default_value = "study")]
        category: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List tasks with their verification status
    List,
    /// Submit a proof photo for a task (id may be a unique prefix)
    Submit {
        id: String,
        /// Path to the proof image
        file: PathBuf,
    },
    /// Delete a task
    Delete { id: String },
    /// Log screen-time hours against the current week
    Screen { hours: f64 },
    /// Set the weekly goal in hours
    Goal { hours: f64 },
    /// Show the current week and streak
    Stats,
    /// Show all recorded weeks
    History,
}

struct App {
    flow: TaskFlow,
    refresh: RefreshUseCase,
    outbox: Arc<WriteBehind>,
    user: AuthenticatedUser,
}

type Stores = (
    Arc<dyn TaskRepository>,
    Arc<dyn WeeklyStatRepository>,
    Arc<dyn ProfileRepository>,
);

fn build_stores(settings: &Settings) -> Result<Stores> {
    if settings.has_remote_store() {
        let store = Arc::new(SupabaseStore::new(settings)?);
        let tasks: Arc<dyn TaskRepository> = store.clone();
        let stats: Arc<dyn WeeklyStatRepository> = store.clone();
        let profiles: Arc<dyn ProfileRepository> = store;
        Ok((tasks, stats, profiles))
    } else {
        log::info!("no remote store configured, using local files");
        let store = Arc::new(FileStore::new(None)?);
        let tasks: Arc<dyn TaskRepository> = store.clone();
        let stats: Arc<dyn WeeklyStatRepository> = store.clone();
        let profiles: Arc<dyn ProfileRepository> = store;
        Ok((tasks, stats, profiles))
    }
}

fn build_verifier(settings: &Settings) -> Result<Arc<dyn ProofVerifier>> {
    if settings.has_ai() {
        Ok(Arc::new(AiVerifier::new(settings)?))
    } else {
        log::warn!("no AI endpoint configured, proofs are accepted unreviewed");
        Ok(Arc::new(OfflineVerifier))
    }
}

fn build_storage(settings: &Settings) -> Result<Arc<dyn ProofStorage>> {
    if settings.has_remote_store() {
        Ok(Arc::new(BucketStorage::new(settings)?))
    } else {
        Ok(Arc::new(InlineStorage))
    }
}

async fn build_app(settings: &Settings) -> Result<App> {
    let (tasks, stats, profiles) = build_stores(settings)?;
    let outbox = Arc::new(WriteBehind::new(stats.clone(), profiles.clone()));
    let rating = Arc::new(LinearRatingPolicy);

    let identity: Box<dyn IdentityProvider> = match std::env::var(ENV_GOOGLE_TOKEN) {
        Ok(token) if !token.trim().is_empty() => Box::new(GoogleIdentity::new(token)?),
        _ => Box::new(StaticIdentity::local(settings.local_user_id)),
    };
    let user = identity.authenticate().await?;

    let flow = TaskFlow::new(
        tasks.clone(),
        stats.clone(),
        profiles.clone(),
        build_verifier(settings)?,
        build_storage(settings)?,
        rating.clone(),
        outbox.clone(),
    );
    let refresh = RefreshUseCase::new(profiles, tasks, stats, outbox.clone(), rating);

    Ok(App {
        flow,
        refresh,
        outbox,
        user,
    })
}

fn parse_category(input: &str) -> Result<Category> {
    match input.to_lowercase().as_str() {
        "study" | "s" => Ok(Category::Study),
        "work" | "w" => Ok(Category::Work),
        other => Err(anyhow!("Unknown category: {} (use study or work)", other)),
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Accepts a full uuid or a unique prefix, matched against the user's tasks.
async fn resolve_task_id(app: &App, input: &str) -> Result<Uuid> {
    if let Ok(id) = input.parse::<Uuid>() {
        return Ok(id);
    }
    let session = app.refresh.refresh(&app.user).await;
    let matches: Vec<Uuid> = session
        .tasks
        .iter()
        .filter(|t| t.id.to_string().starts_with(input))
        .map(|t| t.id)
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => Err(anyhow!("No task matches id '{}'", input)),
        _ => Err(anyhow!("Id '{}' is ambiguous, use more characters", input)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    guardian_core::load_dotenv();
    env_logger::init();

    let cli = Cli::parse();
    let settings = guardian_core::load_settings()?;
    let app = build_app(&settings).await?;

    match cli.command {
        Commands::Add {
            title,
            hours,
            category,
            description,
        } => {
            let category = parse_category(&category)?;
            let task = app
                .flow
                .create_task(app.user.id, title, description, category, hours)
                .await?;
            println!("Task added: {} (ID: {})", task.title, task.id);
            println!("  Category: {:?}, planned {:.1}h", task.category, task.planned_hours);
        }
        Commands::List => {
            let session = app.refresh.refresh(&app.user).await;
            render::show_tasks(&session.tasks);
        }
        Commands::Submit { id, file } => {
            let task_id = resolve_task_id(&app, &id).await?;
            let bytes = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("proof.jpg");
            let outcome = app
                .flow
                .submit_proof(app.user.id, task_id, &bytes, filename, mime_for(&file))
                .await?;

            if outcome.task.is_verified() {
                println!("Verified: {}", outcome.verdict.reason);
                if !outcome.proof_saved {
                    println!("Warning: proof could not be saved durably.");
                }
            } else {
                println!("Rejected: {}", outcome.verdict.reason);
            }
        }
        Commands::Delete { id } => {
            let task_id = resolve_task_id(&app, &id).await?;
            app.flow.delete_task(app.user.id, task_id).await?;
            println!("Task deleted.");
        }
        Commands::Screen { hours } => {
            let stat = app.flow.log_screen_time(app.user.id, hours).await?;
            println!(
                "Screen time this week: {:.1}h (rating now {:.1}/10)",
                stat.screen_time_hours, stat.rating
            );
        }
        Commands::Goal { hours } => {
            let profile = app.flow.set_weekly_goal(app.user.id, hours).await?;
            println!("Weekly goal set to {:.1}h", profile.weekly_goal_hours);
        }
        Commands::Stats => {
            let session = app.refresh.refresh(&app.user).await;
            render::show_stats(&session);
        }
        Commands::History => {
            let session = app.refresh.refresh(&app.user).await;
            render::show_history(&session.current_stat, &session.history);
        }
    }

    // Write-behind runs off the critical path; drain it before the process
    // exits so nothing queued is lost.
    app.outbox.flush().await;

    Ok(())
}
