mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use synthmap_core::Synthmap;
use tracing_subscriber::EnvFilter;

/// synthmap: merge photogrammetry projects into one project per entity
#[derive(Parser)]
#[command(name = "synthmap", version, about)]
struct Cli {
    /// Path to the catalog database
    #[arg(long, default_value_t = default_catalog_path())]
    catalog: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered COLMAP projects (lists them when no action is given)
    Projects {
        #[command(subcommand)]
        action: Option<ProjectsAction>,
    },
    /// Manage entities and the images tagged with them
    Entities {
        #[command(subcommand)]
        action: Option<EntitiesAction>,
    },
    /// Synthesize one project from every image related to an entity
    Synth {
        /// Entity ID
        entity_id: i64,
        /// Directory to write `<entity_id>/main.db` under (defaults to the configured root)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Manage the default output root
    Output {
        #[command(subcommand)]
        action: OutputAction,
    },
    /// Show catalog status summary
    Status,
}

#[derive(Subcommand)]
enum ProjectsAction {
    /// Register a project from its project.ini, or from --db and --images
    Add {
        /// Display label
        label: String,
        /// Path to the project's project.ini
        #[arg(conflicts_with_all = ["db", "images"], required_unless_present = "db")]
        project_file: Option<PathBuf>,
        /// Path to the project's database
        #[arg(long, requires = "images")]
        db: Option<PathBuf>,
        /// Path to the project's image directory
        #[arg(long, requires = "db")]
        images: Option<PathBuf>,
    },
    /// Hash the project's images and link them to the catalog
    Register {
        /// Project ID
        id: i64,
    },
    /// Remove a project from the catalog
    Rm {
        /// Project ID
        id: i64,
    },
}

#[derive(Subcommand)]
enum EntitiesAction {
    /// Create an entity
    Add {
        /// Display label
        label: String,
    },
    /// Tag catalog images with an entity
    Tag {
        /// Entity ID
        entity_id: i64,
        /// Catalog image IDs
        #[arg(required = true)]
        image_ids: Vec<i64>,
    },
    /// List the images tagged with an entity
    Images {
        /// Entity ID
        entity_id: i64,
    },
}

#[derive(Subcommand)]
enum OutputAction {
    /// Set the default output root
    Set {
        /// Path to the output directory
        path: PathBuf,
    },
    /// Show the current output root
    Show,
}

fn default_catalog_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
        .join(".synthmap")
        .join("main.db")
        .to_string_lossy()
        .to_string()
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let catalog_path = PathBuf::from(&cli.catalog);
    tracing::debug!(catalog = %catalog_path.display(), "opening catalog");
    let mut app = Synthmap::open(&catalog_path)?;

    match cli.command {
        Commands::Projects { action } => match action {
            None => commands::projects::list(&app)?,
            Some(ProjectsAction::Add {
                label,
                project_file,
                db,
                images,
            }) => commands::projects::add(&app, &label, project_file, db, images)?,
            Some(ProjectsAction::Register { id }) => commands::projects::register(&mut app, id)?,
            Some(ProjectsAction::Rm { id }) => commands::projects::rm(&app, id)?,
        },
        Commands::Entities { action } => match action {
            None => commands::entities::list(&app)?,
            Some(EntitiesAction::Add { label }) => commands::entities::add(&app, &label)?,
            Some(EntitiesAction::Tag {
                entity_id,
                image_ids,
            }) => commands::entities::tag(&app, entity_id, &image_ids)?,
            Some(EntitiesAction::Images { entity_id }) => {
                commands::entities::images(&app, entity_id)?
            }
        },
        Commands::Synth { entity_id, output } => commands::synth::run(&app, entity_id, output)?,
        Commands::Output { action } => match action {
            OutputAction::Set { path } => commands::output::set(&app, path)?,
            OutputAction::Show => commands::output::show(&app)?,
        },
        Commands::Status => commands::status::run(&app)?,
    }

    Ok(())
}
