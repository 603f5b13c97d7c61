use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use trackboard::{
    BoardStore, NewLink, NewProject, ProjectStatus, SettingsUpdate, StoreConfig, StoreMode,
    flatten_links, flatten_projects, parse_backup,
};

#[derive(Parser)]
#[command(name = "trackboard")]
#[command(about = "Track projects, courses and links from the terminal")]
struct Cli {
    /// Storage mode
    #[arg(long, value_enum, default_value_t = ModeArg::Local)]
    mode: ModeArg,

    /// Directory holding local-mode documents and blobs
    #[arg(long, default_value = "trackboard-data")]
    data_dir: PathBuf,

    /// Single-file board archive used in database mode
    #[arg(long, default_value = "board.trackboard")]
    board_file: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Local,
    Database,
}

impl From<ModeArg> for StoreMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Local => StoreMode::Local,
            ModeArg::Database => StoreMode::Database,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum TableArg {
    Projects,
    Links,
}

#[derive(Subcommand)]
enum Command {
    /// List the whole board
    List,
    /// Create a project in the ideas bucket
    AddProject {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        repo_url: Option<String>,
        #[arg(long)]
        due_date: Option<String>,
    },
    /// Move a project to the completed bucket
    Complete { id: String },
    /// Move a project back to the ideas bucket
    Reopen { id: String },
    /// Add a global link
    AddLink {
        title: String,
        url: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete a global link by id
    RmLink { id: String },
    /// Write the full backup document
    Export {
        #[arg(long, default_value = "backup.json")]
        out: PathBuf,
    },
    /// Print a flattened table as TSV
    ExportTable {
        #[arg(value_enum)]
        table: TableArg,
    },
    /// Replace projects and links from a backup document
    Import { file: PathBuf },
    /// Show or change settings
    Settings {
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        pin: Option<String>,
        #[arg(long)]
        clear_pin: bool,
        #[arg(long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Cli::parse();
    let cwd = std::env::current_dir()?;
    let config = StoreConfig {
        mode: args.mode.into(),
        data_dir: cwd.join(&args.data_dir),
        board_file: cwd.join(&args.board_file),
    };
    let mut store = BoardStore::open(config).await?;

    match args.command {
        Command::List => {
            println!("Ideas:");
            for project in store.ideas() {
                println!(
                    "  [{:>3}%] {}  ({})",
                    project.progress, project.title, project.id
                );
            }
            println!("Completed:");
            for project in store.completed() {
                println!(
                    "  [{:>3}%] {}  ({})",
                    project.progress, project.title, project.id
                );
            }
            println!("Courses:");
            for course in store.courses() {
                let mark = if course.completed { "x" } else { " " };
                println!("  [{mark}] {}  ({})", course.name, course.id);
            }
            println!("Links:");
            for link in store.links() {
                println!("  {}  {}  ({})", link.title, link.url, link.id);
            }
        }
        Command::AddProject {
            title,
            description,
            tags,
            repo_url,
            due_date,
        } => {
            let project = store
                .add_project(NewProject {
                    title,
                    description,
                    tags,
                    repo_url,
                    due_date,
                    ..NewProject::default()
                })
                .await
                .ok_or_else(|| anyhow::anyhow!("Failed to save the new project"))?;
            println!("Created project {}", project.id);
        }
        Command::Complete { id } => {
            if !store.move_project(&id, ProjectStatus::Completed).await {
                anyhow::bail!("Could not complete project {id}");
            }
            println!("Completed {id}");
        }
        Command::Reopen { id } => {
            if !store.move_project(&id, ProjectStatus::Ideas).await {
                anyhow::bail!("Could not reopen project {id}");
            }
            println!("Reopened {id}");
        }
        Command::AddLink {
            title,
            url,
            description,
        } => {
            let link = store
                .add_link(NewLink {
                    title,
                    url,
                    description,
                })
                .await
                .ok_or_else(|| anyhow::anyhow!("Failed to save the new link"))?;
            println!("Created link {}", link.id);
        }
        Command::RmLink { id } => {
            if !store.delete_link(&id).await {
                anyhow::bail!("No link with id {id}");
            }
            println!("Deleted {id}");
        }
        Command::Export { out } => {
            let backup = store.export_backup();
            tokio::fs::write(&out, serde_json::to_vec_pretty(&backup)?).await?;
            println!(
                "Wrote {} projects and {} links to {:?}",
                backup.ideas.len() + backup.completed.len(),
                backup.links.len(),
                out
            );
        }
        Command::ExportTable { table } => match table {
            TableArg::Projects => {
                println!("{}", trackboard::ProjectRow::HEADER.join("\t"));
                for row in flatten_projects(store.ideas(), store.completed()) {
                    println!("{}", row.tsv());
                }
            }
            TableArg::Links => {
                println!("{}", trackboard::LinkRow::HEADER.join("\t"));
                for row in flatten_links(store.links()) {
                    println!("{}", row.tsv());
                }
            }
        },
        Command::Import { file } => {
            let raw = tokio::fs::read_to_string(&file).await?;
            let backup = parse_backup(&raw)?;
            store.import_backup(backup).await?;
            println!("Import complete");
        }
        Command::Settings {
            theme,
            pin,
            clear_pin,
            profile,
        } => {
            let update = SettingsUpdate {
                theme,
                pin: if clear_pin { Some(None) } else { pin.map(Some) },
                profile_name: profile,
            };
            let changed = update.theme.is_some()
                || update.pin.is_some()
                || update.profile_name.is_some();
            if changed && !store.update_settings(update).await {
                anyhow::bail!("Failed to save settings");
            }
            let settings = store.settings();
            println!("theme: {}", settings.theme);
            println!(
                "pin: {}",
                if settings.pin.is_some() { "set" } else { "unset" }
            );
            println!("profile: {}", settings.profile_name);
        }
    }

    store.save().await?;
    Ok(())
}
