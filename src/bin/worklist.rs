//! worklist CLI: inspect and edit work list definition files.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use worklist::config::Config;
use worklist::definition::{WorkListKind, get_name, parse_name};
use worklist::model::{
    DataSourceIdentity, GdbTableIdentity, Status, Visibility, WorkItem, WorkItemIdentity,
    WorkspaceFactory,
};
use worklist::repository::WorkItemStateRepository;
use worklist::store::{self, DefinitionFile, StoreFormat};
use worklist::telemetry::init_telemetry;

#[derive(Parser)]
#[command(name = "worklist", about = "Inspect and edit work list definitions")]
struct Cli {
    /// TOML config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Definition format (xml | json); overrides the configured one
    #[arg(long, global = true)]
    format: Option<StoreFormat>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create an empty definition in the configured directory
    Create {
        name: String,
        /// selection | issue
        #[arg(long, default_value = "selection")]
        kind: String,
        #[arg(long)]
        display_name: Option<String>,
    },
    /// Show a definition's header and workspaces
    Info { file: PathBuf },
    /// List persisted item states
    States {
        file: PathBuf,
        /// todo | done | all
        #[arg(long, default_value = "all")]
        visibility: Visibility,
    },
    /// Set the volatile state of one item and commit
    Mark {
        file: PathBuf,
        #[arg(long)]
        oid: i64,
        /// Source table name
        #[arg(long)]
        table: String,
        /// Registration id of the table, -1 if unregistered
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        table_id: i64,
        /// Data source connection string
        #[arg(long)]
        connection: String,
        #[arg(long, default_value = "filegdb")]
        factory: WorkspaceFactory,
        #[arg(long)]
        status: Option<Status>,
        #[arg(long)]
        visited: Option<bool>,
    },
    /// Change the display name and file stem
    Rename { file: PathBuf, display_name: String },
    /// Work list name from a file path or layer URI
    Name { path_or_uri: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    if let Some(format) = cli.format {
        config.format = format;
    }

    let _guard = init_telemetry(config.telemetry())?;

    match cli.command {
        Command::Create {
            name,
            kind,
            display_name,
        } => cmd_create(&config, &name, &kind, display_name.as_deref()),
        Command::Info { file } => cmd_info(&file, config.format),
        Command::States { file, visibility } => cmd_states(&file, config.format, visibility),
        Command::Mark {
            file,
            oid,
            table,
            table_id,
            connection,
            factory,
            status,
            visited,
        } => {
            let data_source = DataSourceIdentity::new(connection, factory);
            let table = GdbTableIdentity::new(data_source, table_id, table);
            let identity = WorkItemIdentity::new(table, oid);
            cmd_mark(&file, config.format, identity, status, visited)
        }
        Command::Rename { file, display_name } => cmd_rename(&file, config.format, &display_name),
        Command::Name { path_or_uri } => {
            let name = if path_or_uri.contains("://") {
                parse_name(&path_or_uri)?
            } else {
                get_name(&path_or_uri)
            };
            println!("{name}");
            Ok(())
        }
    }
}

fn cmd_create(config: &Config, name: &str, kind: &str, display_name: Option<&str>) -> anyhow::Result<()> {
    let kind = match kind.to_ascii_lowercase().as_str() {
        "selection" => WorkListKind::Selection,
        "issue" => WorkListKind::Issue,
        other => anyhow::bail!("unknown work list kind: {other}"),
    };
    let path = config.definition_path(name, kind);
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    let file = DefinitionFile::at(&path, name, display_name.unwrap_or(name), kind);
    let mut repository = WorkItemStateRepository::new(store::open_store(config.format, file));
    repository.commit()?;

    println!("Created {}", path.display());
    Ok(())
}

fn cmd_info(file: &Path, format: StoreFormat) -> anyhow::Result<()> {
    let Some(definition) = store::read_definition(file, format)? else {
        anyhow::bail!("{} does not exist", file.display());
    };

    println!("Name:          {}", definition.name);
    println!("Display name:  {}", definition.display_name);
    println!("Type:          {}", definition.type_name);
    match definition.current_index() {
        Some(index) => println!("Current index: {index}"),
        None => println!("Current index: none"),
    }
    println!("Items:         {}", definition.items.len());

    let done = definition.items.iter().filter(|s| s.status == Status::Done).count();
    let visited = definition.items.iter().filter(|s| s.visited).count();
    println!("  done:        {done}");
    println!("  visited:     {visited}");

    println!("Tables:");
    for table in definition.table_identities() {
        println!("  {table} [id {}]", table.id);
    }

    if let Some(gdb) = store::issue_geodatabase_path(file, format)? {
        println!("Issue geodatabase: {gdb}");
    }
    Ok(())
}

fn cmd_states(file: &Path, format: StoreFormat, visibility: Visibility) -> anyhow::Result<()> {
    let Some(definition) = store::read_definition(file, format)? else {
        anyhow::bail!("{} does not exist", file.display());
    };

    println!("{:<12} {:<8} {:<8}", "OID", "VISITED", "STATUS");
    for state in definition.items.iter().filter(|s| visibility.admits(s.status)) {
        println!("{:<12} {:<8} {:<8}", state.oid, state.visited, state.status);
    }
    Ok(())
}

fn cmd_mark(
    file: &Path,
    format: StoreFormat,
    identity: WorkItemIdentity,
    status: Option<Status>,
    visited: Option<bool>,
) -> anyhow::Result<()> {
    let (store, _) = store::open_existing(file, format)?;
    let mut repository = WorkItemStateRepository::new(store);

    let mut item = WorkItem::new(identity, None);
    repository.refresh_item(&mut item)?;

    if let Some(status) = status {
        item.status = status;
    }
    if let Some(visited) = visited {
        item.visited = visited;
    }

    repository.update_volatile_state([&item])?;
    repository.commit()?;

    println!(
        "OID {}: visited={} status={}",
        item.oid(),
        item.visited,
        item.status
    );
    Ok(())
}

fn cmd_rename(file: &Path, format: StoreFormat, display_name: &str) -> anyhow::Result<()> {
    let (store, _) = store::open_existing(file, format)?;
    let mut repository = WorkItemStateRepository::new(store);

    repository.rename(display_name)?;
    repository.commit()?;

    let renamed = repository.location().to_path_buf();
    if renamed != file {
        std::fs::remove_file(file)?;
    }
    println!("Renamed to {}", renamed.display());
    Ok(())
}
