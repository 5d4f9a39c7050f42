use canvas_sync::config::DEFAULT_CONFIG_FILE;
use canvas_sync::{
    Action, FsLocalText, Outcome, Plan, ReconciliationEngine, SyncConfig, SyncDirection,
};
use canvas_sync_cli::{confirm, fail, init_logging, open_store, parse_args};
use clap::{Parser, ValueEnum};
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Sync a local task list with its canvas", long_about = None)]
struct Cli {
    /// Project registry
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    /// Project to sync; optional when the registry has one project
    #[arg(short, long)]
    project: Option<String>,
    #[arg(short, long, value_enum, default_value_t = ActionArg::Check)]
    action: ActionArg,
    /// Write without asking for confirmation
    #[arg(short, long)]
    force: bool,
    /// Log engine phases to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    /// Show differences only
    Check,
    /// Replace the canvas with the local file
    Push,
    /// Replace the local file with the canvas
    Pull,
}

impl From<ActionArg> for Action {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Check => Action::Check,
            ActionArg::Push => Action::Push,
            ActionArg::Pull => Action::Pull,
        }
    }
}

fn main() {
    let cli: Cli = parse_args();
    init_logging(cli.verbose);
    let action = Action::from(cli.action);

    let mut config = SyncConfig::load(&cli.config).unwrap_or_else(|err| fail(err));
    let project = config
        .select_project(cli.project.as_deref())
        .unwrap_or_else(|err| fail(err))
        .to_string();
    let store = open_store(&config).unwrap_or_else(|err| fail(err));
    let canvas_id = config
        .resolve_canvas(&project, &store)
        .unwrap_or_else(|err| fail(err));
    let local_path = config
        .project(&project)
        .map(|p| p.local_path.clone())
        .unwrap_or_else(|err| fail(err));

    println!("Canvas sync: {project}");
    println!("  Canvas: {canvas_id}");
    println!("  Local: {}", local_path.display());
    println!();

    let engine = ReconciliationEngine::new(config, store, FsLocalText);
    let plan = engine
        .plan(&project, action)
        .unwrap_or_else(|err| fail(err));

    let pending = match plan {
        Plan::InSync => {
            println!("{}", in_sync_message(action));
            return;
        }
        Plan::Report(diff) => {
            println!("=== Differences ===");
            print!("{diff}");
            return;
        }
        Plan::Pending(pending) => pending,
    };

    let prompt = match pending.direction() {
        SyncDirection::Push => {
            println!("=== Changes to push (local -> canvas) ===");
            "Push these changes to canvas? [y/N] ".to_string()
        }
        SyncDirection::Pull => {
            println!("=== Changes to pull (canvas -> local) ===");
            let file_name = local_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| local_path.display().to_string());
            format!("Overwrite local {file_name} with canvas content? [y/N] ")
        }
    };
    print!("{}", pending.diff());

    let confirmed = cli.force || {
        println!();
        confirm(&prompt, &mut io::stdin().lock(), &mut io::stdout())
            .unwrap_or_else(|err| fail(err))
    };

    match engine
        .apply(pending, confirmed)
        .unwrap_or_else(|err| fail(err))
    {
        Outcome::Aborted => {
            println!("Aborted.");
            std::process::exit(1);
        }
        Outcome::Pushed { document_id } => println!("Pushed to canvas {document_id}"),
        Outcome::Pulled { path } => println!("Updated {}", path.display()),
        Outcome::InSync | Outcome::Reported { .. } => {}
    }
}

fn in_sync_message(action: Action) -> &'static str {
    match action {
        Action::Check => "No differences found.",
        Action::Push => "No differences - nothing to push.",
        Action::Pull => "No differences - nothing to pull.",
    }
}
