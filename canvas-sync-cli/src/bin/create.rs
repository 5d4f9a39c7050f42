use canvas_sync::config::DEFAULT_CONFIG_FILE;
use canvas_sync::{
    ConfigError, FsLocalText, LocalText, RemoteDocumentStore, SyncConfig, local_canonical,
};
use canvas_sync_cli::{fail, init_logging, open_store, parse_args};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Create a canvas attached to a channel.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Channel name (with or without `#`) or channel id
    channel: String,
    /// Markdown file with the initial content
    markdown_file: PathBuf,
    /// Title echoed after creation
    #[arg(short, long)]
    title: Option<String>,
    /// Project registry; only its store settings are used
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli: Cli = parse_args();
    init_logging(cli.verbose);

    let config = SyncConfig::load(&cli.config).unwrap_or_else(|err| fail(err));
    let store = open_store(&config).unwrap_or_else(|err| fail(err));

    let content = FsLocalText
        .read_text(&cli.markdown_file)
        .unwrap_or_else(|err| fail(format!("{}: {err}", cli.markdown_file.display())));
    let content = local_canonical(&content);
    println!(
        "Loaded {} ({} chars)",
        cli.markdown_file.display(),
        content.chars().count()
    );

    let channel = cli.channel.trim_start_matches('#');
    let destination = store
        .resolve_destination(channel)
        .unwrap_or_else(|err| fail(err))
        .unwrap_or_else(|| fail(ConfigError::UnknownChannel(channel.to_string())));
    let canvas_id = store
        .create(&destination, &content)
        .unwrap_or_else(|err| fail(err));
    info!(canvas_id = %canvas_id, destination = %destination, "canvas created");

    println!("Created canvas in #{channel}");
    println!("  Canvas ID: {canvas_id}");
    if let Some(title) = &cli.title {
        println!("  Title: {title}");
    }
}
