use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Subcommand, Debug, Clone)]
pub(crate) enum Cmd {
    /// Run diagnostics to check runtime, storage and configuration
    Doctor,
    /// Resolve an image identifier and print the concrete reference
    Resolve {
        /// Registry name[:tag] or sha1://<hash> content address
        identifier: String,
    },
}

#[derive(Parser, Debug)]
#[command(
    name = "labbox-launcher",
    version,
    about = "Launch a labbox container.",
    override_usage = "labbox-launcher [OPTIONS] [IMAGE] [--command CMD...]\n       labbox-launcher <doctor|resolve>",
    after_long_help = "Examples:\n  labbox-launcher magland/labbox-ephys:0.3.8 --kachery $KACHERY_STORAGE_DIR -p 15310:15310\n  labbox-launcher sha1://<hash>/labbox.json --detached\n  labbox-launcher ubuntu:20.04 -v ./data:/data:ro --command bash -l\n  labbox-launcher resolve sha1://<hash>\n"
)]
pub(crate) struct Cli {
    /// Image identifier: registry name[:tag] or sha1://<hash> content address (prompted when omitted)
    #[arg(value_name = "IMAGE")]
    pub(crate) image: Option<String>,

    /// Bind mount HOST:CONTAINER[:ro|rw] (repeatable)
    #[arg(short = 'v', long = "mount", value_name = "HOST:CONTAINER")]
    pub(crate) mounts: Vec<String>,

    /// Publish HOST:CONTAINER port (repeatable)
    #[arg(short = 'p', long = "port", value_name = "HOST:CONTAINER")]
    pub(crate) ports: Vec<String>,

    /// Set KEY=VALUE in the container (repeatable; last wins per key)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub(crate) env: Vec<String>,

    /// Start the container in the background and print its id
    #[arg(short = 'd', long)]
    pub(crate) detached: bool,

    /// Container name
    #[arg(long)]
    pub(crate) name: Option<String>,

    /// Keep attached containers after they exit (default: remove)
    #[arg(long)]
    pub(crate) keep: bool,

    /// Mount a kachery storage directory at /kachery-storage and point KACHERY_STORAGE_DIR at it
    #[arg(long, value_name = "DIR")]
    pub(crate) kachery: Option<PathBuf>,

    /// Container runtime: docker, podman or a path (overrides LABBOX_LAUNCHER_RUNTIME)
    #[arg(long, global = true)]
    pub(crate) runtime: Option<String>,

    /// Configuration file (default: ~/.labbox-launcher.yml)
    #[arg(long, value_name = "FILE", global = true)]
    pub(crate) config: Option<PathBuf>,

    /// Never prompt; missing required settings are an error
    #[arg(long = "non-interactive")]
    pub(crate) non_interactive: bool,

    /// Prepare and print what would run, but do not execute
    #[arg(long)]
    pub(crate) dry_run: bool,

    /// Print detailed execution info
    #[arg(long, global = true)]
    pub(crate) verbose: bool,

    /// Colorize output: auto|always|never
    #[arg(long = "color", value_enum, global = true)]
    pub(crate) color: Option<labbox_launcher::ColorMode>,

    /// Command and arguments to run instead of the image entry point (must come last)
    #[arg(
        long = "command",
        num_args = 1..,
        allow_hyphen_values = true,
        value_name = "CMD"
    )]
    pub(crate) command: Option<Vec<String>>,

    #[command(subcommand)]
    pub(crate) cmd: Option<Cmd>,
}
