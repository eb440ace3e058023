//! All the clap stuff for parsing/documenting the cli

use camino::Utf8PathBuf;
use clap::{
    builder::{PossibleValuesParser, TypedValueParser},
    Args, Parser, Subcommand, ValueEnum,
};
use shipwright::context::DEFAULT_PARALLELISM;
use tracing::level_filters::LevelFilter;

#[derive(Parser, Clone, Debug)]
#[clap(version, about, long_about = None)]
#[clap(propagate_version = true)]
/// Package prebuilt binaries and publish them as a release.
pub struct Cli {
    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,

    /// How verbose logging should be (log level)
    #[clap(long, short)]
    #[clap(default_value_t = LevelFilter::INFO)]
    #[clap(value_parser = PossibleValuesParser::new(["off", "error", "warn", "info", "debug", "trace"]).map(|s| s.parse::<LevelFilter>().expect("possible values are valid")))]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub verbose: LevelFilter,

    /// The format of the output
    #[clap(long, short, value_enum)]
    #[clap(default_value_t = OutputFormat::Human)]
    #[clap(help_heading = "GLOBAL OPTIONS", global = true)]
    pub output_format: OutputFormat,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Package the builds and publish a release
    #[clap(disable_version_flag = true)]
    Release(ReleaseArgs),
    /// Print the JSON Schema of one of shipwright's files
    #[clap(disable_version_flag = true)]
    Schema(SchemaArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ReleaseArgs {
    /// Path to the config file
    ///
    /// Defaults to shipwright.toml in the current directory.
    #[clap(long, short)]
    pub config: Option<Utf8PathBuf>,

    /// Path to the builds input
    ///
    /// Defaults to builds.json in the dist dir.
    #[clap(long)]
    pub builds: Option<Utf8PathBuf>,

    /// Release the current commit as a snapshot
    ///
    /// Snapshots don't need a tag, are versioned SNAPSHOT-<commit>, and are never published.
    #[clap(long)]
    pub snapshot: bool,

    /// Do everything except publishing
    #[clap(long)]
    pub skip_publish: bool,

    /// Don't check that the git working tree is clean
    #[clap(long)]
    pub skip_validate: bool,

    /// How many uploads may run at once
    #[clap(long, short)]
    #[clap(default_value_t = DEFAULT_PARALLELISM)]
    pub parallelism: usize,

    /// File with the release notes to use as the release body
    #[clap(long)]
    pub release_notes: Option<Utf8PathBuf>,

    /// Log at debug level (overrides --verbose)
    #[clap(long)]
    pub debug: bool,
}

#[derive(Args, Clone, Debug)]
pub struct SchemaArgs {
    /// Which file to print the schema of
    #[clap(value_enum)]
    #[clap(default_value_t = SchemaKind::Builds)]
    pub kind: SchemaKind,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    /// builds.json
    Builds,
    /// shipwright.toml
    Config,
    /// the report printed at the end of `shipwright release`
    Report,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}
