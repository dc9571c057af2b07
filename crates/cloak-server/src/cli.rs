//! Clap derive structures for the `cloak-server` CLI.
//!
//! Also compiled by build.rs for man page generation, so this file may only
//! depend on clap and clap_complete.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// cloak-server -- register and provision an Encrypt.me VPN server
#[derive(Debug, Parser)]
#[command(
    name = "cloak-server",
    version,
    about = "Register and provision an Encrypt.me VPN server",
    long_about = "Talks to the Encrypt.me server management API on behalf of a\n\
        VPN gateway: registers it with a team, shows its configuration,\n\
        requests its certificate and downloads its PKI bundle.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Path to the config file
    #[arg(long, env = "CLOAK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// URL of the Encrypt.me management site (saved to the config)
    #[arg(long, visible_alias = "base_url", global = true)]
    pub base_url: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "CLOAK_OUTPUT", default_value = "table", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress normal output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "CLOAK_INSECURE", global = true)]
    pub insecure: bool,

    /// PEM bundle of extra CA certificates to trust
    #[arg(long, value_name = "PEM", global = true)]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "CLOAK_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text and tables (default)
    Table,
    /// Pretty-printed JSON of the API record
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Register this server with a team
    Register(RegisterArgs),

    /// Show information about this server
    Info,

    /// Request a certificate for this server's private key
    Req(ReqArgs),

    /// Download this server's PKI bundle
    Pki(PkiArgs),

    /// Inspect the CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Account email (prompted for when omitted)
    #[arg(long, short = 'e')]
    pub email: Option<String>,

    /// Account password (prompted for when omitted)
    #[arg(long, env = "CLOAK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Target the server joins
    #[arg(long, short = 't')]
    pub target: String,

    /// Server name [default: this host's name]
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// API version to register against
    #[arg(long)]
    pub api_version: Option<String>,

    /// Replace an existing registration without asking
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct ReqArgs {
    /// PEM-encoded private key for the certificate
    #[arg(long, value_name = "PEM")]
    pub key: PathBuf,
}

#[derive(Debug, Args)]
pub struct PkiArgs {
    /// Fetch unconditionally, ignoring the cached ETag
    #[arg(long, short = 'f', conflicts_with = "etag")]
    pub force: bool,

    /// ETag to send instead of the cached one
    #[arg(long)]
    pub etag: Option<String>,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the resolved configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
