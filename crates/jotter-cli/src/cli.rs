use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use jotter_core::LimitType;

#[derive(Parser)]
#[command(name = "jot")]
#[command(about = "Keep one memo in sync between this machine and a private gist")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// CLI profile name
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    /// Never contact GitHub; work on the local copy only
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the memo
    Show {
        /// Output the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Replace the memo (reads stdin when no text is given)
    Write {
        /// New memo text
        text: Vec<String>,
    },
    /// Append a line to the memo
    Append {
        /// Line to append
        text: Vec<String>,
    },
    /// Change the input length policy
    Limit {
        /// Count characters or UTF-8 bytes
        #[arg(long = "type", value_enum)]
        limit_type: LimitTypeArg,
        /// Maximum length
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        value: u32,
    },
    /// Show record metadata and sync state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Push local changes, or pull the remote copy
    Sync {
        /// Pull instead of push
        #[arg(long)]
        pull: bool,
    },
    /// Append lines from stdin as they arrive, pushing after each pause
    Compose,
    /// Discard the local memo and start from an empty one
    Wipe {
        /// Skip the confirmation check
        #[arg(long)]
        yes: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sign in to GitHub for gist sync
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum LimitTypeArg {
    Char,
    Byte,
}

impl From<LimitTypeArg> for LimitType {
    fn from(value: LimitTypeArg) -> Self {
        match value {
            LimitTypeArg::Char => Self::Char,
            LimitTypeArg::Byte => Self::Byte,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update profile config
    Init {
        /// Profile name to initialize
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// GitHub OAuth app client id for device login
        #[arg(long, value_name = "ID")]
        client_id: Option<String>,
        /// GitHub REST API base URL
        #[arg(long, value_name = "URL")]
        api_base_url: Option<String>,
        /// Name of the file kept in the gist
        #[arg(long, value_name = "NAME")]
        gist_file: Option<String>,
        /// Quiet period before a push, in milliseconds
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved configuration for a profile
    Show {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with a personal access token, or via the device flow
    Login {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
        /// Personal access token with the `gist` scope
        #[arg(long, value_name = "TOKEN")]
        token: Option<String>,
    },
    /// Show auth status for profile
    Status {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
    /// Sign out and forget the cached gist
    Logout {
        /// Optional profile override
        #[arg(long, value_name = "NAME")]
        profile: Option<String>,
    },
}
