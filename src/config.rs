//! Command line and environment configuration.

use std::io::{self, IsTerminal};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use directories::ProjectDirs;

use crate::logging::{LogConfig, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "fdic-dashboard",
    version,
    about = "Browse, chart and compare FDIC-insured institutions"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// -v for debug, -vv for trace.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the dashboard, table and comparison pages.
    Serve(ServeArgs),
    /// Load a CSV export into the local SQLite mirror.
    Import(ImportArgs),
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:3000", env = "FDIC_BIND")]
    pub bind: SocketAddr,

    #[arg(long, value_enum, default_value = "remote", env = "FDIC_BACKEND")]
    pub backend: Backend,

    #[arg(long = "supabase-url", env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long = "supabase-key", env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_key: Option<String>,

    #[arg(long = "supabase-schema", env = "SUPABASE_SCHEMA", default_value = "fdic_data")]
    pub supabase_schema: String,

    /// SQLite mirror used by the `sqlite` backend.
    #[arg(long = "db", env = "FDIC_DB_PATH", value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Field taxonomy JSON; the bundled one is used when omitted.
    #[arg(long, value_name = "PATH")]
    pub taxonomy: Option<PathBuf>,

    /// Always hit the backend instead of memoizing reads.
    #[arg(long = "no-cache")]
    pub no_cache: bool,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Target table: institutions, fields, report_periods or reported_values.
    #[arg(long, default_value = "institutions")]
    pub table: String,

    #[arg(value_name = "CSV")]
    pub csv_path: PathBuf,

    #[arg(long = "db", env = "FDIC_DB_PATH", value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Supabase PostgREST endpoint.
    Remote,
    /// Local SQLite mirror.
    Sqlite,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

impl Cli {
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_verbosity(self.verbose)
            .with_format(self.log_format.into())
            .with_ansi(io::stderr().is_terminal())
            .with_log_file(self.log_file.clone())
    }
}

/// Remote connection settings, present only when both are set.
pub struct RemoteSettings {
    pub url: String,
    pub key: String,
    pub schema: String,
}

impl ServeArgs {
    pub fn remote(&self) -> Result<RemoteSettings> {
        let (Some(url), Some(key)) = (&self.supabase_url, &self.supabase_key) else {
            bail!("the remote backend needs SUPABASE_URL and SUPABASE_ANON_KEY");
        };
        Ok(RemoteSettings {
            url: url.clone(),
            key: key.clone(),
            schema: self.supabase_schema.clone(),
        })
    }
}

pub fn resolve_db_path(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.clone()),
        None => default_db_path(),
    }
}

pub fn default_db_path() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("com", "fdic", "fdic-dashboard")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    Ok(project_dirs.data_local_dir().join("institutions.sqlite"))
}
