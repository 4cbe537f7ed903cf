//! CLI command definitions and argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use parva_core::api::endpoints::DEFAULT_LOCATION;
use parva_core::api::ResolveOptions;

/// Default look-ahead for `upcoming` and `next`.
const DEFAULT_DAYS: u32 = 30;

/// Parva CLI - query the Parva calendar API and drive the offline cache.
///
/// API commands print the normalized `{data, meta}` envelope as JSON.
/// `offline` commands route requests through the offline agent backed by
/// the on-disk cache, so they keep answering when the network is gone.
#[derive(Debug, Parser)]
#[command(name = "parva")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// API base URL, overriding the config file
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// App origin the offline agent controls, overriding the config file
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Also write daily log files to this directory
    #[arg(long, global = true, env = "PARVA_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Today's date in both calendars
    Today,

    /// Convert a Gregorian date (YYYY-MM-DD) to Bikram Sambat
    Convert { date: String },

    /// Panchanga for a date (default: today)
    Panchanga { date: Option<String> },

    /// Festivals in the next N days
    Upcoming {
        #[arg(default_value_t = DEFAULT_DAYS)]
        days: u32,
    },

    /// Observances on a date
    Observances(ObservanceArgs),

    /// Next observance after a date
    Next(NextArgs),

    /// Explain a festival's date for a year
    Festival { id: String, year: i32 },

    /// Fetch a calculation trace
    Trace { trace_id: String },

    /// Resolve a date under a calendar profile
    Resolve(ResolveArgs),

    /// Spec conformance report
    Conformance,

    /// Verify a trace's provenance
    Verify { trace_id: String },

    /// Offline cache agent
    Offline(OfflineArgs),

    /// Show or write the configuration
    Config(ConfigArgs),
}

/// Arguments for the observances command.
#[derive(Debug, Args)]
pub struct ObservanceArgs {
    /// Date (YYYY-MM-DD)
    pub date: String,

    /// Observer location
    #[arg(short, long, default_value = DEFAULT_LOCATION)]
    pub location: String,

    /// Comma-separated tradition preferences
    #[arg(short, long)]
    pub preferences: Option<String>,
}

/// Arguments for the next command.
#[derive(Debug, Args)]
pub struct NextArgs {
    /// Start date (default: today)
    #[arg(long)]
    pub from: Option<String>,

    /// Days to look ahead
    #[arg(short, long, default_value_t = DEFAULT_DAYS)]
    pub days: u32,

    /// Observer location
    #[arg(short, long, default_value = DEFAULT_LOCATION)]
    pub location: String,

    /// Comma-separated tradition preferences
    #[arg(short, long)]
    pub preferences: Option<String>,
}

/// Arguments for the resolve command. Defaults place the observer in
/// Kathmandu under the mainstream Nepali profile.
#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Date (YYYY-MM-DD)
    pub date: String,

    /// Calendar policy profile
    #[arg(long)]
    pub profile: Option<String>,

    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Leave the calculation trace out of the response
    #[arg(long)]
    pub no_trace: bool,
}

impl ResolveArgs {
    pub fn options(&self) -> ResolveOptions {
        let defaults = ResolveOptions::default();
        ResolveOptions {
            profile: self.profile.clone().unwrap_or(defaults.profile),
            latitude: self.latitude.unwrap_or(defaults.latitude),
            longitude: self.longitude.unwrap_or(defaults.longitude),
            include_trace: !self.no_trace,
        }
    }
}

#[derive(Debug, Args)]
pub struct OfflineArgs {
    #[command(subcommand)]
    pub action: OfflineAction,
}

/// Offline agent actions.
#[derive(Debug, Subcommand)]
pub enum OfflineAction {
    /// Install and activate the offline cache
    Install,

    /// Fetch a URL (absolute, or a path under the origin) through the agent
    Fetch { url: String },

    /// List cache buckets and their entries
    Buckets,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Configuration actions. Without one, the effective configuration is shown.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Write the effective configuration to the config file
    Init,
}
