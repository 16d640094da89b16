use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "tripsheet", version, about = "Trip spreadsheet sync")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Owner and spreadsheet addressed by a command.
#[derive(Debug, Clone, clap::Args)]
pub struct SourceArgs {
    /// Owner of the trip (cache key).
    #[arg(long, env = "TRIPSHEET_OWNER_ID")]
    pub owner: String,

    /// Google spreadsheet id.
    #[arg(long, env = "TRIPSHEET_SPREADSHEET_ID")]
    pub spreadsheet_id: String,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one locations sync: enrich within budget, write back, publish the cache.
    ///
    /// A `partial` status means there is more to enrich; run it again.
    Sync {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Read or rewrite the itinerary tab.
    Itinerary {
        #[command(flatten)]
        source: SourceArgs,

        #[command(subcommand)]
        action: ItineraryAction,
    },

    /// Patch one location by id in the spreadsheet and the cache.
    UpdateLocation {
        #[command(flatten)]
        source: SourceArgs,

        /// Location id, e.g. `loc-3`.
        #[arg(long)]
        id: String,

        /// JSON object of fields to change, e.g. `{"city":"Kyoto"}`.
        #[arg(long)]
        patch: String,
    },

    /// Print a cached snapshot without touching the spreadsheet.
    ShowCache {
        #[arg(long, env = "TRIPSHEET_OWNER_ID")]
        owner: String,

        #[arg(long, value_enum, default_value = "locations")]
        kind: CacheKind,
    },

    /// Print the effective configuration (secrets redacted).
    Config,
}

#[derive(Debug, Subcommand)]
pub enum ItineraryAction {
    /// Print the itinerary, creating the tab when it does not exist.
    Read,
    /// Replace the itinerary with the items in a JSON file.
    Write {
        /// JSON array of `{day, locationId, order, note}`.
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum CacheKind {
    Locations,
    Itinerary,
}
