use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const ENV_REQUEST_API_KEY: &str = "ORGDIR_REQUEST_API_KEY";

#[derive(Parser, Debug)]
#[command(name = "orgdir", version, about = "Organization directory query CLI")]
pub struct Cli {
    #[arg(long, global = true, help = "TOML config file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Database file (overrides config)")]
    pub db: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = ENV_REQUEST_API_KEY,
        hide_env_values = true,
        help = "API key presented with the request"
    )]
    pub api_key: Option<String>,
    #[arg(long, global = true, help = "Log level (overrides config)")]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Create or upgrade the database schema.
    Migrate,
    /// Replace directory data with the demo dataset.
    Seed,
    #[command(flatten)]
    Query(QueryCommand),
}

/// Read-only directory queries; these pass through the access gate.
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum QueryCommand {
    /// List every building.
    Buildings,
    ByBuilding {
        building_id: i64,
    },
    ByActivity {
        activity_id: i64,
    },
    /// Organizations in an activity subtree, matched by root name.
    ByActivityName {
        name: String,
    },
    ByRadius {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        #[arg(long, allow_negative_numbers = true)]
        radius_km: f64,
    },
    ByName {
        fragment: String,
    },
    Org {
        organization_id: i64,
    },
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Migrate => "migrate",
            Self::Seed => "seed",
            Self::Query(query) => query.name(),
        }
    }
}

impl QueryCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Buildings => "buildings",
            Self::ByBuilding { .. } => "by_building",
            Self::ByActivity { .. } => "by_activity",
            Self::ByActivityName { .. } => "by_activity_name",
            Self::ByRadius { .. } => "by_radius",
            Self::ByName { .. } => "by_name",
            Self::Org { .. } => "org",
        }
    }
}
