//! `orgdir` command-line front end.
//!
//! # Responsibility
//! - Resolve settings (file, then environment, then flags) and start logging.
//! - Gate query commands on the presented API key, run them in a read
//!   session and print JSON.
//!
//! # Exit codes
//! `0` success, `1` other failure, `2` invalid input, `3` access denied,
//! `4` nothing found.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, QueryCommand};
use log::{error, info};
use orgdir_core::config::{self, ConfigError, ENV_DB_PATH};
use orgdir_core::db::{migrations, open_db, DbError};
use orgdir_core::{
    init_logging, seed_demo_data, AccessError, ApiKeyGate, Building, DirectoryConfig,
    DirectoryReader, LoggingError, NotFoundTarget, OrganizationView, QueryError, QueryResult,
    RadiusSearch, SeedError, SeedSummary, SessionService,
};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::process::ExitCode;

#[derive(Debug)]
enum CliError {
    MissingDatabase,
    Config(ConfigError),
    Logging(LoggingError),
    Access(AccessError),
    Query(QueryError),
    Db(DbError),
    Seed(SeedError),
    Output(serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Access(_) => 3,
            Self::Query(err) => match err.http_status() {
                404 => 4,
                422 => 2,
                _ => 1,
            },
            Self::MissingDatabase | Self::Config(ConfigError::Validation(_)) => 2,
            _ => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDatabase => write!(
                f,
                "no database configured; pass --db, --config or set {ENV_DB_PATH}"
            ),
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Access(err) => write!(f, "access denied: {err}"),
            Self::Query(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Seed(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "failed to encode output: {err}"),
        }
    }
}

impl Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<AccessError> for CliError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}

impl From<QueryError> for CliError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<SeedError> for CliError {
    fn from(value: SeedError) -> Self {
        Self::Seed(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Output {
    Organizations(Vec<OrganizationView>),
    Organization(OrganizationView),
    Buildings(Vec<Building>),
    Migrated { schema_version: u32 },
    Seeded(SeedSummary),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = run(cli);
    // Buffered file output is not flushed by process exit.
    log::logger().flush();
    match outcome {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let settings = resolve_config(&cli, |key| std::env::var(key).ok())?;
    init_logging(&settings.logging)?;

    let output = match &cli.command {
        Commands::Migrate => open_db(&settings.database.path)
            .and_then(|conn| migrations::current_user_version(&conn))
            .map(|schema_version| Output::Migrated { schema_version })
            .map_err(CliError::from),
        Commands::Seed => open_db(&settings.database.path)
            .map_err(CliError::from)
            .and_then(|mut conn| Ok(Output::Seeded(seed_demo_data(&mut conn)?))),
        Commands::Query(query) => ApiKeyGate::new(settings.access.api_key.clone())
            .verify(cli.api_key.as_deref())
            .map_err(CliError::from)
            .and_then(|()| {
                DirectoryReader::new(&settings.database.path)
                    .session(|service| run_query(query, service))
                    .map_err(CliError::from)
            }),
    };

    match &output {
        Ok(_) => info!(
            "event=cli_command module=cli status=ok command={}",
            cli.command.name()
        ),
        Err(err) => error!(
            "event=cli_command module=cli status=error command={} exit_code={}",
            cli.command.name(),
            err.exit_code()
        ),
    }
    Ok(serde_json::to_string_pretty(&output?)?)
}

/// File settings, then `ORGDIR_*` environment, then flags.
fn resolve_config(
    cli: &Cli,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<DirectoryConfig, CliError> {
    let mut settings = match (&cli.config, &cli.db, lookup(ENV_DB_PATH)) {
        (Some(path), _, _) => config::load(path)?,
        (None, Some(db), _) => DirectoryConfig::for_database(db),
        (None, None, Some(db)) => DirectoryConfig::for_database(db),
        (None, None, None) => return Err(CliError::MissingDatabase),
    };
    settings.apply_env_overrides(&lookup)?;

    if let Some(db) = &cli.db {
        settings.database.path = db.clone();
    }
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn run_query(query: &QueryCommand, service: &SessionService<'_>) -> QueryResult<Output> {
    let organizations = match query {
        QueryCommand::Buildings => return Ok(Output::Buildings(service.all_buildings()?)),
        QueryCommand::Org { organization_id } => {
            let organization = service.by_identity(*organization_id)?;
            return service
                .present(std::slice::from_ref(&organization))?
                .pop()
                .map(Output::Organization)
                .ok_or(QueryError::NotFound(NotFoundTarget::Organization(
                    *organization_id,
                )));
        }
        QueryCommand::ByBuilding { building_id } => service.by_building(*building_id)?,
        QueryCommand::ByActivity { activity_id } => service.by_activity(*activity_id)?,
        QueryCommand::ByActivityName { name } => service.by_activity_name(name)?,
        QueryCommand::ByRadius {
            lat,
            lon,
            radius_km,
        } => service.by_radius(&RadiusSearch::new(*lat, *lon, *radius_km))?,
        QueryCommand::ByName { fragment } => service.by_name_substring(fragment)?,
    };
    Ok(Output::Organizations(service.present(&organizations)?))
}
