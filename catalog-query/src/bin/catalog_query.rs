//! Command-line front end for the observation catalog
//!
//! Runs queries against a CSV dump of the `files` table, renders the SQL a
//! relational backend would receive, and manages the SIMBAD alias cache.
//!
//! # Usage
//!
//! ```bash
//! # Query with the public parameter names
//! catalog-query --catalog files.csv query "target=M31&file-types=fits&limit=10"
//!
//! # Cone search around RA=350, Dec=0 with a 20 degree radius
//! catalog-query --catalog files.csv query "target=&pos-ra=350&pos-dec=0&pos-rad=20"
//!
//! # Show the parameterized SQL for PostgreSQL
//! catalog-query sql "target=/^HIP&time-start=58849" --dialect postgres
//!
//! # Resolve aliases for every target and save the cache
//! catalog-query --catalog files.csv warm
//! catalog-query resolve "M31"
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use catalog_query::sql::render_named;
use catalog_query::{
    plan, EngineConfig, FilterSpec, JsonSnapshotFile, MemoryCatalog, QueryEngine, QueryParams,
    SimbadResolver, SynonymCache,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// CSV dump of the catalog (overrides the configuration)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Alias cache snapshot (overrides the configuration)
    #[arg(long)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a query and print the response envelope
    Query {
        /// URL query string, e.g. "target=M31&limit=5"
        query: String,
    },

    /// Print the parameterized SQL for a query
    Sql {
        /// URL query string, e.g. "target=M31&limit=5"
        query: String,

        /// SQL dialect: mysql or postgres
        #[arg(short, long, default_value = "mysql")]
        dialect: String,
    },

    /// List distinct target names
    Targets {
        /// Include the alias list of every target
        #[arg(short, long)]
        aliases: bool,
    },

    /// List distinct telescopes
    Telescopes,

    /// List distinct file types
    FileTypes,

    /// Resolve aliases for every target and save the cache
    Warm,

    /// Look up the aliases of a single name
    Resolve {
        /// Target name
        name: String,
    },
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(catalog) = &cli.catalog {
        config.catalog_path = Some(catalog.clone());
    }
    if let Some(cache) = &cli.cache {
        config.synonym_cache_path = cache.clone();
    }
    Ok(config)
}

fn open_engine(config: &EngineConfig) -> Result<QueryEngine<MemoryCatalog>> {
    let path = config
        .catalog_path
        .as_ref()
        .ok_or_else(|| anyhow!("No catalog given; pass --catalog or set catalog_path"))?;
    let catalog = MemoryCatalog::load_csv(path)
        .with_context(|| format!("Failed to load catalog from {}", path.display()))?;
    Ok(QueryEngine::with_table(catalog, config.table.clone()))
}

fn open_cache(config: &EngineConfig) -> Result<SynonymCache<SimbadResolver, JsonSnapshotFile>> {
    let store = JsonSnapshotFile::new(&config.synonym_cache_path);
    SynonymCache::open(SimbadResolver::new(&config.simbad), store).with_context(|| {
        format!(
            "Failed to load alias cache from {}",
            config.synonym_cache_path.display()
        )
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Query { query } => {
            let engine = open_engine(&config)?;
            let response = engine.respond(&QueryParams::from_query_string(query));
            print_json(&response)?;
        }
        Commands::Sql { query, dialect } => {
            let spec = FilterSpec::from_params(&QueryParams::from_query_string(query))?;
            let rendered = render_named(&plan(&spec), &config.table, dialect)
                .ok_or_else(|| anyhow!("Unknown SQL dialect: {dialect}"))?;
            print_json(&rendered)?;
        }
        Commands::Targets { aliases } => {
            let engine = open_engine(&config)?;
            if *aliases {
                let cache = open_cache(&config)?;
                print_json(&engine.target_aliases(&cache)?)?;
            } else {
                print_json(&engine.list_targets()?)?;
            }
        }
        Commands::Telescopes => print_json(&open_engine(&config)?.list_telescopes()?)?,
        Commands::FileTypes => print_json(&open_engine(&config)?.list_file_types()?)?,
        Commands::Warm => {
            let engine = open_engine(&config)?;
            let cache = open_cache(&config)?;
            let report = engine.warm_synonyms(&cache)?;
            info!(
                "Alias cache written to {}",
                config.synonym_cache_path.display()
            );
            print_json(&report)?;
        }
        Commands::Resolve { name } => {
            let cache = open_cache(&config)?;
            let aliases = cache.lookup(name);
            cache.persist()?;
            print_json(&aliases)?;
        }
    }

    Ok(())
}
