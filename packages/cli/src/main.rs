#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal front end for the crime risk views.
//!
//! Every view command loads a fresh snapshot from the analytics backend,
//! reconciles it, and prints one surface of it. `classify` and `predict`
//! run a single on-demand query. `--json` prints the underlying view model
//! instead of a table.
//!
//! The backend location comes from `CRIME_RISK_API_URL` and
//! `CRIME_RISK_TIMEOUT_SECS`, overridable with `--api-url` and `--timeout`.

mod render;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use crime_risk::{RiskClassifier, TierTable};
use crime_risk_backend::{AnalyticsBackend, BackendConfig, HttpBackend, config::parse_timeout};
use crime_risk_geocoder::GeocodingTable;
use crime_risk_query::{
    ClusterQuery, PredictionQuery, QueryConfig, QueryLimits, QueryOrchestrator, QueryState, Weapon,
};
use crime_risk_view::{SnapshotStore, ViewModel, map_markers};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "crime_risk", about = "Crime risk views for the neighborhoods of Recife")]
struct Cli {
    /// Backend base URL (overrides `CRIME_RISK_API_URL`)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// Request timeout in seconds (overrides `CRIME_RISK_TIMEOUT_SECS`)
    #[arg(long, global = true)]
    timeout: Option<String>,
    /// Cluster → tier fallback table (TOML) replacing the built-in one
    #[arg(long, global = true)]
    tiers: Option<PathBuf>,
    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary counts, tier distribution, top neighborhoods, and data warnings
    Overview {
        /// Number of neighborhoods in the top chart
        #[arg(long, default_value = "10")]
        top: usize,
    },
    /// Cluster profiles and their statistics
    Clusters,
    /// Neighborhoods ranked by occurrences
    Ranking {
        /// Maximum number of rows
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Map markers with coordinates, colors, and radii
    Map {
        /// City coordinate table (TOML) replacing the built-in Recife one
        #[arg(long)]
        city: Option<PathBuf>,
    },
    /// Which cluster does a neighborhood belong to?
    Classify {
        /// Neighborhood name (e.g., "Boa Viagem")
        bairro: String,
    },
    /// Predict crimes for a neighborhood and period, with its history
    Predict {
        /// Neighborhood name (e.g., "Boa Viagem")
        bairro: String,
        /// Month, 1-12 (default: current month)
        #[arg(long)]
        month: Option<u32>,
        /// Year (default: current year)
        #[arg(long)]
        year: Option<i32>,
        /// Expected victims
        #[arg(long, default_value = "1")]
        victims: u32,
        /// Expected suspects
        #[arg(long, default_value = "1")]
        suspects: u32,
        /// Weapon: `none`, `arma-de-fogo`, `arma-branca`, or `outras-armas`
        #[arg(long, default_value = "none")]
        weapon: Weapon,
    },
    /// Describe the prediction model
    Model,
    /// Check that the backend is up
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = backend_config(&cli)?;
    log::debug!("Using backend at {}", config.base_url);
    let timeout = config.timeout;
    let backend: Arc<dyn AnalyticsBackend> = Arc::new(HttpBackend::new(&config)?);
    let classifier = RiskClassifier::new(match &cli.tiers {
        Some(path) => TierTable::from_toml_str(&read(path)?)?,
        None => TierTable::embedded(),
    });

    match cli.command {
        Commands::Overview { top } => {
            let view = load_view(&backend, classifier).await?;
            if cli.json {
                print_json(&view)?;
            } else {
                render::overview(&view, top);
            }
        }
        Commands::Clusters => {
            let view = load_view(&backend, classifier).await?;
            if cli.json {
                print_json(&view.per_cluster)?;
            } else {
                render::clusters(&view);
            }
        }
        Commands::Ranking { limit } => {
            let view = load_view(&backend, classifier).await?;
            let rows = &view.ranking[..limit.min(view.ranking.len())];
            if cli.json {
                print_json(&rows)?;
            } else {
                render::ranking(rows);
            }
        }
        Commands::Map { city } => {
            let table = match city {
                Some(path) => GeocodingTable::from_toml_str(&read(&path)?)?,
                None => GeocodingTable::recife(),
            };
            let view = load_view(&backend, classifier).await?;
            let layer = map_markers(&view, &table);
            if cli.json {
                print_json(&layer)?;
            } else {
                render::map(&table, &layer);
            }
        }
        Commands::Classify { bairro } => {
            let orchestrator = QueryOrchestrator::new(backend, query_config(timeout))
                .with_classifier(classifier);
            orchestrator.submit_cluster(ClusterQuery::new(bairro)).await?;
            finish_query(&orchestrator, cli.json)?;
        }
        Commands::Predict {
            bairro,
            month,
            year,
            victims,
            suspects,
            weapon,
        } => {
            let defaults = PredictionQuery::for_today(bairro);
            let query = PredictionQuery {
                month: month.unwrap_or(defaults.month),
                year: year.unwrap_or(defaults.year),
                victims,
                suspects,
                weapon,
                ..defaults
            };
            let orchestrator = QueryOrchestrator::new(backend, query_config(timeout))
                .with_classifier(classifier);
            orchestrator.submit_prediction(query).await?;
            orchestrator.history_settled().await;
            finish_query(&orchestrator, cli.json)?;
        }
        Commands::Model => {
            let info = backend.fetch_model_info().await?;
            if cli.json {
                print_json(&info)?;
            } else {
                render::model(&info);
            }
        }
        Commands::Health => {
            let health = backend.health().await?;
            if cli.json {
                print_json(&health)?;
            } else {
                println!(
                    "{} (version {}): {}",
                    health.mensagem.as_deref().unwrap_or("Analytics API"),
                    health.versao.as_deref().unwrap_or("?"),
                    health.status.as_deref().unwrap_or("unknown"),
                );
            }
        }
    }

    Ok(())
}

fn backend_config(cli: &Cli) -> Result<BackendConfig, Box<dyn std::error::Error>> {
    let env = BackendConfig::from_env()?;
    let timeout = match &cli.timeout {
        Some(value) => parse_timeout(value)?,
        None => env.timeout,
    };
    let base_url = cli.api_url.as_deref().unwrap_or(&env.base_url);
    Ok(BackendConfig::new(base_url, timeout)?)
}

fn query_config(timeout: Duration) -> QueryConfig {
    QueryConfig::new(QueryLimits::embedded(), timeout)
}

fn read(path: &Path) -> Result<String, Box<dyn std::error::Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()).into())
}

async fn load_view(
    backend: &Arc<dyn AnalyticsBackend>,
    classifier: RiskClassifier,
) -> Result<Arc<ViewModel>, Box<dyn std::error::Error>> {
    let store = SnapshotStore::new(Arc::clone(backend), classifier);
    Ok(store.refresh().await?)
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn finish_query(
    orchestrator: &QueryOrchestrator,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    match orchestrator.state() {
        QueryState::Success(outcome) => {
            if json {
                print_json(&outcome)?;
            } else {
                render::outcome(&outcome);
            }
            Ok(())
        }
        QueryState::Failed(failure) => {
            let hint = if failure.retryable { " (retry may help)" } else { "" };
            Err(format!("{}{hint}", failure.message).into())
        }
        QueryState::Idle | QueryState::Loading { .. } => Err("Query did not complete".into()),
    }
}
