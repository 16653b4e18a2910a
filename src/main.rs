//! Denguedash - Dengue Surveillance Dashboard
//!
//! One-shot batch pipeline: load the case export, clean it, aggregate along
//! the demographic, geographic, temporal and clinical dimensions, then serve
//! the rendered dashboard.

mod charts;
mod data;
mod geo;
mod stats;
mod web;

use anyhow::Result;
use tracing::{info, Level};

use data::{CaseCleaner, CaseLoader};
use geo::GeoJoiner;
use web::Dashboard;

const DEFAULT_PORT: u16 = 8050;

/// Runtime configuration, environment only. There are no CLI flags.
struct Config {
    cases_path: String,
    population_path: String,
    boundaries_path: String,
    map_artifact_path: String,
    port: u16,
}

impl Config {
    fn from_env() -> Self {
        Self {
            cases_path: std::env::var("DENGUE_CASES")
                .unwrap_or_else(|_| "Base_dengue.csv".to_string()),
            population_path: std::env::var("DENGUE_POPULATION")
                .unwrap_or_else(|_| "poblacion_departamentos_colombia_2018.csv".to_string()),
            boundaries_path: std::env::var("DENGUE_BOUNDARIES")
                .unwrap_or_else(|_| "Mapa_Depto.geojson".to_string()),
            map_artifact_path: std::env::var("DENGUE_MAP_HTML")
                .unwrap_or_else(|_| "mapa_dengue.html".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok())
                .unwrap_or(DEFAULT_PORT),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();

    let raw = CaseLoader::load_cases(&config.cases_path)?;
    info!("loaded {} case records from {}", raw.height(), config.cases_path);

    let cases = CaseCleaner::clean(&raw)?;
    let population = CaseLoader::load_population(&config.population_path)?;
    let boundaries = GeoJoiner::load_boundaries(&config.boundaries_path)?;

    let dashboard = Dashboard::build(&cases, &boundaries, &population, &config.map_artifact_path)?;

    web::serve(dashboard.into_html(), config.port).await
}
