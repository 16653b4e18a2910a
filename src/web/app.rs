//! Dashboard Application Module
//! Runs every aggregation exactly once over the cleaned case table, builds
//! the figures and assembles the four-tab page. The result is an immutable
//! HTML string; nothing is recomputed per request.

use polars::prelude::DataFrame;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::charts::{
    ChartBuilder, Figure, MapError, MapRenderer, BLUE, DEEP_SKY_BLUE, DODGER_BLUE, INDIAN_RED,
    MEDIUM_BLUE, ROYAL_BLUE,
};
use crate::geo::{GeoError, GeoJoiner};
use crate::stats::{AggregateError, Aggregator};
use crate::web::layout::{self, Tab};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error(transparent)]
    Geo(#[from] GeoError),
    #[error(transparent)]
    Map(#[from] MapError),
    #[error("Failed to read map artifact: {0}")]
    Io(#[from] std::io::Error),
}

/// Municipality view sizes offered by the toggle.
const MUNICIPALITY_TIERS: [usize; 4] = [5, 10, 15, 20];
const DEFAULT_MUNICIPALITY_VIEW: &str = "Top 10";

const YOUNG_AGE_LIMIT: f64 = 5.0;
const ELDERLY_AGE_FLOOR: f64 = 65.0;
const TOP_DEPARTMENTS: usize = 10;

/// The fully assembled dashboard page.
pub struct Dashboard {
    html: String,
}

impl Dashboard {
    /// Build the dashboard from the cleaned case table, the boundary
    /// collection and the population table. The density map is written to
    /// `map_artifact_path` and read back for embedding.
    pub fn build(
        cases: &DataFrame,
        boundaries: &Value,
        population: &DataFrame,
        map_artifact_path: &str,
    ) -> Result<Self, DashboardError> {
        // Demographics, from the table before geographic filtering.
        let ages = Aggregator::age_values(cases, None, None)?;
        let young = Aggregator::age_counts_up_to(cases, YOUNG_AGE_LIMIT)?;
        let elderly = Aggregator::age_values(cases, Some(ELDERLY_AGE_FLOOR), None)?;
        let sex = Aggregator::percentage_table(cases, "SEXO", "Sexo")?;
        let insurance = Aggregator::percentage_table(cases, "TIP_SS", "Tipo de Seguro")?;
        let groups = Aggregator::group_flag_counts(cases)?;
        let area = Aggregator::percentage_table(cases, "AREA", "Área")?;

        // Geography. Everything downstream works on the corrected table.
        let mapped = GeoJoiner::apply_department_corrections(cases)?;
        info!(
            "{} of {} case records are geographically mappable",
            mapped.height(),
            cases.height()
        );

        let department_counts = GeoJoiner::department_counts(&mapped)?;
        let top_departments = Aggregator::top_n(&department_counts, TOP_DEPARTMENTS);
        let top_regions =
            GeoJoiner::merge_counts_onto_regions(boundaries, &top_departments, "Casos_top10")?;

        let density = GeoJoiner::density_table(&department_counts, population)?;
        let annotated = GeoJoiner::annotate_boundaries(boundaries, &density)?;

        MapRenderer::write_html(&ChartBuilder::density_choropleth(&annotated), map_artifact_path)?;
        let map_document = std::fs::read_to_string(map_artifact_path)?;
        info!("density map artifact written to {map_artifact_path}");

        let municipality_counts =
            Aggregator::count_table(&mapped, "MUN_OCU", "Municipio", "Casos")?;
        let municipality_views: Vec<(String, DataFrame)> = MUNICIPALITY_TIERS
            .iter()
            .map(|&n| (format!("Top {n}"), Aggregator::top_n(&municipality_counts, n)))
            .collect();

        // Temporal and clinical views.
        let weekly = Aggregator::weekly_by_year(&mapped)?;
        let events = Aggregator::yearly_counts(&mapped, "EVENTO", "Pacientes")?;
        let final_status = Aggregator::final_status_by_year(&mapped)?;
        let confirmed = Aggregator::confirmed_by_year(&mapped)?;
        let hospitalized = Aggregator::hospitalized(&mapped)?;
        let hospitalized_by_year = Aggregator::yearly_totals(&hospitalized, "Frecuencia")?;
        let hospitalized_by_sex = Aggregator::yearly_counts(&hospitalized, "SEXO", "Frecuencia")?;
        let deaths = Aggregator::deaths_by_event(&mapped)?;

        let figures: Vec<(String, Figure)> = vec![
            ("fig-edad".into(), ChartBuilder::age_box(&ages)),
            ("fig-edad-5".into(), ChartBuilder::young_age_bar(&young)),
            ("fig-edad-65".into(), ChartBuilder::elderly_age_box(&elderly)),
            (
                "fig-mapa-top10".into(),
                ChartBuilder::department_choropleth(&top_regions, boundaries),
            ),
            (
                "fig-municipios".into(),
                ChartBuilder::municipality_top_bars(
                    &municipality_views,
                    DEFAULT_MUNICIPALITY_VIEW,
                ),
            ),
            ("fig-semana".into(), ChartBuilder::weekly_lines(&weekly)),
            (
                "fig-eventos".into(),
                ChartBuilder::yearly_grouped_bars(
                    &events,
                    "EVENTO",
                    "Pacientes",
                    "Pacientes por Evento y Año",
                    "Número de Pacientes",
                    "Evento",
                    &[("DENGUE", DODGER_BLUE), ("DENGUE GRAVE", MEDIUM_BLUE)],
                ),
            ),
            (
                "fig-estado".into(),
                ChartBuilder::yearly_grouped_bars(
                    &final_status,
                    "ESTADO_FINAL",
                    "Frecuencia",
                    "Estado Final del Caso por Año",
                    "Número de Casos",
                    "Estado Final",
                    &[
                        ("Probable", MEDIUM_BLUE),
                        ("C. por laboratorio", DEEP_SKY_BLUE),
                        ("C. por nexo", ROYAL_BLUE),
                    ],
                ),
            ),
            (
                "fig-confirmados".into(),
                ChartBuilder::yearly_grouped_bars(
                    &confirmed,
                    "confirmados",
                    "Frecuencia",
                    "Distribución de Casos confirmados por año",
                    "Número de Casos",
                    "Confirmados",
                    &[("No", DEEP_SKY_BLUE), ("Sí", BLUE)],
                ),
            ),
            (
                "fig-hospitalizados".into(),
                ChartBuilder::yearly_bar(
                    &hospitalized_by_year,
                    "Frecuencia",
                    "Pacientes Hospitalizados por Año",
                    "Número de Casos",
                ),
            ),
            (
                "fig-hosp-sexo".into(),
                ChartBuilder::yearly_grouped_bars(
                    &hospitalized_by_sex,
                    "SEXO",
                    "Frecuencia",
                    "Pacientes Hospitalizados por Año y Sexo",
                    "Pacientes Hospitalizados",
                    "Sexo",
                    &[("M", BLUE), ("F", INDIAN_RED)],
                ),
            ),
            ("fig-decesos".into(), ChartBuilder::deaths_donut(&deaths)),
        ];

        let demographics = [
            layout::section("Distribución de Edades", &layout::graph_div("fig-edad")),
            layout::section("Edades menores a 5 años", &layout::graph_div("fig-edad-5")),
            layout::section(
                "Edades mayores o iguales a 65 años",
                &layout::graph_div("fig-edad-65"),
            ),
            layout::section("Sexo", &layout::table_widget(&sex)),
            layout::section("Tipo de seguro", &layout::table_widget(&insurance)),
            layout::section("Grupo Poblacional", &layout::table_widget(&groups)),
            layout::section("Área de residencia", &layout::table_widget(&area)),
        ]
        .concat();

        let geography = [
            layout::section(
                "Top 10 Departamentos con más casos",
                &layout::graph_div("fig-mapa-top10"),
            ),
            layout::section(
                "Mapa de Densidad de Casos por Departamento",
                &layout::iframe_embed(&map_document),
            ),
            layout::section(
                "Top 10 Municipios con más casos",
                &layout::graph_div("fig-municipios"),
            ),
        ]
        .concat();

        let temporal = layout::section(
            "Casos de Dengue por Semana y Año",
            &layout::graph_div("fig-semana"),
        );

        let clinical = [
            layout::section("Pacientes por Evento", &layout::graph_div("fig-eventos")),
            layout::section("Estado Final del Caso", &layout::graph_div("fig-estado")),
            layout::section("Casos Confirmados", &layout::graph_div("fig-confirmados")),
            layout::section(
                "Pacientes Hospitalizados",
                &[
                    layout::graph_div("fig-hospitalizados"),
                    layout::graph_div("fig-hosp-sexo"),
                ]
                .concat(),
            ),
            layout::section("Decesos por Evento", &layout::graph_div("fig-decesos")),
        ]
        .concat();

        let tabs = vec![
            Tab::new("Información Demográfica", demographics),
            Tab::new("Ubicación Geográfica", geography),
            Tab::new("Variables Temporales", temporal),
            Tab::new("Datos Clínicos", clinical),
        ];

        let html = layout::page(
            "Análisis Exploratorio de Casos de Dengue en Colombia",
            &tabs,
            &figures,
        );

        Ok(Self { html })
    }

    pub fn into_html(self) -> String {
        self.html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use serde_json::json;

    fn cases() -> DataFrame {
        df!(
            "EDAD_AJUSTADA" => &[Some(4.0f64), Some(34.0), Some(70.0), None],
            "SEXO" => &["F", "M", "F", "F"],
            "TIP_SS" => &["S", "C", "S", "S"],
            "GP_MIGRANT" => &[0i64, 1, 0, 0],
            "GP_GESTAN" => &[0i64, 0, 0, 0],
            "GP_POBICFB" => &[0i64, 0, 1, 0],
            "AREA" => &[1i64, 2, 1, 1],
            "DPTO_OCU" => &[Some("NARIÑO"), Some("VALLE"), Some("EXTERIOR"), Some("NARIÑO")],
            "MUN_OCU" => &["PASTO", "CALI", "OTRO", "IPIALES"],
            "SEMANA" => &[1i64, 2, 3, 1],
            "ANO" => &[2020i64, 2020, 2021, 2021],
            "EVENTO" => &["DENGUE", "DENGUE GRAVE", "DENGUE", "DENGUE"],
            "ESTADO_FINAL" => &[2i64, 3, 5, 0],
            "PAC_HOS" => &[1i64, 2, 1, 2],
            "CON_FIN" => &[Some(1i64), Some(2), None, Some(1)],
            "confirmados" => &[1i64, 1, 0, 0],
        )
        .unwrap()
    }

    fn boundaries() -> serde_json::Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"dpto_cnmbr": "NARINO"},
                 "geometry": {"type": "Polygon", "coordinates": []}},
                {"type": "Feature", "properties": {"dpto_cnmbr": "VALLE DEL CAUCA"},
                 "geometry": {"type": "Polygon", "coordinates": []}},
            ],
        })
    }

    fn population() -> DataFrame {
        df!(
            "Departamento" => &["Nariño", "Valle del Cauca"],
            "Poblacion" => &[1_000_000i64, 4_000_000],
        )
        .unwrap()
    }

    #[test]
    fn builds_the_full_page_and_map_artifact() {
        let artifact = std::env::temp_dir().join("denguedash_dashboard_test_map.html");
        let artifact = artifact.to_string_lossy().to_string();

        let dashboard =
            Dashboard::build(&cases(), &boundaries(), &population(), &artifact).unwrap();
        let html = dashboard.into_html();

        for label in [
            "Información Demográfica",
            "Ubicación Geográfica",
            "Variables Temporales",
            "Datos Clínicos",
        ] {
            assert!(html.contains(label));
        }
        for id in [
            "fig-edad",
            "fig-mapa-top10",
            "fig-municipios",
            "fig-semana",
            "fig-decesos",
        ] {
            assert!(html.contains(&format!("id=\"{id}\"")));
        }

        let map_html = std::fs::read_to_string(&artifact).unwrap();
        assert!(map_html.contains("choropleth"));
    }
}
