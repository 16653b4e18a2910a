//! Geographic Join Module
//! Department-name corrections, the population join and the annotation of
//! the boundary collection with case counts and densities.

use polars::prelude::*;
use serde_json::{json, Value};
use std::borrow::Cow;
use std::collections::HashMap;
use thiserror::Error;
use unidecode::unidecode;

use crate::stats::{AggregateError, Aggregator};

#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Failed to read boundary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid boundary file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Boundary collection has no features array")]
    MissingFeatures,
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Recorded department spellings mapped to the boundary-file spelling.
pub const DEPARTMENT_CORRECTIONS: [(&str, &str); 6] = [
    ("VALLE", "VALLE DEL CAUCA"),
    ("NARIÑO", "NARINO"),
    ("NORTE SANTANDER", "NORTE DE SANTANDER"),
    ("BOGOTA", "BOGOTA, D.C."),
    ("GUAJIRA", "LA GUAJIRA"),
    (
        "SAN ANDRES",
        "ARCHIPIELAGO DE SAN ANDRES, PROVIDENCIA Y SANTA CATALINA",
    ),
];

/// Record values with no geographic counterpart; their rows are dropped
/// before any geographic aggregation.
pub const UNMAPPABLE_DEPARTMENTS: [&str; 2] = ["PROCEDENCIA DESCONOCIDA", "EXTERIOR"];

/// Census-table spelling mapped to the boundary-file spelling.
const POPULATION_CORRECTIONS: [(&str, &str); 1] = [(
    "SAN ANDRES, PROVIDENCIA Y SANTA CATALINA",
    "ARCHIPIELAGO DE SAN ANDRES, PROVIDENCIA Y SANTA CATALINA",
)];

/// Density scale: cases per this many inhabitants.
pub const DENSITY_PER_HABITANTS: f64 = 100_000.0;

/// Normalize a department name for joining: uppercase, diacritics stripped.
pub fn normalize_department(name: &str) -> String {
    unidecode(&name.to_uppercase())
}

/// Handles the geographic merge between case counts, the population table
/// and the boundary collection.
pub struct GeoJoiner;

impl GeoJoiner {
    /// Load the boundary collection from a GeoJSON file.
    pub fn load_boundaries(file_path: &str) -> Result<Value, GeoError> {
        let text = std::fs::read_to_string(file_path)?;
        let geojson: Value = serde_json::from_str(&text)?;

        if geojson.get("features").and_then(Value::as_array).is_none() {
            return Err(GeoError::MissingFeatures);
        }

        Ok(geojson)
    }

    /// Apply the corrective spelling map to `DPTO_OCU` and drop the rows
    /// with no geographic counterpart.
    ///
    /// Every aggregation downstream of the geographic step works on the
    /// table this returns.
    pub fn apply_department_corrections(df: &DataFrame) -> Result<DataFrame, GeoError> {
        let corrected = df.column("DPTO_OCU")?.str()?.apply(|name| {
            let name = name?;
            if UNMAPPABLE_DEPARTMENTS.contains(&name) {
                return None;
            }
            let mapped = DEPARTMENT_CORRECTIONS
                .iter()
                .find(|(from, _)| *from == name)
                .map_or(name, |(_, to)| *to);
            Some(Cow::Borrowed(mapped))
        });

        let mut out = df.clone();
        out.with_column(corrected.into_series())?;
        let out = out
            .lazy()
            .filter(col("DPTO_OCU").is_not_null())
            .collect()?;

        Ok(out)
    }

    /// Case counts per department, descending.
    ///
    /// Output columns: `["Departamento", "Casos"]`.
    pub fn department_counts(df: &DataFrame) -> Result<DataFrame, GeoError> {
        Ok(Aggregator::count_table(df, "DPTO_OCU", "Departamento", "Casos")?)
    }

    /// Join department case counts against the population table and compute
    /// the case density per [`DENSITY_PER_HABITANTS`] inhabitants.
    ///
    /// Both join keys are normalized first. Departments missing from the
    /// population table keep a null density here; the annotation step
    /// zero-fills them.
    ///
    /// Output columns: `["Departamento", "Casos", "Poblacion",
    /// "Densidad_Casos"]`, densest first.
    pub fn density_table(
        cases_by_department: &DataFrame,
        population: &DataFrame,
    ) -> Result<DataFrame, GeoError> {
        let mut cases = cases_by_department.clone();
        cases.with_column(Self::normalized_names(&cases)?)?;

        let mut population = population.clone();
        population.with_column(Self::normalized_names(&population)?)?;

        let table = cases
            .lazy()
            .join(
                population
                    .lazy()
                    .select([col("Departamento"), col("Poblacion")]),
                [col("Departamento")],
                [col("Departamento")],
                JoinArgs::new(JoinType::Left),
            )
            .with_column(
                ((col("Casos").cast(DataType::Float64)
                    / col("Poblacion").cast(DataType::Float64))
                    * lit(DENSITY_PER_HABITANTS))
                .round(2)
                .alias("Densidad_Casos"),
            )
            .sort(
                ["Densidad_Casos"],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true),
            )
            .collect()?;

        Ok(table)
    }

    /// Merge a department count table onto the boundary-collection names,
    /// zero-filling regions without a matching row.
    ///
    /// Output columns: `["Departamento", count_label]` with one row per
    /// boundary feature, names exactly as spelled in the boundary file.
    pub fn merge_counts_onto_regions(
        geojson: &Value,
        counts: &DataFrame,
        count_label: &str,
    ) -> Result<DataFrame, GeoError> {
        let by_name = Self::counts_by_normalized_name(counts, count_label)?;

        let mut names: Vec<String> = Vec::new();
        let mut merged: Vec<i64> = Vec::new();
        for name in Self::region_names(geojson)? {
            let count = by_name
                .get(&normalize_department(&name))
                .copied()
                .unwrap_or(0);
            names.push(name);
            merged.push(count);
        }

        let table = DataFrame::new(vec![
            Column::new("Departamento".into(), names),
            Column::new(count_label.into(), merged),
        ])?;

        Ok(table)
    }

    /// Produce a NEW boundary collection whose features carry `casos` and
    /// `densidad` properties. Regions with no matching cases get 0 and 0.0;
    /// a missing population figure also zero-fills the density.
    pub fn annotate_boundaries(
        geojson: &Value,
        density: &DataFrame,
    ) -> Result<Value, GeoError> {
        let names = Aggregator::str_column(density, "Departamento");
        let casos = density.column("Casos")?.cast(&DataType::Int64)?;
        let casos = casos.i64()?;
        let densidad = density.column("Densidad_Casos")?.cast(&DataType::Float64)?;
        let densidad = densidad.f64()?;

        let mut by_name: HashMap<String, (i64, f64)> = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            by_name.insert(
                normalize_department(name),
                (casos.get(i).unwrap_or(0), densidad.get(i).unwrap_or(0.0)),
            );
        }

        let features = geojson
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoError::MissingFeatures)?;

        let annotated: Vec<Value> = features
            .iter()
            .map(|feature| {
                let mut feature = feature.clone();
                let name = feature
                    .pointer("/properties/dpto_cnmbr")
                    .and_then(Value::as_str)
                    .map(normalize_department)
                    .unwrap_or_default();
                let (cases, density) = by_name.get(&name).copied().unwrap_or((0, 0.0));
                if let Some(props) = feature.get_mut("properties").and_then(Value::as_object_mut) {
                    props.insert("casos".to_string(), json!(cases));
                    props.insert("densidad".to_string(), json!(density));
                }
                feature
            })
            .collect();

        let mut out = geojson.clone();
        out["features"] = Value::Array(annotated);

        Ok(out)
    }

    /// Region names exactly as spelled in the boundary file.
    pub fn region_names(geojson: &Value) -> Result<Vec<String>, GeoError> {
        let features = geojson
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoError::MissingFeatures)?;

        Ok(features
            .iter()
            .filter_map(|feature| {
                feature
                    .pointer("/properties/dpto_cnmbr")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .collect())
    }

    fn normalized_names(df: &DataFrame) -> Result<Series, GeoError> {
        let normalized = df.column("Departamento")?.str()?.apply(|name| {
            name.map(|value| {
                let normalized = normalize_department(value);
                let canonical = POPULATION_CORRECTIONS
                    .iter()
                    .find(|(from, _)| *from == normalized)
                    .map(|(_, to)| (*to).to_string())
                    .unwrap_or(normalized);
                Cow::Owned(canonical)
            })
        });

        Ok(normalized.into_series())
    }

    fn counts_by_normalized_name(
        counts: &DataFrame,
        count_label: &str,
    ) -> Result<HashMap<String, i64>, GeoError> {
        let names = Aggregator::str_column(counts, "Departamento");
        let values = counts.column(count_label)?.cast(&DataType::Int64)?;
        let values = values.i64()?;

        let mut by_name = HashMap::new();
        for (i, name) in names.iter().enumerate() {
            by_name.insert(normalize_department(name), values.get(i).unwrap_or(0));
        }

        Ok(by_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundaries() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"dpto_cnmbr": "NARINO"},
                    "geometry": {"type": "Polygon", "coordinates": []}
                },
                {
                    "type": "Feature",
                    "properties": {"dpto_cnmbr": "VICHADA"},
                    "geometry": {"type": "Polygon", "coordinates": []}
                }
            ]
        })
    }

    #[test]
    fn normalizes_names_for_joining() {
        assert_eq!(normalize_department("NARIÑO"), "NARINO");
        assert_eq!(normalize_department("Bogotá"), "BOGOTA");
        assert_eq!(normalize_department("CHOCO"), "CHOCO");
    }

    #[test]
    fn corrections_rewrite_known_spellings_and_drop_unmappable() {
        let df = df!(
            "DPTO_OCU" => &[
                Some("VALLE"),
                Some("NARIÑO"),
                Some("PROCEDENCIA DESCONOCIDA"),
                Some("EXTERIOR"),
                Some("TOLIMA"),
                None,
            ],
        )
        .unwrap();

        let corrected = GeoJoiner::apply_department_corrections(&df).unwrap();
        assert_eq!(
            Aggregator::str_column(&corrected, "DPTO_OCU"),
            vec!["VALLE DEL CAUCA", "NARINO", "TOLIMA"]
        );
    }

    #[test]
    fn density_follows_the_declared_scale_factor() {
        let cases = df!(
            "Departamento" => &["NARINO", "VICHADA"],
            "Casos" => &[50i64, 10],
        )
        .unwrap();
        let population = df!(
            "Departamento" => &["Nariño"],
            "Poblacion" => &[1_000_000i64],
        )
        .unwrap();

        let table = GeoJoiner::density_table(&cases, &population).unwrap();
        let density = table.column("Densidad_Casos").unwrap().f64().unwrap();

        // 50 cases over 1,000,000 inhabitants at the 100,000 scale.
        assert_eq!(density.get(0), Some(5.0));
        // VICHADA has no population row; its density stays missing here.
        assert_eq!(density.get(1), None);
    }

    #[test]
    fn annotation_zero_fills_unmatched_regions() {
        let density = df!(
            "Departamento" => &["NARINO"],
            "Casos" => &[50i64],
            "Densidad_Casos" => &[Some(5.0f64)],
        )
        .unwrap();

        let original = boundaries();
        let annotated = GeoJoiner::annotate_boundaries(&original, &density).unwrap();

        let props = |v: &Value, i: usize| v["features"][i]["properties"].clone();
        assert_eq!(props(&annotated, 0)["casos"], json!(50));
        assert_eq!(props(&annotated, 0)["densidad"], json!(5.0));
        assert_eq!(props(&annotated, 1)["casos"], json!(0));
        assert_eq!(props(&annotated, 1)["densidad"], json!(0.0));

        // The input collection is untouched.
        assert!(props(&original, 0).get("casos").is_none());
    }

    #[test]
    fn annotation_zero_fills_missing_density() {
        let density = df!(
            "Departamento" => &["VICHADA"],
            "Casos" => &[10i64],
            "Densidad_Casos" => &[None::<f64>],
        )
        .unwrap();

        let annotated = GeoJoiner::annotate_boundaries(&boundaries(), &density).unwrap();
        let props = &annotated["features"][1]["properties"];
        assert_eq!(props["casos"], json!(10));
        assert_eq!(props["densidad"], json!(0.0));
    }

    #[test]
    fn counts_merge_covers_every_region() {
        let counts = df!(
            "Departamento" => &["NARINO"],
            "Casos_top10" => &[7i64],
        )
        .unwrap();

        let merged =
            GeoJoiner::merge_counts_onto_regions(&boundaries(), &counts, "Casos_top10").unwrap();
        assert_eq!(
            Aggregator::str_column(&merged, "Departamento"),
            vec!["NARINO", "VICHADA"]
        );
        assert_eq!(Aggregator::i64_column(&merged, "Casos_top10"), vec![7, 0]);
    }
}
