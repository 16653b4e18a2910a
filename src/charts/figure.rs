//! Figure Builder Module
//! Pure mapping from aggregate tables to Plotly figure specifications. No
//! computation happens here beyond column extraction.

use polars::prelude::DataFrame;
use serde::Serialize;
use serde_json::{json, Value};

use crate::stats::Aggregator;

/// Trace colors, matching the dashboard's blues palette.
pub const DODGER_BLUE: &str = "dodgerblue";
pub const ROYAL_BLUE: &str = "royalblue";
pub const MEDIUM_BLUE: &str = "mediumblue";
pub const DEEP_SKY_BLUE: &str = "deepskyblue";
pub const BLUE: &str = "blue";
pub const INDIAN_RED: &str = "indianred";

/// Sequential blues, used for the donut slices and as the fallback for
/// unmapped categories.
pub const BLUES_SEQUENTIAL: [&str; 9] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

/// A Plotly figure: trace list plus layout, serialized as-is for the
/// client-side renderer.
#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

/// Builds the dashboard figures.
pub struct ChartBuilder;

impl ChartBuilder {
    /// Box figure over the full age distribution.
    pub fn age_box(ages: &[f64]) -> Figure {
        Figure {
            data: vec![json!({
                "type": "box",
                "x": ages,
                "name": "Edad",
                "marker": {"color": DODGER_BLUE},
            })],
            layout: json!({
                "title": {"text": "Distribución de la edad", "font": {"size": 18}},
                "xaxis": {"title": {"text": "Edad"}},
                "yaxis": {"title": {"text": "Frecuencia"}},
            }),
        }
    }

    /// Bar figure of counts per distinct age for the youngest cases.
    ///
    /// Expects the `["EDAD_AJUSTADA", "FRECUENCIA"]` table, ascending.
    pub fn young_age_bar(counts: &DataFrame) -> Figure {
        Figure {
            data: vec![json!({
                "type": "bar",
                "x": Aggregator::f64_column(counts, "EDAD_AJUSTADA"),
                "y": Aggregator::i64_column(counts, "FRECUENCIA"),
                "marker": {"color": ROYAL_BLUE},
            })],
            layout: json!({
                "title": {"text": "Distribución de Edades Menores a 5 años", "font": {"size": 20}},
                "xaxis": {"title": {"text": "Edad"}},
                "yaxis": {"title": {"text": "Frecuencia"}},
            }),
        }
    }

    /// Box figure over the ages of the oldest cases.
    pub fn elderly_age_box(ages: &[f64]) -> Figure {
        Figure {
            data: vec![json!({
                "type": "box",
                "x": ages,
                "name": "Edad",
                "marker": {"color": ROYAL_BLUE},
            })],
            layout: json!({
                "title": {
                    "text": "Distribución de Edades Mayores o Iguales a 65 años",
                    "font": {"size": 20},
                },
                "xaxis": {"title": {"text": "Edad"}},
                "yaxis": {"title": {"text": "Frecuencia"}},
            }),
        }
    }

    /// Choropleth of the top-department counts over the boundary
    /// collection.
    ///
    /// Expects the zero-filled `["Departamento", "Casos_top10"]` merge of
    /// counts onto region names.
    pub fn department_choropleth(regions: &DataFrame, boundaries: &Value) -> Figure {
        Figure {
            data: vec![json!({
                "type": "choropleth",
                "geojson": boundaries.clone(),
                "locations": Aggregator::str_column(regions, "Departamento"),
                "featureidkey": "properties.dpto_cnmbr",
                "z": Aggregator::i64_column(regions, "Casos_top10"),
                "colorscale": "Blues",
                "colorbar": {"title": {"text": "Casos"}},
            })],
            layout: json!({
                "title": {"text": "Top 10 Departamentos con Mayor Ocurrencia de Dengue"},
                "geo": {"fitbounds": "locations", "visible": false},
                "margin": {"r": 0, "t": 40, "l": 0, "b": 0},
            }),
        }
    }

    /// Horizontal bar figure with one trace per top-N municipality view and
    /// a dropdown to toggle between them. The view state is declarative;
    /// `default_view` names the trace visible on load.
    ///
    /// Each view is a `(label, table)` pair where the table is a descending
    /// `["Municipio", "Casos"]` slice; bars are drawn bottom-up.
    pub fn municipality_top_bars(views: &[(String, DataFrame)], default_view: &str) -> Figure {
        let mut data = Vec::new();
        let mut buttons = Vec::new();

        for (i, (label, table)) in views.iter().enumerate() {
            let mut names = Aggregator::str_column(table, "Municipio");
            let mut counts = Aggregator::i64_column(table, "Casos");
            // Ascending order reads bottom-up on a horizontal bar chart.
            names.reverse();
            counts.reverse();

            data.push(json!({
                "type": "bar",
                "orientation": "h",
                "x": counts,
                "y": names,
                "name": label,
                "visible": label == default_view,
                "marker": {"color": DODGER_BLUE},
            }));

            let mut visible = vec![false; views.len()];
            visible[i] = true;
            buttons.push(json!({
                "label": label,
                "method": "update",
                "args": [
                    {"visible": visible},
                    {"title": {"text": format!("{label} Municipios con más casos")}},
                ],
            }));
        }

        Figure {
            data,
            layout: json!({
                "title": {"text": "Municipios con más casos reportados de dengue"},
                "xaxis": {"title": {"text": "Frecuencia"}},
                "yaxis": {"title": {"text": "Municipios"}},
                "updatemenus": [{
                    "buttons": buttons,
                    "direction": "down",
                    "x": 1.05,
                    "xanchor": "left",
                    "y": 1.1,
                    "yanchor": "top",
                }],
                "height": 700,
                "margin": {"l": 100, "r": 40, "t": 80, "b": 40},
            }),
        }
    }

    /// One line trace per year over the epidemiological weeks.
    ///
    /// Expects the weekly pivot: `["SEMANA", <year columns>]`.
    pub fn weekly_lines(pivot: &DataFrame) -> Figure {
        let weeks = Aggregator::i64_column(pivot, "SEMANA");

        let data = pivot
            .get_column_names()
            .iter()
            .map(|name| name.as_str())
            .filter(|name| *name != "SEMANA")
            .map(|year| {
                json!({
                    "type": "scatter",
                    "mode": "lines",
                    "name": year,
                    "x": &weeks,
                    "y": Aggregator::i64_column(pivot, year),
                    "line": {"width": 2},
                })
            })
            .collect();

        Figure {
            data,
            layout: json!({
                "title": {"text": "Casos de Dengue por Semana y Año"},
                "xaxis": {"title": {"text": "Semana"}},
                "yaxis": {"title": {"text": "Número de Casos"}},
                "hovermode": "x unified",
                "legend": {"title": {"text": "Año"}},
            }),
        }
    }

    /// Grouped bar figure over a long `["ANO", category, count]` table, one
    /// trace per category value colored from `colors` (blues fallback).
    pub fn yearly_grouped_bars(
        table: &DataFrame,
        category: &str,
        count_label: &str,
        title: &str,
        y_title: &str,
        legend_title: &str,
        colors: &[(&str, &str)],
    ) -> Figure {
        let years = Aggregator::i64_column(table, "ANO");
        let labels = Aggregator::str_column(table, category);
        let counts = Aggregator::i64_column(table, count_label);

        let mut ordered: Vec<String> = Vec::new();
        for label in &labels {
            if !ordered.contains(label) {
                ordered.push(label.clone());
            }
        }

        let data = ordered
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let mut x: Vec<i64> = Vec::new();
                let mut y: Vec<i64> = Vec::new();
                for (row, label) in labels.iter().enumerate() {
                    if label == value {
                        x.push(years[row]);
                        y.push(counts[row]);
                    }
                }

                json!({
                    "type": "bar",
                    "name": value,
                    "x": x,
                    "y": y,
                    "marker": {"color": Self::color_for(colors, value, i)},
                })
            })
            .collect();

        Figure {
            data,
            layout: json!({
                "title": {"text": title},
                "xaxis": {"title": {"text": "Año"}, "tickmode": "linear"},
                "yaxis": {"title": {"text": y_title}},
                "barmode": "group",
                "hovermode": "x",
                "legend": {"title": {"text": legend_title}},
            }),
        }
    }

    /// Plain yearly bar figure over a `["ANO", count]` table.
    pub fn yearly_bar(table: &DataFrame, count_label: &str, title: &str, y_title: &str) -> Figure {
        Figure {
            data: vec![json!({
                "type": "bar",
                "x": Aggregator::i64_column(table, "ANO"),
                "y": Aggregator::i64_column(table, count_label),
                "marker": {"color": DODGER_BLUE},
            })],
            layout: json!({
                "title": {"text": title},
                "xaxis": {"title": {"text": "Año"}, "tickmode": "linear"},
                "yaxis": {"title": {"text": y_title}},
                "hovermode": "x unified",
            }),
        }
    }

    /// Donut figure of deaths per clinical event.
    ///
    /// Expects the `["Evento", "Decesos"]` table.
    pub fn deaths_donut(table: &DataFrame) -> Figure {
        Figure {
            data: vec![json!({
                "type": "pie",
                "labels": Aggregator::str_column(table, "Evento"),
                "values": Aggregator::i64_column(table, "Decesos"),
                "hole": 0.4,
                "marker": {"colors": BLUES_SEQUENTIAL},
                "textposition": "inside",
                "textinfo": "percent+label",
                "hovertemplate": "%{label}: %{value} casos (%{percent})",
            })],
            layout: json!({
                "title": {"text": "Distribución de Decesos por Evento"},
            }),
        }
    }

    /// Density choropleth over the annotated boundary collection, with
    /// department, case-count and density hover labels.
    pub fn density_choropleth(annotated: &Value) -> Figure {
        let features = annotated
            .get("features")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut locations: Vec<String> = Vec::new();
        let mut densities: Vec<f64> = Vec::new();
        let mut cases: Vec<i64> = Vec::new();
        for feature in &features {
            let Some(name) = feature
                .pointer("/properties/dpto_cnmbr")
                .and_then(Value::as_str)
            else {
                continue;
            };
            locations.push(name.to_string());
            densities.push(
                feature
                    .pointer("/properties/densidad")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0),
            );
            cases.push(
                feature
                    .pointer("/properties/casos")
                    .and_then(Value::as_i64)
                    .unwrap_or(0),
            );
        }

        Figure {
            data: vec![json!({
                "type": "choropleth",
                "geojson": annotated.clone(),
                "locations": locations,
                "featureidkey": "properties.dpto_cnmbr",
                "z": densities,
                "customdata": cases,
                "colorscale": "Blues",
                "colorbar": {"title": {"text": "Densidad"}},
                "hovertemplate": "Departamento: %{location}<br>Casos: %{customdata}<br>Densidad: %{z}<extra></extra>",
            })],
            layout: json!({
                "title": {"text": "Densidad de Casos por 100.000 Habitantes"},
                "geo": {"fitbounds": "locations", "visible": false},
                "margin": {"r": 0, "t": 40, "l": 0, "b": 0},
            }),
        }
    }

    fn color_for<'a>(colors: &[(&str, &'a str)], value: &str, index: usize) -> &'a str {
        colors
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, color)| *color)
            .unwrap_or(BLUES_SEQUENTIAL[3 + index % 5])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn municipality_views_toggle_one_visible_trace() {
        let table = |rows: i64| {
            let names: Vec<String> = (0..rows).map(|i| format!("MUN {i}")).collect();
            let counts: Vec<i64> = (0..rows).map(|i| 100 - i).collect();
            df!("Municipio" => names, "Casos" => counts).unwrap()
        };
        let views = vec![
            ("Top 5".to_string(), table(5)),
            ("Top 10".to_string(), table(10)),
        ];

        let figure = ChartBuilder::municipality_top_bars(&views, "Top 10");
        assert_eq!(figure.data.len(), 2);
        assert_eq!(figure.data[0]["visible"], serde_json::json!(false));
        assert_eq!(figure.data[1]["visible"], serde_json::json!(true));

        let buttons = figure.layout["updatemenus"][0]["buttons"]
            .as_array()
            .unwrap();
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0]["args"][0]["visible"], serde_json::json!([true, false]));

        // Bars are emitted ascending for the horizontal orientation.
        let first_x = figure.data[0]["x"].as_array().unwrap();
        assert_eq!(first_x.first().unwrap().as_i64(), Some(96));
        assert_eq!(first_x.last().unwrap().as_i64(), Some(100));
    }

    #[test]
    fn weekly_lines_emit_one_trace_per_year_column() {
        let pivot = df!(
            "SEMANA" => &[1i64, 2, 3],
            "2020" => &[4i64, 0, 1],
            "2021" => &[2i64, 5, 0],
        )
        .unwrap();

        let figure = ChartBuilder::weekly_lines(&pivot);
        assert_eq!(figure.data.len(), 2);
        assert_eq!(figure.data[0]["name"], serde_json::json!("2020"));
        assert_eq!(figure.data[1]["y"], serde_json::json!([2, 5, 0]));
    }

    #[test]
    fn grouped_bars_split_by_category_with_mapped_colors() {
        let table = df!(
            "ANO" => &[2020i64, 2020, 2021],
            "EVENTO" => &["DENGUE", "DENGUE GRAVE", "DENGUE"],
            "Pacientes" => &[10i64, 2, 7],
        )
        .unwrap();

        let figure = ChartBuilder::yearly_grouped_bars(
            &table,
            "EVENTO",
            "Pacientes",
            "Pacientes por Evento y Año",
            "Número de Pacientes",
            "Evento",
            &[("DENGUE", DODGER_BLUE), ("DENGUE GRAVE", MEDIUM_BLUE)],
        );

        assert_eq!(figure.data.len(), 2);
        assert_eq!(figure.data[0]["x"], serde_json::json!([2020, 2021]));
        assert_eq!(figure.data[0]["marker"]["color"], serde_json::json!(DODGER_BLUE));
        assert_eq!(figure.data[1]["marker"]["color"], serde_json::json!(MEDIUM_BLUE));
        assert_eq!(figure.layout["barmode"], serde_json::json!("group"));
    }

    #[test]
    fn deaths_donut_keeps_the_hole() {
        let table = df!(
            "Evento" => &["DENGUE", "DENGUE GRAVE"],
            "Decesos" => &[8i64, 3],
        )
        .unwrap();

        let figure = ChartBuilder::deaths_donut(&table);
        assert_eq!(figure.data[0]["hole"], serde_json::json!(0.4));
        assert_eq!(figure.data[0]["labels"], serde_json::json!(["DENGUE", "DENGUE GRAVE"]));
    }

    #[test]
    fn density_choropleth_reads_annotated_properties() {
        let annotated = serde_json::json!({
            "type": "FeatureCollection",
            "features": [
                {"properties": {"dpto_cnmbr": "NARINO", "casos": 50, "densidad": 5.0}},
                {"properties": {"dpto_cnmbr": "VICHADA", "casos": 0, "densidad": 0.0}},
            ],
        });

        let figure = ChartBuilder::density_choropleth(&annotated);
        assert_eq!(figure.data[0]["z"], serde_json::json!([5.0, 0.0]));
        assert_eq!(figure.data[0]["customdata"], serde_json::json!([50, 0]));
        assert_eq!(
            figure.data[0]["locations"],
            serde_json::json!(["NARINO", "VICHADA"])
        );
    }
}
