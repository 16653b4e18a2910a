//! Dashboard Layout Module
//! Pure HTML assembly: the tab bar, section headers, graph placeholders and
//! table widgets. Figures are rendered client-side from the embedded specs.

use polars::prelude::DataFrame;
use serde_json::Value;

use crate::charts::Figure;

/// One dashboard tab: a label and its already-rendered body.
pub struct Tab {
    pub label: String,
    pub body: String,
}

impl Tab {
    pub fn new(label: &str, body: String) -> Self {
        Self {
            label: label.to_string(),
            body,
        }
    }
}

/// Escape text for safe embedding in HTML content or attributes.
pub fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// A section header followed by its content.
pub fn section(title: &str, body: &str) -> String {
    format!("<h3>{}</h3>\n{}\n", html_escape(title), body)
}

/// Placeholder div for a figure; the id must match a key in the embedded
/// figure map.
pub fn graph_div(id: &str) -> String {
    format!("<div id=\"{id}\" class=\"graph\"></div>")
}

/// Scrollable table widget rendered from an aggregate DataFrame.
pub fn table_widget(df: &DataFrame) -> String {
    let mut html = String::from("<div class=\"table-box\"><table>\n<thead><tr>");
    for name in df.get_column_names() {
        html.push_str(&format!("<th>{}</th>", html_escape(name.as_str())));
    }
    html.push_str("</tr></thead>\n<tbody>\n");

    let columns = df.get_columns();
    for row in 0..df.height() {
        html.push_str("<tr>");
        for column in columns {
            let series = column.as_materialized_series();
            let cell = series
                .get(row)
                .ok()
                .filter(|value| !value.is_null())
                .map(|value| value.to_string().trim_matches('"').to_string())
                .unwrap_or_default();
            html.push_str(&format!("<td>{}</td>", html_escape(&cell)));
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</tbody>\n</table></div>");
    html
}

/// Embed a standalone HTML document (the map artifact) inline.
pub fn iframe_embed(document: &str) -> String {
    format!(
        "<iframe srcdoc=\"{}\" width=\"100%\" height=\"600px\" frameborder=\"0\"></iframe>",
        html_escape(document)
    )
}

/// Assemble the full dashboard page: heading, CSS-only tab bar and the
/// client-side figure bootstrap.
pub fn page(heading: &str, tabs: &[Tab], figures: &[(String, Figure)]) -> String {
    let mut tab_css = String::new();
    let mut tab_bar = String::new();
    let mut panels = String::new();

    for (i, tab) in tabs.iter().enumerate() {
        let checked = if i == 0 { " checked" } else { "" };
        tab_bar.push_str(&format!(
            "<input type=\"radio\" name=\"tabs\" id=\"tab-{i}\"{checked}>\
             <label for=\"tab-{i}\">{}</label>\n",
            html_escape(&tab.label)
        ));
        panels.push_str(&format!(
            "<section class=\"panel\" id=\"panel-{i}\">\n{}\n</section>\n",
            tab.body
        ));
        tab_css.push_str(&format!(
            "#tab-{i}:checked ~ #panel-{i} {{ display: block; }}\n"
        ));
    }

    let mut spec_map = serde_json::Map::new();
    for (id, figure) in figures {
        if let Ok(value) = serde_json::to_value(figure) {
            spec_map.insert(id.clone(), value);
        }
    }
    // "</" must not appear verbatim inside a script element.
    let specs = Value::Object(spec_map).to_string().replace("</", "<\\/");

    format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>Visualización de Dengue</title>
<script src="https://cdn.plot.ly/plotly-2.32.0.min.js"></script>
<style>
body {{ font-family: Arial, Helvetica, sans-serif; margin: 0 20px; }}
h1 {{ text-align: center; }}
h3 {{ margin-top: 30px; }}
.tabs input[type="radio"] {{ display: none; }}
.tabs label {{
  display: inline-block; padding: 10px 24px; cursor: pointer;
  border: 1px solid #d6d6d6; border-bottom: none; background: #f9f9f9;
}}
.tabs input:checked + label {{ background: #ffffff; font-weight: bold; }}
.panel {{ display: none; border-top: 1px solid #d6d6d6; padding-top: 10px; }}
table {{ border-collapse: collapse; width: 100%; }}
th {{ background-color: #f0f0f0; font-weight: bold; }}
th, td {{ text-align: center; padding: 8px; border: 1px solid #e3e3e3; }}
.table-box {{ height: 300px; overflow-y: auto; }}
{tab_css}
</style>
</head>
<body>
<h1>{heading}</h1>
<div class="tabs">
{tab_bar}
{panels}
</div>
<script>
const FIGURES = {specs};
for (const [id, figure] of Object.entries(FIGURES)) {{
  Plotly.newPlot(id, figure.data, figure.layout, {{responsive: true}});
}}
// Hidden panels render at zero width; poke a resize when tabs change.
for (const radio of document.querySelectorAll('input[name="tabs"]')) {{
  radio.addEventListener("change", () => window.dispatchEvent(new Event("resize")));
}}
</script>
</body>
</html>
"#,
        heading = html_escape(heading),
        specs = specs,
        tab_css = tab_css,
        tab_bar = tab_bar,
        panels = panels,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use serde_json::json;

    #[test]
    fn table_widget_renders_headers_and_cells() {
        let df = df!(
            "Sexo" => &["F", "M"],
            "Porcentaje" => &[60.0f64, 40.0],
        )
        .unwrap();

        let html = table_widget(&df);
        assert!(html.contains("<th>Sexo</th>"));
        assert!(html.contains("<td>F</td>"));
        assert!(html.contains("<td>40.0</td>"));
    }

    #[test]
    fn table_widget_escapes_cell_content() {
        let df = df!("Evento" => &["<DENGUE>"]).unwrap();
        let html = table_widget(&df);
        assert!(html.contains("&lt;DENGUE&gt;"));
        assert!(!html.contains("<DENGUE>"));
    }

    #[test]
    fn page_contains_every_tab_and_figure() {
        let tabs = vec![
            Tab::new("Demografía", section("Sexo", &graph_div("fig-sexo"))),
            Tab::new("Geografía", String::from("<p>mapa</p>")),
        ];
        let figures = vec![(
            "fig-sexo".to_string(),
            Figure {
                data: vec![json!({"type": "bar"})],
                layout: json!({}),
            },
        )];

        let html = page("Casos de Dengue", &tabs, &figures);
        assert!(html.contains("Demografía"));
        assert!(html.contains("Geografía"));
        assert!(html.contains("id=\"fig-sexo\""));
        assert!(html.contains("Plotly.newPlot"));
        // First tab is selected by default.
        assert!(html.contains("id=\"tab-0\" checked"));
    }

    #[test]
    fn iframe_embedding_escapes_the_document() {
        let html = iframe_embed("<html><body>mapa</body></html>");
        assert!(html.starts_with("<iframe srcdoc=\"&lt;html&gt;"));
        assert!(html.contains("height=\"600px\""));
    }
}
