//! Map Artifact Module
//! Writes the density choropleth as a self-contained HTML file. The
//! geography tab re-reads the file and embeds it.

use std::path::Path;
use thiserror::Error;

use crate::charts::Figure;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Failed to write map artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize figure: {0}")]
    Json(#[from] serde_json::Error),
}

/// Renders the cached map artifact.
pub struct MapRenderer;

impl MapRenderer {
    /// Write the figure as a standalone HTML page.
    pub fn write_html(figure: &Figure, file_path: &str) -> Result<(), MapError> {
        std::fs::write(Path::new(file_path), Self::standalone_html(figure)?)?;
        Ok(())
    }

    /// A minimal self-contained page rendering one figure full-size.
    pub fn standalone_html(figure: &Figure) -> Result<String, MapError> {
        // "</" must not appear verbatim inside a script element.
        let spec = serde_json::to_string(figure)?.replace("</", "<\\/");

        Ok(format!(
            r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>Mapa de Densidad de Casos</title>
<script src="https://cdn.plot.ly/plotly-2.32.0.min.js"></script>
<style>html, body, #mapa {{ margin: 0; height: 100%; }}</style>
</head>
<body>
<div id="mapa"></div>
<script>
const figure = {spec};
Plotly.newPlot("mapa", figure.data, figure.layout, {{responsive: true}});
</script>
</body>
</html>
"#
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn standalone_page_embeds_the_figure() {
        let figure = Figure {
            data: vec![json!({"type": "choropleth", "z": [5.0]})],
            layout: json!({"title": {"text": "Densidad"}}),
        };

        let html = MapRenderer::standalone_html(&figure).unwrap();
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains("choropleth"));
        assert!(html.starts_with("<!DOCTYPE html>"));
    }

    #[test]
    fn script_closers_inside_the_spec_are_escaped() {
        let figure = Figure {
            data: vec![json!({"hovertemplate": "a</script>b"})],
            layout: json!({}),
        };

        let html = MapRenderer::standalone_html(&figure).unwrap();
        assert!(!html.contains("a</script>b"));
    }
}
