//! Case Data Loader Module
//! Reads the surveillance CSV export and the population table using Polars.

use polars::prelude::*;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("No rows in {0}")]
    NoData(String),
}

/// Study variables selected from the raw export. Every downstream table is
/// derived from this subset.
pub const CASE_COLUMNS: [&str; 19] = [
    "EDAD_AJUSTADA",
    "SEXO",
    "TIP_SS",
    "GP_MIGRANT",
    "GP_POBICFB",
    "GP_GESTAN",
    "AREA",
    "PAIS_OCU",
    "DPTO_OCU",
    "MUN_OCU",
    "SEMANA",
    "ANO",
    "EVENTO",
    "TIP_CAS",
    "ESTADO_FINAL",
    "CASO",
    "PAC_HOS",
    "CON_FIN",
    "confirmados",
];

/// Raw column positions that must stay text. Schema inference would read
/// them as integers and drop leading zeros in the code values.
const FORCED_TEXT_COLUMNS: [usize; 2] = [11, 36];

const INFER_SCHEMA_ROWS: usize = 10000;

/// Handles CSV ingestion with Polars for high performance.
pub struct CaseLoader;

impl CaseLoader {
    /// Load the case-record CSV restricted to the study columns.
    pub fn load_cases(file_path: &str) -> Result<DataFrame, LoaderError> {
        // First pass: inferred schema only, to resolve the names of the
        // positionally forced text columns.
        let inferred = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_ignore_errors(true)
            .finish()?
            .collect_schema()?;

        let mut forced = Schema::with_capacity(FORCED_TEXT_COLUMNS.len());
        for &idx in &FORCED_TEXT_COLUMNS {
            if let Some((name, _)) = inferred.get_at_index(idx) {
                forced.with_column(name.clone(), DataType::String);
            }
        }

        let df = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .with_ignore_errors(true)
            .with_dtype_overwrite(Some(Arc::new(forced)))
            .finish()?
            .select([cols(CASE_COLUMNS)])
            .collect()?;

        if df.height() == 0 {
            return Err(LoaderError::NoData(file_path.to_string()));
        }

        Ok(df)
    }

    /// Load the per-department population table.
    ///
    /// Expected columns: `Departamento` and `Población Censada 2018`; the
    /// census column is renamed to `Poblacion`.
    pub fn load_population(file_path: &str) -> Result<DataFrame, LoaderError> {
        let mut df = LazyCsvReader::new(file_path)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .finish()?
            .collect()?;

        if df.height() == 0 {
            return Err(LoaderError::NoData(file_path.to_string()));
        }

        if df.column("Población Censada 2018").is_ok() {
            df.rename("Población Censada 2018", "Poblacion".into())?;
        }

        Ok(df)
    }
}
