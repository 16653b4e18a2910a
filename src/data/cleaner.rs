//! Case Cleaner Module
//! Normalizes the raw case table before any aggregation.

use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Oldest plausible recorded age; anything above is data-entry noise.
pub const MAX_AGE: f64 = 114.0;

/// Sub-annual ages arrive recorded in days, weeks or months. They all count
/// as age 1.
pub const MIN_AGE: f64 = 1.0;

/// Handles cleaning of the raw case table.
pub struct CaseCleaner;

impl CaseCleaner {
    /// Clean the case table, producing a new DataFrame.
    ///
    /// Only two fields are altered: `EDAD_AJUSTADA` is clipped to
    /// [`MIN_AGE`, `MAX_AGE`] (values above become missing, values below
    /// become 1) and missing `ESTADO_FINAL` codes become 0.
    pub fn clean(df: &DataFrame) -> Result<DataFrame, CleanerError> {
        let age = col("EDAD_AJUSTADA").cast(DataType::Float64);

        let cleaned = df
            .clone()
            .lazy()
            .with_columns([
                when(age.clone().gt(lit(MAX_AGE)))
                    .then(lit(NULL))
                    .otherwise(
                        when(age.clone().lt(lit(MIN_AGE)))
                            .then(lit(MIN_AGE))
                            .otherwise(age),
                    )
                    .alias("EDAD_AJUSTADA"),
                col("ESTADO_FINAL")
                    .fill_null(lit(0))
                    .cast(DataType::Int32)
                    .alias("ESTADO_FINAL"),
            ])
            .collect()?;

        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "EDAD_AJUSTADA" => &[Some(0.5f64), Some(130.0), Some(34.0), None],
            "ESTADO_FINAL" => &[Some(3i64), None, Some(5), Some(2)],
        )
        .unwrap()
    }

    #[test]
    fn clamps_sub_annual_ages_to_one() {
        let cleaned = CaseCleaner::clean(&sample()).unwrap();
        let ages = cleaned.column("EDAD_AJUSTADA").unwrap().f64().unwrap();
        assert_eq!(ages.get(0), Some(1.0));
    }

    #[test]
    fn drops_impossible_ages_to_missing() {
        let cleaned = CaseCleaner::clean(&sample()).unwrap();
        let ages = cleaned.column("EDAD_AJUSTADA").unwrap().f64().unwrap();
        assert_eq!(ages.get(1), None);
    }

    #[test]
    fn keeps_valid_and_missing_ages_unchanged() {
        let cleaned = CaseCleaner::clean(&sample()).unwrap();
        let ages = cleaned.column("EDAD_AJUSTADA").unwrap().f64().unwrap();
        assert_eq!(ages.get(2), Some(34.0));
        assert_eq!(ages.get(3), None);
    }

    #[test]
    fn cleaned_ages_stay_within_bounds() {
        let cleaned = CaseCleaner::clean(&sample()).unwrap();
        let ages = cleaned.column("EDAD_AJUSTADA").unwrap().f64().unwrap();
        for age in ages.into_iter().flatten() {
            assert!((MIN_AGE..=MAX_AGE).contains(&age));
        }
    }

    #[test]
    fn fills_missing_final_status_with_zero() {
        let cleaned = CaseCleaner::clean(&sample()).unwrap();
        let status = cleaned.column("ESTADO_FINAL").unwrap().i32().unwrap();
        let values: Vec<i32> = status.into_iter().flatten().collect();
        assert_eq!(values, vec![3, 0, 5, 2]);
    }
}
