//! Aggregation Module
//! Grouped counts, frequency percentages and pivots over the cleaned case
//! table. Every function returns a fresh DataFrame; nothing is mutated.

use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AggregateError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Final-status codes kept for the clinical view, with their display labels.
pub const FINAL_STATUS_LABELS: [(i32, &str); 3] = [
    (2, "Probable"),
    (3, "C. por laboratorio"),
    (5, "C. por nexo"),
];

/// Population-group flag columns with their display labels.
pub const GROUP_FLAGS: [(&str, &str); 3] = [
    ("GP_MIGRANT", "Migrante"),
    ("GP_GESTAN", "Gestante"),
    ("GP_POBICFB", "Población ICBF"),
];

/// Handles the grouped-count and percentage computations.
pub struct Aggregator;

impl Aggregator {
    /// Frequency-percentage table for one categorical column.
    ///
    /// Output columns: `[label, "Porcentaje"]`, percentages of the non-null
    /// rows rounded to 2 decimals, ordered by descending frequency.
    pub fn percentage_table(
        df: &DataFrame,
        column: &str,
        label: &str,
    ) -> Result<DataFrame, AggregateError> {
        let non_null = df
            .clone()
            .lazy()
            .select([col(column)])
            .drop_nulls(None)
            .collect()?;
        let total = non_null.height() as f64;

        let table = non_null
            .lazy()
            .group_by([col(column)])
            .agg([len().alias("conteo")])
            .with_column(
                (col("conteo").cast(DataType::Float64) * lit(100.0) / lit(total))
                    .round(2)
                    .alias("Porcentaje"),
            )
            .sort(
                ["conteo"],
                SortMultipleOptions::default().with_order_descending(true),
            )
            .select([col(column).alias(label), col("Porcentaje")])
            .collect()?;

        Ok(table)
    }

    /// Count table for one categorical column, ordered by descending count.
    ///
    /// Output columns: `[label, count_label]`.
    pub fn count_table(
        df: &DataFrame,
        column: &str,
        label: &str,
        count_label: &str,
    ) -> Result<DataFrame, AggregateError> {
        let table = df
            .clone()
            .lazy()
            .select([col(column)])
            .drop_nulls(None)
            .group_by([col(column)])
            .agg([len().alias(count_label)])
            .sort(
                [count_label],
                SortMultipleOptions::default().with_order_descending(true),
            )
            .select([col(column).alias(label), col(count_label)])
            .collect()?;

        Ok(table)
    }

    /// The N largest rows of an already-descending count table.
    pub fn top_n(table: &DataFrame, n: usize) -> DataFrame {
        table.head(Some(n))
    }

    /// Number of rows flagged 1 for each population-group column.
    ///
    /// Output columns: `["Grupo de Pertenencia", "Cantidad de Personas"]`.
    pub fn group_flag_counts(df: &DataFrame) -> Result<DataFrame, AggregateError> {
        let mut labels: Vec<String> = Vec::new();
        let mut counts: Vec<i64> = Vec::new();

        for (column, label) in GROUP_FLAGS {
            let flagged = df
                .clone()
                .lazy()
                .filter(col(column).cast(DataType::Int32).eq(lit(1)))
                .collect()?;
            labels.push(label.to_string());
            counts.push(flagged.height() as i64);
        }

        let table = DataFrame::new(vec![
            Column::new("Grupo de Pertenencia".into(), labels),
            Column::new("Cantidad de Personas".into(), counts),
        ])?;

        Ok(table)
    }

    /// Age values within the given bounds, missing values excluded.
    pub fn age_values(
        df: &DataFrame,
        min_age: Option<f64>,
        max_age: Option<f64>,
    ) -> Result<Vec<f64>, AggregateError> {
        let mut lf = df
            .clone()
            .lazy()
            .select([col("EDAD_AJUSTADA").cast(DataType::Float64)])
            .drop_nulls(None);
        if let Some(min) = min_age {
            lf = lf.filter(col("EDAD_AJUSTADA").gt_eq(lit(min)));
        }
        if let Some(max) = max_age {
            lf = lf.filter(col("EDAD_AJUSTADA").lt_eq(lit(max)));
        }

        let values = lf.collect()?;

        Ok(Self::f64_column(&values, "EDAD_AJUSTADA"))
    }

    /// Count per distinct age at or below `limit`, ascending by age.
    ///
    /// Output columns: `["EDAD_AJUSTADA", "FRECUENCIA"]`.
    pub fn age_counts_up_to(df: &DataFrame, limit: f64) -> Result<DataFrame, AggregateError> {
        let table = df
            .clone()
            .lazy()
            .filter(col("EDAD_AJUSTADA").cast(DataType::Float64).lt_eq(lit(limit)))
            .group_by([col("EDAD_AJUSTADA")])
            .agg([len().alias("FRECUENCIA")])
            .sort(["EDAD_AJUSTADA"], SortMultipleOptions::default())
            .collect()?;

        Ok(table)
    }

    /// Counts grouped by year and one further categorical column, ordered by
    /// year.
    ///
    /// Output columns: `["ANO", column, count_label]` (long format).
    pub fn yearly_counts(
        df: &DataFrame,
        column: &str,
        count_label: &str,
    ) -> Result<DataFrame, AggregateError> {
        let table = df
            .clone()
            .lazy()
            .select([col("ANO").cast(DataType::Int32), col(column)])
            .drop_nulls(None)
            .group_by([col("ANO"), col(column)])
            .agg([len().alias(count_label)])
            .sort(["ANO", column], SortMultipleOptions::default())
            .collect()?;

        Ok(table)
    }

    /// Counts per year, ordered by year.
    ///
    /// Output columns: `["ANO", count_label]`.
    pub fn yearly_totals(df: &DataFrame, count_label: &str) -> Result<DataFrame, AggregateError> {
        let table = df
            .clone()
            .lazy()
            .select([col("ANO").cast(DataType::Int32)])
            .drop_nulls(None)
            .group_by([col("ANO")])
            .agg([len().alias(count_label)])
            .sort(["ANO"], SortMultipleOptions::default())
            .collect()?;

        Ok(table)
    }

    /// Weekly counts pivoted by year into columns, zero-filled.
    ///
    /// Output columns: `["SEMANA", <one column per year>]`, week-ordered;
    /// the year columns are named by the year value and ordered ascending.
    pub fn weekly_by_year(df: &DataFrame) -> Result<DataFrame, AggregateError> {
        let counts = df
            .clone()
            .lazy()
            .select([
                col("ANO").cast(DataType::Int32),
                col("SEMANA").cast(DataType::Int32),
            ])
            .drop_nulls(None)
            .group_by([col("ANO"), col("SEMANA")])
            .agg([len().cast(DataType::Int64).alias("casos")])
            .collect()?;

        let mut pivot = counts
            .clone()
            .lazy()
            .select([col("SEMANA")])
            .unique(None, UniqueKeepStrategy::Any)
            .sort(["SEMANA"], SortMultipleOptions::default())
            .collect()?;

        let mut years: Vec<i32> = Self::i64_column(&counts, "ANO")
            .into_iter()
            .map(|y| y as i32)
            .collect();
        years.sort_unstable();
        years.dedup();

        for year in years {
            let year_label = year.to_string();
            let per_year = counts
                .clone()
                .lazy()
                .filter(col("ANO").eq(lit(year)))
                .select([col("SEMANA"), col("casos").alias(year_label.as_str())])
                .collect()?;

            pivot = pivot
                .lazy()
                .join(
                    per_year.lazy(),
                    [col("SEMANA")],
                    [col("SEMANA")],
                    JoinArgs::new(JoinType::Left),
                )
                .with_column(col(year_label.as_str()).fill_null(lit(0)))
                .collect()?;
        }

        Ok(pivot)
    }

    /// Final-status counts by year, restricted to the codes in
    /// [`FINAL_STATUS_LABELS`] and recoded to their display labels.
    ///
    /// Output columns: `["ANO", "ESTADO_FINAL", "Frecuencia"]`.
    pub fn final_status_by_year(df: &DataFrame) -> Result<DataFrame, AggregateError> {
        let status = col("ESTADO_FINAL").cast(DataType::Int32);

        let mut keep = status.clone().eq(lit(FINAL_STATUS_LABELS[0].0));
        for (code, _) in &FINAL_STATUS_LABELS[1..] {
            keep = keep.or(status.clone().eq(lit(*code)));
        }

        let recode = when(status.clone().eq(lit(2)))
            .then(lit("Probable"))
            .when(status.clone().eq(lit(3)))
            .then(lit("C. por laboratorio"))
            .when(status.clone().eq(lit(5)))
            .then(lit("C. por nexo"))
            .otherwise(lit(NULL));

        let recoded = df
            .clone()
            .lazy()
            .filter(keep)
            .with_column(recode.alias("ESTADO_FINAL"))
            .collect()?;

        Self::yearly_counts(&recoded, "ESTADO_FINAL", "Frecuencia")
    }

    /// Confirmed-flag counts by year, recoded 1 → "Sí", 0 → "No".
    ///
    /// Output columns: `["ANO", "confirmados", "Frecuencia"]`.
    pub fn confirmed_by_year(df: &DataFrame) -> Result<DataFrame, AggregateError> {
        let flag = col("confirmados").cast(DataType::Int32);

        let recoded = df
            .clone()
            .lazy()
            .with_column(
                when(flag.clone().eq(lit(1)))
                    .then(lit("Sí"))
                    .when(flag.eq(lit(0)))
                    .then(lit("No"))
                    .otherwise(lit(NULL))
                    .alias("confirmados"),
            )
            .collect()?;

        Self::yearly_counts(&recoded, "confirmados", "Frecuencia")
    }

    /// The subset of rows with a hospitalization flag of 1.
    pub fn hospitalized(df: &DataFrame) -> Result<DataFrame, AggregateError> {
        let filtered = df
            .clone()
            .lazy()
            .filter(col("PAC_HOS").cast(DataType::Int32).eq(lit(1)))
            .collect()?;

        Ok(filtered)
    }

    /// Death counts by clinical event (closure code 2).
    ///
    /// Output columns: `["Evento", "Decesos"]`.
    pub fn deaths_by_event(df: &DataFrame) -> Result<DataFrame, AggregateError> {
        let deceased = df
            .clone()
            .lazy()
            .filter(col("CON_FIN").cast(DataType::Int32).eq(lit(2)))
            .collect()?;

        Self::count_table(&deceased, "EVENTO", "Evento", "Decesos")
    }

    /// String values of a column, in row order.
    pub fn str_column(df: &DataFrame, column: &str) -> Vec<String> {
        let Ok(col) = df.column(column) else {
            return Vec::new();
        };
        let series = col.as_materialized_series();
        (0..series.len())
            .filter_map(|i| {
                let val = series.get(i).ok()?;
                if val.is_null() {
                    None
                } else {
                    Some(val.to_string().trim_matches('"').to_string())
                }
            })
            .collect()
    }

    /// Float values of a column, in row order, nulls skipped.
    pub fn f64_column(df: &DataFrame, column: &str) -> Vec<f64> {
        df.column(column)
            .and_then(|col| col.cast(&DataType::Float64))
            .ok()
            .and_then(|col| col.f64().ok().map(|ca| ca.into_iter().flatten().collect()))
            .unwrap_or_default()
    }

    /// Integer values of a column, in row order, nulls skipped.
    pub fn i64_column(df: &DataFrame, column: &str) -> Vec<i64> {
        df.column(column)
            .and_then(|col| col.cast(&DataType::Int64))
            .ok()
            .and_then(|col| col.i64().ok().map(|ca| ca.into_iter().flatten().collect()))
            .unwrap_or_default()
    }
}
