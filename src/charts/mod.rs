//! Charts module - Plotly figure specifications and the map artifact

mod figure;
mod map;

pub use figure::{
    ChartBuilder, Figure, BLUE, DEEP_SKY_BLUE, DODGER_BLUE, INDIAN_RED, MEDIUM_BLUE, ROYAL_BLUE,
};
pub use map::{MapError, MapRenderer};
