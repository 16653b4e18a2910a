//! Geo module - boundary loading, name corrections and the population join

mod joiner;

pub use joiner::{
    normalize_department, GeoError, GeoJoiner, DENSITY_PER_HABITANTS, DEPARTMENT_CORRECTIONS,
    UNMAPPABLE_DEPARTMENTS,
};
