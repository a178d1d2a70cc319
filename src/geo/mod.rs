//! Geodetic projection between raster, map and geographic coordinates

pub mod projector;

pub use projector::{
    lon_lat_grids, GeodeticProjector, LatitudeEvaluator, LongitudeEvaluator,
    DEFAULT_INTERPOLATION_DEPTH,
};
