//! swathgrid: A Fast, Modular Satellite Angle-Grid and Sparse-Sampling Engine
//!
//! Producing a physically accurate per-pixel correction value across a
//! multi-million-pixel satellite scene is prohibitive when the authoritative
//! evaluator is an expensive numerical model or a moderately expensive
//! geodetic computation. This library makes it tractable with two pieces:
//! a satellite-track-aware sampler that selects a small, well-distributed
//! set of raster locations for exact evaluation, and a recursive
//! bilinear-bisection (BLRB) interpolator that reconstructs the dense grid
//! from those evaluations with bounded error.
//!
//! The dense satellite/solar angle grids themselves are cheap enough to
//! solve everywhere; they double as the source of the per-row track
//! bookkeeping that anchors the sampler to the satellite ground track.

pub mod core;
pub mod geo;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    AngleGrid, BoxLine, CentrelinePoint, CoordGrid, Coordinator, GeoTransform, GridError,
    GridReal, GridResult, GriddedGeoBox, TrackBookkeeping, TrackIntersection, NO_DATA,
};

pub use crate::core::{
    AngleConfig, AngleGridComputer, AngleGrids, EphemerisElements, Evaluator, OrbitalElements,
    SatelliteModel, Spheroid, TrackBisector, VertexLookupEvaluator, VertexSampler,
};

pub use geo::{lon_lat_grids, GeodeticProjector, DEFAULT_INTERPOLATION_DEPTH};
