//! Core sampling and reconstruction modules

pub mod angles;
pub mod blrb;
pub mod orbital;
pub mod track;
pub mod vertices;

// Re-export main types
pub use angles::{AngleConfig, AngleGridComputer, AngleGrids};
pub use blrb::{
    bilinear, indices, interpolate_block, interpolate_grid, subdivide, CornerPoints, Evaluator,
    Quadrants, VertexLookupEvaluator,
};
pub use orbital::{
    decimal_hour, julian_century, solar_position, EphemerisElements, OrbitalElements,
    SatelliteModel, SatelliteTrack, Spheroid, TrackPoint,
};
pub use track::{first_and_last, swath_edges, TrackBisector};
pub use vertices::{asymmetric_linspace, classify_track, VertexSampler};

#[cfg(feature = "parallel")]
pub use blrb::interpolate_block_parallel;
