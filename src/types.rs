use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Real-valued angle or time grid data
pub type GridReal = f32;

/// 2D angle/time grid (rows x cols), float32 like the persisted products
pub type AngleGrid = Array2<GridReal>;

/// 2D coordinate or coefficient grid (rows x cols)
pub type CoordGrid = Array2<f64>;

/// Fill value for pixels outside the usable swath
pub const NO_DATA: GridReal = -999.0;

/// Geospatial transformation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Map a fractional pixel coordinate (col, row) to map coordinates (x, y).
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let x = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let y = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (x, y)
    }
}

/// Immutable raster descriptor: shape, affine transform and CRS.
///
/// Created once per acquisition (and per resolution group) and read many
/// times by downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GriddedGeoBox {
    shape: (usize, usize),
    transform: GeoTransform,
    crs_epsg: u32,
}

impl GriddedGeoBox {
    pub fn new(shape: (usize, usize), transform: GeoTransform, crs_epsg: u32) -> Self {
        Self {
            shape,
            transform,
            crs_epsg,
        }
    }

    /// Raster shape as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.shape
    }

    pub fn rows(&self) -> usize {
        self.shape.0
    }

    pub fn cols(&self) -> usize {
        self.shape.1
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// EPSG code of the raster's coordinate reference system
    pub fn crs_epsg(&self) -> u32 {
        self.crs_epsg
    }

    /// Map coordinates of a fractional pixel location (col, row)
    pub fn convert_coordinates(&self, col: f64, row: f64) -> (f64, f64) {
        self.transform.apply(col, row)
    }
}

/// Per-row record of the satellite track bi-section and swath extent.
///
/// `start_index`/`end_index` are the first and last column within the
/// maximum view angle; -1 marks rows with no qualifying pixel. When
/// `n_points > 0` the bisection column always lies within the swath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxLine {
    pub row_index: i64,
    pub bisection_index: i64,
    pub n_points: i64,
    pub start_index: i64,
    pub end_index: i64,
}

/// Sparse sample location selected for expensive evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinator {
    pub row_index: i64,
    pub col_index: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub map_y: f64,
    pub map_x: f64,
}

/// Geolocated satellite track point for one raster row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CentrelinePoint {
    pub row_index: i64,
    pub col_index: i64,
    pub n_pixels: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw per-row track bookkeeping accumulated by the dense angle solver.
///
/// `col_sum[r]` is the sum of the track-adjacent column indices recorded for
/// row `r`, `count[r]` how many were recorded (0, 1 or 2). Averaging and
/// gap carry-forward happen later, in the track bisector.
#[derive(Debug, Clone, Default)]
pub struct TrackBookkeeping {
    pub col_sum: Vec<f64>,
    pub count: Vec<f64>,
}

impl TrackBookkeeping {
    pub fn new(rows: usize) -> Self {
        Self {
            col_sum: vec![0.0; rows],
            count: vec![0.0; rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.count.len()
    }
}

/// How the satellite track intersects the raster rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackIntersection {
    /// Track present at both the first and last row
    Full,
    /// Track appears or disappears at an interior row
    Partial { boundary_row: usize },
    /// Track absent everywhere
    Empty,
}

/// Error types for grid and geometry processing
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Projection error: {0}")]
    Projection(String),

    #[error("EPSG:{0} is not in the CRS database")]
    UnsupportedCrs(u32),

    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    #[error("Invalid vertex grid: {0}")]
    InvalidVertices(String),

    #[error("No vertex value at ({row}, {col})")]
    MissingVertex { row: usize, col: usize },
}

/// Result type for grid operations
pub type GridResult<T> = Result<T, GridError>;
