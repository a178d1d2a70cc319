//! Pixel to lon/lat projection via pure-Rust CRS transforms.
//!
//! Pixel coordinates reference pixel centres (a 0.5 offset in both axes)
//! so reprojected values agree with the centre of the ground cell.

use crate::core::blrb::{interpolate_grid, Evaluator};
use crate::types::{CoordGrid, GridError, GridResult, GriddedGeoBox};
use ndarray::Array2;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// EPSG code of the geographic output CRS (WGS84)
const GEODETIC_EPSG: u32 = 4326;

/// Default recursion depth for reconstructing lon/lat grids
pub const DEFAULT_INTERPOLATION_DEPTH: usize = 7;

/// Converts pixel (row, col) locations of one acquisition to map and
/// geographic coordinates.
pub struct GeodeticProjector {
    geobox: GriddedGeoBox,
    source: Proj,
    target: Proj,
    source_is_geographic: bool,
}

impl GeodeticProjector {
    pub fn new(geobox: &GriddedGeoBox) -> GridResult<Self> {
        let source_proj4 = proj_string(geobox.crs_epsg())?;
        let source_is_geographic = source_proj4.contains("+proj=longlat");

        Ok(Self {
            geobox: geobox.clone(),
            source: parse_proj(source_proj4, geobox.crs_epsg())?,
            target: parse_proj(proj_string(GEODETIC_EPSG)?, GEODETIC_EPSG)?,
            source_is_geographic,
        })
    }

    pub fn geobox(&self) -> &GriddedGeoBox {
        &self.geobox
    }

    /// Map coordinates of a pixel centre.
    pub fn pixel_to_map(&self, row: f64, col: f64) -> (f64, f64) {
        self.geobox.convert_coordinates(col + 0.5, row + 0.5)
    }

    /// Geographic (lon, lat) of a pixel centre, in degrees.
    pub fn pixel_to_lonlat(&self, row: f64, col: f64) -> GridResult<(f64, f64)> {
        let (x, y) = self.pixel_to_map(row, col);
        self.map_to_lonlat(x, y)
    }

    /// Reproject map coordinates to geographic (lon, lat) degrees.
    pub fn map_to_lonlat(&self, x: f64, y: f64) -> GridResult<(f64, f64)> {
        if self.geobox.crs_epsg() == GEODETIC_EPSG {
            return Ok((x, y));
        }

        // proj4rs works in radians for geographic CRS
        let (x_in, y_in) = if self.source_is_geographic {
            (x.to_radians(), y.to_radians())
        } else {
            (x, y)
        };

        let mut point = (x_in, y_in, 0.0);
        transform(&self.source, &self.target, &mut point).map_err(|e| {
            GridError::Projection(format!(
                "transform from EPSG:{} failed at ({}, {}): {:?}",
                self.geobox.crs_epsg(),
                x,
                y,
                e
            ))
        })?;

        Ok((point.0.to_degrees(), point.1.to_degrees()))
    }

    /// Scene centre (lon, lat) in degrees.
    pub fn centre_lonlat(&self) -> GridResult<(f64, f64)> {
        let (rows, cols) = self.geobox.shape();
        self.pixel_to_lonlat((rows / 2) as f64, (cols / 2) as f64)
    }

    /// The four raster corner (lon, lat) pairs: UL, UR, LL, LR.
    pub fn corner_lonlats(&self) -> GridResult<[(f64, f64); 4]> {
        let (rows, cols) = self.geobox.shape();
        let last_row = rows as f64 - 0.5;
        let last_col = cols as f64 - 0.5;

        Ok([
            self.pixel_to_lonlat(-0.5, -0.5)?,
            self.pixel_to_lonlat(-0.5, last_col)?,
            self.pixel_to_lonlat(last_row, -0.5)?,
            self.pixel_to_lonlat(last_row, last_col)?,
        ])
    }

    /// Minimum and maximum latitude over the raster corners; handles both
    /// hemispheres.
    pub fn latitude_extent(&self) -> GridResult<(f64, f64)> {
        let corners = self.corner_lonlats()?;
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        for (_, lat) in corners {
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }
        Ok((min_lat, max_lat))
    }
}

/// Longitude component of the geodetic projection, as a BLRB evaluator.
pub struct LongitudeEvaluator<'a> {
    projector: &'a GeodeticProjector,
}

impl<'a> LongitudeEvaluator<'a> {
    pub fn new(projector: &'a GeodeticProjector) -> Self {
        Self { projector }
    }
}

impl Evaluator for LongitudeEvaluator<'_> {
    fn evaluate(&self, row: usize, col: usize) -> GridResult<f64> {
        Ok(self.projector.pixel_to_lonlat(row as f64, col as f64)?.0)
    }
}

/// Latitude component of the geodetic projection, as a BLRB evaluator.
pub struct LatitudeEvaluator<'a> {
    projector: &'a GeodeticProjector,
}

impl<'a> LatitudeEvaluator<'a> {
    pub fn new(projector: &'a GeodeticProjector) -> Self {
        Self { projector }
    }
}

impl Evaluator for LatitudeEvaluator<'_> {
    fn evaluate(&self, row: usize, col: usize) -> GridResult<f64> {
        Ok(self.projector.pixel_to_lonlat(row as f64, col as f64)?.1)
    }
}

/// Dense longitude and latitude grids for an acquisition, reconstructed
/// by bilinear recursive bisection from exact reprojections.
pub fn lon_lat_grids(
    geobox: &GriddedGeoBox,
    depth: usize,
) -> GridResult<(CoordGrid, CoordGrid)> {
    let projector = GeodeticProjector::new(geobox)?;
    let shape = geobox.shape();

    log::info!(
        "Creating lon/lat grids: {}x{} at depth {}",
        shape.0,
        shape.1,
        depth
    );

    let mut lon = Array2::zeros(shape);
    interpolate_grid(
        &mut lon,
        &LongitudeEvaluator::new(&projector),
        depth,
        (0, 0),
        shape,
    )?;

    let mut lat = Array2::zeros(shape);
    interpolate_grid(
        &mut lat,
        &LatitudeEvaluator::new(&projector),
        depth,
        (0, 0),
        shape,
    )?;

    Ok((lon, lat))
}

fn proj_string(epsg: u32) -> GridResult<&'static str> {
    let code = u16::try_from(epsg).map_err(|_| GridError::UnsupportedCrs(epsg))?;
    crs_definitions::from_code(code)
        .map(|def| def.proj4)
        .ok_or(GridError::UnsupportedCrs(epsg))
}

fn parse_proj(proj4: &str, epsg: u32) -> GridResult<Proj> {
    Proj::from_proj_string(proj4)
        .map_err(|e| GridError::Projection(format!("invalid projection EPSG:{}: {:?}", epsg, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoTransform;
    use approx::assert_relative_eq;

    fn geographic_geobox() -> GriddedGeoBox {
        GriddedGeoBox::new(
            (40, 50),
            GeoTransform {
                top_left_x: 144.8,
                pixel_width: 0.01,
                rotation_x: 0.0,
                top_left_y: -34.8,
                rotation_y: 0.0,
                pixel_height: -0.01,
            },
            4326,
        )
    }

    fn utm_geobox() -> GriddedGeoBox {
        // UTM zone 55S, near the zone's central meridian
        GriddedGeoBox::new(
            (40, 50),
            GeoTransform {
                top_left_x: 500_000.0,
                pixel_width: 25.0,
                rotation_x: 0.0,
                top_left_y: 6_115_000.0,
                rotation_y: 0.0,
                pixel_height: -25.0,
            },
            32755,
        )
    }

    #[test]
    fn test_pixel_centre_convention() {
        let projector = GeodeticProjector::new(&geographic_geobox()).unwrap();
        let (lon, lat) = projector.pixel_to_lonlat(0.0, 0.0).unwrap();
        assert_relative_eq!(lon, 144.805, epsilon = 1e-9);
        assert_relative_eq!(lat, -34.805, epsilon = 1e-9);
    }

    #[test]
    fn test_utm_projection() {
        let projector = GeodeticProjector::new(&utm_geobox()).unwrap();
        let (lon, lat) = projector.pixel_to_lonlat(0.0, 0.0).unwrap();
        // easting 500000 sits on the 147E central meridian
        assert_relative_eq!(lon, 147.0, epsilon = 0.01);
        assert!(lat < -34.0 && lat > -36.0, "latitude was {}", lat);
    }

    #[test]
    fn test_unsupported_crs() {
        let geobox = GriddedGeoBox::new(
            (4, 4),
            GeoTransform {
                top_left_x: 0.0,
                pixel_width: 1.0,
                rotation_x: 0.0,
                top_left_y: 0.0,
                rotation_y: 0.0,
                pixel_height: -1.0,
            },
            999_999,
        );
        assert!(matches!(
            GeodeticProjector::new(&geobox),
            Err(GridError::UnsupportedCrs(999_999))
        ));
    }

    #[test]
    fn test_latitude_extent() {
        let projector = GeodeticProjector::new(&geographic_geobox()).unwrap();
        let (min_lat, max_lat) = projector.latitude_extent().unwrap();
        assert!(min_lat < max_lat);
        assert_relative_eq!(max_lat, -34.8, epsilon = 1e-9);
        assert_relative_eq!(min_lat, -35.2, epsilon = 1e-9);
    }

    #[test]
    fn test_lon_lat_grids_match_direct_projection() {
        let geobox = geographic_geobox();
        let projector = GeodeticProjector::new(&geobox).unwrap();
        let (lon, lat) = lon_lat_grids(&geobox, DEFAULT_INTERPOLATION_DEPTH).unwrap();

        for &(r, c) in &[(0usize, 0usize), (13, 29), (39, 49), (20, 25)] {
            let (exact_lon, exact_lat) = projector.pixel_to_lonlat(r as f64, c as f64).unwrap();
            assert_relative_eq!(lon[[r, c]], exact_lon, epsilon = 1e-6);
            assert_relative_eq!(lat[[r, c]], exact_lat, epsilon = 1e-6);
        }
    }
}
