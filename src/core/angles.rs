//! Dense satellite and solar angle grids over a 2D raster.
//!
//! Unlike the sparse reconstruction pathway, these fields are cheap enough
//! to solve at every pixel: the computer scans the raster row by row
//! against the orbital model and simultaneously accumulates the per-row
//! track bookkeeping consumed by the track bisector.

use crate::core::orbital::{
    decimal_hour, julian_century, solar_position, OrbitalElements, SatelliteModel, SatelliteTrack,
    Spheroid, TrackPoint,
};
use crate::types::{
    AngleGrid, CoordGrid, GridError, GridResult, GriddedGeoBox, TrackBookkeeping, NO_DATA,
};
use chrono::{DateTime, Utc};
use ndarray::Array2;

/// Angle computation parameters
#[derive(Debug, Clone)]
pub struct AngleConfig {
    /// Maximum satellite view angle in degrees; pixels beyond it are
    /// outside the usable swath
    pub max_view_angle: f32,
    /// Number of sample points along the satellite track
    pub track_points: usize,
    /// Latitude padding around the scene extent for the track table, in
    /// degrees
    pub latitude_buffer: f64,
}

impl Default for AngleConfig {
    fn default() -> Self {
        Self {
            max_view_angle: 9.0,  // nadir-looking imager swath
            track_points: 12,
            latitude_buffer: 1.0,
        }
    }
}

/// Dense per-pixel angle and time grids, plus the raw track bookkeeping.
#[derive(Debug, Clone)]
pub struct AngleGrids {
    /// Satellite view (off-nadir zenith) angle in degrees
    pub satellite_view: AngleGrid,
    /// Satellite azimuth angle in degrees, clockwise from north
    pub satellite_azimuth: AngleGrid,
    /// Solar zenith angle in degrees
    pub solar_zenith: AngleGrid,
    /// Solar azimuth angle in degrees, clockwise from north
    pub solar_azimuth: AngleGrid,
    /// Relative (satellite - solar) azimuth angle in degrees
    pub relative_azimuth: AngleGrid,
    /// Acquisition time offset from the scene centre, in seconds
    pub time_delta: AngleGrid,
    /// Per-row track bookkeeping for the track bisector
    pub track: TrackBookkeeping,
}

/// Computes the dense angle grids for one acquisition.
pub struct AngleGridComputer {
    geobox: GriddedGeoBox,
    centre_datetime: DateTime<Utc>,
    spheroid: Spheroid,
    orbital: OrbitalElements,
    config: AngleConfig,
}

impl AngleGridComputer {
    pub fn new(
        geobox: GriddedGeoBox,
        centre_datetime: DateTime<Utc>,
        spheroid: Spheroid,
        orbital: OrbitalElements,
    ) -> Self {
        Self::with_config(geobox, centre_datetime, spheroid, orbital, AngleConfig::default())
    }

    pub fn with_config(
        geobox: GriddedGeoBox,
        centre_datetime: DateTime<Utc>,
        spheroid: Spheroid,
        orbital: OrbitalElements,
        config: AngleConfig,
    ) -> Self {
        Self {
            geobox,
            centre_datetime,
            spheroid,
            orbital,
            config,
        }
    }

    pub fn config(&self) -> &AngleConfig {
        &self.config
    }

    /// Solve the six angle/time grids from the dense longitude and
    /// latitude grids.
    ///
    /// Pixels whose view angle falls outside the maximum are left at the
    /// no-data fill. A raster row whose latitude has no track interval is
    /// a fatal geometry inconsistency.
    pub fn compute(&self, lon: &CoordGrid, lat: &CoordGrid) -> GridResult<AngleGrids> {
        let (rows, cols) = self.geobox.shape();
        if lon.dim() != (rows, cols) || lat.dim() != (rows, cols) {
            return Err(GridError::InvalidShape(format!(
                "lon/lat grids {:?}/{:?} do not match acquisition shape {:?}",
                lon.dim(),
                lat.dim(),
                (rows, cols)
            )));
        }

        log::info!("Computing satellite and solar angle grids: {}x{}", rows, cols);
        log::debug!("Angle parameters: {:?}", self.config);

        // INIT: orbital model through the scene centre, track table over
        // the buffered latitude extent
        let centre = (lon[[rows / 2, cols / 2]], lat[[rows / 2, cols / 2]]);
        let (min_lat, max_lat) = lat.iter().fold((f64::MAX, f64::MIN), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

        let model = SatelliteModel::new(centre, self.spheroid, self.orbital, true)?;
        let track = model.track(
            min_lat - self.config.latitude_buffer,
            max_lat + self.config.latitude_buffer,
            self.config.track_points,
        )?;

        let century = julian_century(&self.centre_datetime);
        let hours = decimal_hour(&self.centre_datetime);

        let mut grids = AngleGrids {
            satellite_view: Array2::from_elem((rows, cols), NO_DATA),
            satellite_azimuth: Array2::from_elem((rows, cols), NO_DATA),
            solar_zenith: Array2::from_elem((rows, cols), NO_DATA),
            solar_azimuth: Array2::from_elem((rows, cols), NO_DATA),
            relative_azimuth: Array2::from_elem((rows, cols), NO_DATA),
            time_delta: Array2::from_elem((rows, cols), NO_DATA),
            track: TrackBookkeeping::new(rows),
        };

        // PER_ROW_SCAN
        for r in 0..rows {
            self.scan_row(r, lon, lat, &track, century, hours, &mut grids)
                .map_err(|e| {
                    GridError::Geometry(format!("error in calculating angles at row {}: {}", r, e))
                })?;
        }

        // FINALIZE
        let tracked = grids.track.count.iter().filter(|&&n| n > 0.5).count();
        log::info!(
            "Angle grids complete; satellite track crosses {} of {} rows",
            tracked,
            rows
        );

        Ok(grids)
    }

    fn scan_row(
        &self,
        row: usize,
        lon: &CoordGrid,
        lat: &CoordGrid,
        track: &SatelliteTrack,
        century: f64,
        hours: f64,
        grids: &mut AngleGrids,
    ) -> GridResult<()> {
        let cols = lon.ncols();
        let mut previous_offset: Option<f64> = None;

        for c in 0..cols {
            let pixel_lon = lon[[row, c]];
            let pixel_lat = lat[[row, c]];

            let track_point = track.interpolate(pixel_lat)?;
            let (view, view_azimuth) = self.view_geometry(pixel_lon, pixel_lat, &track_point);

            // track bookkeeping: record the column pair straddling the
            // track's longitude crossing (a single column when it lands
            // exactly on one)
            let offset = wrap_degrees(pixel_lon - track_point.longitude);
            if offset == 0.0 {
                grids.track.col_sum[row] += c as f64;
                grids.track.count[row] += 1.0;
            } else if let Some(prev) = previous_offset {
                if prev != 0.0 && prev.signum() != offset.signum() {
                    grids.track.col_sum[row] += (c - 1) as f64 + c as f64;
                    grids.track.count[row] += 2.0;
                }
            }
            previous_offset = Some(offset);

            if view > self.config.max_view_angle as f64 {
                continue;
            }

            let pixel_hours = hours + track_point.t / 3600.0;
            let (solar_zenith, solar_azimuth) =
                solar_position(century, pixel_hours, pixel_lon, pixel_lat);

            grids.satellite_view[[row, c]] = view as f32;
            grids.satellite_azimuth[[row, c]] = view_azimuth as f32;
            grids.solar_zenith[[row, c]] = solar_zenith as f32;
            grids.solar_azimuth[[row, c]] = solar_azimuth as f32;
            grids.relative_azimuth[[row, c]] = wrap_degrees(view_azimuth - solar_azimuth) as f32;
            grids.time_delta[[row, c]] = track_point.t as f32;
        }

        Ok(())
    }

    /// Satellite view zenith and azimuth at a pixel, from the
    /// sub-satellite point at the pixel's latitude crossing.
    fn view_geometry(&self, pixel_lon: f64, pixel_lat: f64, track_point: &TrackPoint) -> (f64, f64) {
        let psi = central_angle(
            pixel_lat,
            pixel_lon,
            track_point.latitude,
            track_point.longitude,
        );

        let earth_radius = self.spheroid.geocentric_radius(pixel_lat);
        let orbit_radius = self.orbital.semi_major_radius;
        let slant_range = (earth_radius.powi(2) + orbit_radius.powi(2)
            - 2.0 * earth_radius * orbit_radius * psi.cos())
        .sqrt();

        let view = ((orbit_radius * psi.sin() / slant_range).clamp(-1.0, 1.0)).asin();
        let azimuth = bearing(
            pixel_lat,
            pixel_lon,
            track_point.latitude,
            track_point.longitude,
        );

        (view.to_degrees(), azimuth)
    }
}

/// Great-circle central angle between two (lat, lon) points, in radians.
fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let half_dphi = (phi2 - phi1) / 2.0;
    let half_dlambda = (lon2 - lon1).to_radians() / 2.0;

    let a = half_dphi.sin().powi(2) + phi1.cos() * phi2.cos() * half_dlambda.sin().powi(2);
    2.0 * a.sqrt().clamp(-1.0, 1.0).asin()
}

/// Initial great-circle bearing from point 1 to point 2, degrees
/// clockwise from north.
fn bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Wrap an angle in degrees to (-180, 180].
fn wrap_degrees(angle: f64) -> f64 {
    let a = angle.rem_euclid(360.0);
    if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}
