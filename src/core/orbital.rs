//! Orbital and solar geometry for the dense angle solver.
//!
//! A circular inclined orbit is fitted through the scene centre on the
//! rotating Earth; per-latitude crossing times and track longitudes feed
//! the per-pixel view-angle computation. Solar position uses the
//! Julian-century ephemeris driven by the acquisition timestamp.

use crate::types::{GridError, GridResult};
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Earth rotational angular velocity in radians/second
pub const EARTH_ROTATIONAL_ANGULAR_VELOCITY: f64 = 7.2722052e-5;

/// Earth gravitational parameter in m^3 s^-2
pub const EARTH_GRAVITATIONAL_PARAMETER: f64 = 3.986004418e14;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Earth spheroid parameters used in the angle-grid calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Spheroid {
    /// Semi-major axis in metres
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    pub eccentricity_squared: f64,
    /// Earth rotational angular velocity in radians/second
    pub angular_velocity: f64,
}

impl Spheroid {
    pub fn new(semi_major_axis: f64, inverse_flattening: f64) -> Self {
        let eccentricity_squared = 1.0 - (1.0 - 1.0 / inverse_flattening).powi(2);
        Self {
            semi_major_axis,
            inverse_flattening,
            eccentricity_squared,
            angular_velocity: EARTH_ROTATIONAL_ANGULAR_VELOCITY,
        }
    }

    pub fn wgs84() -> Self {
        Self::new(6_378_137.0, 298.257223563)
    }

    /// Geocentric radius at a geodetic latitude (degrees), in metres.
    pub fn geocentric_radius(&self, latitude: f64) -> f64 {
        let lat = latitude.to_radians();
        let e2 = self.eccentricity_squared;
        let cos2 = lat.cos().powi(2);
        let sin2 = lat.sin().powi(2);
        self.semi_major_axis * ((cos2 + (1.0 - e2).powi(2) * sin2) / (1.0 - e2 * sin2)).sqrt()
    }

    /// Geocentric latitude (radians) for a geodetic latitude (degrees).
    fn geocentric_latitude(&self, latitude: f64) -> f64 {
        ((1.0 - self.eccentricity_squared) * latitude.to_radians().tan()).atan()
    }
}

/// Satellite orbital parameters distilled from a two-line element set.
///
/// Loading and selecting the ephemeris file is the caller's concern; this
/// is only the content the orbital model needs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EphemerisElements {
    /// Orbital inclination in radians
    pub inclination: f64,
    /// Mean motion in revolutions per day
    pub mean_motion: f64,
}

/// Satellite orbital elements used for the angle grids.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Orbital inclination in degrees
    pub inclination: f64,
    /// Semi-major orbital radius in metres
    pub semi_major_radius: f64,
    /// Angular velocity in radians/second
    pub angular_velocity: f64,
}

impl OrbitalElements {
    /// Derive the elements from ephemeris data.
    ///
    /// The semi-major radius follows from the mean motion via the Earth
    /// gravitational parameter.
    pub fn from_ephemeris(ephemeris: &EphemerisElements) -> Self {
        let mean_angular = 2.0 * std::f64::consts::PI * ephemeris.mean_motion / SECONDS_PER_DAY;
        Self {
            inclination: ephemeris.inclination.to_degrees(),
            semi_major_radius: (EARTH_GRAVITATIONAL_PARAMETER / mean_angular.powi(2)).cbrt(),
            angular_velocity: mean_angular,
        }
    }

    /// Analytic fallback seeded from the platform's nominal orbit, for
    /// acquisitions without a usable ephemeris.
    pub fn from_platform(inclination: f64, semi_major_radius: f64, angular_velocity: f64) -> Self {
        Self {
            inclination,
            semi_major_radius,
            angular_velocity,
        }
    }
}

/// Satellite track point: crossing time (seconds relative to the scene
/// centre) and ground-track position at one latitude.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackPoint {
    pub t: f64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Circular inclined orbit fitted through the scene centre.
///
/// The ascending-node longitude is solved so the selected pass direction
/// crosses the scene centre at t = 0; Earth rotation is applied to the
/// ground-track longitude.
#[derive(Debug, Clone)]
pub struct SatelliteModel {
    spheroid: Spheroid,
    orbital: OrbitalElements,
    descending: bool,
    sin_inclination: f64,
    cos_inclination: f64,
    /// Orbit angle from the ascending node at the scene centre
    u_centre: f64,
    /// Inertial longitude of the ascending node, radians
    node_longitude: f64,
}

impl SatelliteModel {
    /// Fit the model through the scene centre (lon, lat in degrees).
    ///
    /// `descending` selects the pass direction; sun-synchronous imagers
    /// acquire daytime scenes on the descending node.
    pub fn new(
        centre_lonlat: (f64, f64),
        spheroid: Spheroid,
        orbital: OrbitalElements,
        descending: bool,
    ) -> GridResult<Self> {
        let inclination = orbital.inclination.to_radians();
        let sin_inclination = inclination.sin();
        let cos_inclination = inclination.cos();

        let psi_centre = spheroid.geocentric_latitude(centre_lonlat.1);
        let u_centre = orbit_angle(psi_centre, sin_inclination, descending).ok_or_else(|| {
            GridError::Geometry(format!(
                "scene centre latitude {:.4} outside orbital coverage",
                centre_lonlat.1
            ))
        })?;

        let node_longitude = wrap_angle(
            centre_lonlat.0.to_radians() - inertial_longitude(u_centre, cos_inclination),
        );

        Ok(Self {
            spheroid,
            orbital,
            descending,
            sin_inclination,
            cos_inclination,
            u_centre,
            node_longitude,
        })
    }

    pub fn orbital(&self) -> &OrbitalElements {
        &self.orbital
    }

    pub fn spheroid(&self) -> &Spheroid {
        &self.spheroid
    }

    /// Crossing time and ground-track position at a geodetic latitude.
    pub fn solve_latitude(&self, latitude: f64) -> GridResult<TrackPoint> {
        let psi = self.spheroid.geocentric_latitude(latitude);
        let u = orbit_angle(psi, self.sin_inclination, self.descending).ok_or_else(|| {
            GridError::Geometry(format!(
                "latitude {:.4} outside orbital coverage",
                latitude
            ))
        })?;

        let t = (u - self.u_centre) / self.orbital.angular_velocity;
        let longitude = wrap_angle(
            self.node_longitude + inertial_longitude(u, self.cos_inclination)
                - self.spheroid.angular_velocity * t,
        );

        Ok(TrackPoint {
            t,
            latitude,
            longitude: longitude.to_degrees(),
        })
    }

    /// Track-time table over a latitude window.
    pub fn track(&self, min_lat: f64, max_lat: f64, points: usize) -> GridResult<SatelliteTrack> {
        if points < 2 || max_lat <= min_lat {
            return Err(GridError::Geometry(format!(
                "degenerate track window [{}, {}] with {} points",
                min_lat, max_lat, points
            )));
        }

        let step = (max_lat - min_lat) / (points - 1) as f64;
        let mut table = Vec::with_capacity(points);
        for k in 0..points {
            table.push(self.solve_latitude(min_lat + k as f64 * step)?);
        }

        log::debug!(
            "Satellite track sampled: {} points over latitudes [{:.3}, {:.3}]",
            points,
            min_lat,
            max_lat
        );

        Ok(SatelliteTrack { points: table })
    }
}

/// The satellite track-time table, sampled by latitude.
#[derive(Debug, Clone)]
pub struct SatelliteTrack {
    /// Track points in ascending latitude order
    pub points: Vec<TrackPoint>,
}

impl SatelliteTrack {
    /// Interpolate crossing time and track longitude at a latitude.
    ///
    /// A latitude with no bracketing table interval means the orbital
    /// model cannot place the acquisition; that is fatal for the row
    /// being scanned.
    pub fn interpolate(&self, latitude: f64) -> GridResult<TrackPoint> {
        let points = &self.points;
        let no_interval = || {
            GridError::Geometry(format!(
                "no interval found in track for latitude {:.4}",
                latitude
            ))
        };

        let first = points.first().ok_or_else(no_interval)?;
        let last = points.last().ok_or_else(no_interval)?;
        if latitude < first.latitude || latitude > last.latitude {
            return Err(no_interval());
        }

        let idx = points
            .partition_point(|p| p.latitude <= latitude)
            .clamp(1, points.len() - 1);
        let lo = points[idx - 1];
        let hi = points[idx];

        let span = hi.latitude - lo.latitude;
        let f = if span > 0.0 {
            (latitude - lo.latitude) / span
        } else {
            0.0
        };

        Ok(TrackPoint {
            t: lo.t + (hi.t - lo.t) * f,
            latitude,
            longitude: lo.longitude + (hi.longitude - lo.longitude) * f,
        })
    }

    pub fn min_latitude(&self) -> f64 {
        self.points.first().map(|p| p.latitude).unwrap_or(f64::NAN)
    }

    pub fn max_latitude(&self) -> f64 {
        self.points.last().map(|p| p.latitude).unwrap_or(f64::NAN)
    }
}

/// Orbit angle from the ascending node at a geocentric latitude, on the
/// requested pass branch. None when the latitude is outside the orbit's
/// ground coverage.
fn orbit_angle(psi: f64, sin_inclination: f64, descending: bool) -> Option<f64> {
    let s = psi.sin() / sin_inclination;
    if s.abs() > 1.0 {
        return None;
    }
    let u = s.asin();
    Some(if descending {
        std::f64::consts::PI - u
    } else {
        u
    })
}

/// Inertial longitude offset from the ascending node at orbit angle `u`.
fn inertial_longitude(u: f64, cos_inclination: f64) -> f64 {
    (cos_inclination * u.sin()).atan2(u.cos())
}

/// Wrap an angle in radians to (-pi, pi].
fn wrap_angle(angle: f64) -> f64 {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut a = angle.rem_euclid(two_pi);
    if a > std::f64::consts::PI {
        a -= two_pi;
    }
    a
}

/// Julian centuries since the J2000 epoch (2000-01-01 12:00 UTC).
pub fn julian_century(datetime: &DateTime<Utc>) -> f64 {
    let julian_date = 2_440_587.5 + datetime.timestamp() as f64 / SECONDS_PER_DAY;
    (julian_date - 2_451_545.0) / 36_525.0
}

/// UTC time of day as a decimal hour.
pub fn decimal_hour(datetime: &DateTime<Utc>) -> f64 {
    datetime.hour() as f64
        + datetime.minute() as f64 / 60.0
        + datetime.second() as f64 / 3600.0
        + datetime.nanosecond() as f64 / 3.6e12
}

/// Solar zenith and azimuth (degrees, azimuth clockwise from north) at a
/// location, from the Julian century and UTC decimal hour.
pub fn solar_position(century: f64, decimal_hours: f64, longitude: f64, latitude: f64) -> (f64, f64) {
    // geometric mean longitude and anomaly of the sun
    let l0 = (280.46646 + century * (36000.76983 + 0.0003032 * century)).rem_euclid(360.0);
    let m = (357.52911 + century * (35999.05029 - 0.0001537 * century)).to_radians();
    let eccentricity = 0.016708634 - century * (0.000042037 + 0.0000001267 * century);

    let equation_of_centre = m.sin() * (1.914602 - century * (0.004817 + 0.000014 * century))
        + (2.0 * m).sin() * (0.019993 - 0.000101 * century)
        + (3.0 * m).sin() * 0.000289;
    let true_longitude = l0 + equation_of_centre;
    let omega = (125.04 - 1934.136 * century).to_radians();
    let apparent_longitude = (true_longitude - 0.00569 - 0.00478 * omega.sin()).to_radians();

    let mean_obliquity = 23.0
        + (26.0 + (21.448 - century * (46.815 + century * (0.00059 - century * 0.001813))) / 60.0)
            / 60.0;
    let obliquity = (mean_obliquity + 0.00256 * omega.cos()).to_radians();

    let declination = (obliquity.sin() * apparent_longitude.sin()).asin();

    // equation of time in minutes
    let y = (obliquity / 2.0).tan().powi(2);
    let l0_rad = l0.to_radians();
    let equation_of_time = 4.0
        * (y * (2.0 * l0_rad).sin() - 2.0 * eccentricity * m.sin()
            + 4.0 * eccentricity * y * m.sin() * (2.0 * l0_rad).cos()
            - 0.5 * y * y * (4.0 * l0_rad).sin()
            - 1.25 * eccentricity * eccentricity * (2.0 * m).sin())
        .to_degrees();

    let true_solar_minutes =
        (decimal_hours * 60.0 + equation_of_time + 4.0 * longitude).rem_euclid(1440.0);
    let hour_angle = (true_solar_minutes / 4.0 - 180.0).to_radians();

    let lat = latitude.to_radians();
    let cos_zenith =
        (lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos())
            .clamp(-1.0, 1.0);
    let zenith = cos_zenith.acos().to_degrees();

    // azimuth measured from south, westward positive, then rotated to
    // clockwise-from-north
    let azimuth_south = hour_angle
        .sin()
        .atan2(hour_angle.cos() * lat.sin() - declination.tan() * lat.cos());
    let azimuth = (azimuth_south.to_degrees() + 180.0).rem_euclid(360.0);

    (zenith, azimuth)
}
