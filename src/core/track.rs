//! Satellite track bi-section and swath edge detection.
//!
//! Turns the dense satellite-view-angle grid and the per-row track
//! bookkeeping from the angle solver into the per-row BoxLine table
//! consumed by the vertex sampler.

use crate::geo::GeodeticProjector;
use crate::types::{
    AngleGrid, BoxLine, CentrelinePoint, GridResult, TrackBookkeeping, NO_DATA,
};

/// Indices of the first and last true value, (-1, -1) when none.
///
/// ```
/// use swathgrid::core::track::first_and_last;
///
/// assert_eq!(first_and_last([false, false, true, true, false, true, true, false, false, false]), (2, 6));
/// assert_eq!(first_and_last([false, false, false]), (-1, -1));
/// assert_eq!(first_and_last([true]), (0, 0));
/// ```
pub fn first_and_last<I>(values: I) -> (i64, i64)
where
    I: IntoIterator<Item = bool>,
{
    let mut first = -1;
    let mut last = -1;

    for (i, v) in values.into_iter().enumerate() {
        if v {
            if first < 0 {
                first = i as i64;
            }
            last = i as i64;
        }
    }

    (first, last)
}

/// Left and right swath edges per row.
///
/// A column qualifies when its view angle lies in `[0, max_angle]`; no-data
/// pixels never qualify. Rows with no qualifying column get (-1, -1).
pub fn swath_edges(view_angles: &AngleGrid, max_angle: f32) -> (Vec<i64>, Vec<i64>) {
    let rows = view_angles.nrows();
    let mut start = Vec::with_capacity(rows);
    let mut end = Vec::with_capacity(rows);

    for row in view_angles.rows() {
        let (s, e) = first_and_last(
            row.iter()
                .map(|&v| v != NO_DATA && v >= 0.0 && v <= max_angle),
        );
        start.push(s);
        end.push(e);
    }

    (start, end)
}

/// Builds the BoxLine table: per-row bisection column, point count and
/// swath extent.
#[derive(Debug, Clone)]
pub struct TrackBisector {
    /// Maximum satellite view angle in degrees defining the usable swath
    max_view_angle: f32,
}

impl TrackBisector {
    pub fn new(max_view_angle: f32) -> Self {
        Self { max_view_angle }
    }

    /// Assemble the BoxLine table from the dense view-angle grid and the
    /// raw per-row track bookkeeping.
    ///
    /// Rows where the track recorded more than one adjacent column use
    /// their average; rows with no track pixel inherit the bisection column
    /// of the nearest row that has one. If the track missed the raster
    /// entirely, every bisection index falls back to the horizontal
    /// midline column.
    pub fn build_boxline(
        &self,
        view_angles: &AngleGrid,
        track: &TrackBookkeeping,
    ) -> Vec<BoxLine> {
        let (rows, cols) = view_angles.dim();
        debug_assert_eq!(rows, track.rows());

        let centres = bisection_columns(track, cols);
        let (start, end) = swath_edges(view_angles, self.max_view_angle);

        let mut boxline = Vec::with_capacity(rows);
        for r in 0..rows {
            let n_points = track.count[r].round() as i64;
            let mut bisection = centres[r].round() as i64;
            bisection = bisection.clamp(0, cols as i64 - 1);
            if n_points > 0 && start[r] >= 0 {
                bisection = bisection.clamp(start[r], end[r]);
            }

            boxline.push(BoxLine {
                row_index: r as i64,
                bisection_index: bisection,
                n_points: n_points.clamp(0, 2),
                start_index: start[r],
                end_index: end[r],
            });
        }

        log::debug!(
            "Boxline assembled: {} rows, {} with track points",
            rows,
            boxline.iter().filter(|b| b.n_points > 0).count()
        );

        boxline
    }

    /// Geolocated satellite track path, one point per raster row.
    pub fn centreline(
        &self,
        track: &TrackBookkeeping,
        projector: &GeodeticProjector,
    ) -> GridResult<Vec<CentrelinePoint>> {
        let rows = track.rows();
        let cols = projector.geobox().cols();
        let centres = bisection_columns(track, cols);

        let mut centreline = Vec::with_capacity(rows);
        for r in 0..rows {
            let col = centres[r].round().clamp(0.0, cols as f64 - 1.0);
            let (lon, lat) = projector.pixel_to_lonlat(r as f64, col)?;
            centreline.push(CentrelinePoint {
                row_index: r as i64,
                col_index: col as i64,
                n_pixels: track.count[r],
                latitude: lat,
                longitude: lon,
            });
        }

        Ok(centreline)
    }
}

/// Averaged per-row bisection column with gap carry-forward.
///
/// Trackless rows take the value of the nearest row with a track point,
/// searching both directions (ties resolve upward). A raster the track
/// never crossed degrades to the horizontal midline.
fn bisection_columns(track: &TrackBookkeeping, cols: usize) -> Vec<f64> {
    let rows = track.rows();
    let midline = (cols / 2) as f64;

    let mut centres = vec![0.0; rows];
    let mut valid = Vec::new();
    for r in 0..rows {
        if track.count[r] > 0.5 {
            centres[r] = if track.count[r] > 1.5 {
                track.col_sum[r] / track.count[r]
            } else {
                track.col_sum[r]
            };
            valid.push(r);
        }
    }

    if valid.is_empty() {
        log::warn!("Satellite track does not cross the raster; bisection falls back to the midline column");
        return vec![midline; rows];
    }

    let mut vi = 0;
    for (r, centre) in centres.iter_mut().enumerate() {
        if track.count[r] > 0.5 {
            continue;
        }
        // advance to the valid row nearest to r
        while vi + 1 < valid.len()
            && valid[vi + 1].abs_diff(r) < valid[vi].abs_diff(r)
        {
            vi += 1;
        }
        *centre = centres_value(track, valid[vi]);
    }

    centres
}

fn centres_value(track: &TrackBookkeeping, row: usize) -> f64 {
    if track.count[row] > 1.5 {
        track.col_sum[row] / track.count[row]
    } else {
        track.col_sum[row]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn bookkeeping(entries: &[(f64, f64)]) -> TrackBookkeeping {
        TrackBookkeeping {
            col_sum: entries.iter().map(|e| e.0).collect(),
            count: entries.iter().map(|e| e.1).collect(),
        }
    }

    #[test]
    fn test_first_and_last() {
        let v = [false, false, true, true, false, true, true, false, false, false];
        assert_eq!(first_and_last(v), (2, 6));
        assert_eq!(first_and_last([false, false, false]), (-1, -1));
        assert_eq!(first_and_last([true]), (0, 0));
    }

    #[test]
    fn test_swath_edges() {
        let mut view = Array2::from_elem((3, 6), 20.0_f32);
        view[[0, 2]] = 3.0;
        view[[0, 3]] = 8.9;
        view[[1, 0]] = 0.0;
        view[[2, 4]] = NO_DATA;

        let (start, end) = swath_edges(&view, 9.0);
        assert_eq!(start, vec![2, 0, -1]);
        assert_eq!(end, vec![3, 0, -1]);
    }

    #[test]
    fn test_boxline_averages_and_rounds() {
        // row 1 recorded two adjacent columns, 4 and 5
        let track = bookkeeping(&[(3.0, 1.0), (9.0, 2.0), (5.0, 1.0)]);
        let view = Array2::from_elem((3, 10), 1.0_f32);

        let boxline = TrackBisector::new(9.0).build_boxline(&view, &track);
        assert_eq!(boxline[0].bisection_index, 3);
        assert_eq!(boxline[1].bisection_index, 5); // 4.5 rounds up
        assert_eq!(boxline[1].n_points, 2);
        assert_eq!(boxline[2].bisection_index, 5);
    }

    #[test]
    fn test_boxline_gap_carry_forward() {
        // leading and interior gaps both inherit the nearest valid row
        let track = bookkeeping(&[
            (0.0, 0.0),
            (4.0, 1.0),
            (0.0, 0.0),
            (0.0, 0.0),
            (8.0, 1.0),
        ]);
        let view = Array2::from_elem((5, 10), 1.0_f32);

        let boxline = TrackBisector::new(9.0).build_boxline(&view, &track);
        assert_eq!(boxline[0].bisection_index, 4); // leading gap, not row 4's value
        assert_eq!(boxline[2].bisection_index, 4); // nearer to row 1
        assert_eq!(boxline[3].bisection_index, 8); // nearer to row 4
        assert_eq!(boxline[0].n_points, 0);
    }

    #[test]
    fn test_boxline_midline_fallback() {
        let track = bookkeeping(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0)]);
        let view = Array2::from_elem((3, 11), 1.0_f32);

        let boxline = TrackBisector::new(9.0).build_boxline(&view, &track);
        for b in &boxline {
            assert_eq!(b.bisection_index, 5);
            assert_eq!(b.n_points, 0);
        }
    }

    #[test]
    fn test_boxline_invariant_bisection_within_swath() {
        let track = bookkeeping(&[(9.0, 1.0), (2.0, 1.0)]);
        let mut view = Array2::from_elem((2, 10), 20.0_f32);
        // swath only covers columns 3..=6
        for r in 0..2 {
            for c in 3..=6 {
                view[[r, c]] = 2.0;
            }
        }

        let boxline = TrackBisector::new(9.0).build_boxline(&view, &track);
        for b in &boxline {
            if b.n_points > 0 {
                assert!(b.start_index <= b.bisection_index);
                assert!(b.bisection_index <= b.end_index);
            }
        }
    }
}
