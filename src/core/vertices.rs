//! Sparse vertex selection across the satellite swath.
//!
//! Places a small grid of sample locations ("coordinator") over the scene,
//! pinned to the satellite track bi-section so the expensive evaluations
//! land where the interpolated fields bend the most.

use crate::core::track::first_and_last;
use crate::geo::GeodeticProjector;
use crate::types::{BoxLine, Coordinator, GridError, GridResult, TrackIntersection};

/// Evenly spaced integer samples with a pinned midpoint.
///
/// Samples run from `start` up to (but excluding) `midpoint`, then from
/// `midpoint` to `stop` inclusive, so the midpoint is always emitted
/// exactly. The two halves are intentionally asymmetric when `num` does not
/// split evenly around the midpoint; they also rebalance when one side is
/// too narrow to host its share of distinct values, so the output is
/// strictly increasing whenever `stop - start + 1 >= num`.
///
/// ```
/// use swathgrid::core::vertices::asymmetric_linspace;
///
/// assert_eq!(asymmetric_linspace(10, 20, 5, 18), vec![10, 14, 18, 19, 20]);
/// ```
pub fn asymmetric_linspace(start: i64, stop: i64, num: usize, midpoint: i64) -> Vec<i64> {
    if num == 0 {
        return Vec::new();
    }
    if num == 1 || stop <= start {
        return vec![midpoint.clamp(start, stop.max(start))];
    }

    let mid = midpoint.clamp(start, stop);
    let mut n_front = num / 2;
    let mut n_back = num - n_front;

    // rebalance so each half can hold its points distinctly
    let front_capacity = (mid - start) as usize;
    let back_capacity = (stop - mid + 1) as usize;
    if n_front > front_capacity {
        n_front = front_capacity;
        n_back = num - n_front;
    }
    if n_back > back_capacity {
        n_back = back_capacity;
        n_front = num - n_back;
    }

    let mut samples = Vec::with_capacity(num);

    if n_front > 0 {
        let step = (mid - start) as f64 / n_front as f64;
        for k in 0..n_front {
            samples.push(start + (k as f64 * step).floor() as i64);
        }
    }
    if n_back == 1 {
        samples.push(mid);
    } else if n_back > 1 {
        let step = (stop - mid) as f64 / (n_back - 1) as f64;
        for k in 0..n_back {
            samples.push(mid + (k as f64 * step).floor() as i64);
        }
    }

    samples
}

/// Classify how the satellite track intersects the raster rows.
///
/// Partial tracks report the interior row where the track starts or stops;
/// when the track both appears and disappears mid-scene the first interior
/// boundary is reported.
pub fn classify_track(boxline: &[BoxLine]) -> TrackIntersection {
    let rows = boxline.len();
    let (first, last) = first_and_last(boxline.iter().map(|b| b.n_points > 0));

    if first < 0 {
        return TrackIntersection::Empty;
    }

    let first = first as usize;
    let last = last as usize;
    if first == 0 && last == rows - 1 {
        TrackIntersection::Full
    } else if first != 0 {
        TrackIntersection::Partial {
            boundary_row: first,
        }
    } else {
        TrackIntersection::Partial { boundary_row: last }
    }
}

/// Selects the sparse coordinator grid from the BoxLine table.
#[derive(Debug, Clone)]
pub struct VertexSampler {
    /// Vertex grid shape as (rows, cols); cols must be odd so one column
    /// lands exactly on the bisection line
    vertices: (usize, usize),
}

impl VertexSampler {
    pub fn new(vertex_rows: usize, vertex_cols: usize) -> GridResult<Self> {
        if vertex_rows < 2 || vertex_cols < 2 {
            return Err(GridError::InvalidVertices(format!(
                "vertex grid must be at least 2x3, got {}x{}",
                vertex_rows, vertex_cols
            )));
        }
        if vertex_cols % 2 == 0 {
            return Err(GridError::InvalidVertices(format!(
                "vertex columns must be odd so one column lands on the bisection line, got {}",
                vertex_cols
            )));
        }

        Ok(Self {
            vertices: (vertex_rows, vertex_cols),
        })
    }

    /// Sample locations across the scene, pinned to the track bi-section.
    ///
    /// The representative mid row (the track boundary row for partial
    /// intersections, the vertical midline otherwise) is always sampled
    /// exactly rather than interpolated across, because curvature is
    /// highest near the track discontinuity.
    pub fn sample(
        &self,
        projector: &GeodeticProjector,
        boxline: &[BoxLine],
    ) -> GridResult<Vec<Coordinator>> {
        let geobox = projector.geobox();
        let (rows, cols) = geobox.shape();
        let (v_rows, v_cols) = self.vertices;

        if rows < v_rows || cols < v_cols {
            return Err(GridError::InvalidVertices(format!(
                "vertex grid {}x{} exceeds acquisition dimensions {}x{}",
                v_rows, v_cols, rows, cols
            )));
        }
        if boxline.len() != rows {
            return Err(GridError::InvalidShape(format!(
                "boxline has {} rows, raster has {}",
                boxline.len(),
                rows
            )));
        }

        let intersection = classify_track(boxline);
        let mid_row = match intersection {
            TrackIntersection::Partial { boundary_row } => boundary_row,
            TrackIntersection::Full | TrackIntersection::Empty => rows / 2,
        };
        log::debug!(
            "Track intersection {:?}, representative row {}",
            intersection,
            mid_row
        );

        let grid_rows =
            asymmetric_linspace(0, rows as i64 - 1, v_rows, mid_row as i64);

        let mut coordinator = Vec::with_capacity(v_rows * v_cols);
        for &gr in &grid_rows {
            let line = &boxline[gr as usize];

            let (start, end, centre) = if line.n_points > 0 && line.start_index >= 0 {
                (line.start_index, line.end_index, line.bisection_index)
            } else {
                (0, cols as i64 - 1, (cols / 2) as i64)
            };
            // a swath too narrow to host the vertex columns distinctly
            // widens to the full row
            let (start, end) = if end - start + 1 < v_cols as i64 {
                (0, cols as i64 - 1)
            } else {
                (start, end)
            };

            let grid_cols =
                asymmetric_linspace(start, end, v_cols, centre.clamp(start, end));

            for &gc in &grid_cols {
                let (lon, lat) = projector.pixel_to_lonlat(gr as f64, gc as f64)?;
                let (map_x, map_y) = projector.pixel_to_map(gr as f64, gc as f64);
                coordinator.push(Coordinator {
                    row_index: gr,
                    col_index: gc,
                    latitude: lat,
                    longitude: lon,
                    map_y,
                    map_x,
                });
            }
        }

        log::info!(
            "Coordinator sampled: {} vertices over {}x{} raster",
            coordinator.len(),
            rows,
            cols
        );

        Ok(coordinator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxline_row(row: i64, bisection: i64, n: i64, start: i64, end: i64) -> BoxLine {
        BoxLine {
            row_index: row,
            bisection_index: bisection,
            n_points: n,
            start_index: start,
            end_index: end,
        }
    }

    #[test]
    fn test_asymmetric_linspace_doctest_case() {
        assert_eq!(asymmetric_linspace(10, 20, 5, 18), vec![10, 14, 18, 19, 20]);
    }

    #[test]
    fn test_asymmetric_linspace_midpoint_always_present() {
        for midpoint in 0..50 {
            let samples = asymmetric_linspace(0, 49, 7, midpoint);
            assert!(
                samples.contains(&midpoint),
                "midpoint {} missing from {:?}",
                midpoint,
                samples
            );
        }
    }

    #[test]
    fn test_asymmetric_linspace_strictly_increasing() {
        for midpoint in [0, 1, 3, 24, 48, 49] {
            let samples = asymmetric_linspace(0, 49, 9, midpoint);
            assert_eq!(samples.len(), 9);
            for w in samples.windows(2) {
                assert!(w[0] < w[1], "not increasing at midpoint {}: {:?}", midpoint, samples);
            }
            assert_eq!(samples[0], 0);
            assert_eq!(*samples.last().unwrap(), 49);
        }
    }

    #[test]
    fn test_asymmetric_linspace_even_count() {
        let samples = asymmetric_linspace(10, 20, 4, 18);
        assert_eq!(samples.len(), 4);
        assert!(samples.contains(&18));
    }

    #[test]
    fn test_classify_track() {
        let full: Vec<BoxLine> = (0..5)
            .map(|r| boxline_row(r, 3, 1, 0, 9))
            .collect();
        assert_eq!(classify_track(&full), TrackIntersection::Full);

        let mut partial = full.clone();
        partial[0].n_points = 0;
        partial[1].n_points = 0;
        assert_eq!(
            classify_track(&partial),
            TrackIntersection::Partial { boundary_row: 2 }
        );

        let mut tail = full.clone();
        tail[3].n_points = 0;
        tail[4].n_points = 0;
        assert_eq!(
            classify_track(&tail),
            TrackIntersection::Partial { boundary_row: 2 }
        );

        let empty: Vec<BoxLine> = (0..5)
            .map(|r| boxline_row(r, 3, 0, -1, -1))
            .collect();
        assert_eq!(classify_track(&empty), TrackIntersection::Empty);
    }

    #[test]
    fn test_vertex_sampler_validation() {
        assert!(VertexSampler::new(3, 3).is_ok());
        assert!(VertexSampler::new(3, 4).is_err());
        assert!(VertexSampler::new(1, 3).is_err());
    }
}
