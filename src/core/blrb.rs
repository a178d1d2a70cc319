//! Bilinear recursive bisection (BLRB) reconstruction.
//!
//! Fills a dense 2D grid from exact evaluations at a bounded number of
//! points: blocks are subdivided quad-tree style down to a recursion depth,
//! corner values are evaluated exactly and the interior is filled by
//! separable bilinear interpolation. At depth `d` the evaluator is called
//! O(4^d) times instead of once per pixel.

use crate::types::{Coordinator, GridError, GridResult};
use ndarray::{s, Array2};
use std::collections::HashMap;

/// A point evaluator supplying exact values at raster locations.
///
/// Implementations are expected to be pure: the same (row, col) may be
/// evaluated more than once across sibling quadrants and must return the
/// same value each time. Errors are propagated uncaught by the
/// interpolation drivers; a failing evaluator signals corrupt input data,
/// not a condition to mask.
pub trait Evaluator {
    fn evaluate(&self, row: usize, col: usize) -> GridResult<f64>;
}

/// Lookup strategy over per-vertex values computed out-of-band.
///
/// The expensive model runs at the coordinator locations before the
/// reconstruction is invoked; asking for a location that was never sampled
/// is an error.
#[derive(Debug, Clone)]
pub struct VertexLookupEvaluator {
    values: HashMap<(usize, usize), f64>,
}

impl VertexLookupEvaluator {
    pub fn new(values: HashMap<(usize, usize), f64>) -> Self {
        Self { values }
    }

    /// Pair the coordinator table with the model results it was sampled for.
    pub fn from_coordinators(coordinators: &[Coordinator], values: &[f64]) -> GridResult<Self> {
        if coordinators.len() != values.len() {
            return Err(GridError::InvalidShape(format!(
                "{} coordinator locations but {} vertex values",
                coordinators.len(),
                values.len()
            )));
        }

        let mut map = HashMap::with_capacity(values.len());
        for (c, &v) in coordinators.iter().zip(values) {
            if c.row_index < 0 || c.col_index < 0 {
                return Err(GridError::InvalidShape(format!(
                    "negative coordinator location ({}, {})",
                    c.row_index, c.col_index
                )));
            }
            map.insert((c.row_index as usize, c.col_index as usize), v);
        }

        Ok(Self::new(map))
    }
}

impl Evaluator for VertexLookupEvaluator {
    fn evaluate(&self, row: usize, col: usize) -> GridResult<f64> {
        self.values
            .get(&(row, col))
            .copied()
            .ok_or(GridError::MissingVertex { row, col })
    }
}

/// The four corner locations of one block, as (row, col) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CornerPoints {
    pub ul: (usize, usize),
    pub ur: (usize, usize),
    pub ll: (usize, usize),
    pub lr: (usize, usize),
}

/// Corner quadruples of the four sub-blocks of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadrants {
    pub ul: CornerPoints,
    pub ur: CornerPoints,
    pub ll: CornerPoints,
    pub lr: CornerPoints,
}

/// Inclusive pixel bounding box of a block: (row_min, row_max, col_min, col_max).
pub fn indices(origin: (usize, usize), shape: (usize, usize)) -> (usize, usize, usize, usize) {
    (
        origin.0,
        origin.0 + shape.0 - 1,
        origin.1,
        origin.1 + shape.1 - 1,
    )
}

/// Split a block into four quadrant corner-quadruples at its midpoint
/// (floor division for odd extents). Sibling quadrants share the midpoint
/// row and column.
pub fn subdivide(origin: (usize, usize), shape: (usize, usize)) -> Quadrants {
    let (r0, r_end, c0, c_end) = indices(origin, shape);
    let r_mid = r0 + shape.0 / 2;
    let c_mid = c0 + shape.1 / 2;

    Quadrants {
        ul: CornerPoints {
            ul: (r0, c0),
            ur: (r0, c_mid),
            ll: (r_mid, c0),
            lr: (r_mid, c_mid),
        },
        ur: CornerPoints {
            ul: (r0, c_mid),
            ur: (r0, c_end),
            ll: (r_mid, c_mid),
            lr: (r_mid, c_end),
        },
        ll: CornerPoints {
            ul: (r_mid, c0),
            ur: (r_mid, c_mid),
            ll: (r_end, c0),
            lr: (r_end, c_mid),
        },
        lr: CornerPoints {
            ul: (r_mid, c_mid),
            ur: (r_mid, c_end),
            ll: (r_end, c_mid),
            lr: (r_end, c_end),
        },
    }
}

/// The four sub-blocks of a block as (origin, shape) pairs, in
/// UL, UR, LL, LR order. Sub-blocks overlap on the shared midpoint row
/// and column.
fn child_blocks(
    origin: (usize, usize),
    shape: (usize, usize),
) -> [((usize, usize), (usize, usize)); 4] {
    let (r0, c0) = origin;
    let (h, w) = shape;
    let (hh, hw) = (h / 2, w / 2);
    let (r_mid, c_mid) = (r0 + hh, c0 + hw);

    [
        ((r0, c0), (hh + 1, hw + 1)),
        ((r0, c_mid), (hh + 1, w - hw)),
        ((r_mid, c0), (h - hh, hw + 1)),
        ((r_mid, c_mid), (h - hh, w - hw)),
    ]
}

/// Dense block from its four corner values via separable linear
/// interpolation. Exact at all four corners; a constant field stays
/// constant. Corner argument order matches the block layout UL, UR, LR, LL.
pub fn bilinear(shape: (usize, usize), v_ul: f64, v_ur: f64, v_lr: f64, v_ll: f64) -> Array2<f64> {
    let (rows, cols) = shape;
    let mut out = Array2::zeros(shape);

    for i in 0..rows {
        let fy = if rows > 1 {
            i as f64 / (rows - 1) as f64
        } else {
            0.0
        };
        let left = v_ul + (v_ll - v_ul) * fy;
        let right = v_ur + (v_lr - v_ur) * fy;

        for j in 0..cols {
            let fx = if cols > 1 {
                j as f64 / (cols - 1) as f64
            } else {
                0.0
            };
            out[[i, j]] = left + (right - left) * fx;
        }
    }

    out
}

fn terminal(shape: (usize, usize), depth: usize) -> bool {
    depth == 0 || shape.0 <= 2 || shape.1 <= 2
}

/// Work-stack driver writing every terminal block into `result`.
///
/// `base` is subtracted from absolute block coordinates before writing, so
/// the same routine serves both the block-local and the in-place grid entry
/// points. Shared boundary pixels between sibling blocks are recomputed to
/// identical values, so write order does not matter.
fn fill_region<E: Evaluator + ?Sized>(
    result: &mut Array2<f64>,
    base: (usize, usize),
    origin: (usize, usize),
    shape: (usize, usize),
    evaluator: &E,
    depth: usize,
) -> GridResult<()> {
    let mut stack = vec![(origin, shape, depth)];

    while let Some((org, shp, d)) = stack.pop() {
        if terminal(shp, d) {
            let (r0, r1, c0, c1) = indices(org, shp);
            let f_ul = evaluator.evaluate(r0, c0)?;
            let f_ur = evaluator.evaluate(r0, c1)?;
            let f_ll = evaluator.evaluate(r1, c0)?;
            let f_lr = evaluator.evaluate(r1, c1)?;

            let block = bilinear(shp, f_ul, f_ur, f_lr, f_ll);
            let ro = org.0 - base.0;
            let co = org.1 - base.1;
            result
                .slice_mut(s![ro..ro + shp.0, co..co + shp.1])
                .assign(&block);
        } else {
            // push in reverse so blocks are processed, and shared
            // boundaries last written, in UL, UR, LL, LR order
            for (child_origin, child_shape) in child_blocks(org, shp).into_iter().rev() {
                stack.push((child_origin, child_shape, d - 1));
            }
        }
    }

    Ok(())
}

/// Reconstruct one block as a dense array.
///
/// Evaluator coordinates are absolute raster coordinates; the returned
/// array is indexed relative to `origin`.
pub fn interpolate_block<E: Evaluator + ?Sized>(
    origin: (usize, usize),
    shape: (usize, usize),
    evaluator: &E,
    depth: usize,
) -> GridResult<Array2<f64>> {
    if shape.0 == 0 || shape.1 == 0 {
        return Err(GridError::InvalidShape(format!(
            "cannot interpolate an empty block of shape {:?}",
            shape
        )));
    }

    let mut result = Array2::zeros(shape);
    fill_region(&mut result, origin, origin, shape, evaluator, depth)?;
    Ok(result)
}

/// Fill a window of a pre-allocated dense array in place.
///
/// Two calls with the same evaluator and depth produce bit-identical
/// results.
pub fn interpolate_grid<E: Evaluator + ?Sized>(
    result: &mut Array2<f64>,
    evaluator: &E,
    depth: usize,
    origin: (usize, usize),
    shape: (usize, usize),
) -> GridResult<()> {
    let dim = result.dim();
    if shape.0 == 0 || shape.1 == 0 {
        return Err(GridError::InvalidShape(format!(
            "cannot interpolate an empty window of shape {:?}",
            shape
        )));
    }
    if origin.0 + shape.0 > dim.0 || origin.1 + shape.1 > dim.1 {
        return Err(GridError::InvalidShape(format!(
            "window {:?} at {:?} exceeds grid dimensions {:?}",
            shape, origin, dim
        )));
    }

    log::debug!(
        "Interpolating {}x{} window at {:?}, depth {}",
        shape.0,
        shape.1,
        origin,
        depth
    );
    fill_region(result, (0, 0), origin, shape, evaluator, depth)
}

/// Fork-join variant of [`interpolate_block`].
///
/// Sibling quadrants are pure functions of the evaluator and block
/// geometry: each writes a disjoint interior and recomputes the shared
/// boundary pixels to identical values, so the result is bit-identical to
/// the sequential driver.
#[cfg(feature = "parallel")]
pub fn interpolate_block_parallel<E>(
    origin: (usize, usize),
    shape: (usize, usize),
    evaluator: &E,
    depth: usize,
) -> GridResult<Array2<f64>>
where
    E: Evaluator + Sync,
{
    if shape.0 == 0 || shape.1 == 0 {
        return Err(GridError::InvalidShape(format!(
            "cannot interpolate an empty block of shape {:?}",
            shape
        )));
    }

    par_block(origin, shape, evaluator, depth)
}

#[cfg(feature = "parallel")]
fn par_block<E>(
    origin: (usize, usize),
    shape: (usize, usize),
    evaluator: &E,
    depth: usize,
) -> GridResult<Array2<f64>>
where
    E: Evaluator + Sync,
{
    if terminal(shape, depth) {
        let (r0, r1, c0, c1) = indices(origin, shape);
        let f_ul = evaluator.evaluate(r0, c0)?;
        let f_ur = evaluator.evaluate(r0, c1)?;
        let f_ll = evaluator.evaluate(r1, c0)?;
        let f_lr = evaluator.evaluate(r1, c1)?;
        return Ok(bilinear(shape, f_ul, f_ur, f_lr, f_ll));
    }

    let blocks = child_blocks(origin, shape);
    let ((b_ul, b_ur), (b_ll, b_lr)) = rayon::join(
        || {
            rayon::join(
                || par_block(blocks[0].0, blocks[0].1, evaluator, depth - 1),
                || par_block(blocks[1].0, blocks[1].1, evaluator, depth - 1),
            )
        },
        || {
            rayon::join(
                || par_block(blocks[2].0, blocks[2].1, evaluator, depth - 1),
                || par_block(blocks[3].0, blocks[3].1, evaluator, depth - 1),
            )
        },
    );

    let mut out = Array2::zeros(shape);
    for ((child_origin, child_shape), sub) in blocks.into_iter().zip([b_ul?, b_ur?, b_ll?, b_lr?]) {
        let ro = child_origin.0 - origin.0;
        let co = child_origin.1 - origin.1;
        out.slice_mut(s![ro..ro + child_shape.0, co..co + child_shape.1])
            .assign(&sub);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    struct FnEval(fn(usize, usize) -> f64);

    impl Evaluator for FnEval {
        fn evaluate(&self, row: usize, col: usize) -> GridResult<f64> {
            Ok((self.0)(row, col))
        }
    }

    struct FailingEval;

    impl Evaluator for FailingEval {
        fn evaluate(&self, row: usize, col: usize) -> GridResult<f64> {
            Err(GridError::Geometry(format!("bad pixel ({}, {})", row, col)))
        }
    }

    #[test]
    fn test_indices() {
        assert_eq!(indices((0, 0), (16, 32)), (0, 15, 0, 31));
        assert_eq!(indices((2, 3), (3, 4)), (2, 4, 3, 6));
    }

    #[test]
    fn test_subdivide() {
        let q = subdivide((0, 0), (16, 32));
        assert_eq!(
            q.ul,
            CornerPoints {
                ul: (0, 0),
                ur: (0, 16),
                ll: (8, 0),
                lr: (8, 16)
            }
        );
        assert_eq!(
            q.ur,
            CornerPoints {
                ul: (0, 16),
                ur: (0, 31),
                ll: (8, 16),
                lr: (8, 31)
            }
        );
        assert_eq!(
            q.ll,
            CornerPoints {
                ul: (8, 0),
                ur: (8, 16),
                ll: (15, 0),
                lr: (15, 16)
            }
        );
        assert_eq!(
            q.lr,
            CornerPoints {
                ul: (8, 16),
                ur: (8, 31),
                ll: (15, 16),
                lr: (15, 31)
            }
        );
    }

    #[test]
    fn test_bilinear_constant_field() {
        let x = std::f64::consts::PI;
        let a = bilinear((5, 5), x, x, x, x);
        for v in a.iter() {
            assert_eq!(*v, x);
        }
    }

    #[test]
    fn test_bilinear_corner_exactness() {
        let a = bilinear((5, 5), 0.0, 1.0, 1.0, 0.0);
        assert_eq!(a[[0, 0]], 0.0);
        assert_eq!(a[[0, 4]], 1.0);
        assert_eq!(a[[4, 0]], 0.0);
        assert_eq!(a[[4, 4]], 1.0);
        assert_eq!(a[[2, 2]], 0.5);
    }

    #[test]
    fn test_bilinear_saddle() {
        let a = bilinear((5, 5), 0.0, 1.0, 2.0, 1.0);
        assert_eq!(a[[0, 0]], 0.0);
        assert_eq!(a[[0, 4]], 1.0);
        assert_eq!(a[[4, 0]], 1.0);
        assert_eq!(a[[4, 4]], 2.0);
        assert_eq!(a[[2, 2]], 1.0);
    }

    #[test]
    fn test_bilinear_degenerate_extents() {
        let row = bilinear((1, 4), 0.0, 3.0, 3.0, 0.0);
        assert_eq!(row[[0, 0]], 0.0);
        assert_eq!(row[[0, 3]], 3.0);

        let col = bilinear((4, 1), 0.0, 0.0, 3.0, 3.0);
        assert_eq!(col[[0, 0]], 0.0);
        assert_eq!(col[[3, 0]], 3.0);
    }

    #[test]
    fn test_interpolate_block_product_field() {
        let b = interpolate_block((0, 0), (5, 5), &FnEval(|i, j| (i * j) as f64), 7).unwrap();
        assert_eq!(b[[0, 0]], 0.0);
        assert_eq!(b[[0, 4]], 0.0);
        assert_eq!(b[[4, 0]], 0.0);
        assert_relative_eq!(b[[2, 2]], 4.0, max_relative = 1e-12);
        assert_eq!(b[[4, 4]], 16.0);

        let b = interpolate_block((0, 0), (5, 11), &FnEval(|i, j| (i * j) as f64), 7).unwrap();
        assert_eq!(b[[0, 0]], 0.0);
        assert_eq!(b[[0, 10]], 0.0);
        assert_eq!(b[[4, 0]], 0.0);
        assert_eq!(b[[4, 10]], 40.0);
        assert_relative_eq!(b[[3, 10]], 30.0, max_relative = 1e-12);
        assert_relative_eq!(b[[4, 9]], 36.0, max_relative = 1e-12);
    }

    #[test]
    fn test_interpolate_block_planar_exactness() {
        let f = |i: usize, j: usize| (i + j) as f64;
        let shape = (3, 5);

        let direct = bilinear(shape, f(0, 0), f(0, 4), f(2, 4), f(2, 0));
        let b = interpolate_block((0, 0), shape, &FnEval(|i, j| (i + j) as f64), 7).unwrap();

        for (a, b) in direct.iter().zip(b.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_error_monotone_in_depth() {
        // curvature in both axes, so interpolation error is non-trivial
        fn f(i: usize, j: usize) -> f64 {
            (i as f64).powi(2) * (j as f64).sqrt()
        }

        let shape = (16, 32);
        let mut previous = f64::INFINITY;
        for depth in 0..4 {
            let b = interpolate_block((0, 0), shape, &FnEval(f), depth).unwrap();
            let mut max_err: f64 = 0.0;
            for i in 0..shape.0 {
                for j in 0..shape.1 {
                    max_err = max_err.max((b[[i, j]] - f(i, j)).abs());
                }
            }
            assert!(
                max_err <= previous + 1e-9,
                "error grew from {} to {} at depth {}",
                previous,
                max_err,
                depth
            );
            previous = max_err;
        }
    }

    #[test]
    fn test_interpolate_grid_idempotent() {
        let shape = (20, 17);
        let mut first = Array2::zeros(shape);
        let mut second = Array2::zeros(shape);
        let eval = FnEval(|i, j| (i as f64).sin() + (j as f64).cos());

        interpolate_grid(&mut first, &eval, 3, (0, 0), shape).unwrap();
        interpolate_grid(&mut second, &eval, 3, (0, 0), shape).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_interpolate_grid_window_bounds() {
        let mut grid = Array2::zeros((10, 10));
        let eval = FnEval(|i, j| (i + j) as f64);
        assert!(interpolate_grid(&mut grid, &eval, 2, (4, 4), (10, 10)).is_err());
        assert!(interpolate_grid(&mut grid, &eval, 2, (0, 0), (0, 5)).is_err());
    }

    #[test]
    fn test_evaluator_failure_propagates() {
        let result = interpolate_block((0, 0), (8, 8), &FailingEval, 3);
        assert!(matches!(result, Err(GridError::Geometry(_))));
    }

    #[test]
    fn test_vertex_lookup_evaluator() {
        let mut values = HashMap::new();
        values.insert((0, 0), 1.5);
        values.insert((0, 4), 2.5);
        let eval = VertexLookupEvaluator::new(values);

        assert_eq!(eval.evaluate(0, 0).unwrap(), 1.5);
        assert!(matches!(
            eval.evaluate(3, 3),
            Err(GridError::MissingVertex { row: 3, col: 3 })
        ));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let eval = FnEval(|i, j| (i as f64).powi(2) * (j as f64 + 1.0).ln());
        let sequential = interpolate_block((0, 0), (33, 65), &eval, 5).unwrap();
        let parallel = interpolate_block_parallel((0, 0), (33, 65), &eval, 5).unwrap();
        assert_eq!(sequential, parallel);
    }
}
