//! Tuning-table interpolation over non-uniform axes.
//!
//! The fuel and spark maps are immutable 2-D grids sampled on strictly
//! increasing axis vectors. Queries clamp to the axis range and return a
//! bilinear blend of the surrounding cell; a 3-D trilinear variant exists
//! for maps with a third input (e.g. a future IAT correction axis).
//!
//! Degenerate boundary queries are deterministic: an exact hit on an axis
//! breakpoint selects the lower cell. A length-1 axis collapses that
//! dimension and returns the sole row/column unchanged.

/// Locate the lower cell edge for `v` on `axis` and the blend fraction
/// within the cell. Out-of-range values clamp to the end cells, so the
/// fraction is always in `[0, 1]`.
fn axis_pos(axis: &[f32], v: f32) -> (usize, f32) {
    if axis.len() < 2 {
        return (0, 0.0);
    }
    let v = v.clamp(axis[0], axis[axis.len() - 1]);

    // Greatest i with axis[i] <= v, kept below the last breakpoint so
    // i + 1 is always a valid corner. Exact hits land on the lower cell.
    let mut i = 0;
    while i + 2 < axis.len() && v >= axis[i + 1] {
        i += 1;
    }

    let span = axis[i + 1] - axis[i];
    (i, (v - axis[i]) / span)
}

fn assert_axis(axis: &[f32]) {
    debug_assert!(!axis.is_empty(), "table axis must not be empty");
    debug_assert!(
        axis.windows(2).all(|w| w[0] < w[1]),
        "table axis must be strictly increasing"
    );
}

// ---------------------------------------------------------------------------
// 2-D tables
// ---------------------------------------------------------------------------

/// Immutable 2-D lookup table. `data` is row-major over `ys`:
/// `data[j * xs.len() + i]` is the sample at `(xs[i], ys[j])`.
#[derive(Debug, Clone, Copy)]
pub struct Table2d<'a> {
    xs: &'a [f32],
    ys: &'a [f32],
    data: &'a [f32],
}

impl<'a> Table2d<'a> {
    pub fn new(xs: &'a [f32], ys: &'a [f32], data: &'a [f32]) -> Self {
        assert_axis(xs);
        assert_axis(ys);
        debug_assert_eq!(data.len(), xs.len() * ys.len());
        Self { xs, ys, data }
    }

    #[inline]
    fn at(&self, xi: usize, yi: usize) -> f32 {
        self.data[yi * self.xs.len() + xi]
    }

    /// Bilinear interpolation at `(x, y)`, clamped to the grid edges.
    pub fn lookup(&self, x: f32, y: f32) -> f32 {
        let (i, tx) = axis_pos(self.xs, x);
        let (j, ty) = axis_pos(self.ys, y);
        let i1 = (i + 1).min(self.xs.len() - 1);
        let j1 = (j + 1).min(self.ys.len() - 1);

        let d00 = self.at(i, j);
        let d10 = self.at(i1, j);
        let d01 = self.at(i, j1);
        let d11 = self.at(i1, j1);

        d00 * (1.0 - tx) * (1.0 - ty)
            + d10 * tx * (1.0 - ty)
            + d01 * (1.0 - tx) * ty
            + d11 * tx * ty
    }
}

// ---------------------------------------------------------------------------
// 3-D tables
// ---------------------------------------------------------------------------

/// Immutable 3-D lookup table. `data` is laid out z-major:
/// `data[(k * ys.len() + j) * xs.len() + i]` samples `(xs[i], ys[j], zs[k])`.
#[derive(Debug, Clone, Copy)]
pub struct Table3d<'a> {
    xs: &'a [f32],
    ys: &'a [f32],
    zs: &'a [f32],
    data: &'a [f32],
}

impl<'a> Table3d<'a> {
    pub fn new(xs: &'a [f32], ys: &'a [f32], zs: &'a [f32], data: &'a [f32]) -> Self {
        assert_axis(xs);
        assert_axis(ys);
        assert_axis(zs);
        debug_assert_eq!(data.len(), xs.len() * ys.len() * zs.len());
        Self { xs, ys, zs, data }
    }

    #[inline]
    fn at(&self, xi: usize, yi: usize, zi: usize) -> f32 {
        self.data[(zi * self.ys.len() + yi) * self.xs.len() + xi]
    }

    /// Trilinear interpolation at `(x, y, z)`, clamped to the grid edges.
    pub fn lookup(&self, x: f32, y: f32, z: f32) -> f32 {
        let (i, tx) = axis_pos(self.xs, x);
        let (j, ty) = axis_pos(self.ys, y);
        let (k, tz) = axis_pos(self.zs, z);
        let i1 = (i + 1).min(self.xs.len() - 1);
        let j1 = (j + 1).min(self.ys.len() - 1);
        let k1 = (k + 1).min(self.zs.len() - 1);

        let front = self.at(i, j, k) * (1.0 - tx) * (1.0 - ty)
            + self.at(i1, j, k) * tx * (1.0 - ty)
            + self.at(i, j1, k) * (1.0 - tx) * ty
            + self.at(i1, j1, k) * tx * ty;
        let back = self.at(i, j, k1) * (1.0 - tx) * (1.0 - ty)
            + self.at(i1, j, k1) * tx * (1.0 - ty)
            + self.at(i, j1, k1) * (1.0 - tx) * ty
            + self.at(i1, j1, k1) * tx * ty;

        front * (1.0 - tz) + back * tz
    }
}
