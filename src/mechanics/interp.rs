/// Interpolation mechanics: piecewise-linear curves over sampled knots.

/// A curve through `(x, y)` knots with strictly increasing `x`.
/// Between knots it is linear; outside, the first/last segment is
/// extended linearly.
#[derive(Clone, Copy, Debug)]
pub struct Curve<'a> {
    pub xs: &'a [f64],
    pub ys: &'a [f64],
}

impl<'a> Curve<'a> {
    /// `None` unless there are at least two knots, lengths match and `xs`
    /// strictly increases.
    pub fn new(xs: &'a [f64], ys: &'a [f64]) -> Option<Self> {
        if xs.len() < 2 || xs.len() != ys.len() {
            return None;
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return None;
        }
        Some(Self { xs, ys })
    }

    pub fn at(&self, x: f64) -> f64 {
        let n = self.xs.len();
        // Segment whose right knot is the first xs[i] > x, clamped to the ends.
        let hi = self.xs.partition_point(|&k| k <= x).clamp(1, n - 1);
        let lo = hi - 1;
        let (x0, x1) = (self.xs[lo], self.xs[hi]);
        let (y0, y1) = (self.ys[lo], self.ys[hi]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }
}
