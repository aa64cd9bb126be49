//! 0x60–0x6F Table family (§4.2).
//!
//! Axis values must be monotonically increasing (checked at registration
//! time, see `config`); out-of-range inputs clamp to the endpoint value —
//! no extrapolation.

use super::common::{Inputs, StepCtx, StepOutput};

pub const MAX_POINTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpMode {
    Linear,
    Step,
}

#[derive(Debug, Clone)]
pub struct Table1d {
    pub x: heapless::Vec<i32, MAX_POINTS>,
    pub y: heapless::Vec<i32, MAX_POINTS>,
    pub mode: InterpMode,
}

impl Table1d {
    pub fn lookup(&self, x: i32) -> i32 {
        lookup_1d(&self.x, &self.y, x, self.mode)
    }

    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        self.lookup(inputs.first().copied().unwrap_or(0)).into()
    }
}

/// Shared by `Table1d` and by any other kind needing a 1D breakpoint
/// lookup (e.g. PWM_DUTY's curve shapes).
pub fn lookup_1d(xs: &[i32], ys: &[i32], x: i32, mode: InterpMode) -> i32 {
    if xs.is_empty() {
        return 0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    let last = xs.len() - 1;
    if x >= xs[last] {
        return ys[last];
    }
    for i in 0..last {
        if x >= xs[i] && x <= xs[i + 1] {
            return match mode {
                InterpMode::Step => ys[i],
                InterpMode::Linear => {
                    let (x0, x1, y0, y1) = (xs[i] as i64, xs[i + 1] as i64, ys[i] as i64, ys[i + 1] as i64);
                    let span = x1 - x0;
                    if span == 0 {
                        return ys[i];
                    }
                    (y0 + (x as i64 - x0) * (y1 - y0) / span) as i32
                }
            };
        }
    }
    ys[last]
}

#[derive(Debug, Clone)]
pub struct Table2d {
    pub x: heapless::Vec<i32, MAX_POINTS>,
    pub y: heapless::Vec<i32, MAX_POINTS>,
    /// Row-major: `z[row][col]` where `row` indexes `y` and `col` indexes `x`.
    pub z: heapless::Vec<heapless::Vec<i32, MAX_POINTS>, MAX_POINTS>,
}

impl Table2d {
    pub fn lookup(&self, x: i32, y: i32) -> i32 {
        if self.y.is_empty() || self.x.is_empty() {
            return 0;
        }
        let last = self.y.len() - 1;
        if y <= self.y[0] {
            return lookup_1d(&self.x, &self.z[0], x, InterpMode::Linear);
        }
        if y >= self.y[last] {
            return lookup_1d(&self.x, &self.z[last], x, InterpMode::Linear);
        }
        for row in 0..last {
            if y >= self.y[row] && y <= self.y[row + 1] {
                let r0 = lookup_1d(&self.x, &self.z[row], x, InterpMode::Linear);
                let r1 = lookup_1d(&self.x, &self.z[row + 1], x, InterpMode::Linear);
                let (y0, y1) = (self.y[row] as i64, self.y[row + 1] as i64);
                let span = y1 - y0;
                if span == 0 {
                    return r0;
                }
                return (r0 as i64 + (y as i64 - y0) * (r1 as i64 - r0 as i64) / span) as i32;
            }
        }
        self.z[last].first().copied().unwrap_or(0)
    }

    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0);
        let y = inputs.get(1).copied().unwrap_or(0);
        self.lookup(x, y).into()
    }
}

/// `y = sum(coeffs[i] * x^i) / scale`, evaluated via Horner's method in
/// `i64` to keep headroom for the highest-degree term before the final
/// fixed-point scale-down.
#[derive(Debug, Clone)]
pub struct CurveFit {
    pub coeffs: heapless::Vec<i32, 8>,
    pub scale: i32,
}
impl CurveFit {
    pub fn step(&mut self, inputs: &Inputs, _ctx: StepCtx) -> StepOutput {
        let x = inputs.first().copied().unwrap_or(0) as i64;
        let scale = if self.scale == 0 { 1 } else { self.scale as i64 };
        let mut acc: i64 = 0;
        for coeff in self.coeffs.iter().rev() {
            acc = acc * x / scale + *coeff as i64;
        }
        (acc as i32).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn v(vals: &[i32]) -> heapless::Vec<i32, MAX_POINTS> {
        heapless::Vec::from_slice(vals).unwrap()
    }

    /// §8 S5 — Table_1D clamp scenario.
    #[test]
    fn table_1d_clamp_scenario() {
        let t = Table1d {
            x: v(&[0, 250, 500, 750, 1000]),
            y: v(&[0, 100, 400, 800, 1000]),
            mode: InterpMode::Linear,
        };
        assert_eq!(t.lookup(-50), 0);
        assert_eq!(t.lookup(125), 50);
        assert_eq!(t.lookup(250), 100);
        assert_eq!(t.lookup(625), 600);
        assert_eq!(t.lookup(1500), 1000);
    }

    /// §8 invariant 6: at an axis point, linear and step agree with y[i].
    #[test]
    fn interpolation_agrees_at_axis_points() {
        let linear = Table1d {
            x: v(&[0, 100, 200]),
            y: v(&[0, 50, 200]),
            mode: InterpMode::Linear,
        };
        let step = Table1d {
            x: v(&[0, 100, 200]),
            y: v(&[0, 50, 200]),
            mode: InterpMode::Step,
        };
        for x in [0, 100, 200] {
            assert_eq!(linear.lookup(x), step.lookup(x));
        }
    }

    #[test]
    fn bilinear_interpolates_both_axes() {
        let t = Table2d {
            x: v(&[0, 100]),
            y: v(&[0, 100]),
            z: heapless::Vec::from_slice(&[v(&[0, 100]), v(&[100, 200])]).unwrap(),
        };
        assert_eq!(t.lookup(0, 0), 0);
        assert_eq!(t.lookup(100, 100), 200);
        assert_eq!(t.lookup(50, 50), 100);
    }
}
