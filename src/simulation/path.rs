//! Ship path curve
//!
//! The path is a uniform cubic B-spline over a control polygon, stored as
//! the equivalent chain of cubic Bezier segments. A single global parameter
//! in [0, 1] runs over the whole chain.

use cgmath::{InnerSpace, Vector3};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("a {kind} B-spline needs at least {needed} control points, got {got}")]
    TooFewControlPoints {
        kind: &'static str,
        needed: usize,
        got: usize,
    },
}

/// Parametric curve queried by the path frame and the overlays
pub trait PathCurve {
    /// Point at global parameter `t` in [0, 1]
    fn position(&self, t: f32) -> Vector3<f32>;

    /// Derivative of [`position`](Self::position) with respect to `t`
    fn tangent(&self, t: f32) -> Vector3<f32>;

    /// `count` evenly spaced parameter samples from 0 to 1 inclusive
    fn sample(&self, count: usize) -> Vec<Vector3<f32>> {
        let count = count.max(2);
        (0..count)
            .map(|i| self.position(i as f32 / (count - 1) as f32))
            .collect()
    }

    /// Moves `t` forward by roughly `distance` along the curve, wrapping at 1
    ///
    /// Uses the local speed `|dP/dt|`, so constant `distance` gives a
    /// near-constant world-space pace regardless of parameterization.
    fn advance_parameter(&self, t: f32, distance: f32) -> f32 {
        let speed = self.tangent(t).magnitude();
        if speed <= f32::EPSILON {
            return t;
        }
        let next = t + distance / speed;
        if next >= 1.0 || next < 0.0 {
            next.rem_euclid(1.0)
        } else {
            next
        }
    }
}

/// Chain of cubic Bezier segments sharing end points
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseBezier {
    /// `3 * segments + 1` points; segment `i` uses `[3i, 3i + 3]`
    control_points: Vec<Vector3<f32>>,
}

impl PiecewiseBezier {
    /// Converts a uniform cubic B-spline control polygon
    ///
    /// A closed polygon of `n >= 3` points yields `n` segments and a
    /// periodic curve; an open one of `n >= 4` points yields `n - 3`.
    pub fn from_control_polygon(polygon: &[Vector3<f32>], closed: bool) -> Result<Self, CurveError> {
        let n = polygon.len();
        let (needed, segments) = if closed { (3, n) } else { (4, n.saturating_sub(3)) };
        if n < needed {
            return Err(CurveError::TooFewControlPoints {
                kind: if closed { "closed" } else { "open" },
                needed,
                got: n,
            });
        }

        let point = |i: usize| polygon[i % n];
        let mut control_points = Vec::with_capacity(3 * segments + 1);
        for i in 0..segments {
            let (d0, d1, d2, d3) = (point(i), point(i + 1), point(i + 2), point(i + 3));
            if i == 0 {
                control_points.push((d0 + d1 * 4.0 + d2) / 6.0);
            }
            control_points.push((d1 * 2.0 + d2) / 3.0);
            control_points.push((d1 + d2 * 2.0) / 3.0);
            control_points.push((d1 + d2 * 4.0 + d3) / 6.0);
        }

        Ok(Self { control_points })
    }

    pub fn segment_count(&self) -> usize {
        (self.control_points.len() - 1) / 3
    }

    /// The Bezier control points, drawn as the control polygon overlay
    pub fn bezier_control_points(&self) -> &[Vector3<f32>] {
        &self.control_points
    }

    /// Segment index and local parameter for a global `t`
    fn locate(&self, t: f32) -> (usize, f32) {
        let segments = self.segment_count();
        let scaled = t.clamp(0.0, 1.0) * segments as f32;
        let index = (scaled.floor() as usize).min(segments - 1);
        (index, scaled - index as f32)
    }

    fn segment(&self, index: usize) -> [Vector3<f32>; 4] {
        let base = 3 * index;
        [
            self.control_points[base],
            self.control_points[base + 1],
            self.control_points[base + 2],
            self.control_points[base + 3],
        ]
    }
}

impl PathCurve for PiecewiseBezier {
    fn position(&self, t: f32) -> Vector3<f32> {
        let (index, u) = self.locate(t);
        let [b0, b1, b2, b3] = self.segment(index);
        let v = 1.0 - u;
        b0 * (v * v * v) + b1 * (3.0 * v * v * u) + b2 * (3.0 * v * u * u) + b3 * (u * u * u)
    }

    fn tangent(&self, t: f32) -> Vector3<f32> {
        let (index, u) = self.locate(t);
        let [b0, b1, b2, b3] = self.segment(index);
        let v = 1.0 - u;
        let local = (b1 - b0) * (3.0 * v * v) + (b2 - b1) * (6.0 * v * u) + (b3 - b2) * (3.0 * u * u);
        local * self.segment_count() as f32
    }
}
