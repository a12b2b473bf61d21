//! Orientation frame that rides along the ship path

use cgmath::{InnerSpace, Matrix4, Vector3, Vector4};

/// Orthonormal frame aligned to a curve tangent
///
/// The normal is either derived from a fixed world-up reference every time
/// the frame is aligned, or carried over from the previous alignment by
/// parallel transport, which avoids sudden flips where the tangent passes
/// close to the reference direction.
#[derive(Debug, Clone, PartialEq)]
pub struct PathFrame {
    tangent: Vector3<f32>,
    normal: Vector3<f32>,
    binormal: Vector3<f32>,
    parallel_transport: bool,
}

const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

impl Default for PathFrame {
    fn default() -> Self {
        Self {
            tangent: Vector3::new(1.0, 0.0, 0.0),
            normal: WORLD_UP,
            binormal: Vector3::new(0.0, 0.0, 1.0),
            parallel_transport: false,
        }
    }
}

impl PathFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tangent(&self) -> Vector3<f32> {
        self.tangent
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.normal
    }

    pub fn binormal(&self) -> Vector3<f32> {
        self.binormal
    }

    pub fn uses_parallel_transport(&self) -> bool {
        self.parallel_transport
    }

    pub fn toggle_parallel_transport(&mut self) -> bool {
        self.parallel_transport = !self.parallel_transport;
        self.parallel_transport
    }

    /// Re-aligns the frame so its first axis follows `tangent`
    ///
    /// A zero tangent leaves the frame unchanged.
    pub fn align_to(&mut self, tangent: Vector3<f32>) {
        if tangent.magnitude2() <= f32::EPSILON * f32::EPSILON {
            return;
        }
        let tangent = tangent.normalize();

        let reference = if self.parallel_transport {
            self.normal
        } else {
            WORLD_UP
        };
        let normal = project_out(reference, tangent)
            .or_else(|| project_out(self.normal, tangent))
            .or_else(|| project_out(Vector3::new(1.0, 0.0, 0.0), tangent))
            .or_else(|| project_out(Vector3::new(0.0, 0.0, 1.0), tangent))
            .unwrap_or(self.normal);

        self.tangent = tangent;
        self.normal = normal;
        self.binormal = tangent.cross(normal);
    }

    /// Transforms placing the unit +X axis segment onto each frame axis
    ///
    /// Returned in tangent, normal, binormal order with red, green and blue
    /// colours.
    pub fn axis_transforms(&self, origin: Vector3<f32>, length: f32) -> [(Matrix4<f32>, Vector4<f32>); 3] {
        let axis = |primary: Vector3<f32>, second: Vector3<f32>, third: Vector3<f32>| {
            Matrix4::from_cols(
                (primary * length).extend(0.0),
                second.extend(0.0),
                third.extend(0.0),
                origin.extend(1.0),
            )
        };
        [
            (
                axis(self.tangent, self.normal, self.binormal),
                Vector4::new(1.0, 0.0, 0.0, 1.0),
            ),
            (
                axis(self.normal, self.binormal, self.tangent),
                Vector4::new(0.0, 1.0, 0.0, 1.0),
            ),
            (
                axis(self.binormal, self.tangent, self.normal),
                Vector4::new(0.0, 0.0, 1.0, 1.0),
            ),
        ]
    }
}

/// `v` with its component along unit `axis` removed, normalized; `None` if
/// nothing is left
fn project_out(v: Vector3<f32>, axis: Vector3<f32>) -> Option<Vector3<f32>> {
    let rest = v - axis * v.dot(axis);
    (rest.magnitude2() > 1e-8).then(|| rest.normalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::path::{PathCurve, PiecewiseBezier};

    const EPS: f32 = 1e-4;

    fn assert_orthonormal(frame: &PathFrame) {
        let (t, n, b) = (frame.tangent(), frame.normal(), frame.binormal());
        for axis in [t, n, b] {
            assert!((axis.magnitude() - 1.0).abs() < EPS);
        }
        assert!(t.dot(n).abs() < EPS);
        assert!(t.dot(b).abs() < EPS);
        assert!(n.dot(b).abs() < EPS);
        assert!((t.cross(n) - b).magnitude() < EPS);
    }

    #[test]
    fn test_fixed_up_frame_keeps_normal_near_world_up() {
        let mut frame = PathFrame::new();
        frame.align_to(Vector3::new(1.0, 0.2, 0.3));

        assert_orthonormal(&frame);
        assert!(frame.normal().dot(WORLD_UP) > 0.9);
    }

    #[test]
    fn test_tangent_parallel_to_up_still_gives_a_frame() {
        let mut frame = PathFrame::new();
        frame.align_to(Vector3::new(0.0, 3.0, 0.0));

        assert_orthonormal(&frame);
        assert!((frame.tangent() - WORLD_UP).magnitude() < EPS);
    }

    #[test]
    fn test_zero_tangent_is_ignored() {
        let mut frame = PathFrame::new();
        frame.align_to(Vector3::new(0.0, 0.0, 1.0));
        let before = frame.clone();

        frame.align_to(Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(frame, before);
    }

    #[test]
    fn test_parallel_transport_stays_orthonormal_along_path() {
        let polygon = [
            Vector3::new(2.0, 2.0, 0.0),
            Vector3::new(3.0, 0.0, 0.0),
            Vector3::new(3.0, 0.0, -2.0),
            Vector3::new(0.0, 2.0, -3.0),
            Vector3::new(-2.0, 2.0, -1.0),
            Vector3::new(-3.0, 3.0, 0.0),
            Vector3::new(-1.0, 1.0, 1.0),
        ];
        let curve = PiecewiseBezier::from_control_polygon(&polygon, true).unwrap();
        let mut frame = PathFrame::new();
        assert!(frame.toggle_parallel_transport());

        let mut previous_normal = None;
        let mut t = 0.0;
        for _ in 0..500 {
            frame.align_to(curve.tangent(t));
            assert_orthonormal(&frame);
            if let Some(previous) = previous_normal {
                // Small steps never flip the normal
                assert!(frame.normal().dot(previous) > 0.9);
            }
            previous_normal = Some(frame.normal());
            t = curve.advance_parameter(t, 0.01);
        }
    }

    #[test]
    fn test_axis_transforms_place_unit_segment_on_axes() {
        let mut frame = PathFrame::new();
        frame.align_to(Vector3::new(0.0, 0.0, 1.0));
        let origin = Vector3::new(1.0, 2.0, 3.0);

        let axes = frame.axis_transforms(origin, 0.5);
        let tip = |m: Matrix4<f32>| (m * Vector4::new(1.0, 0.0, 0.0, 1.0)).truncate();

        assert!((tip(axes[0].0) - (origin + frame.tangent() * 0.5)).magnitude() < EPS);
        assert!((tip(axes[1].0) - (origin + frame.normal() * 0.5)).magnitude() < EPS);
        assert!((tip(axes[2].0) - (origin + frame.binormal() * 0.5)).magnitude() < EPS);
        assert_eq!(axes[0].1, Vector4::new(1.0, 0.0, 0.0, 1.0));
    }
}
