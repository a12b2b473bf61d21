use cgmath::{Deg, InnerSpace, Matrix, Matrix3, Matrix4, Rad, SquareMatrix, Vector3};

/// Maps OpenGL clip-space depth [-1, 1] onto wgpu's [0, 1]
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Perspective projection ready for a wgpu depth buffer
pub fn perspective_projection(fovy_degrees: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(fovy_degrees), aspect, near, far)
}

/// Transpose of the inverse of the upper-left 3x3 of `modelview`
///
/// Falls back to the plain upper 3x3 when it is singular.
pub fn normal_matrix(modelview: &Matrix4<f32>) -> Matrix3<f32> {
    let upper = Matrix3::from_cols(
        modelview.x.truncate(),
        modelview.y.truncate(),
        modelview.z.truncate(),
    );
    upper
        .invert()
        .map(|inverse| inverse.transpose())
        .unwrap_or(upper)
}

/// Yaw and pitch in degrees that turn a +Z facing quad at `center` toward `eye`
///
/// Returns zero angles when the eye sits on the center.
pub fn billboard_angles(eye: Vector3<f32>, center: Vector3<f32>) -> (f32, f32) {
    let offset = eye - center;
    if offset.magnitude2() <= f32::EPSILON {
        return (0.0, 0.0);
    }
    let to_camera = offset.normalize();
    let yaw = Deg::from(Rad(to_camera.x.atan2(to_camera.z)));
    let pitch = Deg::from(Rad(-to_camera.y.clamp(-1.0, 1.0).asin()));
    (yaw.0, pitch.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Vector4, Zero};

    const EPS: f32 = 1e-4;

    #[test]
    fn test_billboard_facing_along_z_has_zero_angles() {
        let (yaw, pitch) = billboard_angles(Vector3::new(0.0, 0.0, 7.0), Vector3::zero());
        assert!(yaw.abs() < EPS);
        assert!(pitch.abs() < EPS);
    }

    #[test]
    fn test_billboard_angles_turn_quad_normal_to_eye() {
        let center = Vector3::new(1.0, -2.0, 0.5);
        let eye = Vector3::new(4.0, 3.0, -6.0);
        let (yaw, pitch) = billboard_angles(eye, center);

        let rotation = Matrix4::from_angle_y(Deg(yaw)) * Matrix4::from_angle_x(Deg(pitch));
        let normal = (rotation * Vector4::new(0.0, 0.0, 1.0, 0.0)).truncate();
        assert!((normal - (eye - center).normalize()).magnitude() < EPS);
    }

    #[test]
    fn test_billboard_eye_at_center_is_neutral() {
        assert_eq!(billboard_angles(Vector3::zero(), Vector3::zero()), (0.0, 0.0));
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let modelview = Matrix4::from_nonuniform_scale(2.0, 4.0, 1.0);
        let normal = normal_matrix(&modelview);
        assert!((normal.x.x - 0.5).abs() < EPS);
        assert!((normal.y.y - 0.25).abs() < EPS);
        assert!((normal.z.z - 1.0).abs() < EPS);
    }

    #[test]
    fn test_projection_maps_near_plane_to_zero_depth() {
        let projection = perspective_projection(45.0, 1.5, 0.01, 50.0);
        let near = projection * Vector4::new(0.0, 0.0, -0.01, 1.0);
        let far = projection * Vector4::new(0.0, 0.0, -50.0, 1.0);
        assert!((near.z / near.w).abs() < EPS);
        assert!((far.z / far.w - 1.0).abs() < EPS);
    }
}
