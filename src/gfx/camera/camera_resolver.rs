use cgmath::{Deg, InnerSpace, Matrix4, Point3, Vector3};
use log::debug;

use super::{
    camera_mode::{CameraMode, ViewParameters},
    camera_utils::perspective_projection,
};
use crate::{
    config::CameraConfig,
    simulation::{BodyId, BodySystem, Vehicle},
};

const WORLD_UP: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

/// Up vector used when the view direction is parallel to world up
const FALLBACK_UP: Vector3<f32> = Vector3::new(0.0, 0.0, -1.0);

/// Turns the active camera mode and scene state into view and projection
#[derive(Debug, Clone)]
pub struct CameraResolver {
    mode: CameraMode,
    /// Rotation about X of the locked-on eye, degrees
    pub x_angle: f32,
    /// Rotation about Y of the locked-on eye, degrees
    pub y_angle: f32,
    distance_factor: f32,
    min_distance_factor: f32,
    max_distance_factor: f32,
    zoom_step: f32,
    orbit_step: f32,
    free_eye_offset: Vector3<f32>,
    follow_back: f32,
    follow_lift: f32,
    fovy: f32,
    near: f32,
    far: f32,
    aspect: f32,
}

impl CameraResolver {
    pub fn new(config: &CameraConfig) -> Self {
        let mode = match config.initial_target {
            Some(index) => CameraMode::LockedOnBody(BodyId(index)),
            None => CameraMode::FreeOrbitOnSun,
        };
        Self {
            mode,
            x_angle: config.initial_vertical_angle,
            y_angle: config.initial_horizontal_angle,
            distance_factor: config
                .distance_factor
                .clamp(config.min_distance_factor, config.max_distance_factor),
            min_distance_factor: config.min_distance_factor,
            max_distance_factor: config.max_distance_factor,
            zoom_step: config.zoom_step,
            orbit_step: config.orbit_step_degrees,
            free_eye_offset: config.free_eye_offset.into(),
            follow_back: config.follow_back,
            follow_lift: config.follow_lift,
            fovy: config.fovy_degrees,
            near: config.near,
            far: config.far,
            aspect: 1.0,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CameraMode) {
        if self.mode != mode {
            debug!("Camera mode: {}", mode);
        }
        self.mode = mode;
    }

    pub fn distance_factor(&self) -> f32 {
        self.distance_factor
    }

    /// Moves the locked-on eye closer, stopping at the minimum distance
    pub fn zoom_in(&mut self) {
        self.distance_factor = (self.distance_factor - self.zoom_step).max(self.min_distance_factor);
    }

    /// Moves the locked-on eye away, stopping at the maximum distance
    pub fn zoom_out(&mut self) {
        self.distance_factor = (self.distance_factor + self.zoom_step).min(self.max_distance_factor);
    }

    pub fn orbit_left(&mut self) {
        self.y_angle -= self.orbit_step;
    }

    pub fn orbit_right(&mut self) {
        self.y_angle += self.orbit_step;
    }

    pub fn orbit_up(&mut self) {
        self.x_angle -= self.orbit_step;
    }

    pub fn orbit_down(&mut self) {
        self.x_angle += self.orbit_step;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Updates the aspect ratio; zero-sized surfaces are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Eye, center and up for the current mode
    ///
    /// A locked-on target that no longer exists falls back to the central
    /// body.
    pub fn resolve(&self, bodies: &BodySystem, ship: &Vehicle) -> ViewParameters {
        let (eye, center) = match self.mode {
            CameraMode::FollowVehicle => {
                let eye = ship.position - ship.direction * self.follow_back
                    + Vector3::new(0.0, self.follow_lift, 0.0);
                (eye, ship.position)
            }
            CameraMode::LockedOnBody(id) => {
                let body = bodies.get(id).unwrap_or_else(|| bodies.central());
                let center = body.position;
                let offset = Vector3::new(0.0, 0.0, self.distance_factor * body.radius);
                let rotation =
                    Matrix4::from_angle_y(Deg(self.y_angle)) * Matrix4::from_angle_x(Deg(self.x_angle));
                (center + (rotation * offset.extend(0.0)).truncate(), center)
            }
            CameraMode::FreeOrbitOnSun => {
                let center = bodies.central().position;
                (center + self.free_eye_offset, center)
            }
        };

        ViewParameters {
            eye,
            center,
            up: up_vector(eye, center),
        }
    }

    pub fn view_matrix(&self, view: &ViewParameters) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::new(view.eye.x, view.eye.y, view.eye.z),
            Point3::new(view.center.x, view.center.y, view.center.z),
            view.up,
        )
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        perspective_projection(self.fovy, self.aspect, self.near, self.far)
    }
}

fn up_vector(eye: Vector3<f32>, center: Vector3<f32>) -> Vector3<f32> {
    let forward = center - eye;
    if forward.magnitude2() <= f32::EPSILON || forward.normalize().cross(WORLD_UP).magnitude2() < 1e-8 {
        FALLBACK_UP
    } else {
        WORLD_UP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::BodyConfig, simulation::Vehicle};
    use cgmath::{SquareMatrix, Vector4, Zero};

    const EPS: f32 = 1e-4;

    fn level_camera() -> CameraConfig {
        CameraConfig {
            initial_vertical_angle: 0.0,
            ..CameraConfig::default()
        }
    }

    fn sun_and_giant() -> BodySystem {
        BodySystem::from_config(&[
            BodyConfig::new("sun", 0.0, 0.0, 1.0, 0.0),
            BodyConfig::new("giant", 0.0, 0.0, 3.3, 5.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_locked_eye_sits_factor_radii_away() {
        let bodies = sun_and_giant();
        let mut camera = CameraResolver::new(&level_camera());
        camera.set_mode(CameraMode::LockedOnBody(BodyId(1)));

        let view = camera.resolve(&bodies, &Vehicle::default());
        let center = bodies.get(BodyId(1)).unwrap().position;

        assert_eq!(view.center, center);
        assert!((view.eye - (center + Vector3::new(0.0, 0.0, 29.7))).magnitude() < EPS);
        assert_eq!(view.up, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_zoom_stays_in_range() {
        let mut camera = CameraResolver::new(&CameraConfig::default());
        for _ in 0..500 {
            camera.zoom_out();
            assert!(camera.distance_factor() <= 20.0);
        }
        assert_eq!(camera.distance_factor(), 20.0);
        for _ in 0..500 {
            camera.zoom_in();
            assert!(camera.distance_factor() >= 2.5);
        }
        assert_eq!(camera.distance_factor(), 2.5);
    }

    #[test]
    fn test_initial_top_down_view_has_valid_up() {
        let bodies = sun_and_giant();
        let camera = CameraResolver::new(&CameraConfig::default());
        assert_eq!(camera.mode(), CameraMode::LockedOnBody(BodyId(0)));

        let view = camera.resolve(&bodies, &Vehicle::default());
        assert!((view.eye - Vector3::new(0.0, 9.0, 0.0)).magnitude() < EPS);
        assert_eq!(view.up, FALLBACK_UP);

        let matrix = camera.view_matrix(&view);
        assert!(matrix.determinant().is_finite());
        assert!(matrix.x.x.is_finite() && matrix.z.z.is_finite());
    }

    #[test]
    fn test_horizontal_orbit_rotates_about_y() {
        let bodies = sun_and_giant();
        let mut camera = CameraResolver::new(&level_camera());
        for _ in 0..9 {
            camera.orbit_right();
        }

        let view = camera.resolve(&bodies, &Vehicle::default());
        // A quarter turn about +Y carries +Z onto +X
        assert!((view.eye - Vector3::new(9.0, 0.0, 0.0)).magnitude() < EPS);
    }

    #[test]
    fn test_follow_hovers_behind_ship() {
        let bodies = sun_and_giant();
        let mut camera = CameraResolver::new(&CameraConfig::default());
        camera.set_mode(CameraMode::FollowVehicle);
        let ship = Vehicle::new(Vector3::new(1.0, 0.0, -9.0));

        let view = camera.resolve(&bodies, &ship);
        assert_eq!(view.center, ship.position);
        assert!((view.eye - Vector3::new(1.0, 0.5, -11.0)).magnitude() < EPS);
    }

    #[test]
    fn test_free_orbit_looks_at_central_body() {
        let bodies = sun_and_giant();
        let mut camera = CameraResolver::new(&CameraConfig::default());
        camera.set_mode(CameraMode::FreeOrbitOnSun);

        let view = camera.resolve(&bodies, &Vehicle::default());
        assert_eq!(view.center, Vector3::zero());
        assert_eq!(view.eye, Vector3::new(0.0, 0.0, 7.0));

        let eye_space = camera.view_matrix(&view) * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!((eye_space.z + 7.0).abs() < EPS);
    }

    #[test]
    fn test_resize_ignores_zero_sizes() {
        let mut camera = CameraResolver::new(&CameraConfig::default());
        camera.resize(800, 400);
        camera.resize(0, 300);
        assert_eq!(camera.aspect(), 2.0);
    }
}
