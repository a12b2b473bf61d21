//! Player spacecraft kinematics

use cgmath::{Deg, Matrix4, Rad, Vector3};

/// Ship moving in the orbital plane
///
/// Thrust and turn inputs change the speeds, which keep acting every tick
/// until countered. There are no bounds or collisions.
#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub position: Vector3<f32>,
    /// Unit vector the ship faces
    pub direction: Vector3<f32>,
    pub speed: f32,
    /// Degrees per tick
    pub angular_speed: f32,
    /// Heading about +Y in degrees; 0 faces +Z
    pub angle: f32,
}

impl Default for Vehicle {
    fn default() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            direction: Vector3::new(0.0, 0.0, 1.0),
            speed: 0.0,
            angular_speed: 0.0,
            angle: 0.0,
        }
    }
}

impl Vehicle {
    pub fn new(position: Vector3<f32>) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn accelerate(&mut self, delta: f32) {
        self.speed += delta;
    }

    pub fn accelerate_angular(&mut self, delta: f32) {
        self.angular_speed += delta;
    }

    /// Applies one tick of turning and forward motion
    pub fn update(&mut self) {
        self.angle += self.angular_speed;
        let heading = Rad::from(Deg(self.angle));
        self.direction = Vector3::new(heading.0.sin(), 0.0, heading.0.cos());
        self.position += self.speed * self.direction;
    }

    /// Places and orients the ship mesh, whose nose points along +Z
    pub fn model_matrix(&self, scale: f32) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_y(Deg(self.angle))
            * Matrix4::from_scale(scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::InnerSpace;

    #[test]
    fn test_idle_vehicle_stays_put() {
        let mut ship = Vehicle::new(Vector3::new(1.0, 2.0, 3.0));
        for _ in 0..10 {
            ship.update();
        }
        assert_eq!(ship.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(ship.direction, Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_thrust_accumulates_and_moves_forward() {
        let mut ship = Vehicle::default();
        ship.accelerate(0.001);
        ship.accelerate(0.001);
        ship.update();
        ship.update();

        assert!((ship.speed - 0.002).abs() < 1e-7);
        assert!((ship.position.z - 0.004).abs() < 1e-6);
        assert!(ship.position.x.abs() < 1e-7);
    }

    #[test]
    fn test_speed_is_unclamped() {
        let mut ship = Vehicle::default();
        ship.accelerate(-0.5);
        ship.accelerate(-0.5);
        ship.update();
        assert_eq!(ship.speed, -1.0);
        assert!((ship.position.z + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_turning_rotates_direction_and_keeps_it_unit() {
        let mut ship = Vehicle::default();
        ship.accelerate_angular(90.0);
        ship.update();

        assert!((ship.direction - Vector3::new(1.0, 0.0, 0.0)).magnitude() < 1e-6);
        for _ in 0..37 {
            ship.accelerate_angular(0.02);
            ship.update();
            assert!((ship.direction.magnitude() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_model_matrix_points_nose_along_direction() {
        let mut ship = Vehicle::default();
        ship.angle = 30.0;
        ship.update();
        let nose = ship.model_matrix(1.0) * Vector3::new(0.0, 0.0, 1.0).extend(0.0);
        assert!((nose.truncate() - ship.direction).magnitude() < 1e-5);
    }
}
