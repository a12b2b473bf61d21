//! Orbiting body kinematics
//!
//! Orbits are fixed angular-rate circles, not gravitational simulation. Each
//! body advances its orbital and self-rotation angles by a time step and is
//! placed on its orbit around the already-resolved position of its primary.

use cgmath::{Deg, Matrix4, Rad, Vector3, Zero};

use crate::config::{BodyConfig, ConfigError};

/// Index of a body inside a [`BodySystem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub usize);

/// Kinematic state of one body
#[derive(Debug, Clone)]
pub struct CelestialBody {
    pub name: String,
    /// Radians per day around the primary
    pub orbital_rate: f32,
    /// Radians per day around the body's own axis
    pub self_rate: f32,
    pub radius: f32,
    pub initial_self_angle: f32,
    pub orbital_distance: f32,
    pub orbital_angle: f32,
    pub self_angle: f32,
    pub position: Vector3<f32>,
    /// Primary this body orbits; `None` orbits the origin
    pub parent: Option<BodyId>,
}

impl CelestialBody {
    pub fn new(
        name: &str,
        orbital_rate: f32,
        self_rate: f32,
        radius: f32,
        orbital_distance: f32,
    ) -> Self {
        Self {
            name: name.to_owned(),
            orbital_rate,
            self_rate,
            radius,
            initial_self_angle: 0.0,
            orbital_distance,
            orbital_angle: 0.0,
            self_angle: 0.0,
            position: Vector3::zero(),
            parent: None,
        }
    }

    pub fn from_config(config: &BodyConfig) -> Self {
        Self {
            initial_self_angle: config.initial_self_angle,
            self_angle: config.initial_self_angle,
            parent: config.parent.map(BodyId),
            ..Self::new(
                &config.name,
                config.orbital_rate,
                config.self_rate,
                config.radius,
                config.orbital_distance,
            )
        }
    }

    /// Advances both angles by `dt` days
    pub fn time_step(&mut self, dt: f32) {
        self.orbital_angle += self.orbital_rate * dt;
        self.self_angle += self.self_rate * dt;
    }

    /// Places the body on its orbit around `center`
    ///
    /// Starts at `(orbital_distance, 0, 0)` and rotates clockwise, seen from
    /// above, by the orbital angle.
    pub fn resolve_position(&mut self, center: Vector3<f32>) {
        let rotation = Matrix4::from_angle_y(Rad(-self.orbital_angle));
        let local = rotation * Vector3::new(self.orbital_distance, 0.0, 0.0).extend(1.0);
        self.position = center + local.truncate();
    }

    /// Translation, self-rotation and scale of the unit sphere for this body
    pub fn model_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_y(Rad(self.self_angle))
            * Matrix4::from_scale(self.radius)
    }

    /// Orbital angle in degrees, wrapped to [0, 360)
    pub fn orbital_angle_degrees(&self) -> f32 {
        Deg::from(Rad(self.orbital_angle)).0.rem_euclid(360.0)
    }
}

/// All orbiting bodies, stored primaries before satellites
///
/// The first body is the central light source. Construction rejects any
/// body whose primary is listed after it, so resolving positions in storage
/// order always sees the primary's position from the same step.
#[derive(Debug, Clone)]
pub struct BodySystem {
    bodies: Vec<CelestialBody>,
}

impl BodySystem {
    pub fn new(bodies: Vec<CelestialBody>) -> Result<Self, ConfigError> {
        if bodies.is_empty() {
            return Err(ConfigError::NoBodies);
        }
        if bodies[0].parent.is_some() {
            return Err(ConfigError::CentralBodyHasParent(bodies[0].name.clone()));
        }
        for (index, body) in bodies.iter().enumerate() {
            if let Some(BodyId(parent)) = body.parent {
                if parent >= index {
                    return Err(ConfigError::SatelliteBeforePrimary {
                        body: body.name.clone(),
                        parent,
                    });
                }
            }
        }

        let mut system = Self { bodies };
        system.resolve_positions();
        Ok(system)
    }

    pub fn from_config(configs: &[BodyConfig]) -> Result<Self, ConfigError> {
        Self::new(configs.iter().map(CelestialBody::from_config).collect())
    }

    /// Advances every body's angles by `dt`
    pub fn time_step(&mut self, dt: f32) {
        for body in &mut self.bodies {
            body.time_step(dt);
        }
    }

    /// Recomputes world positions, primaries first
    pub fn resolve_positions(&mut self) {
        for index in 0..self.bodies.len() {
            let center = match self.bodies[index].parent {
                Some(BodyId(parent)) => self.bodies[parent].position,
                None => Vector3::zero(),
            };
            self.bodies[index].resolve_position(center);
        }
    }

    /// Steps and re-resolves in one go
    pub fn advance(&mut self, dt: f32) {
        self.time_step(dt);
        self.resolve_positions();
    }

    pub fn central(&self) -> &CelestialBody {
        &self.bodies[0]
    }

    pub fn get(&self, id: BodyId) -> Option<&CelestialBody> {
        self.bodies.get(id.0)
    }

    pub fn find(&self, name: &str) -> Option<BodyId> {
        self.bodies
            .iter()
            .position(|body| body.name == name)
            .map(BodyId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &CelestialBody)> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(index, body)| (BodyId(index), body))
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}
