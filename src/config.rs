//! Scene configuration
//!
//! [`SceneConfig::default`] describes the solar system the viewer ships
//! with. Every part can be replaced through `with_*` builders; call
//! [`SceneConfig::validate`] before building a scene from it.

use std::{f32::consts::PI, path::PathBuf};
use thiserror::Error;

use crate::simulation::CurveError;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("the scene needs at least one body")]
    NoBodies,

    #[error("central body '{0}' cannot orbit another body")]
    CentralBodyHasParent(String),

    #[error("body '{body}' orbits body #{parent}, which must be listed before it")]
    SatelliteBeforePrimary { body: String, parent: usize },

    #[error("time step {0} must be positive and finite")]
    NonPositiveTimeStep(f32),

    #[error("time step {step} lies outside [{min}, {max}]")]
    TimeStepOutOfRange { step: f32, min: f32, max: f32 },

    #[error("distance factor {factor} lies outside the zoom range [{min}, {max}]")]
    InvalidZoomRange { factor: f32, min: f32, max: f32 },

    #[error("clip planes near={near} far={far} must satisfy 0 < near < far")]
    InvalidClipPlanes { near: f32, far: f32 },

    #[error("path control polygon has {got} points, at least {needed} are required")]
    ShortControlPolygon { got: usize, needed: usize },

    #[error("timer rate must be positive, got {0}")]
    InvalidTimerRate(f32),

    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// One orbiting body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyConfig {
    pub name: String,
    /// Radians per day
    pub orbital_rate: f32,
    /// Radians per day
    pub self_rate: f32,
    pub radius: f32,
    pub initial_self_angle: f32,
    pub orbital_distance: f32,
    /// Index of the primary; `None` orbits the origin
    pub parent: Option<usize>,
    /// Image file under the asset directory
    pub texture: Option<String>,
}

impl BodyConfig {
    pub fn new(name: &str, orbital_rate: f32, self_rate: f32, radius: f32, orbital_distance: f32) -> Self {
        Self {
            name: name.to_owned(),
            orbital_rate,
            self_rate,
            radius,
            initial_self_angle: 0.0,
            orbital_distance,
            parent: None,
            texture: None,
        }
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_texture(mut self, file: &str) -> Self {
        self.texture = Some(file.to_owned());
        self
    }

    pub fn with_initial_self_angle(mut self, angle: f32) -> Self {
        self.initial_self_angle = angle;
        self
    }
}

/// Background sphere surrounding the scene
#[derive(Debug, Clone, PartialEq)]
pub struct StarfieldConfig {
    pub radius: f32,
    pub texture: Option<String>,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            radius: 21.0,
            texture: Some("stars2.png".to_owned()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub fovy_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Locked-on eye distance in body radii
    pub distance_factor: f32,
    pub min_distance_factor: f32,
    pub max_distance_factor: f32,
    pub zoom_step: f32,
    pub orbit_step_degrees: f32,
    /// Rotation about X applied to the locked-on eye, degrees
    pub initial_vertical_angle: f32,
    /// Rotation about Y applied to the locked-on eye, degrees
    pub initial_horizontal_angle: f32,
    /// Eye offset from the central body in free-orbit mode
    pub free_eye_offset: [f32; 3],
    /// Distance behind the ship in follow mode
    pub follow_back: f32,
    /// Height above the ship in follow mode
    pub follow_lift: f32,
    /// Index of the body the camera starts locked on; `None` starts free
    pub initial_target: Option<usize>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy_degrees: 45.0,
            near: 0.01,
            far: 50.0,
            distance_factor: 9.0,
            min_distance_factor: 2.5,
            max_distance_factor: 20.0,
            zoom_step: 0.1,
            orbit_step_degrees: 10.0,
            initial_vertical_angle: -90.0,
            initial_horizontal_angle: 0.0,
            free_eye_offset: [0.0, 0.0, 7.0],
            follow_back: 2.0,
            follow_lift: 0.5,
            initial_target: Some(0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeConfig {
    /// Days per timer tick
    pub initial_step: f32,
    pub min_step: f32,
    pub max_step: f32,
    pub start_paused: bool,
    /// Upper bound (exclusive) of the random day offset applied on randomize
    pub randomize_max_days: u32,
    pub rng_seed: u64,
    /// Advance of the light-source shader's `t` uniform per painted frame
    pub sun_animation_step: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            initial_step: 1.0 / 24.0,
            min_step: 1e-6,
            max_step: 1e6,
            start_paused: false,
            randomize_max_days: 20000,
            rng_seed: 0,
            sun_animation_step: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShipConfig {
    /// OBJ file under the asset directory
    pub mesh: String,
    pub texture: Option<String>,
    pub scale: f32,
    pub thrust_step: f32,
    /// Degrees per tick added per turn input
    pub turn_step: f32,
    /// The ship starts this many central-body radii in -Z of the central body
    pub start_distance_factor: f32,
}

impl Default for ShipConfig {
    fn default() -> Self {
        Self {
            mesh: "spaceship.obj".to_owned(),
            texture: Some("ship.png".to_owned()),
            scale: 0.05,
            thrust_step: 0.001,
            turn_step: 0.02,
            start_distance_factor: 9.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathConfig {
    pub control_polygon: Vec<[f32; 3]>,
    pub closed: bool,
    /// World-space distance the path parameter advances per tick
    pub speed: f32,
    /// Points the path overlay is sampled with
    pub samples: usize,
    pub frame_axis_length: f32,
    pub path_color: [f32; 4],
    pub control_polygon_color: [f32; 4],
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            control_polygon: vec![
                [2.0, 2.0, 0.0],
                [3.0, 0.0, 0.0],
                [3.0, 0.0, -2.0],
                [0.0, 2.0, -3.0],
                [-2.0, 2.0, -1.0],
                [-3.0, 3.0, 0.0],
                [-1.0, 1.0, 1.0],
            ],
            closed: true,
            speed: 0.01,
            samples: 200,
            frame_axis_length: 0.5,
            path_color: [1.0, 0.0, 0.0, 1.0],
            control_polygon_color: [0.8, 0.8, 0.8, 1.0],
        }
    }
}

/// Glow billboard around the central body
#[derive(Debug, Clone, PartialEq)]
pub struct GlowConfig {
    pub texture_size: u32,
    pub inner_radius: f32,
    pub outer_radius: f32,
    /// Billboard half-size in central-body radii
    pub scale: f32,
}

impl Default for GlowConfig {
    fn default() -> Self {
        Self {
            texture_size: 900,
            inner_radius: 150.0,
            outer_radius: 450.0,
            scale: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Timer ticks per second
    pub timer_hz: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Solar System".to_owned(),
            width: 1280,
            height: 720,
            timer_hz: 60.0,
        }
    }
}

/// Everything needed to build a scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneConfig {
    /// Orbiting bodies; the first one is the central light source
    pub bodies: Vec<BodyConfig>,
    pub starfield: StarfieldConfig,
    pub camera: CameraConfig,
    pub time: TimeConfig,
    pub ship: ShipConfig,
    pub path: PathConfig,
    pub glow: GlowConfig,
    pub window: WindowConfig,
    pub shader_dir: PathBuf,
    pub asset_dir: PathBuf,
    /// Latitude and longitude segments of the shared sphere mesh
    pub sphere_tessellation: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        Self {
            bodies: solar_system(),
            starfield: StarfieldConfig::default(),
            camera: CameraConfig::default(),
            time: TimeConfig::default(),
            ship: ShipConfig::default(),
            path: PathConfig::default(),
            glow: GlowConfig::default(),
            window: WindowConfig::default(),
            shader_dir: manifest_dir.join("shaders"),
            asset_dir: manifest_dir.join("assets"),
            sphere_tessellation: 50,
        }
    }
}

/// Sun, four planets and the earth's moon
pub fn solar_system() -> Vec<BodyConfig> {
    vec![
        BodyConfig::new("sun", 0.0, 2.0 * PI / 26.0, 1.0, 0.0).with_texture("sun.png"),
        BodyConfig::new("mercury", 2.0 * PI / 116.0, 2.0 * PI / 58.5, 0.075, -1.4)
            .with_texture("mercury.png"),
        BodyConfig::new("venus", 2.0 * PI / 225.0, 2.0 * PI / 243.0, 0.2, -2.2)
            .with_texture("venus.png"),
        BodyConfig::new("earth", 2.0 * PI / 365.0, 2.0 * PI, 0.25, -3.3).with_texture("day.png"),
        BodyConfig::new("moon", 2.0 * PI / 27.0, 0.0, 0.04, -0.4)
            .with_parent(3)
            .with_texture("moon.png"),
        BodyConfig::new("mars", 2.0 * PI / 687.0, 2.0 * PI * 24.0 / 25.0, 0.15, -5.0)
            .with_texture("mars.png"),
    ]
}

impl SceneConfig {
    pub fn with_bodies(mut self, bodies: Vec<BodyConfig>) -> Self {
        self.bodies = bodies;
        self
    }

    pub fn with_body(mut self, body: BodyConfig) -> Self {
        self.bodies.push(body);
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_time(mut self, time: TimeConfig) -> Self {
        self.time = time;
        self
    }

    pub fn with_time_step(mut self, step: f32) -> Self {
        self.time.initial_step = step;
        self
    }

    pub fn with_ship(mut self, ship: ShipConfig) -> Self {
        self.ship = ship;
        self
    }

    pub fn with_path(mut self, path: PathConfig) -> Self {
        self.path = path;
        self
    }

    pub fn with_window(mut self, window: WindowConfig) -> Self {
        self.window = window;
        self
    }

    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = dir.into();
        self
    }

    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Checks every invariant the scene relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Some(central) = self.bodies.first() else {
            return Err(ConfigError::NoBodies);
        };
        if central.parent.is_some() {
            return Err(ConfigError::CentralBodyHasParent(central.name.clone()));
        }
        for (index, body) in self.bodies.iter().enumerate() {
            if let Some(parent) = body.parent {
                if parent >= index {
                    return Err(ConfigError::SatelliteBeforePrimary {
                        body: body.name.clone(),
                        parent,
                    });
                }
            }
        }

        let time = &self.time;
        if !(time.initial_step.is_finite() && time.initial_step > 0.0) {
            return Err(ConfigError::NonPositiveTimeStep(time.initial_step));
        }
        if time.initial_step < time.min_step || time.initial_step > time.max_step {
            return Err(ConfigError::TimeStepOutOfRange {
                step: time.initial_step,
                min: time.min_step,
                max: time.max_step,
            });
        }

        let camera = &self.camera;
        if !(camera.min_distance_factor > 0.0
            && camera.min_distance_factor <= camera.distance_factor
            && camera.distance_factor <= camera.max_distance_factor)
        {
            return Err(ConfigError::InvalidZoomRange {
                factor: camera.distance_factor,
                min: camera.min_distance_factor,
                max: camera.max_distance_factor,
            });
        }
        if !(camera.near > 0.0 && camera.far > camera.near) {
            return Err(ConfigError::InvalidClipPlanes {
                near: camera.near,
                far: camera.far,
            });
        }

        let needed = if self.path.closed { 3 } else { 4 };
        if self.path.control_polygon.len() < needed {
            return Err(ConfigError::ShortControlPolygon {
                got: self.path.control_polygon.len(),
                needed,
            });
        }

        if !(self.window.timer_hz > 0.0) {
            return Err(ConfigError::InvalidTimerRate(self.window.timer_hz));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SceneConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.bodies.len(), 6);
        assert_eq!(config.bodies[4].name, "moon");
        assert_eq!(config.bodies[4].parent, Some(3));
        assert_eq!(config.starfield.radius, 21.0);
        assert!((config.time.initial_step - 1.0 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_body_list_is_rejected() {
        let config = SceneConfig::default().with_bodies(Vec::new());
        assert_eq!(config.validate(), Err(ConfigError::NoBodies));
    }

    #[test]
    fn test_satellite_before_primary_is_rejected() {
        let config = SceneConfig::default().with_bodies(vec![
            BodyConfig::new("sun", 0.0, 0.0, 1.0, 0.0),
            BodyConfig::new("moon", 1.0, 0.0, 0.1, 0.4).with_parent(2),
            BodyConfig::new("earth", 1.0, 0.0, 0.2, 3.0),
        ]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::SatelliteBeforePrimary {
                body: "moon".to_owned(),
                parent: 2
            })
        );
    }

    #[test]
    fn test_central_body_with_parent_is_rejected() {
        let config = SceneConfig::default()
            .with_bodies(vec![BodyConfig::new("sun", 0.0, 0.0, 1.0, 0.0).with_parent(0)]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CentralBodyHasParent(_))
        ));
    }

    #[test]
    fn test_bad_time_step_is_rejected() {
        assert_eq!(
            SceneConfig::default().with_time_step(0.0).validate(),
            Err(ConfigError::NonPositiveTimeStep(0.0))
        );
        assert!(matches!(
            SceneConfig::default().with_time_step(1e9).validate(),
            Err(ConfigError::TimeStepOutOfRange { .. })
        ));
    }

    #[test]
    fn test_distance_factor_outside_zoom_range_is_rejected() {
        let camera = CameraConfig {
            distance_factor: 25.0,
            ..CameraConfig::default()
        };
        assert!(matches!(
            SceneConfig::default().with_camera(camera).validate(),
            Err(ConfigError::InvalidZoomRange { .. })
        ));
    }

    #[test]
    fn test_short_control_polygon_is_rejected() {
        let path = PathConfig {
            control_polygon: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]],
            ..PathConfig::default()
        };
        assert_eq!(
            SceneConfig::default().with_path(path).validate(),
            Err(ConfigError::ShortControlPolygon { got: 2, needed: 3 })
        );
    }
}
