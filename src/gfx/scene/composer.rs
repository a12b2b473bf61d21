//! Per-frame scene orchestration
//!
//! The [`SceneComposer`] owns every piece of mutable scene state and every
//! GPU resource. The windowing driver calls it through [`FrameLifecycle`]:
//! the timer advances the simulation, input events become [`Command`]s, and
//! each paint resolves the camera and issues the draws in a fixed order.
//! Every draw rebinds its program, writes its full uniform set and binds its
//! texture, so a program that failed to load only loses its own draws.

use anyhow::Result;
use cgmath::{Deg, Matrix4, Vector3, Vector4};
use log::{debug, info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::Path;

use crate::{
    app::FrameLifecycle,
    config::{ConfigError, SceneConfig},
    gfx::{
        camera::{billboard_angles, normal_matrix, CameraMode, CameraResolver},
        geometry::{
            generate_billboard_quad, generate_polyline, generate_sphere, generate_unit_axis,
            ship_mesh,
        },
        rendering::{MeshHandle, RenderBackend, TextureHandle},
        resources::TextureImage,
        scene::display::DisplayFlags,
        shader::{reload_all, ShaderProgram, UniformValue},
    },
    input::{Command, Key, KeyAction, LoopControl},
    simulation::{BodyId, BodySystem, PathCurve, PathFrame, PiecewiseBezier, Vehicle},
};

const TEXTURE_UNIT: u32 = 0;

struct Programs {
    /// Texture-only shading: starfield, ship and glow
    color: ShaderProgram,
    /// Lit bodies
    phong: ShaderProgram,
    /// Central light source
    sun: ShaderProgram,
    /// Debug overlays
    solid_color: ShaderProgram,
}

impl Programs {
    fn new() -> Self {
        Self {
            color: ShaderProgram::new("color"),
            phong: ShaderProgram::new("phong"),
            sun: ShaderProgram::new("sun"),
            solid_color: ShaderProgram::new("solid_color"),
        }
    }

    fn all_mut(&mut self) -> [&mut ShaderProgram; 4] {
        [
            &mut self.color,
            &mut self.phong,
            &mut self.sun,
            &mut self.solid_color,
        ]
    }
}

struct Meshes {
    sphere: MeshHandle,
    billboard: MeshHandle,
    ship: MeshHandle,
    path: MeshHandle,
    control_polygon: MeshHandle,
    axis: MeshHandle,
}

#[derive(Default)]
struct Textures {
    /// Indexed like the body system
    bodies: Vec<Option<TextureHandle>>,
    stars: Option<TextureHandle>,
    ship: Option<TextureHandle>,
    glow: Option<TextureHandle>,
}

/// Scene state and draw orchestration over a [`RenderBackend`]
pub struct SceneComposer<B: RenderBackend> {
    backend: B,
    config: SceneConfig,
    bodies: BodySystem,
    ship: Vehicle,
    camera: CameraResolver,
    curve: PiecewiseBezier,
    frame: PathFrame,
    path_parameter: f32,
    display: DisplayFlags,
    time_step: f32,
    timer_active: bool,
    sun_time: f32,
    rng: StdRng,
    programs: Programs,
    meshes: Option<Meshes>,
    textures: Textures,
}

impl<B: RenderBackend> SceneComposer<B> {
    /// Builds the scene state; GPU resources are created by `initialize`
    pub fn new(backend: B, config: SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let bodies = BodySystem::from_config(&config.bodies)?;
        let polygon: Vec<Vector3<f32>> = config
            .path
            .control_polygon
            .iter()
            .map(|&point| point.into())
            .collect();
        let curve = PiecewiseBezier::from_control_polygon(&polygon, config.path.closed)?;

        let central = bodies.central();
        let ship = Vehicle::new(
            central.position
                - Vector3::new(0.0, 0.0, config.ship.start_distance_factor * central.radius),
        );

        let mut frame = PathFrame::new();
        frame.align_to(curve.tangent(0.0));

        Ok(Self {
            backend,
            bodies,
            ship,
            camera: CameraResolver::new(&config.camera),
            curve,
            frame,
            path_parameter: 0.0,
            display: DisplayFlags::default(),
            time_step: config.time.initial_step,
            timer_active: !config.time.start_paused,
            sun_time: 0.0,
            rng: StdRng::seed_from_u64(config.time.rng_seed),
            programs: Programs::new(),
            meshes: None,
            textures: Textures::default(),
            config,
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn bodies(&self) -> &BodySystem {
        &self.bodies
    }

    pub fn ship(&self) -> &Vehicle {
        &self.ship
    }

    pub fn camera(&self) -> &CameraResolver {
        &self.camera
    }

    pub fn display(&self) -> DisplayFlags {
        self.display
    }

    pub fn path_frame(&self) -> &PathFrame {
        &self.frame
    }

    pub fn path_parameter(&self) -> f32 {
        self.path_parameter
    }

    /// Days advanced per timer tick
    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    pub fn is_running(&self) -> bool {
        self.timer_active
    }

    /// Programs that are currently linked
    pub fn usable_program_count(&self) -> usize {
        [
            &self.programs.color,
            &self.programs.phong,
            &self.programs.sun,
            &self.programs.solid_color,
        ]
        .iter()
        .filter(|program| program.is_usable())
        .count()
    }

    /// Applies one user command
    pub fn apply(&mut self, command: Command) -> LoopControl {
        match command {
            Command::SelectBody(index) => {
                if index < self.bodies.len() {
                    self.camera.set_mode(CameraMode::LockedOnBody(BodyId(index)));
                } else {
                    debug!("No body #{} to look at", index + 1);
                }
            }
            Command::FreeOrbit => self.camera.set_mode(CameraMode::FreeOrbitOnSun),
            Command::FollowVehicle => self.camera.set_mode(CameraMode::FollowVehicle),
            Command::ZoomIn => self.camera.zoom_in(),
            Command::ZoomOut => self.camera.zoom_out(),
            Command::RandomizePhases => self.randomize_phases(),
            Command::ToggleGreyscale => {
                let greyscale = self.display.toggle_greyscale();
                info!("Greyscale {}", if greyscale { "on" } else { "off" });
            }
            Command::ThrustForward
            | Command::ThrustBackward
            | Command::TurnLeft
            | Command::TurnRight => self.steer(command),
            Command::CycleCurveDisplay => {
                let mode = self.display.cycle_curve_display();
                info!("Curve display: {}", mode);
            }
            Command::ToggleParallelTransport => {
                let enabled = self.frame.toggle_parallel_transport();
                info!(
                    "Path frame uses {}",
                    if enabled {
                        "parallel transport"
                    } else {
                        "a fixed up vector"
                    }
                );
            }
            Command::OrbitLeft => self.camera.orbit_left(),
            Command::OrbitRight => self.camera.orbit_right(),
            Command::OrbitUp => self.camera.orbit_up(),
            Command::OrbitDown => self.camera.orbit_down(),
            Command::TogglePause => {
                self.timer_active = !self.timer_active;
                info!("Animation {}", if self.timer_active { "resumed" } else { "paused" });
            }
            Command::DoubleTimeStep => self.set_time_step(self.time_step * 2.0),
            Command::HalveTimeStep => self.set_time_step(self.time_step * 0.5),
            Command::ReloadShaders => self.reload_shaders(),
            Command::Quit => return LoopControl::Exit,
        }
        LoopControl::Continue
    }

    fn steer(&mut self, command: Command) {
        if self.camera.mode() != CameraMode::FollowVehicle {
            return;
        }
        let controls = &self.config.ship;
        match command {
            Command::ThrustForward => self.ship.accelerate(controls.thrust_step),
            Command::ThrustBackward => self.ship.accelerate(-controls.thrust_step),
            Command::TurnLeft => self.ship.accelerate_angular(controls.turn_step),
            Command::TurnRight => self.ship.accelerate_angular(-controls.turn_step),
            _ => {}
        }
    }

    fn set_time_step(&mut self, step: f32) {
        let time = &self.config.time;
        self.time_step = step.clamp(time.min_step, time.max_step);
        info!("Time step: {} days", self.time_step);
    }

    /// Advances every body by a random number of days
    fn randomize_phases(&mut self) {
        let max_days = self.config.time.randomize_max_days.max(1);
        let days = self.rng.random_range(0..max_days) as f32;
        info!("Randomizing planets ({} days)", days);
        self.bodies.advance(days);
    }

    fn reload_shaders(&mut self) {
        let mut programs = self.programs.all_mut();
        reload_all(&mut self.backend, &mut programs);
    }

    fn load_shaders(&mut self) {
        let dir = self.config.shader_dir.clone();
        for program in self.programs.all_mut() {
            let vertex = dir.join(format!("{}.vert.wgsl", program.label()));
            let fragment = dir.join(format!("{}.frag.wgsl", program.label()));
            if let Err(err) = program.load(&mut self.backend, vertex, fragment, None) {
                warn!("Continuing without shader '{}': {}", program.label(), err);
            }
        }
    }

    fn upload_meshes(&mut self) -> Meshes {
        let tessellation = self.config.sphere_tessellation;
        let path_points = self.curve.sample(self.config.path.samples);
        let ship = ship_mesh(&self.config.asset_dir.join(&self.config.ship.mesh));

        Meshes {
            sphere: self
                .backend
                .upload_mesh("sphere", &generate_sphere(tessellation, tessellation)),
            billboard: self
                .backend
                .upload_mesh("billboard", &generate_billboard_quad()),
            ship: self.backend.upload_mesh("ship", &ship),
            path: self
                .backend
                .upload_mesh("path", &generate_polyline(&path_points, false)),
            control_polygon: self.backend.upload_mesh(
                "control polygon",
                &generate_polyline(self.curve.bezier_control_points(), false),
            ),
            axis: self.backend.upload_mesh("axis", &generate_unit_axis()),
        }
    }

    fn load_textures(&mut self) -> Textures {
        let dir = self.config.asset_dir.clone();
        let bodies = self
            .config
            .bodies
            .iter()
            .map(|body| load_texture(&mut self.backend, &dir, body.texture.as_deref()))
            .collect();
        let stars = load_texture(
            &mut self.backend,
            &dir,
            self.config.starfield.texture.as_deref(),
        );
        let ship = load_texture(&mut self.backend, &dir, self.config.ship.texture.as_deref());

        let glow = &self.config.glow;
        let glow_image = TextureImage::sun_glow(glow.texture_size, glow.inner_radius, glow.outer_radius);
        let glow = Some(self.backend.upload_texture("sun glow", &glow_image));

        Textures {
            bodies,
            stars,
            ship,
            glow,
        }
    }

    /// Releases every shader program; the composer draws nothing afterwards
    pub fn release_gpu_resources(&mut self) {
        for program in self.programs.all_mut() {
            program.release(&mut self.backend);
        }
    }

    fn greyscale(&self) -> UniformValue {
        UniformValue::Int(i32::from(self.display.greyscale))
    }

    fn draw_overlays(&mut self, meshes: &Meshes, view_projection: Matrix4<f32>) {
        let overlays = self.display.curve_display.overlays();
        if overlays.is_empty() {
            return;
        }
        let program = &self.programs.solid_color;
        if !program.use_program(&mut self.backend) {
            debug!("Skipping curve overlays: solid_color shader unusable");
            return;
        }
        let path = &self.config.path;

        if overlays.frame {
            let origin = self.curve.position(self.path_parameter);
            for (axis, color) in self.frame.axis_transforms(origin, path.frame_axis_length) {
                program.set_uniform(
                    &mut self.backend,
                    "modelview_projection_matrix",
                    view_projection * axis,
                    false,
                );
                program.set_uniform(&mut self.backend, "color", color, false);
                self.backend.draw_mesh(meshes.axis);
            }
        }

        if overlays.control_polygon {
            program.set_uniform(&mut self.backend, "modelview_projection_matrix", view_projection, false);
            program.set_uniform(
                &mut self.backend,
                "color",
                Vector4::from(path.control_polygon_color),
                false,
            );
            self.backend.draw_mesh(meshes.control_polygon);
        }

        if overlays.path {
            program.set_uniform(&mut self.backend, "modelview_projection_matrix", view_projection, false);
            program.set_uniform(&mut self.backend, "color", Vector4::from(path.path_color), false);
            self.backend.draw_mesh(meshes.path);
        }
    }

    fn draw_sun(&mut self, meshes: &Meshes, view: Matrix4<f32>, projection: Matrix4<f32>) {
        let greyscale = self.greyscale();
        let program = &self.programs.sun;
        if !program.use_program(&mut self.backend) {
            debug!("Skipping central body: sun shader unusable");
            return;
        }
        let model = self.bodies.central().model_matrix();
        program.set_uniform(&mut self.backend, "modelview_projection_matrix", projection * view * model, false);
        program.set_uniform(&mut self.backend, "t", self.sun_time, true);
        program.set_uniform(&mut self.backend, "greyscale", greyscale, false);
        let texture = self.textures.bodies.first().copied().flatten();
        self.backend.bind_texture(TEXTURE_UNIT, texture);
        self.backend.draw_mesh(meshes.sphere);
    }

    /// Draws `mesh` with the texture-only program
    fn draw_textured(&mut self, mesh: MeshHandle, texture: Option<TextureHandle>, mvp: Matrix4<f32>) {
        let greyscale = self.greyscale();
        let program = &self.programs.color;
        if !program.use_program(&mut self.backend) {
            debug!("Skipping draw: color shader unusable");
            return;
        }
        program.set_uniform(&mut self.backend, "modelview_projection_matrix", mvp, false);
        program.set_uniform(&mut self.backend, "greyscale", greyscale, false);
        self.backend.bind_texture(TEXTURE_UNIT, texture);
        self.backend.draw_mesh(mesh);
    }

    fn draw_bodies(&mut self, meshes: &Meshes, view: Matrix4<f32>, projection: Matrix4<f32>) {
        let greyscale = self.greyscale();
        let program = &self.programs.phong;
        if !program.is_usable() {
            debug!("Skipping orbiting bodies: phong shader unusable");
            return;
        }
        let light = view * self.bodies.central().position.extend(1.0);

        for (id, body) in self.bodies.iter().skip(1) {
            let modelview = view * body.model_matrix();
            program.use_program(&mut self.backend);
            program.set_uniform(&mut self.backend, "modelview_projection_matrix", projection * modelview, false);
            program.set_uniform(&mut self.backend, "modelview_matrix", modelview, false);
            program.set_uniform(&mut self.backend, "normal_matrix", normal_matrix(&modelview), false);
            program.set_uniform(&mut self.backend, "light_position", light, false);
            program.set_uniform(&mut self.backend, "greyscale", greyscale, false);
            let texture = self.textures.bodies.get(id.0).copied().flatten();
            self.backend.bind_texture(TEXTURE_UNIT, texture);
            self.backend.draw_mesh(meshes.sphere);
        }
    }

    fn draw_glow(&mut self, meshes: &Meshes, eye: Vector3<f32>, view_projection: Matrix4<f32>) {
        let central = self.bodies.central();
        let (yaw, pitch) = billboard_angles(eye, central.position);
        let model = Matrix4::from_translation(central.position)
            * Matrix4::from_angle_y(Deg(yaw))
            * Matrix4::from_angle_x(Deg(pitch))
            * Matrix4::from_scale(self.config.glow.scale * central.radius);

        self.backend.set_blending(true);
        self.draw_textured(meshes.billboard, self.textures.glow, view_projection * model);
        self.backend.set_blending(false);
    }
}

impl<B: RenderBackend> FrameLifecycle for SceneComposer<B> {
    fn initialize(&mut self) -> Result<()> {
        self.load_shaders();
        let meshes = self.upload_meshes();
        self.textures = self.load_textures();
        self.meshes = Some(meshes);
        info!(
            "Scene ready: {} bodies, {}/4 shader programs usable",
            self.bodies.len(),
            self.usable_program_count()
        );
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.camera.resize(width, height);
        self.backend.resize(width, height);
    }

    fn timer(&mut self) {
        if !self.timer_active {
            return;
        }
        self.bodies.advance(self.time_step);
        self.ship.update();
        self.path_parameter = self
            .curve
            .advance_parameter(self.path_parameter, self.config.path.speed);
        self.frame.align_to(self.curve.tangent(self.path_parameter));
    }

    fn paint(&mut self) {
        let Some(meshes) = self.meshes.take() else {
            return;
        };
        if self.timer_active {
            self.sun_time += self.config.time.sun_animation_step;
        }

        let parameters = self.camera.resolve(&self.bodies, &self.ship);
        let view = self.camera.view_matrix(&parameters);
        let projection = self.camera.projection_matrix();
        let view_projection = projection * view;

        self.backend.begin_frame();

        self.draw_overlays(&meshes, view_projection);
        self.draw_sun(&meshes, view, projection);

        let stars = Matrix4::from_scale(self.config.starfield.radius);
        self.draw_textured(meshes.sphere, self.textures.stars, view_projection * stars);

        self.draw_bodies(&meshes, view, projection);

        let ship = self.ship.model_matrix(self.config.ship.scale);
        self.draw_textured(meshes.ship, self.textures.ship, view_projection * ship);

        self.draw_glow(&meshes, parameters.eye, view_projection);

        self.backend.end_frame();
        self.meshes = Some(meshes);
    }

    fn keyboard(&mut self, key: Key, action: KeyAction) -> LoopControl {
        match Command::from_key(key, action) {
            Some(command) => self.apply(command),
            None => LoopControl::Continue,
        }
    }

    fn status(&self) -> String {
        format!(
            "{} | camera: {} | step: {:.4} days{} | curves: {}",
            self.config.window.title,
            self.camera.mode(),
            self.time_step,
            if self.timer_active { "" } else { " (paused)" },
            self.display.curve_display
        )
    }
}

impl<B: RenderBackend> Drop for SceneComposer<B> {
    fn drop(&mut self) {
        self.release_gpu_resources();
    }
}

/// Uploads `file` from `dir`, or logs and leaves the draw untextured
fn load_texture<B: RenderBackend>(backend: &mut B, dir: &Path, file: Option<&str>) -> Option<TextureHandle> {
    let file = file?;
    match TextureImage::load(&dir.join(file)) {
        Ok(image) => Some(backend.upload_texture(file, &image)),
        Err(err) => {
            warn!("{}; drawing untextured", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::BodyConfig,
        gfx::{
            shader::ShaderBackend,
            testing::{scratch_dir, write_file, BackendEvent, RecordingBackend},
        },
    };
    use tempfile::TempDir;

    const PROGRAMS: [&str; 4] = ["color", "phong", "sun", "solid_color"];

    fn shader_dir(name: &str) -> TempDir {
        let dir = scratch_dir(name);
        for program in PROGRAMS {
            write_file(dir.path(), &format!("{program}.vert.wgsl"), "// vertex stage\n");
            write_file(dir.path(), &format!("{program}.frag.wgsl"), "// fragment stage\n");
        }
        dir
    }

    fn config_in(dir: &Path) -> SceneConfig {
        SceneConfig::default()
            .with_shader_dir(dir)
            .with_asset_dir(dir.join("no-assets"))
    }

    /// Initialized composer plus the shader directory it reloads from
    fn composer(name: &str) -> (SceneComposer<RecordingBackend>, TempDir) {
        let dir = shader_dir(name);
        let mut composer =
            SceneComposer::new(RecordingBackend::new(), config_in(dir.path())).unwrap();
        composer.initialize().unwrap();
        (composer, dir)
    }

    fn paint_draws(composer: &mut SceneComposer<RecordingBackend>) -> Vec<(String, String)> {
        composer.backend_mut().events.clear();
        composer.paint();
        composer.backend().draws()
    }

    fn draw(program: &str, mesh: &str) -> (String, String) {
        (program.to_owned(), mesh.to_owned())
    }

    #[test]
    fn test_paint_draws_in_fixed_order() {
        let (mut composer, _shaders) = composer("composer-order");

        let mut expected = vec![draw("sun", "sphere"), draw("color", "sphere")];
        expected.extend((0..5).map(|_| draw("phong", "sphere")));
        expected.push(draw("color", "ship"));
        expected.push(draw("color", "billboard"));

        assert_eq!(paint_draws(&mut composer), expected);
        assert_eq!(composer.backend().events.first(), Some(&BackendEvent::BeginFrame));
        assert_eq!(composer.backend().events.last(), Some(&BackendEvent::EndFrame));
    }

    #[test]
    fn test_blending_is_enabled_only_for_the_glow() {
        let (mut composer, _shaders) = composer("composer-blend");
        paint_draws(&mut composer);
        let events = &composer.backend().events;

        let blends: Vec<_> = events
            .iter()
            .enumerate()
            .filter(|(_, event)| matches!(event, BackendEvent::Blend(_)))
            .collect();
        assert_eq!(blends.len(), 2);
        assert_eq!(blends[0].1, &BackendEvent::Blend(true));
        assert_eq!(blends[1].1, &BackendEvent::Blend(false));

        let draws_between = events[blends[0].0..blends[1].0]
            .iter()
            .filter(|event| matches!(event, BackendEvent::Draw { .. }))
            .count();
        assert_eq!(draws_between, 1);
    }

    #[test]
    fn test_unusable_sun_shader_only_skips_its_own_draw() {
        let dir = shader_dir("composer-broken-sun");
        write_file(dir.path(), "sun.frag.wgsl", "COMPILE_ERROR unexpected token");
        let mut composer =
            SceneComposer::new(RecordingBackend::new(), config_in(dir.path())).unwrap();
        composer.initialize().unwrap();

        assert_eq!(composer.usable_program_count(), 3);
        let draws = paint_draws(&mut composer);
        assert_eq!(draws.len(), 8);
        assert!(draws.iter().all(|(program, _)| program != "sun"));
        assert_eq!(draws[0], draw("color", "sphere"));
    }

    #[test]
    fn test_phong_draws_receive_full_uniform_set() {
        let (mut composer, _shaders) = composer("composer-uniforms");
        paint_draws(&mut composer);

        let phong_names: Vec<String> = composer
            .backend()
            .uniform_writes()
            .into_iter()
            .filter(|(program, _, _)| program == "phong")
            .map(|(_, name, _)| name)
            .take(5)
            .collect();
        assert_eq!(
            phong_names,
            vec![
                "modelview_projection_matrix",
                "modelview_matrix",
                "normal_matrix",
                "light_position",
                "greyscale"
            ]
        );
    }

    #[test]
    fn test_greyscale_toggle_reaches_uniforms() {
        let (mut composer, _shaders) = composer("composer-greyscale");
        composer.apply(Command::ToggleGreyscale);
        paint_draws(&mut composer);

        let greyscale: Vec<_> = composer
            .backend()
            .uniform_writes()
            .into_iter()
            .filter(|(_, name, _)| name == "greyscale")
            .map(|(_, _, value)| value)
            .collect();
        assert_eq!(greyscale.len(), 9);
        assert!(greyscale.iter().all(|value| *value == UniformValue::Int(1)));
    }

    #[test]
    fn test_missing_optional_time_uniform_is_tolerated() {
        let (mut composer, _shaders) = composer("composer-no-t");
        composer.backend_mut().missing_uniforms.insert("t".to_owned());
        let draws = paint_draws(&mut composer);
        assert_eq!(draws[0], draw("sun", "sphere"));
    }

    #[test]
    fn test_time_step_doubles_halves_and_clamps() {
        let (mut composer, _shaders) = composer("composer-step");
        composer.apply(Command::DoubleTimeStep);
        assert!((composer.time_step() - 1.0 / 12.0).abs() < 1e-7);

        for _ in 0..100 {
            composer.apply(Command::HalveTimeStep);
        }
        assert_eq!(composer.time_step(), 1e-6);
        for _ in 0..100 {
            composer.apply(Command::DoubleTimeStep);
        }
        assert_eq!(composer.time_step(), 1e6);
    }

    #[test]
    fn test_pause_freezes_the_simulation() {
        let (mut composer, _shaders) = composer("composer-pause");
        composer.apply(Command::TogglePause);
        assert!(!composer.is_running());

        let before: Vec<_> = composer.bodies().iter().map(|(_, b)| b.position).collect();
        for _ in 0..10 {
            composer.timer();
        }
        let after: Vec<_> = composer.bodies().iter().map(|(_, b)| b.position).collect();
        assert_eq!(before, after);
        assert_eq!(composer.path_parameter(), 0.0);

        composer.apply(Command::TogglePause);
        composer.timer();
        assert!(composer.path_parameter() > 0.0);
        let earth = composer.bodies().find("earth").unwrap();
        assert!(composer.bodies().get(earth).unwrap().orbital_angle > 0.0);
    }

    #[test]
    fn test_ship_only_steers_while_followed() {
        let (mut composer, _shaders) = composer("composer-steer");
        composer.apply(Command::ThrustForward);
        composer.apply(Command::TurnLeft);
        assert_eq!(composer.ship().speed, 0.0);
        assert_eq!(composer.ship().angular_speed, 0.0);

        composer.apply(Command::FollowVehicle);
        composer.apply(Command::ThrustForward);
        composer.apply(Command::TurnRight);
        assert!((composer.ship().speed - 0.001).abs() < 1e-9);
        assert!((composer.ship().angular_speed + 0.02).abs() < 1e-9);
    }

    #[test]
    fn test_ship_starts_in_front_of_the_sun() {
        let (composer, _shaders) = composer("composer-ship-start");
        assert_eq!(composer.ship().position, Vector3::new(0.0, 0.0, -9.0));
    }

    #[test]
    fn test_body_selection_ignores_missing_bodies() {
        let (mut composer, _shaders) = composer("composer-select");
        composer.apply(Command::SelectBody(3));
        assert_eq!(composer.camera().mode(), CameraMode::LockedOnBody(BodyId(3)));

        composer.apply(Command::SelectBody(42));
        assert_eq!(composer.camera().mode(), CameraMode::LockedOnBody(BodyId(3)));

        composer.apply(Command::FreeOrbit);
        assert_eq!(composer.camera().mode(), CameraMode::FreeOrbitOnSun);
    }

    #[test]
    fn test_randomize_is_deterministic_and_keeps_sun_fixed() {
        let (mut first, _first_dir) = composer("composer-random-a");
        let (mut second, _second_dir) = composer("composer-random-b");
        first.apply(Command::RandomizePhases);
        second.apply(Command::RandomizePhases);

        let angles = |composer: &SceneComposer<RecordingBackend>| -> Vec<f32> {
            composer.bodies().iter().map(|(_, b)| b.orbital_angle).collect()
        };
        assert_eq!(angles(&first), angles(&second));
        assert!(first.bodies().central().position.x.abs() < 1e-6);
        assert!(angles(&first)[1..].iter().any(|angle| *angle != 0.0));
        // Only the bodies move
        assert_eq!(first.path_parameter(), 0.0);
    }

    #[test]
    fn test_overlay_modes_draw_their_sets_first() {
        let (mut composer, _shaders) = composer("composer-overlays");

        composer.apply(Command::CycleCurveDisplay);
        let draws = paint_draws(&mut composer);
        assert_eq!(draws[0], draw("solid_color", "path"));
        assert_eq!(draws[1], draw("sun", "sphere"));

        composer.apply(Command::CycleCurveDisplay);
        let draws = paint_draws(&mut composer);
        assert_eq!(
            draws[..2],
            [draw("solid_color", "control polygon"), draw("solid_color", "path")]
        );

        composer.apply(Command::CycleCurveDisplay);
        let draws = paint_draws(&mut composer);
        assert_eq!(
            draws[..4],
            [
                draw("solid_color", "axis"),
                draw("solid_color", "axis"),
                draw("solid_color", "axis"),
                draw("solid_color", "path"),
            ]
        );

        composer.apply(Command::CycleCurveDisplay);
        let draws = paint_draws(&mut composer);
        assert_eq!(draws[0], draw("sun", "sphere"));
    }

    #[test]
    fn test_overlays_never_touch_the_simulation() {
        let (mut with_overlays, _with_overlays_dir) = composer("composer-overlay-sim-a");
        let (mut without, _without_dir) = composer("composer-overlay-sim-b");
        with_overlays.apply(Command::CycleCurveDisplay);
        with_overlays.apply(Command::CycleCurveDisplay);
        with_overlays.apply(Command::CycleCurveDisplay);

        for _ in 0..20 {
            with_overlays.timer();
            with_overlays.paint();
            without.timer();
            without.paint();
        }
        assert_eq!(with_overlays.path_parameter(), without.path_parameter());
        assert_eq!(with_overlays.path_frame(), without.path_frame());
    }

    #[test]
    fn test_reload_shaders_keeps_object_count() {
        let (mut composer, _shaders) = composer("composer-reload");
        let live = composer.backend().live_object_count();
        assert_eq!(live, 12);

        composer.apply(Command::ReloadShaders);
        composer.apply(Command::ReloadShaders);
        assert_eq!(composer.backend().live_object_count(), live);
        assert_eq!(composer.usable_program_count(), 4);
    }

    #[test]
    fn test_release_frees_every_program() {
        let (mut composer, _shaders) = composer("composer-release");
        composer.release_gpu_resources();
        assert_eq!(composer.backend().live_object_count(), 0);
        assert!(paint_draws(&mut composer).is_empty());
    }

    #[test]
    fn test_escape_requests_exit() {
        let (mut composer, _shaders) = composer("composer-escape");
        assert_eq!(
            composer.keyboard(Key::Escape, KeyAction::Press),
            LoopControl::Exit
        );
        assert_eq!(
            composer.keyboard(Key::Escape, KeyAction::Release),
            LoopControl::Continue
        );
        assert_eq!(
            composer.keyboard(Key::Digit(7), KeyAction::Repeat),
            LoopControl::Continue
        );
        assert_eq!(composer.camera().mode(), CameraMode::FollowVehicle);
    }

    #[test]
    fn test_status_reports_pause_and_mode() {
        let (mut composer, _shaders) = composer("composer-status");
        composer.apply(Command::TogglePause);
        composer.apply(Command::FollowVehicle);
        let status = composer.status();
        assert!(status.contains("paused"));
        assert!(status.contains("ship"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SceneConfig::default().with_bodies(vec![
            BodyConfig::new("sun", 0.0, 0.0, 1.0, 0.0),
            BodyConfig::new("moon", 1.0, 0.0, 0.1, 0.5).with_parent(1),
        ]);
        assert!(matches!(
            SceneComposer::new(RecordingBackend::new(), config),
            Err(ConfigError::SatelliteBeforePrimary { .. })
        ));
    }

    #[test]
    fn test_paint_before_initialize_draws_nothing() {
        let dir = shader_dir("composer-uninitialized");
        let mut composer =
            SceneComposer::new(RecordingBackend::new(), config_in(dir.path())).unwrap();
        composer.paint();
        assert!(composer.backend().events.is_empty());
    }
}
