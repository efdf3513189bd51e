use std::cell::RefCell;
use std::rc::Rc;

use glam::Vec3;

use crate::config::DemoConfig;
use crate::controller::assets::{AssetLoader, AssetSlot, LoadCompletion, LoadTicket, SwapOutcome};
use crate::controller::camera_controller::OrbitController;
use crate::controller::input::{InputProcessor, InputState};
use crate::controller::movement::CharacterController;
use crate::controller::physics::{PhysicsStepDriver, StepReport};
use crate::error::PhysicsError;
use crate::model::{Camera, Character, Scene, World};

/// Receives the finished simulation state once per tick
pub trait FrameRenderer {
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, ctx: &mut FrameLoopContext);
}

/// Turns monotonic timestamps into frame deltas
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call; zero on the first call and never negative
    pub fn delta(&mut self, now_ms: f64) -> f32 {
        let dt = match self.last_ms {
            Some(last) => ((now_ms - last) / 1000.0).max(0.0) as f32,
            None => 0.0,
        };
        self.last_ms = Some(match self.last_ms {
            Some(last) => last.max(now_ms),
            None => now_ms,
        });
        dt
    }
}

/// Per-frame numbers shown in the stats panel
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStats {
    pub fps: f32,
    pub frame_ms: f32,
    pub steps: u32,
    pub contact: bool,
    pub gravity: Vec3,
    frame_count: u32,
    fps_timer: f32,
}

impl FrameStats {
    pub fn record(&mut self, dt: f32, report: &StepReport) {
        self.frame_ms = dt * 1000.0;
        self.steps = report.steps;
        self.contact = report.contact;
        self.gravity = report.gravity;

        self.frame_count += 1;
        self.fps_timer += dt;
        if self.fps_timer >= 1.0 {
            self.fps = self.frame_count as f32 / self.fps_timer;
            self.frame_count = 0;
            self.fps_timer = 0.0;
        }
    }
}

/// Everything the per-frame update touches
pub struct FrameLoopContext {
    pub config: DemoConfig,
    pub clock: FrameClock,
    pub world: World,
    pub scene: Scene,
    pub camera: Camera,
    pub orbit: OrbitController,
    pub input: Rc<RefCell<InputState>>,
    pub processor: InputProcessor,
    pub movement: CharacterController,
    pub driver: PhysicsStepDriver,
    pub character: AssetSlot<Character>,
    pub loader: AssetLoader,
    pub selected_clip: String,
    pub stats: FrameStats,
    pub viewport: (u32, u32),
    pub dt: f32,
}

impl FrameLoopContext {
    pub fn new(config: DemoConfig, width: u32, height: u32) -> Self {
        let (scene, world) = Scene::build(&config);
        let camera = Camera::from_config(&config.camera, width, height);
        let orbit = OrbitController::from_camera(&camera, &config.camera);
        let driver = PhysicsStepDriver::from_config(&config.physics, world.ground_height());
        tracing::info!(policy = driver.policy_name(), width, height, "frame loop ready");

        Self {
            clock: FrameClock::new(),
            camera,
            orbit,
            input: Rc::new(RefCell::new(InputState::new())),
            processor: InputProcessor::default(),
            movement: CharacterController::from_config(&config.movement),
            driver,
            character: AssetSlot::new(),
            loader: AssetLoader::new(config.assets.clone()),
            selected_clip: config.assets.default_clip.clone(),
            stats: FrameStats::default(),
            viewport: (width, height),
            dt: 0.0,
            world,
            scene,
            config,
        }
    }

    /// Start loading `clip`; it replaces the active model when it arrives
    pub fn select_clip(&mut self, clip: &str) -> LoadTicket {
        let ticket = self.character.request();
        self.selected_clip = clip.to_string();
        self.loader.load(ticket, clip);
        ticket
    }

    /// Swap in the newest finished load, dropping superseded ones
    pub fn apply_completed_loads(&mut self) {
        for LoadCompletion { ticket, clip, result } in self.loader.drain() {
            match result {
                Ok(model) => match self.character.complete(ticket, Character::new(model)) {
                    SwapOutcome::Applied { replaced } => {
                        tracing::info!(ticket = ticket.0, %clip, replaced = ?replaced.map(|t| t.0), "character swapped in");
                    }
                    SwapOutcome::Discarded { latest } => {
                        tracing::debug!(ticket = ticket.0, latest = latest.0, %clip, "superseded load discarded");
                    }
                },
                Err(error) => {
                    self.character.fail(ticket);
                    tracing::error!(ticket = ticket.0, %clip, %error, "asset load failed");
                }
            }
        }
    }

    pub fn resize(&mut self, width: u32, height: u32, renderer: &mut dyn FrameRenderer) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.camera.set_aspect(width, height);
        renderer.resize(width, height);
        tracing::debug!(width, height, "viewport resized");
    }

    /// One display refresh: clock, loads, animation, movement, physics, render
    pub fn tick(&mut self, now_ms: f64, renderer: &mut dyn FrameRenderer) -> Result<(), PhysicsError> {
        let dt = self.clock.delta(now_ms);
        self.dt = dt;

        self.apply_completed_loads();

        {
            let mut input = self.input.borrow_mut();
            if let Some(character) = self.character.active_mut() {
                let moving = self.processor.any_movement(&input);
                // Applied before advancing, so a key press animates on the same frame
                character.mixer.time_scale = if moving { 1.0 } else { 0.0 };
                character.advance(dt);
                self.movement.apply(&mut character.position, &input, &self.processor, dt);
            }
            self.orbit.update(&mut input, &mut self.camera);
        }

        let report = self.driver.update(&mut self.world, &self.scene.bindings, &mut self.scene.proxies, dt)?;
        self.stats.record(dt, &report);

        renderer.render(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::input::InputEvent;
    use crate::error::AssetError;
    use crate::model::character::tests::two_bone_model;

    #[derive(Default)]
    struct RecordingRenderer {
        frames: u32,
        sizes: Vec<(u32, u32)>,
        active: Vec<Option<LoadTicket>>,
        proxy_positions: Vec<Vec3>,
    }

    impl FrameRenderer for RecordingRenderer {
        fn resize(&mut self, width: u32, height: u32) {
            self.sizes.push((width, height));
        }

        fn render(&mut self, ctx: &mut FrameLoopContext) {
            self.frames += 1;
            self.active.push(ctx.character.active_ticket());
            self.proxy_positions = ctx.scene.proxies.iter().map(|p| p.pose.position).collect();
        }
    }

    fn context() -> FrameLoopContext {
        let mut config = DemoConfig::default();
        config.scene.star_count = 4;
        config.scene.floor_segments = 2;
        config.scene.particle_count = 8;
        FrameLoopContext::new(config, 800, 600)
    }

    fn press(ctx: &FrameLoopContext, code: &str) {
        ctx.input.borrow_mut().process_event(&InputEvent::KeyDown(code.to_string()));
    }

    fn loaded(ctx: &mut FrameLoopContext) -> LoadTicket {
        let ticket = ctx.character.request();
        ctx.loader.complete(LoadCompletion {
            ticket,
            clip: "two-bone".to_string(),
            result: Ok(two_bone_model()),
        });
        ticket
    }

    #[test]
    fn test_clock_delta() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.delta(5000.0), 0.0, "first frame has no delta");
        assert_eq!(clock.delta(5500.0), 0.5);
        assert_eq!(clock.delta(5400.0), 0.0, "time never runs backwards");
        assert_eq!(clock.delta(6000.0), 0.5);
    }

    #[test]
    fn test_tick_steps_and_renders() {
        let mut ctx = context();
        let mut renderer = RecordingRenderer::default();
        let mut now = 0.0;
        for _ in 0..10 {
            ctx.tick(now, &mut renderer).unwrap();
            now += 1000.0 / 60.0;
        }
        assert_eq!(renderer.frames, 10);
        assert!(ctx.world.steps_taken() >= 8);

        let bodies: Vec<Vec3> = ctx
            .scene
            .bindings
            .iter()
            .map(|b| ctx.world.pose(b.body).unwrap().position)
            .collect();
        assert_eq!(renderer.proxy_positions, bodies, "render sees synced proxies");
    }

    #[test]
    fn test_character_moves_only_with_keys() {
        let mut ctx = context();
        let mut renderer = RecordingRenderer::default();
        loaded(&mut ctx);

        ctx.tick(0.0, &mut renderer).unwrap();
        ctx.tick(500.0, &mut renderer).unwrap();
        let character = ctx.character.active().unwrap();
        assert_eq!(character.position, Vec3::ZERO);
        assert_eq!(character.mixer.time_scale, 0.0, "idle character is paused");
        assert_eq!(character.mixer.time, 0.0);

        press(&ctx, "KeyW");
        ctx.tick(1000.0, &mut renderer).unwrap();
        let character = ctx.character.active().unwrap();
        assert_eq!(character.position, Vec3::new(0.0, 0.0, -50.0));
        assert_eq!(character.mixer.time_scale, 1.0);
        assert_eq!(character.mixer.time, 0.5);
    }

    #[test]
    fn test_second_load_wins() {
        let mut ctx = context();
        let mut renderer = RecordingRenderer::default();

        let first = ctx.character.request();
        let second = ctx.character.request();
        ctx.loader.complete(LoadCompletion {
            ticket: second,
            clip: "second".to_string(),
            result: Ok(two_bone_model()),
        });
        ctx.loader.complete(LoadCompletion {
            ticket: first,
            clip: "first".to_string(),
            result: Ok(two_bone_model()),
        });

        ctx.tick(0.0, &mut renderer).unwrap();
        assert_eq!(ctx.character.active_ticket(), Some(second));
        assert_eq!(renderer.active, vec![Some(second)]);
        assert!(!ctx.character.is_loading());
    }

    #[test]
    fn test_failed_load_keeps_previous_model() {
        let mut ctx = context();
        let mut renderer = RecordingRenderer::default();
        let first = loaded(&mut ctx);
        ctx.tick(0.0, &mut renderer).unwrap();

        let second = ctx.character.request();
        ctx.loader.complete(LoadCompletion {
            ticket: second,
            clip: "missing".to_string(),
            result: Err(AssetError::MissingAnimation),
        });
        ctx.tick(16.0, &mut renderer).unwrap();
        assert_eq!(ctx.character.active_ticket(), Some(first));
    }

    #[test]
    fn test_resize_updates_camera_and_renderer() {
        let mut ctx = context();
        let mut renderer = RecordingRenderer::default();
        ctx.resize(1920, 1080, &mut renderer);
        assert_eq!(ctx.camera.aspect, 1920.0 / 1080.0);
        assert_eq!(ctx.viewport, (1920, 1080));
        assert_eq!(renderer.sizes, vec![(1920, 1080)]);

        ctx.resize(0, 1080, &mut renderer);
        assert_eq!(renderer.sizes.len(), 1, "minimized windows are ignored");
    }
}
