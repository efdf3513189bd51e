use std::sync::Arc;
use std::time::Instant;

use winit::{
    event::*,
    event_loop::EventLoop,
    keyboard::PhysicalKey,
    window::Window,
};

// Import from the library crate
use stardance::{
    config::DemoConfig,
    controller::{input::MouseButton as DragButton, FrameLoopContext, InputEvent},
    error::GpuError,
    logging,
    view::{GpuContext, RenderState},
};

/// Browser-equivalent wheel delta for one line of scrolling
const PIXELS_PER_LINE: f32 = 100.0;

struct App {
    window: Arc<Window>,
    frame: FrameLoopContext,
    renderer: RenderState,
    egui_state: egui_winit::State,
    started: Instant,
    last_cursor: Option<(f64, f64)>,
}

impl App {
    async fn new(window: Arc<Window>, config: DemoConfig) -> Result<Self, GpuError> {
        let gpu = GpuContext::new_native(window.clone()).await?;
        let (width, height) = (gpu.config.width, gpu.config.height);

        let mut frame = FrameLoopContext::new(config, width, height);
        let renderer = RenderState::new(gpu, &frame.scene, &frame.config);
        let egui_state = egui_winit::State::new(
            renderer.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        let clip = frame.config.assets.default_clip.clone();
        frame.select_clip(&clip);

        Ok(Self {
            window,
            frame,
            renderer,
            egui_state,
            started: Instant::now(),
            last_cursor: None,
        })
    }

    /// Translate a window event into demo input; egui sees it first
    fn input(&mut self, event: &WindowEvent) {
        let consumed = self.egui_state.on_window_event(&self.window, event).consumed;
        let mut input = self.frame.input.borrow_mut();

        match event {
            WindowEvent::KeyboardInput {
                event: KeyEvent { state, physical_key: PhysicalKey::Code(code), .. },
                ..
            } => {
                let name = format!("{code:?}");
                match state {
                    ElementState::Pressed if !consumed => input.process_event(&InputEvent::KeyDown(name)),
                    // Releases always go through so keys never stick
                    ElementState::Released => input.process_event(&InputEvent::KeyUp(name)),
                    _ => {}
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Left, .. } => {
                let is_down = *state == ElementState::Pressed;
                if !(is_down && consumed) {
                    input.process_event(&InputEvent::MouseButton { button: DragButton::Left, is_down });
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some((last_x, last_y)) = self.last_cursor {
                    input.process_event(&InputEvent::MouseMove {
                        dx: (position.x - last_x) as f32,
                        dy: (position.y - last_y) as f32,
                    });
                }
                self.last_cursor = Some((position.x, position.y));
            }
            WindowEvent::CursorLeft { .. } => self.last_cursor = None,
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let delta_y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * PIXELS_PER_LINE,
                    MouseScrollDelta::PixelDelta(p) => -p.y as f32,
                };
                input.process_event(&InputEvent::MouseWheel { delta_y });
            }
            WindowEvent::Focused(false) => input.process_event(&InputEvent::FocusLost),
            WindowEvent::Occluded(occluded) => {
                input.process_event(&InputEvent::VisibilityChanged { visible: !occluded });
            }
            _ => {}
        }
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        self.frame.resize(size.width, size.height, &mut self.renderer);
    }

    fn redraw(&mut self) {
        let raw_input = self.egui_state.take_egui_input(&self.window);
        self.renderer.set_egui_input(raw_input);

        let now_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        if let Err(error) = self.frame.tick(now_ms, &mut self.renderer) {
            tracing::error!(%error, "frame failed");
        }

        if let Some(output) = self.renderer.platform_output.take() {
            self.egui_state.handle_platform_output(&self.window, output);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();
    let config = DemoConfig::from_env();

    let event_loop = EventLoop::new()?;
    let window_attributes = Window::default_attributes()
        .with_title("Stardance")
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
    #[allow(deprecated)]
    let window = Arc::new(event_loop.create_window(window_attributes)?);

    let mut app = pollster::block_on(App::new(window, config))?;

    #[allow(deprecated)]
    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(physical_size) => app.resize(*physical_size),
            WindowEvent::RedrawRequested => app.redraw(),
            _ => app.input(event),
        },
        Event::AboutToWait => {
            app.window.request_redraw();
        }
        _ => {}
    })?;

    Ok(())
}
