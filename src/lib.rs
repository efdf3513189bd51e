// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;
pub mod ui;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
use std::{cell::RefCell, rc::Rc};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, prelude::wasm_bindgen, JsCast, JsValue};
#[cfg(target_arch = "wasm32")]
use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

#[cfg(target_arch = "wasm32")]
use crate::{
    config::DemoConfig,
    controller::{input::wasm as web_input, FrameLoopContext, InputEvent, InputProcessor, InputState},
    view::{GpuContext, RenderState},
};

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    logging::init();

    let (window, document, canvas) = init_canvas()?;
    let (width, height) = (canvas.width(), canvas.height());

    let gpu = GpuContext::new(&canvas, width, height)
        .await
        .map_err(|e| js_error(format!("GPU init failed: {e}")))?;

    let mut frame = FrameLoopContext::new(DemoConfig::default(), width, height);
    let mut render_state = RenderState::new(gpu, &frame.scene, &frame.config);
    let default_clip = frame.config.assets.default_clip.clone();
    frame.select_clip(&default_clip);

    let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));
    setup_input_listeners(
        &document,
        &window,
        &canvas,
        frame.input.clone(),
        frame.processor.clone(),
        render_state.egui_ctx.clone(),
        egui_events.clone(),
    )?;

    let performance = window.performance().ok_or_else(|| js_error("no performance on window"))?;
    let window_for_loop = window.clone();
    let canvas_for_loop = canvas.clone();
    RcCellCallback::new(window, move || {
        handle_resize(&window_for_loop, &canvas_for_loop, &mut frame, &mut render_state);

        let now = performance.now();
        let events = std::mem::take(&mut *egui_events.borrow_mut());
        render_state.set_egui_input(egui::RawInput {
            events,
            time: Some(now / 1000.0),
            ..Default::default()
        });

        if let Err(error) = frame.tick(now, &mut render_state) {
            tracing::error!(%error, "frame failed");
        }
    })
    .start();

    Ok(())
}

/// Wire DOM events into the shared input state and egui's event queue
#[cfg(target_arch = "wasm32")]
fn setup_input_listeners(
    document: &Document,
    window: &Window,
    canvas: &HtmlCanvasElement,
    input_state: Rc<RefCell<InputState>>,
    processor: InputProcessor,
    egui_ctx: egui::Context,
    egui_events: Rc<RefCell<Vec<egui::Event>>>,
) -> Result<(), JsValue> {
    // Keyboard down
    {
        let input_state = input_state.clone();
        let processor = processor.clone();
        let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            if processor.is_bound(&e.code()) {
                e.prevent_default();
            }
            input_state.borrow_mut().process_event(&web_input::keyboard_event_to_input(&e, true));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
        keydown.forget();
    }

    // Keyboard up
    {
        let input_state = input_state.clone();
        let keyup = Closure::wrap(Box::new(move |e: KeyboardEvent| {
            input_state.borrow_mut().process_event(&web_input::keyboard_event_to_input(&e, false));
        }) as Box<dyn FnMut(KeyboardEvent)>);
        document.add_event_listener_with_callback("keyup", keyup.as_ref().unchecked_ref())?;
        keyup.forget();
    }

    // Focus loss - clear all keys
    {
        let input_state = input_state.clone();
        let blur = Closure::wrap(Box::new(move |_e: Event| {
            input_state.borrow_mut().process_event(&InputEvent::FocusLost);
        }) as Box<dyn FnMut(Event)>);
        window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
        blur.forget();
    }

    // Visibility change - clear all keys
    {
        let input_state = input_state.clone();
        let document_for_state = document.clone();
        let visibility = Closure::wrap(Box::new(move |_e: Event| {
            let visible = !document_for_state.hidden();
            input_state.borrow_mut().process_event(&InputEvent::VisibilityChanged { visible });
        }) as Box<dyn FnMut(Event)>);
        document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
        visibility.forget();
    }

    // Mouse down on the canvas starts an orbit drag unless egui has the pointer
    {
        let input_state = input_state.clone();
        let egui_ctx = egui_ctx.clone();
        let egui_events = egui_events.clone();
        let mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
            egui_events.borrow_mut().push(pointer_button_event(&e, true));
            if !egui_ctx.is_pointer_over_area() {
                input_state.borrow_mut().process_event(&web_input::mouse_button_to_input(&e, true));
            }
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
        mousedown.forget();
    }

    // Mouse up anywhere ends the drag
    {
        let input_state = input_state.clone();
        let egui_events = egui_events.clone();
        let mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
            egui_events.borrow_mut().push(pointer_button_event(&e, false));
            input_state.borrow_mut().process_event(&web_input::mouse_button_to_input(&e, false));
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
        mouseup.forget();
    }

    // Mouse move
    {
        let input_state = input_state.clone();
        let egui_events = egui_events.clone();
        let mousemove = Closure::wrap(Box::new(move |e: MouseEvent| {
            egui_events
                .borrow_mut()
                .push(egui::Event::PointerMoved(egui::pos2(e.client_x() as f32, e.client_y() as f32)));
            input_state.borrow_mut().process_event(&web_input::mouse_move_to_input(&e));
        }) as Box<dyn FnMut(MouseEvent)>);
        document.add_event_listener_with_callback("mousemove", mousemove.as_ref().unchecked_ref())?;
        mousemove.forget();
    }

    // Context menu prevention
    {
        let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
            e.prevent_default();
        }) as Box<dyn FnMut(MouseEvent)>);
        canvas.add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
        contextmenu.forget();
    }

    // Mouse wheel zooms the orbit camera
    {
        let input_state = input_state.clone();
        let wheel = Closure::wrap(Box::new(move |e: WheelEvent| {
            if egui_ctx.is_pointer_over_area() {
                return;
            }
            input_state.borrow_mut().process_event(&web_input::wheel_to_input(&e));
            e.prevent_default();
        }) as Box<dyn FnMut(WheelEvent)>);
        canvas.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
        wheel.forget();
    }

    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn pointer_button_event(e: &MouseEvent, pressed: bool) -> egui::Event {
    let button = match e.button() {
        1 => egui::PointerButton::Middle,
        2 => egui::PointerButton::Secondary,
        _ => egui::PointerButton::Primary,
    };
    egui::Event::PointerButton {
        pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
        button,
        pressed,
        modifiers: egui::Modifiers::default(),
    }
}

/// Follow the browser window size; polled once per frame
#[cfg(target_arch = "wasm32")]
fn handle_resize(window: &Window, canvas: &HtmlCanvasElement, frame: &mut FrameLoopContext, render_state: &mut RenderState) {
    let (width, height) = window_size(window);
    if width == 0 || height == 0 || (width, height) == (canvas.width(), canvas.height()) {
        return;
    }
    canvas.set_width(width);
    canvas.set_height(height);
    frame.resize(width, height, render_state);
}

#[cfg(target_arch = "wasm32")]
fn window_size(window: &Window) -> (u32, u32) {
    let dimension = |value: Result<JsValue, JsValue>| value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0) as u32;
    (dimension(window.inner_width()), dimension(window.inner_height()))
}

#[cfg(target_arch = "wasm32")]
fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
    let window = web_sys::window().ok_or_else(|| js_error("no global `window`"))?;
    let document = window.document().ok_or_else(|| js_error("no document on window"))?;
    let body = document.body().ok_or_else(|| js_error("no body on document"))?;
    let canvas_el = document
        .create_element("canvas")?
        .dyn_into::<HtmlCanvasElement>()
        .map_err(|_| js_error("failed to create canvas"))?;
    let (width, height) = window_size(&window);
    canvas_el.set_width(width.max(1));
    canvas_el.set_height(height.max(1));
    body.append_child(&canvas_el)?;
    Ok((window, document, canvas_el))
}

#[cfg(target_arch = "wasm32")]
fn js_error<E: Into<String>>(msg: E) -> JsValue {
    JsValue::from_str(&msg.into())
}

/// requestAnimationFrame loop that reschedules itself after every call
#[cfg(target_arch = "wasm32")]
struct RcCellCallback {
    inner: Rc<RefCell<Box<dyn FnMut()>>>,
    window: Window,
}

#[cfg(target_arch = "wasm32")]
impl RcCellCallback {
    fn new(window: Window, f: impl FnMut() + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Box::new(f))),
            window,
        }
    }

    fn schedule(window: &Window, callback: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
        let callback = callback.borrow();
        let Some(closure) = callback.as_ref() else {
            return;
        };
        if let Err(e) = window.request_animation_frame(closure.as_ref().unchecked_ref()) {
            tracing::error!(error = ?e, "requestAnimationFrame failed");
        }
    }

    fn start(self) {
        let inner = self.inner.clone();
        let window = self.window.clone();

        let callback = Rc::new(RefCell::new(None::<Closure<dyn FnMut()>>));
        let callback_clone = callback.clone();

        *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            inner.borrow_mut().as_mut()();
            Self::schedule(&window, &callback_clone);
        }) as Box<dyn FnMut()>));

        Self::schedule(&self.window, &callback);

        // Leak the closure to keep it alive
        std::mem::forget(callback);
    }
}
