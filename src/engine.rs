use crate::browser;
use anyhow::{anyhow, Result};
// ELI5: web assembly is a single threaded environment, so Rc RefCell > Mutex
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - because we control the closure creation and specify the expected type,
    // in principle this should be generally safe (unsafe) code
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlAudioElement, HtmlImageElement, HtmlVideoElement};

use self::input::KeyState;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, keystate: &KeyState);
    fn draw(&mut self, renderer: &Renderer);

    /// A halted game stops the frame loop until the next input event
    fn is_halted(&self) -> bool {
        false
    }
}

// length of a frame in milliseconds
const FRAME_SIZE: f32 = 1.0 / 60.0 * 1000.0;
// cap on catch-up time so resuming a halted loop doesn't replay seconds of updates
const MAX_FRAME_DELTA: f32 = FRAME_SIZE * 5.0;

pub struct GameLoop {
    last_frame: f64,
    accumulated_delta: f32,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut input_receiver = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop {
            last_frame: browser::now()?,
            accumulated_delta: 0.0,
        };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let mut keystate = KeyState::new();
        let halted = Rc::new(Cell::new(false));

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        let loop_halted = halted.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            input::process_input(&mut keystate, &mut input_receiver);

            let delta = (perf - game_loop.last_frame) as f32;
            game_loop.accumulated_delta += delta.min(MAX_FRAME_DELTA);
            while game_loop.accumulated_delta > FRAME_SIZE {
                game.update(&keystate);
                // one-shot presses and clicks are consumed by the first update
                keystate.end_frame();
                game_loop.accumulated_delta -= FRAME_SIZE;
            }
            game_loop.last_frame = perf;
            game.draw(&renderer);

            // ELI5: not asking for another frame IS how the loop stops
            if game.is_halted() {
                log::debug!("GameLoop: halted, waiting for input");
                loop_halted.set(true);
                return;
            }
            if let Some(closure) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(closure) {
                    log::error!("GameLoop: could not request frame : {:#}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        // any key or click wakes a halted loop, the game decides what the
        // input means on the next update
        let wake = move || {
            if halted.replace(false) {
                log::debug!("GameLoop: resuming");
                if let Some(closure) = g.borrow().as_ref() {
                    if let Err(err) = browser::request_animation_frame(closure) {
                        log::error!("GameLoop: could not resume : {:#}", err);
                    }
                }
            }
        };
        let wake = Rc::new(wake);
        let on_key = wake.clone();
        browser::add_window_listener("keydown", move |_: web_sys::Event| on_key())?;
        browser::add_window_listener("click", move |_: web_sys::Event| wake())?;

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub const fn new_from_x_y(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect::new(Point { x, y }, Size { width, height })
    }

    /// Box of the given size centered on `center`
    pub fn centered_on(center: Point, size: Size) -> Self {
        Rect::new_from_x_y(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn left(&self) -> f64 {
        self.x()
    }

    pub fn right(&self) -> f64 {
        self.x() + self.width()
    }

    pub fn top(&self) -> f64 {
        self.y()
    }

    pub fn bottom(&self) -> f64 {
        self.y() + self.height()
    }

    /// Axis aligned overlap, touching edges count as a hit
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() < other.left()
            || self.left() > other.right()
            || self.bottom() < other.top()
            || self.top() > other.bottom())
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left()
            && point.x <= self.right()
            && point.y >= self.top()
            && point.y <= self.bottom()
    }

    /// zero or negative sized rects are never handed to the canvas
    pub fn is_drawable(&self) -> bool {
        self.width() > 0.0 && self.height() > 0.0
    }
}

/// What a frame source hands the renderer once it's ready
pub enum FrameHandle<'a> {
    Image(&'a HtmlImageElement),
    Video(&'a HtmlVideoElement),
}

/// Capability of asynchronously loaded media : the loop never waits on a
/// load, it polls `is_ready()` every frame and skips the draw until true
pub trait FrameSource {
    fn is_ready(&self) -> bool;
    fn current_frame(&self) -> FrameHandle<'_>;
    fn natural_size(&self) -> Size;
}

pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn clear(&self, rect: &Rect) {
        self.context
            .clear_rect(rect.x(), rect.y(), rect.width(), rect.height());
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        if !rect.is_drawable() {
            return;
        }
        self.context.set_fill_style_str(color);
        self.context
            .fill_rect(rect.x(), rect.y(), rect.width(), rect.height());
    }

    pub fn stroke_rect(&self, rect: &Rect, color: &str, line_width: f64) {
        if !rect.is_drawable() {
            return;
        }
        self.context.set_stroke_style_str(color);
        self.context.set_line_width(line_width);
        self.context
            .stroke_rect(rect.x(), rect.y(), rect.width(), rect.height());
    }

    /// Draws `frame` (source pixels) of `source` into `destination`
    /// - returns false when nothing was drawn (not ready, bad geometry, or
    /// the canvas refused), so callers can fall back to a fill
    pub fn draw_frame(&self, source: &dyn FrameSource, frame: &Rect, destination: &Rect) -> bool {
        if !source.is_ready() || !frame.is_drawable() || !destination.is_drawable() {
            return false;
        }
        let result = match source.current_frame() {
            FrameHandle::Image(image) => self
                .context
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    image,
                    frame.x(),
                    frame.y(),
                    frame.width(),
                    frame.height(),
                    destination.x(),
                    destination.y(),
                    destination.width(),
                    destination.height(),
                ),
            FrameHandle::Video(video) => self
                .context
                .draw_image_with_html_video_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    video,
                    frame.x(),
                    frame.y(),
                    frame.width(),
                    frame.height(),
                    destination.x(),
                    destination.y(),
                    destination.width(),
                    destination.height(),
                ),
        };
        match result {
            Ok(()) => true,
            Err(err) => {
                log::warn!("Renderer: draw_frame failed : {:?}", err);
                false
            }
        }
    }

    /// Draws the whole source scaled into `destination`
    pub fn draw_entire_frame(&self, source: &dyn FrameSource, destination: &Rect) -> bool {
        let size = source.natural_size();
        self.draw_frame(source, &Rect::new(Point::default(), size), destination)
    }

    /// Draws the whole source centered on `center`, rotated by `angle` radians
    pub fn draw_rotated(&self, source: &dyn FrameSource, center: Point, size: Size, angle: f64) -> bool {
        self.context.save();
        let drawn = self
            .context
            .translate(center.x, center.y)
            .and_then(|_| self.context.rotate(angle))
            .map(|_| {
                self.draw_entire_frame(
                    source,
                    &Rect::centered_on(Point::default(), size),
                )
            })
            .unwrap_or_else(|err| {
                log::warn!("Renderer: transform failed : {:?}", err);
                false
            });
        self.context.restore();
        drawn
    }

    pub fn draw_text(&self, text: &str, position: Point, style: &TextStyle) {
        self.context.set_font(style.font);
        self.context.set_fill_style_str(style.color);
        self.context.set_text_align(style.align);
        self.context.set_text_baseline(style.baseline);
        if let Err(err) = self.context.fill_text(text, position.x, position.y) {
            log::warn!("Renderer: fill_text failed : {:?}", err);
        }
    }

    pub fn measure_text(&self, text: &str, font: &str) -> f64 {
        self.context.set_font(font);
        self.context
            .measure_text(text)
            .map(|metrics| metrics.width())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub font: &'static str,
    pub color: &'static str,
    pub align: &'static str,
    pub baseline: &'static str,
}

/// Image with a ready flag flipped by its onload callback
pub struct Image {
    element: HtmlImageElement,
    ready: Rc<Cell<bool>>,
}

impl Image {
    /// Starts loading `source` and returns immediately (fire-and-forget)
    pub fn load(source: &str) -> Result<Self> {
        let element = browser::new_image()?;
        let ready = Rc::new(Cell::new(false));

        let success_ready = ready.clone();
        let success_callback = browser::closure_once(move || success_ready.set(true));
        let path = source.to_string();
        let error_callback = browser::closure_once(move |err: JsValue| {
            log::warn!("Image: could not load {} : {:?}", path, err);
        });

        element.set_onload(Some(success_callback.as_ref().unchecked_ref()));
        element.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
        element.set_src(source);

        // keep callback alive until image is loaded or errors
        success_callback.forget();
        error_callback.forget();

        Ok(Image { element, ready })
    }
}

impl FrameSource for Image {
    fn is_ready(&self) -> bool {
        self.ready.get() && self.element.complete() && self.element.natural_width() > 0
    }

    fn current_frame(&self) -> FrameHandle<'_> {
        FrameHandle::Image(&self.element)
    }

    fn natural_size(&self) -> Size {
        Size {
            width: self.element.natural_width().into(),
            height: self.element.natural_height().into(),
        }
    }
}

/// Video used as a (frozen) frame source
/// - `freeze_at` : seconds to seek to before pausing, None keeps the
/// playback position untouched
pub struct Video {
    element: HtmlVideoElement,
    ready: Rc<Cell<bool>>,
    freeze_at: Option<f64>,
}

impl Video {
    pub fn load(source: &str, freeze_at: Option<f64>) -> Result<Self> {
        let element = browser::new_video()?;
        element.set_cross_origin(Some("anonymous"));
        element.set_muted(true);
        element.set_preload("auto");
        element
            .set_attribute("playsinline", "")
            .map_err(|err| anyhow!("Could not set playsinline : {:#?}", err))?;
        element.set_src(source);

        let ready = Rc::new(Cell::new(false));

        if let Some(time) = freeze_at {
            let seek_target = element.clone();
            browser::add_listener(&element, "loadedmetadata", move |_: web_sys::Event| {
                seek_target.set_current_time(time);
            })?;
        }

        let paused = element.clone();
        let seeked_ready = ready.clone();
        browser::add_listener(&element, "seeked", move |_: web_sys::Event| {
            if let Err(err) = paused.pause() {
                log::warn!("Video: pause after seek failed : {:?}", err);
            }
            seeked_ready.set(true);
        })?;

        let paused = element.clone();
        let data_ready = ready.clone();
        browser::add_listener(&element, "loadeddata", move |_: web_sys::Event| {
            if let Err(err) = paused.pause() {
                log::warn!("Video: pause after load failed : {:?}", err);
            }
            data_ready.set(true);
        })?;

        element.load();
        Ok(Video {
            element,
            ready,
            freeze_at,
        })
    }

    /// Pause on the freeze frame, seeking there first when one is set
    pub fn freeze(&self) {
        if let Some(time) = self.freeze_at {
            self.element.set_current_time(time);
        }
        if let Err(err) = self.element.pause() {
            log::warn!("Video: pause failed : {:?}", err);
        }
    }
}

impl FrameSource for Video {
    fn is_ready(&self) -> bool {
        self.ready.get() && self.element.video_width() > 0
    }

    fn current_frame(&self) -> FrameHandle<'_> {
        FrameHandle::Video(&self.element)
    }

    fn natural_size(&self) -> Size {
        Size {
            width: self.element.video_width().into(),
            height: self.element.video_height().into(),
        }
    }
}

/// Fire-and-forget sound clip, playback failures are logged and swallowed
#[derive(Clone)]
pub struct Audio {
    element: HtmlAudioElement,
}

impl Audio {
    pub fn load(source: &str) -> Result<Self> {
        let element = browser::new_audio(source)?;
        element.set_preload("auto");
        Ok(Audio { element })
    }

    pub fn set_looping(&self, looping: bool) {
        self.element.set_loop(looping);
    }

    pub fn set_volume(&self, volume: f64) {
        self.element.set_volume(volume);
    }

    /// Restart from the beginning and play
    pub fn play(&self) {
        self.element.set_current_time(0.0);
        match self.element.play() {
            Ok(promise) => browser::spawn_local(async move {
                if let Err(err) = wasm_bindgen_futures::JsFuture::from(promise).await {
                    log::warn!("Audio: play failed : {:?}", err);
                }
            }),
            Err(err) => log::warn!("Audio: error playing sound : {:?}", err),
        }
    }

    pub fn pause(&self) {
        if let Err(err) = self.element.pause() {
            log::warn!("Audio: pause failed : {:?}", err);
        }
    }

    /// pause and rewind
    pub fn stop(&self) {
        self.pause();
        self.element.set_current_time(0.0);
    }

    /// Runs `callback` every time the clip plays through to its end, a
    /// paused or stopped clip never fires it
    pub fn on_ended(&self, mut callback: impl FnMut() + 'static) -> Result<()> {
        browser::add_listener(&self.element, "ended", move |_: web_sys::Event| callback())
    }
}

pub mod input {
    use crate::browser;
    use crate::engine::Point;
    use anyhow::Result;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
    use std::collections::HashSet;

    // on-screen buttons and the key code they stand in for
    const BUTTONS: [(&str, &str); 4] = [
        ("btnUp", "ArrowUp"),
        ("btnDown", "ArrowDown"),
        ("btnLeft", "ArrowLeft"),
        ("btnRight", "ArrowRight"),
    ];

    #[derive(Debug, Clone, PartialEq)]
    pub enum InputEvent {
        KeyDown(String),
        KeyUp(String),
        /// click position in canvas (logical pixel) space
        Click(Point),
    }

    /// Held keys plus the one-shot presses and clicks of the current frame
    #[derive(Debug, Default)]
    pub struct KeyState {
        held: HashSet<String>,
        presses: Vec<String>,
        clicks: Vec<Point>,
    }

    impl KeyState {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_pressed(&self, code: &str) -> bool {
            self.held.contains(code)
        }

        /// true if a keydown (including OS auto-repeat) for `code` arrived
        /// since the last update
        pub fn was_pressed(&self, code: &str) -> bool {
            self.presses.iter().any(|pressed| pressed == code)
        }

        pub fn presses(&self) -> impl Iterator<Item = &str> {
            self.presses.iter().map(String::as_str)
        }

        pub fn clicks(&self) -> &[Point] {
            &self.clicks
        }

        pub fn apply(&mut self, event: InputEvent) {
            match event {
                InputEvent::KeyDown(code) => {
                    self.held.insert(code.clone());
                    self.presses.push(code);
                }
                InputEvent::KeyUp(code) => {
                    self.held.remove(&code);
                }
                InputEvent::Click(point) => self.clicks.push(point),
            }
        }

        pub fn end_frame(&mut self) {
            self.presses.clear();
            self.clicks.clear();
        }
    }

    pub fn process_input(state: &mut KeyState, receiver: &mut UnboundedReceiver<InputEvent>) {
        // ELI5: try_next() never blocks
        // - Ok(Some(evt)) -> an event is waiting
        // - Ok(None)      -> channel closed
        // - Err(_)        -> nothing queued this frame
        while let Ok(Some(event)) = receiver.try_next() {
            state.apply(event);
        }
    }

    pub fn prepare_input() -> Result<UnboundedReceiver<InputEvent>> {
        let (sender, receiver) = unbounded();

        let down = sender.clone();
        browser::add_window_listener("keydown", move |event: web_sys::KeyboardEvent| {
            send(&down, InputEvent::KeyDown(event.code()));
        })?;
        let up = sender.clone();
        browser::add_window_listener("keyup", move |event: web_sys::KeyboardEvent| {
            send(&up, InputEvent::KeyUp(event.code()));
        })?;

        let canvas = browser::canvas()?;
        let click = sender.clone();
        let target = canvas.clone();
        browser::add_listener(&canvas, "click", move |event: web_sys::MouseEvent| {
            // css pixels -> canvas pixels
            let client_width = f64::from(target.client_width().max(1));
            let client_height = f64::from(target.client_height().max(1));
            let point = Point {
                x: f64::from(event.offset_x()) * f64::from(target.width()) / client_width,
                y: f64::from(event.offset_y()) * f64::from(target.height()) / client_height,
            };
            send(&click, InputEvent::Click(point));
        })?;

        for (id, code) in BUTTONS {
            // buttons are optional page furniture
            if let Some(button) = browser::element_by_id(id) {
                let press = sender.clone();
                browser::add_listener(&button, "click", move |event: web_sys::Event| {
                    event.prevent_default();
                    send(&press, InputEvent::KeyDown(code.to_string()));
                    send(&press, InputEvent::KeyUp(code.to_string()));
                })?;
            }
        }

        Ok(receiver)
    }

    fn send(sender: &UnboundedSender<InputEvent>, event: InputEvent) {
        if let Err(err) = sender.unbounded_send(event) {
            log::warn!("input: dropped event : {:?}", err);
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn presses_last_one_update_but_held_keys_stay() {
            let mut state = KeyState::new();
            state.apply(InputEvent::KeyDown("ArrowUp".into()));
            assert!(state.was_pressed("ArrowUp"));
            assert!(state.is_pressed("ArrowUp"));

            state.end_frame();
            assert!(!state.was_pressed("ArrowUp"));
            assert!(state.is_pressed("ArrowUp"));

            state.apply(InputEvent::KeyUp("ArrowUp".into()));
            assert!(!state.is_pressed("ArrowUp"));
        }

        #[test]
        fn clicks_are_drained_from_the_channel() {
            let (sender, mut receiver) = unbounded();
            sender
                .unbounded_send(InputEvent::Click(Point { x: 10.0, y: 20.0 }))
                .unwrap();
            sender
                .unbounded_send(InputEvent::KeyDown("KeyR".into()))
                .unwrap();

            let mut state = KeyState::new();
            process_input(&mut state, &mut receiver);

            assert_eq!(state.clicks(), &[Point { x: 10.0, y: 20.0 }]);
            assert!(state.was_pressed("KeyR"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_edges_intersect() {
        let a = Rect::new_from_x_y(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new_from_x_y(10.0, 10.0, 5.0, 5.0);
        let c = Rect::new_from_x_y(10.1, 0.0, 5.0, 5.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn centered_rect_spans_half_size_each_way() {
        let rect = Rect::centered_on(Point { x: 50.0, y: 300.0 }, Size { width: 50.0, height: 50.0 });

        assert_eq!(rect.left(), 25.0);
        assert_eq!(rect.right(), 75.0);
        assert_eq!(rect.top(), 275.0);
        assert_eq!(rect.bottom(), 325.0);
    }

    #[test]
    fn contains_is_inclusive() {
        let button = Rect::new_from_x_y(120.0, 1519.0, 160.0, 42.0);

        assert!(button.contains(Point { x: 120.0, y: 1519.0 }));
        assert!(button.contains(Point { x: 200.0, y: 1540.0 }));
        assert!(!button.contains(Point { x: 119.9, y: 1540.0 }));
    }

    #[test]
    fn empty_rects_are_not_drawable() {
        assert!(!Rect::new_from_x_y(0.0, 0.0, 0.0, 10.0).is_drawable());
        assert!(!Rect::new_from_x_y(0.0, 0.0, 10.0, -1.0).is_drawable());
        assert!(Rect::new_from_x_y(-5.0, -5.0, 1.0, 1.0).is_drawable());
    }
}
