use crate::browser;
use anyhow::{anyhow, Error, Result};
// wasm is single threaded, so Rc RefCell over Mutex
use async_trait::async_trait;
use futures::channel::oneshot::channel;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::{
    // unchecked_ref (unsafe) cast from Javascript type to Rust type
    // - we create the closures ourselves, so the expected type is known
    JsCast,
    JsValue,
};
use web_sys::{CanvasRenderingContext2d, HtmlImageElement};

use self::input::KeyState;

#[async_trait(?Send)]
pub trait Game {
    async fn initialize(&self) -> Result<Box<dyn Game>>;
    fn update(&mut self, keystate: &KeyState) -> Result<()>;
    fn draw(&self, renderer: &Renderer);
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

/// Drives a [`Game`] from `requestAnimationFrame`.
///
/// One animation frame is exactly one tick: input is drained, `update` runs
/// once and `draw` runs once. There is no fixed-timestep accumulator, so
/// simulation speed follows the display refresh rate.
pub struct GameLoop {
    frames: u64,
}

impl GameLoop {
    pub async fn start(game: impl Game + 'static) -> Result<()> {
        let mut keyevent_receiver = input::prepare_input()?;
        let mut game = game.initialize().await?;
        let mut game_loop = GameLoop { frames: 0 };
        let renderer = Renderer {
            context: browser::context()?,
        };
        let mut keystate = KeyState::new();

        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |_perf: f64| {
            input::process_input(&mut keystate, &mut keyevent_receiver);
            // a bad frame is logged, never fatal to the loop
            if let Err(err) = game.update(&keystate) {
                error!("frame {} update failed : {:#}", game_loop.frames, err);
            }
            game.draw(&renderer);
            game_loop.frames += 1;

            if let Some(next) = f.borrow().as_ref() {
                if let Err(err) = browser::request_animation_frame(next) {
                    error!("GameLoop stopped : {:#}", err);
                }
            }
        }));

        browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: Loop is None"))?,
        )?;

        Ok(())
    }
}

// ==================== Geometry ====================
#[derive(Debug, Default, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn distance(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub fn scaled(&self, scale: f32) -> Size {
        Size {
            width: self.width * scale,
            height: self.height * scale,
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Rect {
    pub position: Point,
    pub size: Size,
}

impl Rect {
    pub const fn new(position: Point, size: Size) -> Self {
        Rect { position, size }
    }

    pub const fn new_from_x_y(x: f32, y: f32, width: f32, height: f32) -> Self {
        Rect::new(Point { x, y }, Size { width, height })
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn width(&self) -> f32 {
        self.size.width
    }

    pub fn height(&self) -> f32 {
        self.size.height
    }

    pub fn right(&self) -> f32 {
        self.x() + self.width()
    }

    pub fn bottom(&self) -> f32 {
        self.y() + self.height()
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x() + self.width() * 0.5,
            y: self.y() + self.height() * 0.5,
        }
    }

    /// AABB overlap, touching edges count as overlapping
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.x() > other.right()
            || self.right() < other.x()
            || self.y() > other.bottom()
            || self.bottom() < other.y())
    }

    /// Shift into screen space for a horizontal camera offset
    pub fn scrolled(&self, camera_offset: f32) -> Rect {
        Rect::new_from_x_y(
            self.x() - camera_offset,
            self.y(),
            self.width(),
            self.height(),
        )
    }
}

// ==================== Rendering ====================
pub struct Renderer {
    context: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn clear(&self, rect: &Rect) {
        self.context.clear_rect(
            rect.x().into(),
            rect.y().into(),
            rect.width().into(),
            rect.height().into(),
        );
    }

    /// Draw `frame` of `image` (or the whole image when `frame` is `None`)
    /// into `destination`, mirrored horizontally around the destination when
    /// `flip` is set.
    pub fn draw_sprite(
        &self,
        image: &HtmlImageElement,
        frame: Option<&Rect>,
        destination: &Rect,
        flip: bool,
    ) {
        let source = frame.copied().unwrap_or_else(|| {
            Rect::new_from_x_y(
                0.0,
                0.0,
                image.natural_width() as f32,
                image.natural_height() as f32,
            )
        });

        self.context.save();
        let target = if flip {
            let _ = self
                .context
                .translate(destination.right().into(), destination.y().into());
            let _ = self.context.scale(-1.0, 1.0);
            Rect::new_from_x_y(0.0, 0.0, destination.width(), destination.height())
        } else {
            *destination
        };
        self.context
            .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                image,
                source.x().into(),
                source.y().into(),
                source.width().into(),
                source.height().into(),
                target.x().into(),
                target.y().into(),
                target.width().into(),
                target.height().into(),
            )
            .expect("Drawing is throwing exceptions! Unrecoverable error");
        self.context.restore();
    }

    pub fn fill_rect(&self, rect: &Rect, color: &str) {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.x().into(),
            rect.y().into(),
            rect.width().into(),
            rect.height().into(),
        );
    }

    pub fn draw_text(&self, text: &str, location: &Point, font: &str, color: &str) {
        self.context.set_font(font);
        self.context.set_fill_style_str(color);
        self.context
            .fill_text(text, location.x.into(), location.y.into())
            .expect("Drawing text is throwing exceptions! Unrecoverable error");
    }
}

/// Asynchronously load an image from a given source path
/// # Arguments
/// * `source` - string slice to path/url
/// # Returns
/// * `Ok(HtmlImageElement)` - on load success
/// * `Err` - on load fail
pub async fn load_image(source: &str) -> Result<HtmlImageElement> {
    let image = browser::create_html_image_element()?;
    let (tx, rx) = channel::<Result<(), Error>>();
    let success_tx = Rc::new(RefCell::new(Some(tx)));
    let error_tx = success_tx.clone();

    let success_callback = browser::closure_once(move || {
        if let Some(tx) = success_tx.borrow_mut().take() {
            let _ = tx.send(Ok(()));
        }
    });

    let source_name = source.to_string();
    let error_callback = browser::closure_once(move |err: JsValue| {
        if let Some(tx) = error_tx.borrow_mut().take() {
            let _ = tx.send(Err(anyhow!(
                "Error loading image {}: {:#?}",
                source_name,
                err
            )));
        }
    });

    image.set_onload(Some(success_callback.as_ref().unchecked_ref()));
    image.set_onerror(Some(error_callback.as_ref().unchecked_ref()));
    image.set_src(source);

    // keep callbacks alive until the image loads or errors
    success_callback.forget();
    error_callback.forget();

    // Result<Result<(), Error>, oneshot::Canceled>
    // - outer ? : channel result
    // - inner ? : image load result
    rx.await??;

    Ok(image)
}

pub mod input {
    use crate::browser;
    use anyhow::Result;
    use futures::channel::mpsc::{unbounded, UnboundedReceiver};
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;
    use wasm_bindgen::JsCast;

    pub enum KeyPress {
        KeyUp(web_sys::KeyboardEvent),
        KeyDown(web_sys::KeyboardEvent),
    }

    /// Snapshot of held keys, keyed by `KeyboardEvent.code`
    #[derive(Debug, Default)]
    pub struct KeyState {
        pressed_keys: HashSet<String>,
    }

    impl KeyState {
        pub fn new() -> Self {
            KeyState {
                pressed_keys: HashSet::new(),
            }
        }

        pub fn is_pressed(&self, code: &str) -> bool {
            self.pressed_keys.contains(code)
        }

        pub fn set_pressed(&mut self, code: &str) {
            self.pressed_keys.insert(code.to_string());
        }

        pub fn set_released(&mut self, code: &str) {
            self.pressed_keys.remove(code);
        }
    }

    /// Logical keys held this tick. Edge detection (jump, door use) is left
    /// to the consumers.
    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
    pub struct Controls {
        pub jump: bool,
        pub left: bool,
        pub right: bool,
        /// primary interact, talk to NPCs
        pub interact: bool,
        /// secondary interact, use doors
        pub enter: bool,
        pub mute: bool,
        pub volume_down: bool,
        pub volume_up: bool,
    }

    impl Controls {
        pub fn any_movement(&self) -> bool {
            self.jump || self.left || self.right
        }

        /// Any mapped key at all, e.g. to detect the first user gesture
        pub fn any_pressed(&self) -> bool {
            *self != Controls::default()
        }
    }

    impl From<&KeyState> for Controls {
        fn from(keys: &KeyState) -> Self {
            let any = |codes: &[&str]| codes.iter().any(|code| keys.is_pressed(code));
            Controls {
                jump: any(&["KeyW", "Space", "ArrowUp"]),
                left: any(&["KeyA", "ArrowLeft"]),
                right: any(&["KeyD", "ArrowRight"]),
                interact: any(&["KeyE"]),
                enter: any(&["KeyF"]),
                mute: any(&["KeyM"]),
                volume_down: any(&["Minus", "NumpadSubtract"]),
                volume_up: any(&["Equal", "NumpadAdd"]),
            }
        }
    }

    /// Register window key listeners that forward into a channel, drained
    /// once per frame by [`process_input`].
    pub fn prepare_input() -> Result<UnboundedReceiver<KeyPress>> {
        let (keydown_sender, keyevent_receiver) = unbounded();
        let keydown_sender = Rc::new(RefCell::new(keydown_sender));
        let keyup_sender = Rc::clone(&keydown_sender);

        let onkeydown = browser::closure_wrap(Box::new(move |keycode: web_sys::KeyboardEvent| {
            let _ = keydown_sender
                .borrow_mut()
                .start_send(KeyPress::KeyDown(keycode));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let onkeyup = browser::closure_wrap(Box::new(move |keycode: web_sys::KeyboardEvent| {
            let _ = keyup_sender
                .borrow_mut()
                .start_send(KeyPress::KeyUp(keycode));
        }) as Box<dyn FnMut(web_sys::KeyboardEvent)>);

        let window = browser::window()?;
        window.set_onkeydown(Some(onkeydown.as_ref().unchecked_ref()));
        window.set_onkeyup(Some(onkeyup.as_ref().unchecked_ref()));
        onkeydown.forget();
        onkeyup.forget();

        Ok(keyevent_receiver)
    }

    pub fn process_input(state: &mut KeyState, keyevent_receiver: &mut UnboundedReceiver<KeyPress>) {
        while let Ok(event) = keyevent_receiver.try_recv() {
            match event {
                KeyPress::KeyDown(event) => state.set_pressed(&event.code()),
                KeyPress::KeyUp(event) => state.set_released(&event.code()),
            }
        }
    }
}
