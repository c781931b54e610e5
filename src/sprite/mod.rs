// ┌──────────────────────────────────────────────────────────────────────────┐
// │                          sprite/ at a glance                             │
// ├────────────────┬─────────────────────────────────────────────────────────┤
// │ mod.rs         │ Clip table, Animation cursor, Facing, Drawable + the    │
// │                │ draw command types handed to the renderer               │
// │ state.rs       │ PlayerContext (kinematic body) + typed PlayerState<S>   │
// │ player.rs      │ PlayerStateMachine + Player controller                  │
// │ npc.rs         │ Npc behaviour: facing rule, ground pin, proximity       │
// └────────────────┴─────────────────────────────────────────────────────────┘
use crate::engine::{Point, Rect};
use serde::{Deserialize, Serialize};

pub mod npc;
pub mod player;
pub mod state;

/// Handle into the loaded sprite bank, e.g. `"player-walk"`
pub type SpriteId = String;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    /// Which way to look from `from_x` to see `target_x`
    pub fn toward(from_x: f32, target_x: f32) -> Facing {
        if target_x < from_x {
            Facing::Left
        } else {
            Facing::Right
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Clip {
    Idle,
    Walk,
    Jump,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClipMetadata {
    pub frame_count: u8,
    /// ticks each frame is held before advancing
    pub frame_rate: u8,
    pub sprite: &'static str,
}

impl Clip {
    pub const fn metadata(self) -> ClipMetadata {
        match self {
            Clip::Idle => ClipMetadata {
                frame_count: 21,
                frame_rate: 10,
                sprite: "player-idle",
            },
            Clip::Walk => ClipMetadata {
                frame_count: 21,
                frame_rate: 10,
                sprite: "player-walk",
            },
            Clip::Jump => ClipMetadata {
                frame_count: 21,
                frame_rate: 10,
                sprite: "player-jump",
            },
        }
    }
}

/// Type-level marker for a typed player state, see `state::PlayerState<S>`
pub trait SpriteState: Copy + Default {
    const CLIP: Clip;
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Idle;

#[derive(Debug, Default, Copy, Clone)]
pub struct Walking;

#[derive(Debug, Default, Copy, Clone)]
pub struct Jumping;

impl SpriteState for Idle {
    const CLIP: Clip = Clip::Idle;
}

impl SpriteState for Walking {
    const CLIP: Clip = Clip::Walk;
}

impl SpriteState for Jumping {
    const CLIP: Clip = Clip::Jump;
}

/// Frame cursor for the active clip
/// - `frame` always stays below the clip's frame count
/// - `hold` counts ticks spent on the current frame
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Animation {
    pub frame: u8,
    pub hold: u8,
}

impl Animation {
    pub fn advance(mut self, clip: ClipMetadata) -> Self {
        self.hold += 1;
        if self.hold >= clip.frame_rate {
            self.frame = (self.frame + 1) % clip.frame_count;
            self.hold = 0;
        }
        self
    }

    pub fn reset(self) -> Self {
        Animation::default()
    }

    /// Source rectangle within a horizontal strip of `frame_size` cells
    pub fn source_rect(&self, frame_width: f32, frame_height: f32) -> Rect {
        Rect::new_from_x_y(
            f32::from(self.frame) * frame_width,
            0.0,
            frame_width,
            frame_height,
        )
    }
}

/// Sprite draw request, already in screen space
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteDraw {
    pub sprite: SpriteId,
    /// `None` draws the whole image
    pub frame: Option<Rect>,
    pub destination: Rect,
    pub flip: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub rect: Rect,
    pub color: &'static str,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PromptStyle {
    Hint,
    Speech,
    Banner,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub position: Point,
    pub style: PromptStyle,
}

/// Everything the renderer should show for one tick, in z-order per list:
/// sprites first, then blocks, then prompts
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RenderList {
    pub sprites: Vec<SpriteDraw>,
    pub blocks: Vec<Block>,
    pub prompts: Vec<Prompt>,
}

impl RenderList {
    pub fn push_drawable(&mut self, drawable: &impl Drawable, camera_offset: f32) {
        self.sprites.push(drawable.draw_command(camera_offset));
    }
}

/// Anything that can describe itself as a sprite at a camera offset
pub trait Drawable {
    fn draw_command(&self, camera_offset: f32) -> SpriteDraw;
}
