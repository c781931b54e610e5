//! Typed player states over a shared kinematic context.
//!
//! Transitions are only reachable through the methods here:
//! - PUBLIC  : `PlayerState<S>`, `PlayerContext`, `Motion`
//! - PRIVATE : the state's fields
//!
//! Only grounded states (`Idle`, `Walking`) expose `jump()`, so a held jump
//! key can never re-apply the impulse mid-air.
use crate::config::Physics;
use crate::engine::input::Controls;
use crate::engine::{Point, Rect, Size};
use crate::sprite::{Animation, Clip, ClipMetadata, Facing, Idle, Jumping, SpriteState, Walking};

/// Result of one tick for any typed state
pub enum Motion {
    Idle(PlayerState<Idle>),
    Walking(PlayerState<Walking>),
    Airborne(PlayerState<Jumping>),
}

/// Shared data for :
/// - physics : position + velocity + grounded
/// - display : facing + animation cursor
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PlayerContext {
    pub animation: Animation,
    pub position: Point,
    pub velocity: Point,
    /// scaled on-screen size
    pub size: Size,
    pub facing: Facing,
    pub grounded: bool,
}

impl PlayerContext {
    pub fn bounding_box(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub fn ground_level(&self, bounds: Size) -> f32 {
        bounds.height - self.size.height
    }

    /// Clip implied by the body, strict priority: airborne > moving > idle
    pub fn motion(&self, idle_threshold: f32) -> Clip {
        if !self.grounded {
            Clip::Jump
        } else if self.velocity.x.abs() > idle_threshold {
            Clip::Walk
        } else {
            Clip::Idle
        }
    }

    /// Held direction sets the velocity outright, otherwise it decays by
    /// `friction`. Left wins when both are held.
    fn steer(mut self, controls: &Controls, physics: &Physics) -> Self {
        if controls.left {
            self.velocity.x = -physics.walk_speed;
            self.facing = Facing::Left;
        } else if controls.right {
            self.velocity.x = physics.walk_speed;
            self.facing = Facing::Right;
        } else {
            self.velocity.x *= physics.friction;
        }
        self
    }

    /// Gravity, explicit Euler integration (one tick = one step, no delta
    /// time), then ground and side clamping.
    fn update(mut self, physics: &Physics, bounds: Size) -> Self {
        self.velocity.y += physics.gravity;

        self.position.x += self.velocity.x;
        self.position.y += self.velocity.y;

        let ground = self.ground_level(bounds);
        if self.position.y >= ground {
            self.position.y = ground;
            self.velocity.y = 0.0;
            self.grounded = true;
        } else {
            self.grounded = false;
        }

        let right_edge = (bounds.width - self.size.width).max(0.0);
        self.position.x = self.position.x.clamp(0.0, right_edge);

        self
    }

    fn animate(mut self, clip: ClipMetadata) -> Self {
        self.animation = self.animation.advance(clip);
        self
    }

    /// Clips have their own frame counts, so every clip change restarts at
    /// frame 0 to keep the cursor in range.
    fn on_state_transition(mut self) -> Self {
        self.animation = self.animation.reset();
        self
    }

    fn set_vertical_velocity(mut self, y: f32) -> Self {
        self.velocity.y = y;
        self.grounded = false;
        self
    }

    /// Teleport, clamped into `bounds` like a regular step. Velocity is
    /// zeroed and `grounded` is re-derived from the new height.
    fn place_at(mut self, position: Point, bounds: Size) -> Self {
        let ground = self.ground_level(bounds);
        let right_edge = (bounds.width - self.size.width).max(0.0);
        self.position = Point {
            x: position.x.clamp(0.0, right_edge),
            y: position.y.min(ground),
        };
        self.velocity = Point::default();
        self.grounded = self.position.y >= ground;
        self
    }
}

#[derive(Debug, Copy, Clone)]
pub struct PlayerState<S> {
    context: PlayerContext,
    // type-level tag only, never read
    _state: S,
}

impl<S: SpriteState> PlayerState<S> {
    pub fn context(&self) -> &PlayerContext {
        &self.context
    }

    /// Placement above the floor lands in `Airborne`, so no grounded state
    /// ever exists in mid-air
    pub fn place_at(self, position: Point, bounds: Size) -> Motion {
        let placed = PlayerState {
            context: self.context.place_at(position, bounds),
            _state: self._state,
        };
        if placed.context.grounded {
            Motion::Idle(placed.into_state())
        } else {
            Motion::Airborne(placed.into_state())
        }
    }

    fn into_state<T: SpriteState>(self) -> PlayerState<T> {
        let context = if S::CLIP == T::CLIP {
            self.context
        } else {
            self.context.on_state_transition()
        };
        PlayerState {
            context,
            _state: T::default(),
        }
    }

    fn animate(mut self) -> Self {
        self.context = self.context.animate(S::CLIP.metadata());
        self
    }

    fn step(mut self, controls: &Controls, physics: &Physics, bounds: Size) -> Motion {
        self.context = self
            .context
            .steer(controls, physics)
            .update(physics, bounds);
        self.settle(physics.idle_threshold)
    }

    fn settle(self, idle_threshold: f32) -> Motion {
        match self.context.motion(idle_threshold) {
            Clip::Jump => Motion::Airborne(self.into_state::<Jumping>().animate()),
            Clip::Walk => Motion::Walking(self.into_state::<Walking>().animate()),
            Clip::Idle => Motion::Idle(self.into_state::<Idle>().animate()),
        }
    }
}

impl PlayerState<Idle> {
    pub fn new(position: Point, size: Size) -> Self {
        PlayerState {
            context: PlayerContext {
                animation: Animation::default(),
                position,
                velocity: Point::default(),
                size,
                facing: Facing::Right,
                grounded: true,
            },
            _state: Idle,
        }
    }

    pub fn update(self, controls: &Controls, physics: &Physics, bounds: Size) -> Motion {
        self.step(controls, physics, bounds)
    }

    pub fn jump(self, physics: &Physics) -> PlayerState<Jumping> {
        launch(self, physics)
    }
}

impl PlayerState<Walking> {
    pub fn update(self, controls: &Controls, physics: &Physics, bounds: Size) -> Motion {
        self.step(controls, physics, bounds)
    }

    pub fn jump(self, physics: &Physics) -> PlayerState<Jumping> {
        launch(self, physics)
    }
}

impl PlayerState<Jumping> {
    /// Lands into `Idle` or `Walking` once the ground clamp fires
    pub fn update(self, controls: &Controls, physics: &Physics, bounds: Size) -> Motion {
        self.step(controls, physics, bounds)
    }
}

fn launch<S: SpriteState>(state: PlayerState<S>, physics: &Physics) -> PlayerState<Jumping> {
    PlayerState {
        context: state.context.set_vertical_velocity(physics.jump_velocity),
        _state: state._state,
    }
    .into_state()
}
