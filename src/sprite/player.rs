use crate::config::{GameConfig, Physics};
use crate::engine::input::Controls;
use crate::engine::{Point, Rect, Size};
use crate::sprite::state::{Motion, PlayerContext, PlayerState};
use crate::sprite::{Clip, Drawable, Facing, Idle, Jumping, SpriteDraw, SpriteState, Walking};

/// ┌──────────────── State Transition Flow ──────────────────┐
/// │  From State  →  Event   →  To State                     │
/// ├─────────────────────────────────────────────────────────┤
/// │  Idle        →  Jump    →  Jumping                      │
/// │  Walking     →  Jump    →  Jumping                      │
/// │  -------        ------                                  │
/// │  any         →  Update  →  Jumping  (airborne)          │
/// │                         →  Walking  (|vx| > threshold)  │
/// │                         →  Idle     (otherwise)         │
/// └─────────────────────────────────────────────────────────┘
pub enum Event<'a> {
    Jump,
    Update { controls: &'a Controls, bounds: Size },
}

#[derive(Debug, Copy, Clone)]
enum PlayerStateMachine {
    Idle(PlayerState<Idle>),
    Walking(PlayerState<Walking>),
    Jumping(PlayerState<Jumping>),
}

impl From<PlayerState<Idle>> for PlayerStateMachine {
    fn from(state: PlayerState<Idle>) -> Self {
        PlayerStateMachine::Idle(state)
    }
}

impl From<PlayerState<Walking>> for PlayerStateMachine {
    fn from(state: PlayerState<Walking>) -> Self {
        PlayerStateMachine::Walking(state)
    }
}

impl From<PlayerState<Jumping>> for PlayerStateMachine {
    fn from(state: PlayerState<Jumping>) -> Self {
        PlayerStateMachine::Jumping(state)
    }
}

impl From<Motion> for PlayerStateMachine {
    fn from(motion: Motion) -> Self {
        match motion {
            Motion::Idle(state) => state.into(),
            Motion::Walking(state) => state.into(),
            Motion::Airborne(state) => state.into(),
        }
    }
}

impl PlayerStateMachine {
    // consumes self: the old state can't be observed after a transition
    fn transition(self, event: Event, physics: &Physics) -> Self {
        use PlayerStateMachine::*;
        match (self, event) {
            (Idle(state), Event::Jump) => state.jump(physics).into(),
            (Walking(state), Event::Jump) => state.jump(physics).into(),
            (Idle(state), Event::Update { controls, bounds }) => {
                state.update(controls, physics, bounds).into()
            }
            (Walking(state), Event::Update { controls, bounds }) => {
                state.update(controls, physics, bounds).into()
            }
            (Jumping(state), Event::Update { controls, bounds }) => {
                state.update(controls, physics, bounds).into()
            }
            // already airborne, no second impulse
            (Jumping(_), Event::Jump) => self,
        }
    }

    fn context(&self) -> &PlayerContext {
        use PlayerStateMachine::*;
        match self {
            Idle(state) => state.context(),
            Walking(state) => state.context(),
            Jumping(state) => state.context(),
        }
    }

    fn clip(&self) -> Clip {
        use PlayerStateMachine::*;
        match self {
            Idle(_) => crate::sprite::Idle::CLIP,
            Walking(_) => crate::sprite::Walking::CLIP,
            Jumping(_) => crate::sprite::Jumping::CLIP,
        }
    }

    fn place_at(self, position: Point, bounds: Size) -> Self {
        use PlayerStateMachine::*;
        match self {
            Idle(state) => state.place_at(position, bounds).into(),
            Walking(state) => state.place_at(position, bounds).into(),
            Jumping(state) => state.place_at(position, bounds).into(),
        }
    }
}

/// Player controller
/// - `update()` -> jump edge detection, then `Event::Update`
/// - state transitions -> `PlayerStateMachine::transition()`
pub struct Player {
    state: PlayerStateMachine,
    physics: Physics,
    /// unscaled sprite cell, for picking the source frame
    frame: Size,
    jump_held: bool,
}

impl Player {
    pub fn new(position: Point, config: &GameConfig) -> Self {
        Player {
            state: PlayerState::new(position, config.player_size()).into(),
            physics: Physics::from(config),
            frame: config.frame,
            jump_held: false,
        }
    }

    /// One tick. The jump impulse fires only on the press edge; holding the
    /// key never re-triggers it, on the ground or in the air.
    pub fn update(&mut self, controls: &Controls, bounds: Size) {
        if controls.jump && !self.jump_held {
            self.state = self.state.transition(Event::Jump, &self.physics);
        }
        self.jump_held = controls.jump;
        self.state = self
            .state
            .transition(Event::Update { controls, bounds }, &self.physics);
    }

    /// Teleport inside `bounds`; lands in the jump state when above the floor
    pub fn place_at(&mut self, position: Point, bounds: Size) {
        self.state = self.state.place_at(position, bounds);
    }

    pub fn context(&self) -> &PlayerContext {
        self.state.context()
    }

    pub fn position(&self) -> Point {
        self.context().position
    }

    pub fn size(&self) -> Size {
        self.context().size
    }

    pub fn bounding_box(&self) -> Rect {
        self.context().bounding_box()
    }

    pub fn facing(&self) -> Facing {
        self.context().facing
    }

    pub fn clip(&self) -> Clip {
        self.state.clip()
    }
}

impl Drawable for Player {
    fn draw_command(&self, camera_offset: f32) -> SpriteDraw {
        let context = self.context();
        SpriteDraw {
            sprite: self.clip().metadata().sprite.to_string(),
            frame: Some(
                context
                    .animation
                    .source_rect(self.frame.width, self.frame.height),
            ),
            destination: context.bounding_box().scrolled(camera_offset),
            flip: context.facing == Facing::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const BOUNDS: Size = Size {
        width: 640.0,
        height: 480.0,
    };

    fn grounded_player(x: f32) -> Player {
        let config = GameConfig::default();
        let y = BOUNDS.height - config.player_size().height;
        Player::new(Point { x, y }, &config)
    }

    fn jump() -> Controls {
        Controls {
            jump: true,
            ..Controls::default()
        }
    }

    #[test]
    fn jump_fires_on_press_edge_only() {
        let mut player = grounded_player(100.0);
        player.update(&jump(), BOUNDS);
        assert_eq!(player.clip(), Clip::Jump);
        assert_relative_eq!(player.context().velocity.y, -11.5);

        // held through the whole arc and beyond: exactly one impulse
        let mut lowest_velocity = f32::MAX;
        for _ in 0..200 {
            player.update(&jump(), BOUNDS);
            lowest_velocity = lowest_velocity.min(player.context().velocity.y);
        }
        assert!(lowest_velocity > -11.5);
        assert_eq!(player.clip(), Clip::Idle);

        // release and press again jumps again
        player.update(&Controls::default(), BOUNDS);
        player.update(&jump(), BOUNDS);
        assert_eq!(player.clip(), Clip::Jump);
    }

    #[test]
    fn stays_inside_bounds_for_any_input() {
        let mut player = grounded_player(300.0);
        let ground = BOUNDS.height - player.size().height;
        let right_edge = BOUNDS.width - player.size().width;
        let patterns = [
            Controls {
                left: true,
                jump: true,
                ..Controls::default()
            },
            Controls {
                right: true,
                ..Controls::default()
            },
            jump(),
            Controls::default(),
        ];
        for tick in 0..2_000 {
            player.update(&patterns[(tick / 37) % patterns.len()], BOUNDS);
            let position = player.position();
            assert!((0.0..=right_edge).contains(&position.x));
            assert!(position.y <= ground);
        }
    }

    #[test]
    fn walk_speed_is_per_tick() {
        // no delta time: N ticks always cover N * walk_speed
        let mut player = grounded_player(0.0);
        let right = Controls {
            right: true,
            ..Controls::default()
        };
        for _ in 0..50 {
            player.update(&right, BOUNDS);
        }
        assert_relative_eq!(player.position().x, 150.0);
        assert_eq!(player.clip(), Clip::Walk);
    }

    #[test]
    fn coasts_into_idle() {
        let mut player = grounded_player(100.0);
        player.update(
            &Controls {
                right: true,
                ..Controls::default()
            },
            BOUNDS,
        );
        for _ in 0..30 {
            player.update(&Controls::default(), BOUNDS);
        }
        assert_eq!(player.clip(), Clip::Idle);
        // exponential decay never reaches exactly zero
        assert!(player.context().velocity.x > 0.0);
    }

    #[test]
    fn draw_command_flips_when_facing_left() {
        let mut player = grounded_player(200.0);
        player.update(
            &Controls {
                left: true,
                ..Controls::default()
            },
            BOUNDS,
        );
        assert_eq!(player.facing(), Facing::Left);
        let command = player.draw_command(100.0);
        assert!(command.flip);
        assert_eq!(command.sprite, "player-walk");
        assert_relative_eq!(command.destination.x(), 97.0);
        assert_eq!(
            command.frame,
            Some(Rect::new_from_x_y(0.0, 0.0, 32.0, 32.0))
        );
    }

    #[test]
    fn placed_in_mid_air_cannot_jump() {
        let mut player = grounded_player(100.0);
        player.place_at(Point { x: 100.0, y: 132.0 }, BOUNDS);
        assert_eq!(player.clip(), Clip::Jump);
        assert!(!player.context().grounded);

        // fresh press while falling: gravity only, no impulse
        player.update(&jump(), BOUNDS);
        assert_relative_eq!(player.context().velocity.y, 0.5);
        assert_relative_eq!(player.position().y, 132.5);
    }

    #[test]
    fn placed_on_the_floor_can_jump() {
        let mut player = grounded_player(100.0);
        player.update(&jump(), BOUNDS);
        player.place_at(Point { x: 300.0, y: 416.0 }, BOUNDS);
        assert_eq!(player.clip(), Clip::Idle);

        player.update(&Controls::default(), BOUNDS);
        player.update(&jump(), BOUNDS);
        assert_eq!(player.clip(), Clip::Jump);
        assert_relative_eq!(player.context().velocity.y, -11.5);
    }
}
