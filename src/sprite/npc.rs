use crate::config::GameConfig;
use crate::engine::{Point, Rect, Size};
use crate::rooms::SpawnDef;
use crate::sprite::{Animation, Clip, Drawable, Facing, SpriteDraw, SpriteId};
use serde::{Deserialize, Serialize};

/// How an NPC turns toward the player
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacingRule {
    /// track the player every tick
    #[default]
    AlwaysFacePlayer,
    /// hold `rest`, turn only while the player is talking to this NPC
    FaceWhileTalking { rest: Facing },
}

/// Live NPC, rebuilt from its spawn descriptor every time the room is entered
#[derive(Debug, Clone, PartialEq)]
pub struct Npc {
    tag: String,
    sprite: SpriteId,
    dialogue: String,
    rule: FacingRule,
    position: Point,
    size: Size,
    frame: Size,
    facing: Facing,
    animation: Animation,
    interaction_radius: f32,
}

impl Npc {
    pub fn spawn(def: &SpawnDef, config: &GameConfig) -> Self {
        let size = config.npc_size();
        let facing = match def.facing {
            FacingRule::AlwaysFacePlayer => Facing::default(),
            FacingRule::FaceWhileTalking { rest } => rest,
        };
        Npc {
            tag: def.tag.clone(),
            sprite: def.sprite.clone(),
            dialogue: def.dialogue.clone(),
            rule: def.facing,
            position: Point {
                x: def.x,
                y: config.viewport.height - size.height,
            },
            size,
            frame: config.frame,
            facing,
            animation: Animation::default(),
            interaction_radius: config.interaction_radius,
        }
    }

    /// Face per the rule, advance the idle clip and stay pinned to the ground.
    /// `interacting` is whether the talk key is held this tick.
    pub fn update(&mut self, player: &Rect, bounds: Size, interacting: bool) {
        let toward_player = Facing::toward(self.position.x, player.x());
        self.facing = match self.rule {
            FacingRule::AlwaysFacePlayer => toward_player,
            FacingRule::FaceWhileTalking { rest } => {
                if interacting && self.is_player_close(player) {
                    toward_player
                } else {
                    rest
                }
            }
        };
        self.animation = self.animation.advance(Clip::Idle.metadata());
        self.position.y = bounds.height - self.size.height;
    }

    /// Strictly inside the interaction radius, measured centre to centre
    pub fn is_player_close(&self, player: &Rect) -> bool {
        self.bounding_box().center().distance(&player.center()) < self.interaction_radius
    }

    pub fn bounding_box(&self) -> Rect {
        Rect::new(self.position, self.size)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn dialogue(&self) -> &str {
        &self.dialogue
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn position(&self) -> Point {
        self.position
    }
}

impl Drawable for Npc {
    fn draw_command(&self, camera_offset: f32) -> SpriteDraw {
        SpriteDraw {
            sprite: self.sprite.clone(),
            frame: Some(
                self.animation
                    .source_rect(self.frame.width, self.frame.height),
            ),
            destination: self.bounding_box().scrolled(camera_offset),
            flip: self.facing == Facing::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn_def(x: f32, facing: FacingRule) -> SpawnDef {
        SpawnDef {
            tag: "keeper".into(),
            sprite: "keeper-idle".into(),
            x,
            dialogue: "Welcome in!".into(),
            facing,
            requires_visited: None,
        }
    }

    fn player_box_centered_at(x: f32, y: f32) -> Rect {
        Rect::new_from_x_y(x - 32.0, y - 32.0, 64.0, 64.0)
    }

    #[test]
    fn close_when_centers_within_radius() {
        let config = GameConfig::default();
        let mut npc = Npc::spawn(&spawn_def(0.0, FacingRule::default()), &config);
        // NPC centre at (120, 100)
        npc.position = Point { x: 88.0, y: 68.0 };
        assert!(npc.is_player_close(&player_box_centered_at(100.0, 100.0)));
        assert!(!npc.is_player_close(&player_box_centered_at(80.0, 100.0)));
        assert!(!npc.is_player_close(&player_box_centered_at(200.0, 100.0)));
    }

    #[test]
    fn always_faces_player() {
        let config = GameConfig::default();
        let mut npc = Npc::spawn(&spawn_def(300.0, FacingRule::AlwaysFacePlayer), &config);
        npc.update(&player_box_centered_at(100.0, 448.0), config.viewport, false);
        assert_eq!(npc.facing(), Facing::Left);
        npc.update(&player_box_centered_at(500.0, 448.0), config.viewport, false);
        assert_eq!(npc.facing(), Facing::Right);
    }

    #[test]
    fn shy_npc_turns_only_while_talking_in_range() {
        let config = GameConfig::default();
        let rule = FacingRule::FaceWhileTalking {
            rest: Facing::Right,
        };
        let mut npc = Npc::spawn(&spawn_def(300.0, rule), &config);
        // player just left of the NPC, inside the radius
        let near = Rect::new_from_x_y(270.0, 416.0, 64.0, 64.0);
        assert!(npc.is_player_close(&near));

        npc.update(&near, config.viewport, false);
        assert_eq!(npc.facing(), Facing::Right);
        npc.update(&near, config.viewport, true);
        assert_eq!(npc.facing(), Facing::Left);

        let far = Rect::new_from_x_y(10.0, 416.0, 64.0, 64.0);
        npc.update(&far, config.viewport, true);
        assert_eq!(npc.facing(), Facing::Right);
    }

    #[test]
    fn pinned_to_ground() {
        let config = GameConfig::default();
        let mut npc = Npc::spawn(&spawn_def(300.0, FacingRule::default()), &config);
        npc.position.y = 10.0;
        npc.update(&player_box_centered_at(0.0, 0.0), config.viewport, false);
        assert_eq!(npc.position().y, 480.0 - 64.0);
    }
}
