use crate::engine::Size;
use serde::{Deserialize, Serialize};

/// Tunables read from the `config` block of `world.json`; any field left out
/// keeps its default.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    pub gravity: f32,
    /// per-tick horizontal velocity multiplier while no direction is held
    pub friction: f32,
    pub walk_speed: f32,
    /// negative because the canvas origin is top left
    pub jump_velocity: f32,
    /// |vx| above this shows the walk clip
    pub idle_threshold: f32,
    /// one cell of every sprite strip, before scaling
    pub frame: Size,
    pub player_scale: f32,
    pub npc_scale: f32,
    pub interaction_radius: f32,
    pub viewport: Size,
    pub notice_ticks: u32,
    pub tutorial_ticks: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            gravity: 0.5,
            friction: 0.8,
            walk_speed: 3.0,
            jump_velocity: -12.0,
            idle_threshold: 0.1,
            frame: Size {
                width: 32.0,
                height: 32.0,
            },
            player_scale: 2.0,
            npc_scale: 2.0,
            interaction_radius: 40.0,
            viewport: Size {
                width: 640.0,
                height: 480.0,
            },
            notice_ticks: 120,
            tutorial_ticks: 300,
        }
    }
}

impl GameConfig {
    pub fn player_size(&self) -> Size {
        self.frame.scaled(self.player_scale)
    }

    pub fn npc_size(&self) -> Size {
        self.frame.scaled(self.npc_scale)
    }
}

/// Per-tick physics parameters handed to the player controller
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Physics {
    pub gravity: f32,
    pub friction: f32,
    pub walk_speed: f32,
    pub jump_velocity: f32,
    pub idle_threshold: f32,
}

impl From<&GameConfig> for Physics {
    fn from(config: &GameConfig) -> Self {
        Physics {
            gravity: config.gravity,
            friction: config.friction,
            walk_speed: config.walk_speed,
            jump_velocity: config.jump_velocity,
            idle_threshold: config.idle_threshold,
        }
    }
}
