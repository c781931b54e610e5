//! Room definitions: the serde schema of `world.json` and the validated,
//! immutable [`RoomSet`] built from it once at load time.
use crate::audio::Track;
use crate::config::GameConfig;
use crate::engine::{Point, Rect, Size};
use crate::sprite::npc::FacingRule;
use crate::sprite::SpriteId;
use anyhow::{anyhow, ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub type RoomId = String;

// ==================== Schema ====================
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldDef {
    #[serde(default)]
    pub config: GameConfig,
    pub start: RoomId,
    #[serde(default)]
    pub assets: AssetManifest,
    pub rooms: Vec<RoomDef>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct AssetManifest {
    #[serde(default)]
    pub sprites: BTreeMap<SpriteId, String>,
    #[serde(default)]
    pub tracks: BTreeMap<Track, String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoomDef {
    pub id: RoomId,
    pub name: String,
    pub width: f32,
    pub track: Track,
    /// default player spawn, used when no door leads back to the origin
    pub spawn: Point,
    #[serde(default)]
    pub background: Option<SpriteId>,
    #[serde(default)]
    pub doors: Vec<DoorDef>,
    #[serde(default)]
    pub npcs: Vec<SpawnDef>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DoorDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// `null` marks a door that leads nowhere yet
    pub to: Option<RoomId>,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SpawnDef {
    pub tag: String,
    pub sprite: SpriteId,
    pub x: f32,
    pub dialogue: String,
    #[serde(default)]
    pub facing: FacingRule,
    /// only spawn once the player has entered this room at least once
    #[serde(default)]
    pub requires_visited: Option<RoomId>,
}

// ==================== Validated rooms ====================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Room(RoomId),
    /// "coming soon"
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Door {
    pub origin: RoomId,
    pub rect: Rect,
    pub destination: Destination,
    pub label: String,
}

impl Door {
    /// Centred on the door, feet on the door's bottom edge
    pub fn spawn_point(&self, player: Size) -> Point {
        Point {
            x: self.rect.center().x - player.width * 0.5,
            y: self.rect.bottom() - player.height,
        }
    }

    pub fn leads_to(&self, room: &str) -> bool {
        matches!(&self.destination, Destination::Room(id) if id == room)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub width: f32,
    pub track: Track,
    pub spawn: Point,
    pub background: Option<SpriteId>,
    pub doors: Vec<Door>,
    pub npcs: Vec<SpawnDef>,
}

impl Room {
    /// First door, in list order, that leads back to `origin`
    pub fn door_to(&self, origin: &str) -> Option<&Door> {
        self.doors.iter().find(|door| door.leads_to(origin))
    }
}

/// Ordered, immutable registry of rooms
#[derive(Debug, Clone)]
pub struct RoomSet {
    rooms: Vec<Room>,
    index: HashMap<RoomId, usize>,
    start: RoomId,
}

impl RoomSet {
    pub fn from_defs(start: &str, defs: Vec<RoomDef>) -> Result<Self> {
        ensure!(!defs.is_empty(), "world defines no rooms");

        let mut index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                return Err(anyhow!("duplicate room id '{}'", def.id));
            }
        }
        ensure!(
            index.contains_key(start),
            "start room '{}' is not defined",
            start
        );

        let rooms = defs
            .into_iter()
            .map(|def| {
                let id = def.id.clone();
                Room::from_def(def, &index).with_context(|| format!("invalid room '{}'", id))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RoomSet {
            rooms,
            index,
            start: start.to_string(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.index.get(id).map(|&i| &self.rooms[i])
    }

    pub fn start(&self) -> &Room {
        &self.rooms[self.index[&self.start]]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Room {
    fn from_def(def: RoomDef, known: &HashMap<RoomId, usize>) -> Result<Self> {
        ensure!(def.width > 0.0, "width must be positive, got {}", def.width);

        let doors = def
            .doors
            .into_iter()
            .enumerate()
            .map(|(i, door)| {
                ensure!(
                    door.width > 0.0 && door.height > 0.0,
                    "door {} ('{}') has an empty rectangle",
                    i,
                    door.label
                );
                ensure!(
                    door.x >= 0.0 && door.x + door.width <= def.width,
                    "door {} ('{}') lies outside the room",
                    i,
                    door.label
                );
                let destination = match door.to {
                    Some(to) if known.contains_key(&to) => Destination::Room(to),
                    Some(to) => {
                        return Err(anyhow!(
                            "door {} ('{}') leads to unknown room '{}'",
                            i,
                            door.label,
                            to
                        ))
                    }
                    None => Destination::Unavailable,
                };
                Ok(Door {
                    origin: def.id.clone(),
                    rect: Rect::new_from_x_y(door.x, door.y, door.width, door.height),
                    destination,
                    label: door.label,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        for npc in &def.npcs {
            if let Some(room) = &npc.requires_visited {
                ensure!(
                    known.contains_key(room),
                    "npc '{}' waits on unknown room '{}'",
                    npc.tag,
                    room
                );
            }
        }

        Ok(Room {
            id: def.id,
            name: def.name,
            width: def.width,
            track: def.track,
            spawn: def.spawn,
            background: def.background,
            doors,
            npcs: def.npcs,
        })
    }
}
