use crate::audio::AudioSink;
use crate::camera;
use crate::config::GameConfig;
use crate::engine::{Point, Size};
use crate::rooms::{Destination, Room, RoomId, RoomSet};
use crate::sprite::npc::Npc;
use crate::sprite::player::Player;
use anyhow::{anyhow, Result};
use std::collections::HashSet;

/// What the player has done so far this session
#[derive(Debug, Default, Clone)]
pub struct Session {
    visited: HashSet<RoomId>,
}

impl Session {
    pub fn has_visited(&self, room: &str) -> bool {
        self.visited.contains(room)
    }

    fn visit(&mut self, room: &str) -> bool {
        self.visited.insert(room.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Entered {
        from: RoomId,
        to: RoomId,
        spawn: Point,
    },
    /// door leads nowhere yet, rooms unchanged
    Unavailable,
}

/// Owns the current room and everything derived from it. NPCs are replaced
/// wholesale on every entry, never patched.
pub struct Navigator {
    rooms: RoomSet,
    config: GameConfig,
    current: RoomId,
    npcs: Vec<Npc>,
    session: Session,
    camera_offset: f32,
    /// set by a door use, cleared only when the door key is released
    door_in_use: bool,
}

impl Navigator {
    pub fn new(rooms: RoomSet, config: GameConfig) -> Self {
        let current = rooms.start().id.clone();
        let mut navigator = Navigator {
            rooms,
            config,
            current: current.clone(),
            npcs: Vec::new(),
            session: Session::default(),
            camera_offset: 0.0,
            door_in_use: false,
        };
        navigator.session.visit(&current);
        navigator.npcs = navigator.populate(navigator.rooms.start());
        navigator
    }

    pub fn current_room(&self) -> &Room {
        // `current` only ever holds ids resolved through `rooms`
        self.rooms.get(&self.current).unwrap_or_else(|| self.rooms.start())
    }

    pub fn rooms(&self) -> &RoomSet {
        &self.rooms
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    pub fn npcs_mut(&mut self) -> &mut [Npc] {
        &mut self.npcs
    }

    pub fn camera_offset(&self) -> f32 {
        self.camera_offset
    }

    pub fn bounds(&self) -> Size {
        Size {
            width: self.current_room().width,
            height: self.config.viewport.height,
        }
    }

    pub fn update_camera(&mut self, player: &Player) -> f32 {
        self.camera_offset = camera::compute_offset(
            self.current_room().width,
            player.bounding_box().center().x,
            self.config.viewport.width,
        );
        self.camera_offset
    }

    pub fn door_in_use(&self) -> bool {
        self.door_in_use
    }

    /// Input-release hook: the door key went up
    pub fn release_latch(&mut self) {
        self.door_in_use = false;
    }

    /// Walk through a door out of the current room.
    ///
    /// The latch closes whatever the outcome, so one key press is at most one
    /// transition (or one "coming soon" notice).
    pub fn enter(
        &mut self,
        destination: &Destination,
        player: &mut Player,
        audio: &mut impl AudioSink,
    ) -> Result<Transition> {
        self.door_in_use = true;

        let target = match destination {
            Destination::Unavailable => {
                log!("door in '{}' is not open yet", self.current);
                return Ok(Transition::Unavailable);
            }
            Destination::Room(target) => target,
        };
        let room = self
            .rooms
            .get(target)
            .ok_or_else(|| anyhow!("no room '{}' to enter", target))?;

        let origin = std::mem::replace(&mut self.current, room.id.clone());
        self.session.visit(&room.id);
        let npcs = self.populate(room);

        let bounds = Size {
            width: room.width,
            height: self.config.viewport.height,
        };
        let requested = room
            .door_to(&origin)
            .map(|door| door.spawn_point(player.size()))
            .unwrap_or(room.spawn);
        // door geometry is not checked against the floor, so clamp here
        player.place_at(requested, bounds);
        let spawn = player.position();

        audio.play_track_for_room(&room.id);
        let tags: Vec<&str> = npcs.iter().map(Npc::tag).collect();
        log!("{} -> {} {:?}", origin, room.id, tags);

        self.npcs = npcs;
        Ok(Transition::Entered {
            from: origin,
            to: target.clone(),
            spawn,
        })
    }

    fn populate(&self, room: &Room) -> Vec<Npc> {
        room.npcs
            .iter()
            .filter(|def| {
                def.requires_visited
                    .as_deref()
                    .map_or(true, |needed| self.session.has_visited(needed))
            })
            .map(|def| Npc::spawn(def, &self.config))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::rooms::tests::{door, room};
    use crate::rooms::SpawnDef;
    use crate::sprite::npc::FacingRule;

    /// Records every call the navigator makes into the audio collaborator
    #[derive(Debug, Default)]
    pub(crate) struct RecordingAudio {
        pub played: Vec<String>,
        pub volume: Option<f32>,
        pub muted: Option<bool>,
    }

    impl AudioSink for RecordingAudio {
        fn play_track_for_room(&mut self, room: &str) {
            self.played.push(room.to_string());
        }

        fn set_volume(&mut self, level: f32) {
            self.volume = Some(level);
        }

        fn set_muted(&mut self, muted: bool) {
            self.muted = Some(muted);
        }
    }

    fn spawn(tag: &str, requires_visited: Option<&str>) -> SpawnDef {
        SpawnDef {
            tag: tag.to_string(),
            sprite: format!("{}-idle", tag),
            x: 300.0,
            dialogue: format!("I am {}", tag),
            facing: FacingRule::default(),
            requires_visited: requires_visited.map(String::from),
        }
    }

    pub(crate) fn village() -> RoomSet {
        let mut house = room("house", 640.0, vec![door(500.0, Some("town"), "Town")]);
        house.npcs.push(spawn("sister", Some("town")));
        let mut town = room(
            "town",
            1920.0,
            vec![
                door(100.0, Some("house"), "Home"),
                door(800.0, Some("tavern"), "Tavern"),
                door(1200.0, Some("tavern"), "Tavern back door"),
                door(1700.0, None, "Forest"),
            ],
        );
        town.npcs.push(spawn("guard", None));
        let tavern = room("tavern", 1280.0, vec![door(40.0, Some("town"), "Street")]);
        let cellar = room("cellar", 640.0, vec![]);
        RoomSet::from_defs("house", vec![house, town, tavern, cellar]).unwrap()
    }

    fn player() -> Player {
        Player::new(Point { x: 50.0, y: 416.0 }, &GameConfig::default())
    }

    fn to(room: &str) -> Destination {
        Destination::Room(room.to_string())
    }

    #[test]
    fn starts_in_start_room() {
        let navigator = Navigator::new(village(), GameConfig::default());
        assert_eq!(navigator.current_room().id, "house");
        assert!(navigator.session().has_visited("house"));
        // sister waits for the town visit
        assert!(navigator.npcs().is_empty());
    }

    #[test]
    fn spawns_at_door_leading_back() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let mut player = player();
        let mut audio = RecordingAudio::default();

        let transition = navigator.enter(&to("town"), &mut player, &mut audio).unwrap();
        // "Home" door at x 100, 64 wide, bottom at 480
        let expected = Point { x: 100.0, y: 416.0 };
        assert_eq!(
            transition,
            Transition::Entered {
                from: "house".into(),
                to: "town".into(),
                spawn: expected,
            }
        );
        assert_eq!(player.position(), expected);
        assert_eq!(navigator.current_room().id, "town");
        assert_eq!(audio.played, vec!["town".to_string()]);
        assert!(navigator.door_in_use());
    }

    #[test]
    fn first_matching_door_wins() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let mut player = player();
        let mut audio = RecordingAudio::default();
        navigator.enter(&to("town"), &mut player, &mut audio).unwrap();
        navigator.enter(&to("tavern"), &mut player, &mut audio).unwrap();
        navigator.enter(&to("town"), &mut player, &mut audio).unwrap();
        // both tavern doors lead back, the earlier one at x 800 is used
        assert_eq!(player.position(), Point { x: 800.0, y: 416.0 });
    }

    #[test]
    fn falls_back_to_room_spawn() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let mut player = player();
        navigator
            .enter(&to("cellar"), &mut player, &mut RecordingAudio::default())
            .unwrap();
        assert_eq!(player.position(), navigator.current_room().spawn);
    }

    #[test]
    fn unavailable_door_keeps_room_and_closes_latch() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let mut player = player();
        let mut audio = RecordingAudio::default();
        let before = player.position();

        let transition = navigator
            .enter(&Destination::Unavailable, &mut player, &mut audio)
            .unwrap();
        assert_eq!(transition, Transition::Unavailable);
        assert_eq!(navigator.current_room().id, "house");
        assert_eq!(player.position(), before);
        assert!(audio.played.is_empty());
        assert!(navigator.door_in_use());

        navigator.release_latch();
        assert!(!navigator.door_in_use());
    }

    #[test]
    fn visited_flag_gates_npcs() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let mut player = player();
        let mut audio = RecordingAudio::default();

        navigator.enter(&to("town"), &mut player, &mut audio).unwrap();
        let tags: Vec<_> = navigator.npcs().iter().map(|npc| npc.tag().to_string()).collect();
        assert_eq!(tags, vec!["guard".to_string()]);

        navigator.enter(&to("house"), &mut player, &mut audio).unwrap();
        assert_eq!(navigator.npcs().len(), 1);
        assert_eq!(navigator.npcs()[0].tag(), "sister");
    }

    #[test]
    fn round_trip_returns_to_door_spawn() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let mut player = player();
        let mut audio = RecordingAudio::default();

        navigator.enter(&to("town"), &mut player, &mut audio).unwrap();
        navigator.enter(&to("house"), &mut player, &mut audio).unwrap();
        // the house's "Town" door sits at x 500
        assert_eq!(player.position(), Point { x: 500.0, y: 416.0 });
    }

    #[test]
    fn unknown_room_is_an_error() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let result = navigator.enter(
            &to("moon"),
            &mut player(),
            &mut RecordingAudio::default(),
        );
        assert!(result.is_err());
        assert_eq!(navigator.current_room().id, "house");
    }

    #[test]
    fn camera_follows_in_wide_rooms_only() {
        let mut navigator = Navigator::new(village(), GameConfig::default());
        let mut player = player();
        player.place_at(Point { x: 600.0, y: 416.0 }, navigator.bounds());
        assert_eq!(navigator.update_camera(&player), 0.0);

        navigator
            .enter(&to("tavern"), &mut player, &mut RecordingAudio::default())
            .unwrap();
        player.place_at(Point { x: 1000.0, y: 416.0 }, navigator.bounds());
        assert_eq!(navigator.update_camera(&player), 640.0);
    }

    fn with_return_door(back: crate::rooms::DoorDef) -> Navigator {
        let a = room("a", 640.0, vec![door(300.0, Some("b"), "B")]);
        let b = room("b", 640.0, vec![back]);
        Navigator::new(
            RoomSet::from_defs("a", vec![a, b]).unwrap(),
            GameConfig::default(),
        )
    }

    #[test]
    fn narrow_door_at_the_wall_spawns_inside_the_room() {
        let mut back = door(0.0, Some("a"), "A");
        back.width = 32.0;
        back.y = 440.0;
        let mut navigator = with_return_door(back);
        let mut player = player();

        let transition = navigator
            .enter(&to("b"), &mut player, &mut RecordingAudio::default())
            .unwrap();
        let expected = Point { x: 0.0, y: 416.0 };
        assert_eq!(player.position(), expected);
        assert!(player.context().grounded);
        assert!(matches!(transition, Transition::Entered { spawn, .. } if spawn == expected));
    }
}
