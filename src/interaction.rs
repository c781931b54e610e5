//! Per-tick proximity checks: which prompts show, and whether a door fires.
use crate::engine::input::Controls;
use crate::engine::{Point, Rect};
use crate::rooms::{Door, Room};
use crate::sprite::npc::Npc;
use crate::sprite::{Prompt, PromptStyle};

/// Prompts sit this far above whatever they label
const PROMPT_LIFT: f32 = 10.0;

/// Door a fresh press of the door key should use this tick. The first
/// overlapping door in list order wins; a held key (latch closed) never
/// fires.
pub fn door_to_use<'a>(
    room: &'a Room,
    player: &Rect,
    controls: &Controls,
    door_in_use: bool,
) -> Option<&'a Door> {
    if !controls.enter || door_in_use {
        return None;
    }
    room.doors.iter().find(|door| door.rect.intersects(player))
}

/// Everything to label this tick, in screen space. Doors first, in list
/// order, then NPCs in spawn order.
pub fn prompts(
    room: &Room,
    npcs: &[Npc],
    player: &Rect,
    controls: &Controls,
    camera_offset: f32,
) -> Vec<Prompt> {
    let above = |rect: &Rect| Point {
        x: rect.x() - camera_offset,
        y: rect.y() - PROMPT_LIFT,
    };

    let doors = room
        .doors
        .iter()
        .filter(|door| door.rect.intersects(player))
        .map(|door| Prompt {
            text: format!("Press [F] to enter {}", door.label),
            position: above(&door.rect),
            style: PromptStyle::Hint,
        });

    let talk = npcs
        .iter()
        .filter(|npc| npc.is_player_close(player))
        .map(|npc| {
            if controls.interact {
                Prompt {
                    text: npc.dialogue().to_string(),
                    position: above(&npc.bounding_box()),
                    style: PromptStyle::Speech,
                }
            } else {
                Prompt {
                    text: "Press [E] to talk".to_string(),
                    position: above(player),
                    style: PromptStyle::Hint,
                }
            }
        });

    doors.chain(talk).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::navigator::tests::village;
    use crate::rooms::{Destination, SpawnDef};
    use crate::sprite::npc::FacingRule;

    fn player_at(x: f32) -> Rect {
        Rect::new_from_x_y(x, 416.0, 64.0, 64.0)
    }

    fn door_key() -> Controls {
        Controls {
            enter: true,
            ..Controls::default()
        }
    }

    #[test]
    fn fresh_press_on_door_fires() {
        let rooms = village();
        let town = rooms.get("town").unwrap();
        let door = door_to_use(town, &player_at(820.0), &door_key(), false).unwrap();
        assert_eq!(door.destination, Destination::Room("tavern".into()));
    }

    #[test]
    fn held_key_or_no_overlap_does_not_fire() {
        let rooms = village();
        let town = rooms.get("town").unwrap();
        assert!(door_to_use(town, &player_at(820.0), &door_key(), true).is_none());
        assert!(door_to_use(town, &player_at(820.0), &Controls::default(), false).is_none());
        assert!(door_to_use(town, &player_at(400.0), &door_key(), false).is_none());
    }

    #[test]
    fn door_prompt_follows_camera() {
        let rooms = village();
        let town = rooms.get("town").unwrap();
        let prompts = prompts(town, &[], &player_at(820.0), &Controls::default(), 500.0);
        assert_eq!(
            prompts,
            vec![Prompt {
                text: "Press [F] to enter Tavern".into(),
                position: Point { x: 300.0, y: 374.0 },
                style: PromptStyle::Hint,
            }]
        );
    }

    #[test]
    fn npc_hint_then_dialogue() {
        let rooms = village();
        let house = rooms.get("house").unwrap();
        let npc = Npc::spawn(
            &SpawnDef {
                tag: "sister".into(),
                sprite: "sister-idle".into(),
                x: 200.0,
                dialogue: "Hello World!".into(),
                facing: FacingRule::default(),
                requires_visited: None,
            },
            &GameConfig::default(),
        );
        let player = player_at(180.0);

        let idle = prompts(house, &[npc.clone()], &player, &Controls::default(), 0.0);
        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].text, "Press [E] to talk");
        assert_eq!(idle[0].position, Point { x: 180.0, y: 406.0 });

        let talking = Controls {
            interact: true,
            ..Controls::default()
        };
        let speech = prompts(house, &[npc], &player, &talking, 0.0);
        assert_eq!(speech[0].text, "Hello World!");
        assert_eq!(speech[0].style, PromptStyle::Speech);
        assert_eq!(speech[0].position, Point { x: 200.0, y: 406.0 });
    }

    #[test]
    fn overlapping_doors_all_prompt_in_list_order() {
        let rooms = village();
        let mut town = rooms.get("town").unwrap().clone();
        town.doors[1].rect = Rect::new_from_x_y(120.0, 384.0, 64.0, 96.0);
        let labels: Vec<_> = prompts(&town, &[], &player_at(110.0), &Controls::default(), 0.0)
            .into_iter()
            .map(|prompt| prompt.text)
            .collect();
        assert_eq!(
            labels,
            vec!["Press [F] to enter Home", "Press [F] to enter Tavern"]
        );
    }
}
