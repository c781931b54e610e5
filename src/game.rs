use crate::audio::{AudioSink, Soundtrack};
use crate::browser;
use crate::config::GameConfig;
use crate::engine::input::{Controls, KeyState};
use crate::engine::{self, Game, Point, Rect, Renderer};
use crate::interaction;
use crate::navigator::{Navigator, Transition};
use crate::rooms::{Destination, RoomSet, WorldDef};
use crate::sprite::player::Player;
use crate::sprite::{Block, Prompt, PromptStyle, RenderList, SpriteDraw, SpriteId};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use web_sys::HtmlImageElement;

/// ┌──────────────────────── One tick ───────────────────────────────┐
/// │  GameLoop (engine.rs)                                           │
/// │   └─► RoomHopper::update ── KeyState ─► Controls                │
/// │        └─► World::tick                                          │
/// │             ├─► door key released? reopen latch                 │
/// │             ├─► Player::update     (input, physics, animation)  │
/// │             ├─► Npc::update        (facing, ground, animation)  │
/// │             ├─► interaction        (door fires? prompts)        │
/// │             ├─► Navigator::enter   (room, NPCs, spawn, audio)   │
/// │             ├─► camera offset                                   │
/// │             └─► RenderList         (sprites, blocks, prompts)   │
/// │   └─► RoomHopper::draw ── RenderList ─► Renderer                │
/// └─────────────────────────────────────────────────────────────────┘
pub enum RoomHopper {
    /// resources still loading
    Loading,
    Loaded(Box<Loaded>),
}

pub struct Loaded {
    world: World,
    sprites: SpriteBank,
    audio: Soundtrack,
    frame: RenderList,
}

impl RoomHopper {
    const WORLD_PATH: &'static str = "world.json";

    pub fn new() -> Self {
        RoomHopper::Loading
    }

    async fn load_world() -> Result<WorldDef> {
        browser::fetch_json::<WorldDef>(Self::WORLD_PATH)
            .await
            .with_context(|| format!("Failed to load world from : {}", Self::WORLD_PATH))
    }
}

impl Default for RoomHopper {
    fn default() -> Self {
        RoomHopper::new()
    }
}

#[async_trait(?Send)]
impl Game for RoomHopper {
    // consumes nothing: Loading builds a fresh Loaded game, so a second call
    // on Loaded is a logic error
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            RoomHopper::Loading => {
                let world = Self::load_world().await?;
                let rooms = RoomSet::from_defs(&world.start, world.rooms)
                    .context("world.json failed validation")?;
                log!("world loaded : {} rooms, starting in '{}'", rooms.len(), world.start);

                let sprites = SpriteBank::load(&world.assets.sprites).await;
                // music starts on the first key press, see `World::start_music`
                let audio = Soundtrack::new(&world.assets.tracks, &rooms)?;

                Ok(Box::new(RoomHopper::Loaded(Box::new(Loaded {
                    world: World::new(rooms, world.config),
                    sprites,
                    audio,
                    frame: RenderList::default(),
                }))))
            }
            RoomHopper::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &KeyState) -> Result<()> {
        if let RoomHopper::Loaded(loaded) = self {
            let controls = Controls::from(keystate);
            loaded.frame = loaded.world.tick(&controls, &mut loaded.audio)?;
        }
        Ok(())
    }

    fn draw(&self, renderer: &Renderer) {
        if let RoomHopper::Loaded(loaded) = self {
            let viewport = loaded.world.config.viewport;
            renderer.clear(&Rect::new(Point::default(), viewport));
            // draw order is back to front: sprites, door blocks, text
            for sprite in &loaded.frame.sprites {
                loaded.sprites.draw(renderer, sprite);
            }
            for block in &loaded.frame.blocks {
                renderer.fill_rect(&block.rect, block.color);
            }
            for prompt in &loaded.frame.prompts {
                let (font, color) = match prompt.style {
                    PromptStyle::Hint => ("16px Arial", "white"),
                    PromptStyle::Speech => ("20px Arial", "black"),
                    PromptStyle::Banner => ("30px Arial", "black"),
                };
                renderer.draw_text(&prompt.text, &prompt.position, font, color);
            }
        }
    }
}

/// Images keyed by sprite handle. Handles that failed to load are absent and
/// simply not drawn.
pub struct SpriteBank {
    images: HashMap<SpriteId, HtmlImageElement>,
}

impl SpriteBank {
    async fn load(sources: &BTreeMap<SpriteId, String>) -> Self {
        // parallel: total time is the slowest image, not the sum
        let loads = sources.iter().map(|(id, path)| async move {
            let image = engine::load_image(path)
                .await
                .with_context(|| format!("Failed to load sprite '{}' from : {}", id, path));
            (id.clone(), image)
        });
        let images = join_all(loads)
            .await
            .into_iter()
            .filter_map(|(id, image)| match image {
                Ok(image) => Some((id, image)),
                Err(err) => {
                    error!("{:#}", err);
                    None
                }
            })
            .collect();
        SpriteBank { images }
    }

    fn draw(&self, renderer: &Renderer, sprite: &SpriteDraw) {
        match self.images.get(&sprite.sprite) {
            Some(image) if image.complete() => renderer.draw_sprite(
                image,
                sprite.frame.as_ref(),
                &sprite.destination,
                sprite.flip,
            ),
            _ => {}
        }
    }
}

/// Transient banner, counted down in ticks
#[derive(Debug, Clone, PartialEq)]
struct Notice {
    text: String,
    ticks_left: u32,
}

/// Controls hint for the start room. Lingers until a fixed number of ticks
/// after the first movement input.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Tutorial {
    Waiting,
    Fading { ticks_left: u32 },
    Done,
}

const TUTORIAL_TEXT: &str = "Tutorial: W=Jump, A=Left, D=Right, E=Talk, F=Enter";
const VOLUME_STEP: f32 = 0.1;

/// Pure game state, everything one tick touches apart from the browser
pub struct World {
    player: Player,
    navigator: Navigator,
    config: GameConfig,
    notice: Option<Notice>,
    tutorial: Tutorial,
    previous: Controls,
    volume: f32,
    muted: bool,
    /// browsers refuse playback until a user gesture, the first key press
    music_started: bool,
}

impl World {
    pub fn new(rooms: RoomSet, config: GameConfig) -> Self {
        let player = Player::new(rooms.start().spawn, &config);
        World {
            player,
            navigator: Navigator::new(rooms, config),
            config,
            notice: None,
            tutorial: Tutorial::Waiting,
            previous: Controls::default(),
            volume: 0.5,
            muted: false,
            music_started: false,
        }
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn tick(&mut self, controls: &Controls, audio: &mut impl AudioSink) -> Result<RenderList> {
        self.start_music(controls, audio);
        self.apply_audio_settings(controls, audio);
        if !controls.enter {
            self.navigator.release_latch();
        }

        let bounds = self.navigator.bounds();
        self.player.update(controls, bounds);
        let player_box = self.player.bounding_box();
        for npc in self.navigator.npcs_mut() {
            npc.update(&player_box, bounds, controls.interact);
        }

        let door = interaction::door_to_use(
            self.navigator.current_room(),
            &player_box,
            controls,
            self.navigator.door_in_use(),
        )
        .map(|door| door.destination.clone());
        if let Some(destination) = door {
            self.use_door(&destination, audio)?;
        }

        self.navigator.update_camera(&self.player);
        self.advance_timers(controls);
        self.previous = *controls;

        Ok(self.render_list(controls))
    }

    fn use_door(&mut self, destination: &Destination, audio: &mut impl AudioSink) -> Result<()> {
        let text = match self.navigator.enter(destination, &mut self.player, audio)? {
            Transition::Unavailable => "Coming soon!".to_string(),
            Transition::Entered { .. } => {
                format!("Welcome to {}!", self.navigator.current_room().name)
            }
        };
        self.notice = Some(Notice {
            text,
            ticks_left: self.config.notice_ticks,
        });
        Ok(())
    }

    fn start_music(&mut self, controls: &Controls, audio: &mut impl AudioSink) {
        if !self.music_started && controls.any_pressed() {
            self.music_started = true;
            audio.play_track_for_room(&self.navigator.current_room().id);
        }
    }

    /// M toggles mute, - and = step the volume, all on the press edge
    fn apply_audio_settings(&mut self, controls: &Controls, audio: &mut impl AudioSink) {
        let previous = self.previous;
        if controls.mute && !previous.mute {
            self.muted = !self.muted;
            audio.set_muted(self.muted);
        }
        let down = controls.volume_down && !previous.volume_down;
        let up = controls.volume_up && !previous.volume_up;
        let step = match (down, up) {
            (true, false) => -VOLUME_STEP,
            (false, true) => VOLUME_STEP,
            _ => 0.0,
        };
        if step != 0.0 {
            self.volume = (self.volume + step).clamp(0.0, 1.0);
            audio.set_volume(self.volume);
        }
    }

    fn advance_timers(&mut self, controls: &Controls) {
        if let Some(notice) = &mut self.notice {
            notice.ticks_left = notice.ticks_left.saturating_sub(1);
            if notice.ticks_left == 0 {
                self.notice = None;
            }
        }

        self.tutorial = match self.tutorial {
            Tutorial::Waiting if controls.any_movement() => Tutorial::Fading {
                ticks_left: self.config.tutorial_ticks,
            },
            Tutorial::Fading { ticks_left } if ticks_left <= 1 => Tutorial::Done,
            Tutorial::Fading { ticks_left } => Tutorial::Fading {
                ticks_left: ticks_left - 1,
            },
            other => other,
        };
    }

    fn render_list(&self, controls: &Controls) -> RenderList {
        let room = self.navigator.current_room();
        let offset = self.navigator.camera_offset();
        let player_box = self.player.bounding_box();
        let mut frame = RenderList::default();

        if let Some(background) = &room.background {
            frame.sprites.push(SpriteDraw {
                sprite: background.clone(),
                frame: None,
                destination: Rect::new_from_x_y(
                    -offset,
                    0.0,
                    room.width,
                    self.config.viewport.height,
                ),
                flip: false,
            });
        }
        for npc in self.navigator.npcs() {
            frame.push_drawable(npc, offset);
        }
        frame.push_drawable(&self.player, offset);

        frame.blocks = room
            .doors
            .iter()
            .map(|door| Block {
                rect: door.rect.scrolled(offset),
                color: match door.destination {
                    Destination::Room(_) => "#8b5a2b",
                    Destination::Unavailable => "#555555",
                },
            })
            .collect();

        frame.prompts = interaction::prompts(
            room,
            self.navigator.npcs(),
            &player_box,
            controls,
            offset,
        );
        if let Some(notice) = &self.notice {
            frame.prompts.push(Prompt {
                text: notice.text.clone(),
                position: Point {
                    x: self.config.viewport.width * 0.5 - 100.0,
                    y: self.config.viewport.height * 0.5,
                },
                style: PromptStyle::Banner,
            });
        }
        let in_start_room = room.id == self.navigator.rooms().start().id;
        if in_start_room && self.tutorial != Tutorial::Done {
            frame.prompts.push(Prompt {
                text: TUTORIAL_TEXT.to_string(),
                position: Point { x: 10.0, y: 50.0 },
                style: PromptStyle::Hint,
            });
        }
        frame
    }
}
