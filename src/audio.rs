use crate::browser;
use crate::rooms::{RoomId, RoomSet};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use wasm_bindgen_futures::JsFuture;
use web_sys::HtmlAudioElement;

const DEFAULT_VOLUME: f64 = 0.5;

/// Looping background tracks, one per room
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Track {
    Menu,
    Explore,
    Dungeon,
}

/// Audio collaborator. Room changes call `play_track_for_room`; settings
/// glue calls the other two.
pub trait AudioSink {
    /// No-op when the room's track is already playing
    fn play_track_for_room(&mut self, room: &str);
    fn set_volume(&mut self, level: f32);
    fn set_muted(&mut self, muted: bool);
}

/// [`AudioSink`] over `<audio>` elements
pub struct Soundtrack {
    elements: BTreeMap<Track, HtmlAudioElement>,
    room_tracks: HashMap<RoomId, Track>,
    /// shared with pending play promises, which clear it on rejection so the
    /// next request for the same track retries
    current: Rc<Cell<Option<Track>>>,
}

impl Soundtrack {
    pub fn new(sources: &BTreeMap<Track, String>, rooms: &RoomSet) -> Result<Self> {
        let mut elements = BTreeMap::new();
        for (track, source) in sources {
            let element = browser::create_audio_element(source)?;
            element.set_loop(true);
            element.set_volume(DEFAULT_VOLUME);
            elements.insert(*track, element);
        }
        let room_tracks = rooms
            .iter()
            .map(|room| (room.id.clone(), room.track))
            .collect();
        Ok(Soundtrack {
            elements,
            room_tracks,
            current: Rc::new(Cell::new(None)),
        })
    }

    pub fn current(&self) -> Option<Track> {
        self.current.get()
    }

    pub fn play(&mut self, track: Track) {
        if self.current.get() == Some(track) {
            return;
        }
        if let Some(previous) = self.current.get().and_then(|t| self.elements.get(&t)) {
            if let Err(err) = previous.pause() {
                error!("could not pause {:?} : {:#?}", self.current.get(), err);
            }
            previous.set_current_time(0.0);
        }
        let Some(element) = self.elements.get(&track) else {
            log!("no audio source for {:?}", track);
            self.current.set(Some(track));
            return;
        };
        self.current.set(Some(track));
        match element.play() {
            // autoplay is refused until the page sees a user gesture; the
            // refusal arrives on the promise
            Ok(promise) => {
                let current = Rc::clone(&self.current);
                browser::spawn_local(async move {
                    if let Err(err) = JsFuture::from(promise).await {
                        error!("could not play {:?} : {:#?}", track, err);
                        if current.get() == Some(track) {
                            current.set(None);
                        }
                    }
                });
            }
            Err(err) => {
                error!("could not play {:?} : {:#?}", track, err);
                self.current.set(None);
            }
        }
    }
}

impl AudioSink for Soundtrack {
    fn play_track_for_room(&mut self, room: &str) {
        match self.room_tracks.get(room).copied() {
            Some(track) => self.play(track),
            None => log!("room '{}' has no track", room),
        }
    }

    fn set_volume(&mut self, level: f32) {
        let level = f64::from(level.clamp(0.0, 1.0));
        for element in self.elements.values() {
            element.set_volume(level);
        }
    }

    fn set_muted(&mut self, muted: bool) {
        for element in self.elements.values() {
            element.set_muted(muted);
        }
    }
}
