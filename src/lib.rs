// ==================== Imports ====================
use wasm_bindgen::prelude::*;

#[macro_use]
mod browser;
pub mod audio;
pub mod camera;
pub mod config;
pub mod engine;
pub mod game;
pub mod interaction;
pub mod navigator;
pub mod rooms;
pub mod sprite;

// ==================== Main Functions ====================
/// Main entry for the Webassembly module
/// - installs the panic hook
/// - loads `world.json` and the assets it lists
/// - starts the frame loop
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // readable panic messages in the browser console
    console_error_panic_hook::set_once();

    browser::spawn_local(async move {
        let game = game::RoomHopper::new();
        if let Err(err) = engine::GameLoop::start(game).await {
            error!("Could not start game : {:#?}", err);
        }
    });

    Ok(())
}
