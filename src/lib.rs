// ==================== Imports ====================
use wasm_bindgen::prelude::*;

mod browser;
mod engine;

pub mod camera;
pub mod collectibles;
pub mod config;
pub mod game;
pub mod i18n;
pub mod obstacles;
pub mod score;
pub mod sprite;
pub mod state;
pub mod world;

pub use engine::{Point, Rect, Size};

use config::GameConfig;
use engine::GameLoop;
use game::FlappyPiggy;

// ==================== Main Functions ====================
/// Main entry for Webassembly module
/// - installs panic hook and console logger
/// - starts the game loop, which loads assets and config first
#[wasm_bindgen]
pub fn main_js() -> Result<(), JsValue> {
    // setup better panic messages for debugging
    console_error_panic_hook::set_once();

    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    browser::init_logger(level).map_err(|err| JsValue::from_str(&format!("{:#}", err)))?;

    // spawns a new asynchronous task in local thread, for web assembly
    // environment, using wasm_bindgen_futures
    browser::spawn_local(async move {
        let game = FlappyPiggy::new(GameConfig::default());
        if let Err(err) = GameLoop::start(game).await {
            log::error!("Could not start game : {:#}", err);
        }
    });

    Ok(())
}
