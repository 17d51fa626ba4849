//! Test suite for the Web and headless browsers.
#![cfg(target_arch = "wasm32")]

use flappy_piggy::config::GameConfig;
use flappy_piggy::state::GameState;
use flappy_piggy::world::World;
use flappy_piggy::Size;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn viewport() -> Size {
    Size {
        width: 400.0,
        height: 600.0,
    }
}

// unseeded worlds draw their entropy from the browser (getrandom "js")
#[wasm_bindgen_test]
fn unseeded_world_ticks_in_the_browser() {
    let mut world = World::new(GameConfig::default(), viewport());
    let start = js_sys::Date::now();
    world.tick(start, viewport());

    assert_eq!(world.state(), GameState::Normal);
    assert_eq!(world.obstacles().active().len(), 1);
    assert_eq!(world.collectibles().active().len(), 1);
}

#[wasm_bindgen_test]
fn config_survives_a_js_round_trip() {
    let config = GameConfig::default().with_seed(7).with_language("fr");
    let value = serde_wasm_bindgen::to_value(&config).unwrap();
    let back: GameConfig = serde_wasm_bindgen::from_value(value).unwrap();
    assert_eq!(back, config);
}
