use crate::browser;
use crate::config::GameConfig;
use crate::engine::input::*;
use crate::engine::{Audio, FrameSource, Game, Image, Point, Rect, Renderer, Size, TextStyle, Video};
use crate::i18n::{self, Strings};
use crate::sprite::piggy::Direction;
use crate::sprite::{self, MatchVariant, PiggyVisual, GAME_OVER_FRAME, OBSTACLE_SHEET};
use crate::state::GameState;
use crate::world::{World, WorldEvent};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// TABLE
/// ┌───────────────────── Game Architecture Overview ────────────────────────┐
/// │                                                                         │
/// │    ┌─────────────┐          ┌─────────────┐          ┌─────────────┐    │
/// │    │  engine.rs  │  update  │   game.rs   │   tick   │  world.rs   │    │
/// │    │  GameLoop   ├─────────►│ FlappyPiggy ├─────────►│   World     │    │
/// │    │             │   draw   │             │◄─────────┤             │    │
/// │    └──────┬──────┘          └──────┬──────┘  events  └─────────────┘    │
/// │           │                        │                                    │
/// │     ┌─────┴──────┐          ┌──────┴───────┐                            │
/// │     │  KeyState  │          │  SoundBank   │                            │
/// │     │  + clicks  │          │  Assets      │                            │
/// │     └────────────┘          └──────────────┘                            │
/// │                                                                         │
/// ├──────────────────────── Call Sequence ──────────────────────────────────┤
/// │                                                                         │
/// │  1. GameLoop drains input into KeyState                                 │
/// │  2. FlappyPiggy.update()                                                │
/// │     ├─► restart (KeyR / Try Again click) once the run is over           │
/// │     ├─► steering keys -> World.request_move()                           │
/// │     ├─► World.tick(now, canvas size) -> Vec<WorldEvent>                 │
/// │     └─► WorldEvent -> sounds                                            │
/// │  3. FlappyPiggy.draw() paints the world, publishes the button rect      │
/// │  4. is_halted() once the pig has landed, the loop waits for input       │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
pub enum FlappyPiggy {
    /// Config to start from while assets are being requested
    Loading(GameConfig),

    Loaded(Flight),
}

impl FlappyPiggy {
    const CONFIG_PATH: &'static str = "config.json";

    pub fn new(config: GameConfig) -> Self {
        FlappyPiggy::Loading(config)
    }

    /// A missing or broken config.json is not fatal, `fallback` is used instead
    async fn load_config(fallback: &GameConfig) -> GameConfig {
        match browser::fetch_json::<GameConfig>(Self::CONFIG_PATH).await {
            Ok(config) => {
                log::info!("FlappyPiggy: using {}", Self::CONFIG_PATH);
                config
            }
            Err(err) => {
                log::warn!(
                    "FlappyPiggy: no usable {} ({:#}), using defaults",
                    Self::CONFIG_PATH,
                    err
                );
                fallback.clone()
            }
        }
    }
}

#[async_trait(?Send)]
impl Game for FlappyPiggy {
    // returning a new Game means the Loading variant is consumed exactly once
    async fn initialize(&self) -> Result<Box<dyn Game>> {
        match self {
            FlappyPiggy::Loading(config) => {
                let config = Self::load_config(config).await;
                let strings = i18n::resolve(
                    &config,
                    browser::stored_language().as_deref(),
                    browser::navigator_language().as_deref(),
                );
                browser::document()?.set_title(strings.title);
                // assets load in the background, draw() polls their readiness
                let assets = Assets::load()?;
                let sounds = SoundBank::load()?;
                let world = World::new(config, browser::canvas_size()?);
                Ok(Box::new(FlappyPiggy::Loaded(Flight {
                    world,
                    strings,
                    assets,
                    sounds,
                    try_again: None,
                    music_started: false,
                })))
            }
            FlappyPiggy::Loaded(_) => Err(anyhow!("Game is already initialized")),
        }
    }

    fn update(&mut self, keystate: &KeyState) {
        if let FlappyPiggy::Loaded(flight) = self {
            flight.update(keystate);
        }
    }

    fn draw(&mut self, renderer: &Renderer) {
        if let FlappyPiggy::Loaded(flight) = self {
            flight.draw(renderer);
        }
    }

    fn is_halted(&self) -> bool {
        match self {
            FlappyPiggy::Loaded(flight) => flight.world.state() == GameState::Finalized,
            FlappyPiggy::Loading(_) => false,
        }
    }
}

// key code -> steering direction
const MOVES: [(&str, Direction); 4] = [
    ("ArrowUp", Direction::Up),
    ("ArrowDown", Direction::Down),
    ("ArrowLeft", Direction::Left),
    ("ArrowRight", Direction::Right),
];
const RESTART_KEY: &str = "KeyR";

/// One loaded game : the world plus everything the browser needs to show it
pub struct Flight {
    world: World,
    strings: &'static Strings,
    assets: Assets,
    sounds: SoundBank,
    /// screen rect of the Try Again button, Some only while it is on screen
    try_again: Option<Rect>,
    music_started: bool,
}

impl Flight {
    fn update(&mut self, keystate: &KeyState) {
        let has_input = keystate.presses().next().is_some() || !keystate.clicks().is_empty();
        // browsers only allow audio after a user gesture
        if has_input && !self.music_started {
            self.music_started = true;
            self.sounds.play(Sound::Bgm);
        }

        if self.world.state().is_game_over() && self.wants_restart(keystate) {
            self.restart();
            return;
        }

        for (code, direction) in MOVES {
            if keystate.was_pressed(code) && self.world.request_move(direction) {
                self.sounds.play(Sound::Jump);
            }
        }

        let (now, viewport) = match (browser::now(), browser::canvas_size()) {
            (Ok(now), Ok(viewport)) => (now, viewport),
            (Err(err), _) | (_, Err(err)) => {
                log::error!("Flight: skipping tick : {:#}", err);
                return;
            }
        };
        for event in self.world.tick(now, viewport) {
            self.on_event(event);
        }
    }

    fn wants_restart(&self, keystate: &KeyState) -> bool {
        let clicked = self.try_again.map_or(false, |button| {
            keystate.clicks().iter().any(|click| button.contains(*click))
        });
        clicked || keystate.was_pressed(RESTART_KEY)
    }

    fn restart(&mut self) {
        self.sounds.stop_all();
        self.world.restart();
        self.try_again = None;
        self.sounds.play(Sound::Bgm);
    }

    fn on_event(&mut self, event: WorldEvent) {
        match event {
            WorldEvent::ObstaclePassed => self.sounds.play(Sound::CoinCollect),
            WorldEvent::Collected => self.sounds.play(Sound::CoinOink),
            WorldEvent::Crashed => {
                self.sounds.pause(Sound::Bgm);
                self.sounds.start_fall();
                self.sounds.play(Sound::Hit);
                self.sounds.play(Sound::PigDeath);
                self.sounds.play(Sound::CourseClear);
                self.assets.freeze_matches();
            }
            WorldEvent::GroundSpawned => log::debug!("Flight: ground in sight"),
            WorldEvent::Landed => {
                self.sounds.end_fall();
                self.sounds.play(Sound::Dead);
            }
        }
    }

    // Draw order matters : background -> ground -> obstacles -> pig -> coins -> HUD
    fn draw(&mut self, renderer: &Renderer) {
        let viewport = self.world.viewport();
        renderer.clear(&Rect::new(Point::default(), viewport));

        self.draw_background(renderer, viewport);
        self.try_again = None;
        if let Some(ground_top) = self.world.ground_top_on_screen() {
            self.draw_ground(renderer, viewport, ground_top);
            self.draw_match(renderer, viewport, ground_top);
            self.draw_score_panel(renderer, viewport);
        }
        self.draw_obstacles(renderer, viewport);
        self.draw_piggy(renderer);
        self.draw_collectibles(renderer);

        renderer.draw_text(
            &format!("Score: {}", self.world.score()),
            HUD_POSITION,
            &HUD_STYLE,
        );
    }

    fn draw_background(&self, renderer: &Renderer, viewport: Size) {
        let full = Rect::new(Point::default(), viewport);
        let video = &self.assets.background;
        if !video.is_ready() {
            renderer.fill_rect(&full, SKY_COLOR);
            return;
        }
        let native = video.natural_size();
        let tile = scale_to_height(native, viewport.height);
        let camera = self.world.camera();
        let offset = parallax_offset(
            camera.horizontal_offset(),
            camera.vertical_offset(),
            tile.width,
            self.world.state().is_game_over(),
        );
        for x in tile_starts(-offset, viewport.width, tile.width) {
            let destination = Rect::new_from_x_y(x, 0.0, tile.width, tile.height);
            if !renderer.draw_entire_frame(video, &destination) {
                renderer.fill_rect(&full, SKY_COLOR);
                break;
            }
        }
        if tile.height < viewport.height {
            renderer.fill_rect(
                &Rect::new_from_x_y(0.0, tile.height, viewport.width, viewport.height - tile.height),
                SKY_COLOR,
            );
        }
    }

    fn draw_ground(&self, renderer: &Renderer, viewport: Size, ground_top: f64) {
        let height = self.world.config().fall.ground_height;
        let y = ground_top.max(-height).min(viewport.height);
        let band = Rect::new_from_x_y(0.0, y, viewport.width, height);

        let image = &self.assets.ground;
        if !image.is_ready() {
            renderer.fill_rect(&band, GROUND_COLOR);
            return;
        }
        let tile = scale_to_height(image.natural_size(), height);
        for x in tile_starts(0.0, viewport.width + tile.width, tile.width) {
            let destination = Rect::new_from_x_y(x, y, tile.width, height);
            if !renderer.draw_entire_frame(image, &destination) {
                renderer.fill_rect(&band, GROUND_COLOR);
                break;
            }
        }
    }

    /// Frozen frame of the character picked by score, standing on the ground
    fn draw_match(&self, renderer: &Renderer, viewport: Size, ground_top: f64) {
        let variant = MatchVariant::for_score(self.world.score());
        let Some(video) = self.assets.matches.get(&variant) else {
            return;
        };
        if video.is_ready() {
            let destination = match_rect(viewport, video.natural_size(), ground_top);
            renderer.draw_entire_frame(video, &destination);
        }
    }

    /// World anchored score label, Try Again button and level lines
    fn draw_score_panel(&mut self, renderer: &Renderer, viewport: Size) {
        let panel_y = self.world.camera().to_screen_y(SCORE_PANEL_WORLD_Y);
        if !panel_on_screen(panel_y, viewport.height) {
            return;
        }
        let center_x = viewport.width / 2.0;
        let score = self.world.score();

        let label = self.strings.score_label(score);
        let label_width = renderer.measure_text(&label, LABEL_STYLE.font) + PANEL_PADDING * 2.0;
        let label_height = 28.0 + PANEL_PADDING;
        let label_box = Rect::new_from_x_y(
            (viewport.width - label_width) / 2.0,
            panel_y - label_height - 16.0,
            label_width,
            label_height,
        );
        renderer.fill_rect(&label_box, "rgba(0,0,0,0.6)");
        renderer.draw_text(
            &label,
            Point {
                x: center_x,
                y: label_box.y() + label_height / 2.0,
            },
            &LABEL_STYLE,
        );

        let button = try_again_rect(viewport.width, panel_y);
        renderer.fill_rect(&button, "rgba(255,255,255,0.95)");
        renderer.stroke_rect(&button, "#333", 2.0);
        renderer.draw_text(
            self.strings.try_again,
            Point {
                x: center_x,
                y: button.y() + button.height() / 2.0,
            },
            &BUTTON_STYLE,
        );
        self.try_again = Some(button);

        let first_line = button.bottom() + 14.0;
        for (index, line) in self.strings.level_lines(score).iter().enumerate() {
            renderer.draw_text(
                line,
                Point {
                    x: center_x,
                    y: first_line + index as f64 * 20.0,
                },
                &LEVEL_STYLE,
            );
        }
    }

    fn draw_obstacles(&self, renderer: &Renderer, viewport: Size) {
        let camera_y = self.world.camera().vertical_offset();
        let frozen = self.world.obstacles().is_frozen();
        for obstacle in self.world.obstacles().active() {
            let frame = if frozen {
                &GAME_OVER_FRAME
            } else {
                sprite::obstacle_frame(obstacle.variant)
            };
            let top = obstacle.gap_bottom() - camera_y;
            // native size only, never squashed to fit
            if viewport.height - top < frame.height() {
                continue;
            }
            renderer.draw_frame(
                &self.assets.obstacles,
                frame,
                &Rect::new_from_x_y(obstacle.x, top, frame.width(), frame.height()),
            );
        }
    }

    fn draw_piggy(&self, renderer: &Renderer) {
        let piggy = self.world.piggy();
        if let Some(image) = self.assets.piggy.get(&piggy.visual()) {
            renderer.draw_rotated(image, piggy.position(), piggy.size(), piggy.rotation());
        }
    }

    fn draw_collectibles(&self, renderer: &Renderer) {
        let camera_y = self.world.camera().vertical_offset();
        for collectible in self
            .world
            .collectibles()
            .active()
            .iter()
            .filter(|collectible| !collectible.collected)
        {
            renderer.draw_entire_frame(&self.assets.coin, &collectible.screen_box(camera_y));
        }
    }
}

// ==================== Layout ====================
const SKY_COLOR: &str = "#70c5ce";
const GROUND_COLOR: &str = "#8B5A2B";
const SCORE_PANEL_WORLD_Y: f64 = 1511.0;
// how far off screen the panel may be and still be drawn
const PANEL_MARGIN: f64 = 200.0;
const PANEL_PADDING: f64 = 10.0;
const BUTTON_SIZE: Size = Size {
    width: 160.0,
    height: 42.0,
};
const HUD_POSITION: Point = Point { x: 10.0, y: 30.0 };

const HUD_STYLE: TextStyle = TextStyle {
    font: "24px Arial",
    color: "white",
    align: "left",
    baseline: "alphabetic",
};
const LABEL_STYLE: TextStyle = TextStyle {
    font: "20px Comic Sans MS",
    color: "white",
    align: "center",
    baseline: "middle",
};
const BUTTON_STYLE: TextStyle = TextStyle {
    font: "18px Comic Sans MS",
    color: "#111",
    align: "center",
    baseline: "middle",
};
const LEVEL_STYLE: TextStyle = TextStyle {
    font: "16px Comic Sans MS",
    color: "white",
    align: "center",
    baseline: "middle",
};

fn scale_to_height(native: Size, height: f64) -> Size {
    if native.height <= 0.0 {
        return Size::default();
    }
    Size {
        width: native.width * height / native.height,
        height,
    }
}

/// Horizontal scroll of the background tiles, a bit faster the deeper the
/// camera is and pinned once the run is over
fn parallax_offset(camera_x: f64, camera_y: f64, tile_width: f64, frozen: bool) -> f64 {
    if frozen || tile_width <= 0.0 {
        return 0.0;
    }
    let depth = (camera_y / 1000.0).max(0.0).min(2.0);
    (camera_x * (1.0 + depth * 0.6)).rem_euclid(tile_width)
}

/// Left edges of the tiles covering [start, end)
fn tile_starts(start: f64, end: f64, tile_width: f64) -> impl Iterator<Item = f64> {
    let count = if tile_width > 0.0 {
        ((end - start) / tile_width).ceil().max(0.0) as usize
    } else {
        0
    };
    (0..count).map(move |index| start + index as f64 * tile_width)
}

fn match_rect(viewport: Size, native: Size, ground_top: f64) -> Rect {
    let width = (viewport.width * 0.36).min(220.0);
    let height = if native.width > 0.0 && native.height > 0.0 {
        width * native.height / native.width
    } else {
        width * 0.75
    };
    Rect::new_from_x_y(
        (viewport.width - width) / 2.0,
        ground_top - height - 6.0,
        width,
        height,
    )
}

fn panel_on_screen(panel_y: f64, viewport_height: f64) -> bool {
    panel_y >= -PANEL_MARGIN && panel_y <= viewport_height + PANEL_MARGIN
}

fn try_again_rect(viewport_width: f64, panel_y: f64) -> Rect {
    Rect::new_from_x_y(
        (viewport_width - BUTTON_SIZE.width) / 2.0,
        panel_y + 8.0,
        BUTTON_SIZE.width,
        BUTTON_SIZE.height,
    )
}

// ==================== Assets ====================
const BACKGROUND_VIDEO: &str = "https://files.catbox.moe/c0bi7o.mp4";
const GROUND_IMAGE: &str = "wood.png";
const COIN_IMAGE: &str = "mario-coins.gif";

/// Every image and video the game draws, all loading in the background
struct Assets {
    background: Video,
    ground: Image,
    obstacles: Image,
    coin: Image,
    piggy: HashMap<PiggyVisual, Image>,
    matches: HashMap<MatchVariant, Video>,
}

impl Assets {
    fn load() -> Result<Self> {
        let piggy = PiggyVisual::ALL
            .iter()
            .map(|visual| -> Result<(PiggyVisual, Image)> {
                Ok((*visual, Image::load(visual.image_path())?))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        let matches = MatchVariant::ALL
            .iter()
            .map(|variant| -> Result<(MatchVariant, Video)> {
                Ok((
                    *variant,
                    Video::load(variant.video_path(), Some(variant.freeze_at()))?,
                ))
            })
            .collect::<Result<HashMap<_, _>>>()?;
        Ok(Assets {
            background: Video::load(BACKGROUND_VIDEO, None)?,
            ground: Image::load(GROUND_IMAGE)?,
            obstacles: Image::load(OBSTACLE_SHEET)?,
            coin: Image::load(COIN_IMAGE)?,
            piggy,
            matches,
        })
    }

    fn freeze_matches(&self) {
        self.matches.values().for_each(Video::freeze);
    }
}

// ==================== Sounds ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sound {
    Jump,
    Hit,
    PigDeath,
    /// obstacle passed
    CoinCollect,
    /// collectible picked up
    CoinOink,
    Bgm,
    CourseClear,
    FallStart,
    Falling,
    Dead,
}

impl Sound {
    pub const ALL: [Sound; 10] = [
        Sound::Jump,
        Sound::Hit,
        Sound::PigDeath,
        Sound::CoinCollect,
        Sound::CoinOink,
        Sound::Bgm,
        Sound::CourseClear,
        Sound::FallStart,
        Sound::Falling,
        Sound::Dead,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Sound::Jump => "jump.wav",
            Sound::Hit => "Minecraft - Hit (Sound Effect).mp3",
            Sound::PigDeath => {
                "pig-death-(minecraft-sound)-sound-effect-for-editing-made-with-Voicemod.mp3"
            }
            Sound::CoinCollect => "sun_collect.mp3",
            Sound::CoinOink => "piglette oink a1.wav",
            Sound::Bgm => "BGM.mp3",
            Sound::CourseClear => "47. Course Clear.mp3",
            Sound::FallStart => "fall.wav",
            Sound::Falling => "falling.wav",
            Sound::Dead => "dead.wav",
        }
    }

    fn is_looping(self) -> bool {
        matches!(self, Sound::Bgm | Sound::Falling)
    }
}

const MUSIC_VOLUME: f64 = 0.4;

/// Set from crash to landing, shared with the FallStart `ended` listener
/// so a clip that ends after a restart or landing doesn't start the loop
#[derive(Debug, Clone, Default)]
struct FallCue(Rc<Cell<bool>>);

impl FallCue {
    fn begin(&self) {
        self.0.set(true);
    }

    fn end(&self) {
        self.0.set(false);
    }

    fn hands_over(&self) -> bool {
        self.0.get()
    }
}

/// Every clip loaded up front, playback is fire-and-forget
pub struct SoundBank {
    clips: HashMap<Sound, Audio>,
    falling: FallCue,
}

impl SoundBank {
    fn load() -> Result<Self> {
        let mut clips = HashMap::new();
        for sound in Sound::ALL {
            let audio = Audio::load(sound.path())?;
            audio.set_looping(sound.is_looping());
            if sound == Sound::Bgm {
                audio.set_volume(MUSIC_VOLUME);
            }
            clips.insert(sound, audio);
        }
        let falling = FallCue::default();

        // one listener for the whole game, FallStart hands over to the loop
        if let (Some(start), Some(fall_loop)) =
            (clips.get(&Sound::FallStart), clips.get(&Sound::Falling))
        {
            let fall_loop = fall_loop.clone();
            let cue = falling.clone();
            start.on_ended(move || {
                if cue.hands_over() {
                    fall_loop.play();
                }
            })?;
        }
        Ok(SoundBank { clips, falling })
    }

    pub fn play(&self, sound: Sound) {
        if let Some(audio) = self.clips.get(&sound) {
            audio.play();
        }
    }

    pub fn pause(&self, sound: Sound) {
        if let Some(audio) = self.clips.get(&sound) {
            audio.pause();
        }
    }

    pub fn stop(&self, sound: Sound) {
        if let Some(audio) = self.clips.get(&sound) {
            audio.stop();
        }
    }

    pub fn stop_all(&self) {
        self.falling.end();
        self.clips.values().for_each(Audio::stop);
    }

    /// FallStart once, the listener set up in `load` starts the looping
    /// Falling clip when it ends
    fn start_fall(&self) {
        self.falling.begin();
        self.play(Sound::FallStart);
    }

    fn end_fall(&self) {
        self.falling.end();
        self.stop(Sound::FallStart);
        self.stop(Sound::Falling);
    }
}
