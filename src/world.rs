//! Everything that happens in one tick, without a browser in sight.
//!
//! ```text
//!  tick(now, viewport)
//!   ├─► piggy / obstacles / collectibles update
//!   ├─► fall physics moves the camera (death sequence only)
//!   ├─► ground timer
//!   ├─► camera scroll + vertical follow
//!   ├─► collisions : obstacle -> crash, pass -> score, pickup -> score
//!   ├─► ground safeguard + landing
//!   └─► WorldEvents back to the caller (sounds, visuals)
//! ```
use crate::camera::{Camera, Framing};
use crate::collectibles::CollectibleManager;
use crate::config::GameConfig;
use crate::engine::Size;
use crate::obstacles::ObstacleManager;
use crate::score::ScoreTracker;
use crate::sprite::piggy::{Direction, Piggy};
use crate::state::GameState;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// What happened during a tick, for the game to react to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    ObstaclePassed,
    Collected,
    /// first obstacle hit, the death fall starts
    Crashed,
    GroundSpawned,
    /// player touched the ground, the run is over
    Landed,
}

/// Ground of the death sequence, scheduled on crash
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Ground {
    pub spawn_at_ms: Option<f64>,
    pub world_y: Option<f64>,
}

pub struct World {
    config: GameConfig,
    rng: StdRng,
    viewport: Size,
    piggy: Piggy,
    obstacles: ObstacleManager,
    collectibles: CollectibleManager,
    score: ScoreTracker,
    camera: Camera,
    state: GameState,
    ground: Ground,
}

impl World {
    pub fn new(config: GameConfig, viewport: Size) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        World {
            piggy: Piggy::new(config.player.clone(), viewport.width),
            obstacles: ObstacleManager::new(config.obstacles.clone()),
            collectibles: CollectibleManager::new(config.collectibles.clone()),
            score: ScoreTracker::new(),
            camera: Camera::new(config.camera.clone()),
            state: GameState::Normal,
            ground: Ground::default(),
            viewport,
            rng,
            config,
        }
    }

    /// Fresh life : camera, state, score, managers, ground and a new player
    pub fn restart(&mut self) {
        log::info!("world: restart (score was {})", self.score.value());
        self.camera = Camera::new(self.config.camera.clone());
        self.state.reset();
        self.score.reset();
        self.obstacles = ObstacleManager::new(self.config.obstacles.clone());
        self.collectibles = CollectibleManager::new(self.config.collectibles.clone());
        self.ground = Ground::default();
        self.piggy = Piggy::new(self.config.player.clone(), self.viewport.width);
    }

    /// Steering only counts while the player is alive, returns whether the
    /// move was accepted
    pub fn request_move(&mut self, direction: Direction) -> bool {
        if self.state != GameState::Normal {
            return false;
        }
        self.piggy.request_move(direction);
        true
    }

    pub fn tick(&mut self, now_ms: f64, viewport: Size) -> Vec<WorldEvent> {
        let mut events = Vec::new();
        if self.state == GameState::Finalized {
            return events;
        }
        self.viewport = viewport;

        self.piggy.set_bounds_width(viewport.width);
        self.piggy.update();
        self.obstacles.tick(now_ms, viewport, &mut self.rng);
        self.collectibles.tick(now_ms, viewport, &mut self.rng);

        // the world scrolls past a player that stays put on screen
        if self.piggy.is_falling() {
            let velocity = self.piggy.fall_step(self.config.fall.gravity);
            self.camera.displace(velocity);
        }

        if self.state == GameState::GameOverFalling
            && self.ground.spawn_at_ms.map_or(false, |at| now_ms >= at)
        {
            self.spawn_ground(&mut events);
        }

        self.camera.scroll(self.obstacles.speed());
        let framing = if self.state.is_falling() {
            Framing::UpperThird
        } else {
            Framing::Centered
        };
        self.camera
            .frame(self.piggy.position().y, viewport.height, framing);
        self.camera.advance();

        self.check_collisions(now_ms, &mut events);
        events
    }

    fn check_collisions(&mut self, now_ms: f64, events: &mut Vec<WorldEvent>) {
        let camera_y = self.camera.vertical_offset();

        if self.state == GameState::Normal {
            let crashed = self
                .obstacles
                .active()
                .iter()
                .any(|obstacle| self.piggy.check_collision_with_obstacle(obstacle, camera_y));
            if crashed {
                self.begin_fall(now_ms, events);
            }
        }

        // scoring keeps running through the fall
        let passed = self.obstacles.mark_passed(self.piggy.position().x);
        for _ in 0..passed {
            self.award(WorldEvent::ObstaclePassed, events);
        }
        let picked = self
            .collectibles
            .check_collision(&self.piggy.bounding_box(), camera_y);
        for _ in picked {
            self.award(WorldEvent::Collected, events);
        }

        if self.state == GameState::GameOverFalling && self.near_visible_bottom() {
            log::debug!("world: player near the bottom, forcing the ground");
            self.spawn_ground(events);
        }

        if self.state == GameState::GroundSpawned {
            self.try_land(events);
        }
    }

    fn award(&mut self, event: WorldEvent, events: &mut Vec<WorldEvent>) {
        self.score.increment();
        self.piggy.increase_speed(self.score.value());
        events.push(event);
    }

    fn transition(&mut self, to: GameState) -> bool {
        match self.state.transition_to(to) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("world: ignored transition : {}", err);
                false
            }
        }
    }

    fn begin_fall(&mut self, now_ms: f64, events: &mut Vec<WorldEvent>) {
        if !self.transition(GameState::GameOverFalling) {
            return;
        }
        log::info!("world: crashed with score {}", self.score.value());
        self.obstacles.freeze();

        let bottom_limit = self.viewport.height - self.piggy.size().height / 2.0;
        self.piggy.lift_above(bottom_limit);
        self.piggy.start_falling(&mut self.rng);

        self.camera.frame(
            self.piggy.position().y,
            self.viewport.height,
            Framing::UpperThird,
        );
        self.ground = Ground {
            spawn_at_ms: Some(now_ms + self.config.fall.ground_delay_ms),
            world_y: Some(self.config.fall.ground_world_y),
        };
        events.push(WorldEvent::Crashed);
    }

    fn spawn_ground(&mut self, events: &mut Vec<WorldEvent>) {
        if !self.transition(GameState::GroundSpawned) {
            return;
        }
        let world_y = *self
            .ground
            .world_y
            .get_or_insert(self.config.fall.ground_world_y);
        log::debug!("world: ground spawned at world y {}", world_y);

        // nudge so the landing happens in view
        let bias = self.config.camera.fall_bias;
        self.camera
            .set_target((self.piggy.position().y - self.viewport.height * bias).max(0.0));
        self.piggy
            .ensure_min_velocity(self.config.fall.min_landing_velocity);
        events.push(WorldEvent::GroundSpawned);
    }

    fn near_visible_bottom(&self) -> bool {
        let player_bottom = self.camera.to_world_y(self.piggy.bottom());
        let visible_bottom = self.camera.to_world_y(self.viewport.height);
        player_bottom >= visible_bottom - self.config.fall.ground_margin
    }

    fn try_land(&mut self, events: &mut Vec<WorldEvent>) {
        let Some(ground_top) = self.ground_top_on_screen() else {
            return;
        };
        if self.piggy.bottom() < ground_top - self.config.fall.landing_epsilon {
            return;
        }
        if !self.transition(GameState::Finalized) {
            return;
        }
        self.piggy.land_on(ground_top);
        self.piggy.set_failed();
        log::info!("world: landed, final score {}", self.score.value());
        events.push(WorldEvent::Landed);
    }

    pub fn ground_top_on_screen(&self) -> Option<f64> {
        if !self.state.ground_visible() {
            return None;
        }
        self.ground.world_y.map(|y| self.camera.to_screen_y(y))
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn piggy(&self) -> &Piggy {
        &self.piggy
    }

    pub fn obstacles(&self) -> &ObstacleManager {
        &self.obstacles
    }

    pub fn collectibles(&self) -> &CollectibleManager {
        &self.collectibles
    }

    pub fn score(&self) -> u32 {
        self.score.value()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn ground(&self) -> Ground {
        self.ground
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectibles::Collectible;
    use crate::obstacles::Obstacle;
    use crate::sprite::PiggyVisual;
    use approx::assert_relative_eq;

    const TALL: Size = Size {
        width: 400.0,
        height: 600.0,
    };
    const FRAME_MS: f64 = 1000.0 / 60.0;

    fn world(viewport: Size) -> World {
        World::new(GameConfig::default().with_seed(1234), viewport)
    }

    /// obstacle whose solid part starts right at the player's center
    fn blocking_obstacle() -> Obstacle {
        Obstacle {
            x: 30.0,
            gap_center_y: 125.0,
            gap_half_height: 75.0,
            width: 60.0,
            height: 110.0,
            passed: false,
            variant: 0,
        }
    }

    fn crash(world: &mut World, now_ms: f64) -> Vec<WorldEvent> {
        world.obstacles.spawn(blocking_obstacle());
        world.tick(now_ms, world.viewport())
    }

    #[test]
    fn score_counts_passes_and_pickups() {
        let mut world = world(TALL);
        for x in [-20.0, -15.0, -10.0] {
            world.obstacles.spawn(Obstacle {
                x,
                gap_center_y: 400.0,
                ..blocking_obstacle()
            });
        }
        for _ in 0..2 {
            world.collectibles.spawn(Collectible {
                x: 40.0,
                world_y: 190.0,
                size: 25.0,
                collected: false,
            });
        }

        let events = world.tick(0.0, TALL);
        assert_eq!(world.score(), 5);
        assert_eq!(
            events
                .iter()
                .filter(|event| **event == WorldEvent::ObstaclePassed)
                .count(),
            3
        );
        assert_eq!(
            events
                .iter()
                .filter(|event| **event == WorldEvent::Collected)
                .count(),
            2
        );

        // nothing is counted twice
        world.tick(FRAME_MS, TALL);
        assert_eq!(world.score(), 5);
    }

    #[test]
    fn crash_starts_the_fall_once() {
        let mut world = world(TALL);
        let events = crash(&mut world, 0.0);

        assert_eq!(events, vec![WorldEvent::Crashed]);
        assert_eq!(world.state(), GameState::GameOverFalling);
        assert!(world.piggy().is_falling());
        assert!(world.obstacles().is_frozen());
        assert_eq!(world.piggy().visual(), PiggyVisual::Sad);
        assert_eq!(world.ground().spawn_at_ms, Some(1200.0));
        assert_eq!(world.ground().world_y, Some(1601.0));

        let events = world.tick(FRAME_MS, TALL);
        assert!(!events.contains(&WorldEvent::Crashed));
    }

    /// coin on the player's row for the current camera offset
    fn coin_in_reach(world: &mut World) {
        let world_y = world.camera().vertical_offset() + 190.0;
        world.collectibles.spawn(Collectible {
            x: 40.0,
            world_y,
            size: 25.0,
            collected: false,
        });
    }

    #[test]
    fn coins_still_score_while_falling() {
        let mut world = world(TALL);
        crash(&mut world, 0.0);
        assert_eq!(world.score(), 0);

        coin_in_reach(&mut world);
        let events = world.tick(FRAME_MS, TALL);
        assert!(events.contains(&WorldEvent::Collected));
        assert_eq!(world.score(), 1);
        assert_eq!(world.state(), GameState::GameOverFalling);
    }

    #[test]
    fn coins_still_score_once_the_ground_is_out() {
        let mut world = world(TALL);
        crash(&mut world, 0.0);
        world.tick(1200.0, TALL);
        assert_eq!(world.state(), GameState::GroundSpawned);

        coin_in_reach(&mut world);
        let events = world.tick(1200.0 + FRAME_MS, TALL);
        assert!(events.contains(&WorldEvent::Collected));
        assert_eq!(world.score(), 1);
        assert_eq!(world.state(), GameState::GroundSpawned);
    }

    #[test]
    fn steering_is_ignored_after_a_crash() {
        let mut world = world(TALL);
        assert!(world.request_move(Direction::Up));
        crash(&mut world, 0.0);
        assert!(!world.request_move(Direction::Up));
    }

    #[test]
    fn fall_moves_the_camera_not_the_player() {
        let mut world = world(TALL);
        crash(&mut world, 0.0);
        let y = world.piggy().position().y;

        for tick in 1..40 {
            world.tick(f64::from(tick) * FRAME_MS, TALL);
        }
        assert_relative_eq!(world.piggy().position().y, y);
        assert!(world.camera().vertical_offset() > 0.0);
    }

    #[test]
    fn ground_appears_after_the_delay() {
        let mut world = world(TALL);
        crash(&mut world, 0.0);

        world.tick(1199.0, TALL);
        assert_eq!(world.state(), GameState::GameOverFalling);
        assert_eq!(world.ground_top_on_screen(), None);

        let events = world.tick(1200.0, TALL);
        assert!(events.contains(&WorldEvent::GroundSpawned));
        assert_eq!(world.state(), GameState::GroundSpawned);
        assert!(world.piggy().velocity() >= 2.0);
    }

    #[test]
    fn short_viewport_forces_the_ground() {
        let short = Size {
            width: 400.0,
            height: 400.0,
        };
        let mut world = world(short);
        let events = crash(&mut world, 0.0);

        assert_eq!(events, vec![WorldEvent::Crashed, WorldEvent::GroundSpawned]);
        assert_eq!(world.state(), GameState::GroundSpawned);
    }

    #[test]
    fn death_sequence_lands_through_ground_spawned() {
        let mut world = world(TALL);
        crash(&mut world, 0.0);

        let mut seen = vec![world.state()];
        let mut landed = false;
        for tick in 1..5000 {
            let events = world.tick(f64::from(tick) * FRAME_MS, TALL);
            if seen.last() != Some(&world.state()) {
                seen.push(world.state());
            }
            if events.contains(&WorldEvent::Landed) {
                landed = true;
                break;
            }
        }

        assert!(landed, "fall never resolved");
        assert_eq!(
            seen,
            vec![
                GameState::GameOverFalling,
                GameState::GroundSpawned,
                GameState::Finalized
            ]
        );
        assert_eq!(world.piggy().visual(), PiggyVisual::Failed);
        let ground_top = world.ground_top_on_screen().unwrap();
        assert_relative_eq!(world.piggy().bottom(), ground_top);
    }

    #[test]
    fn finalized_ticks_are_no_ops() {
        let mut world = world(TALL);
        crash(&mut world, 0.0);
        let mut now = 0.0;
        while world.state() != GameState::Finalized {
            now += FRAME_MS;
            world.tick(now, TALL);
            assert!(now < 1.0e6, "fall never resolved");
        }

        let camera = world.camera().clone();
        let score = world.score();
        assert!(world.tick(now + FRAME_MS, TALL).is_empty());
        assert_eq!(world.camera(), &camera);
        assert_eq!(world.score(), score);
    }

    #[test]
    fn restart_resets_everything() {
        let mut world = world(TALL);
        world.collectibles.spawn(Collectible {
            x: 40.0,
            world_y: 190.0,
            size: 25.0,
            collected: false,
        });
        world.tick(0.0, TALL);
        crash(&mut world, FRAME_MS);
        for tick in 2..200 {
            world.tick(f64::from(tick) * FRAME_MS, TALL);
        }
        assert!(world.score() > 0);
        assert!(world.camera().vertical_offset() > 0.0);

        world.restart();

        assert_eq!(world.score(), 0);
        assert_eq!(world.state(), GameState::Normal);
        assert_eq!(world.camera().vertical_offset(), 0.0);
        assert_eq!(world.camera().horizontal_offset(), 0.0);
        assert_eq!(world.ground(), Ground::default());
        assert!(!world.piggy().is_falling());
        assert!(world.obstacles().active().is_empty());
        assert!(world.collectibles().active().is_empty());
        assert!(!world.obstacles().is_frozen());
    }

    #[test]
    fn camera_scrolls_slower_once_frozen() {
        let mut world = world(TALL);
        world.tick(0.0, TALL);
        assert_relative_eq!(world.camera().horizontal_offset(), 4.5);

        crash(&mut world, FRAME_MS);
        let before = world.camera().horizontal_offset();
        world.tick(2.0 * FRAME_MS, TALL);
        assert_relative_eq!(world.camera().horizontal_offset(), before + 0.5);
    }
}
