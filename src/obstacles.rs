use crate::config::ObstacleConfig;
use crate::engine::{Rect, Size};
use crate::sprite::{self, OBSTACLE_FRAMES};
use rand::Rng;

/// One obstacle, only the part below the gap is solid
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub x: f64,
    /// world space
    pub gap_center_y: f64,
    pub gap_half_height: f64,
    pub width: f64,
    pub height: f64,
    /// set once the player got past it, never cleared
    pub passed: bool,
    /// cosmetic sprite frame, no effect on the hitbox
    pub variant: usize,
}

impl Obstacle {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// world y where the solid part starts
    pub fn gap_bottom(&self) -> f64 {
        self.gap_center_y + self.gap_half_height
    }

    /// Solid part in screen space for the given camera offset
    pub fn hitbox(&self, camera_y: f64) -> Rect {
        Rect::new_from_x_y(self.x, self.gap_bottom() - camera_y, self.width, self.height)
    }
}

/// Spawns obstacles at the right edge on a timer, scrolls them left and
/// drops them once they are fully past the left edge
#[derive(Debug, Clone)]
pub struct ObstacleManager {
    obstacles: Vec<Obstacle>,
    /// None until the first spawn, which happens on the first tick
    last_spawn: Option<f64>,
    speed: f64,
    config: ObstacleConfig,
}

impl ObstacleManager {
    pub fn new(config: ObstacleConfig) -> Self {
        ObstacleManager {
            obstacles: Vec::new(),
            last_spawn: None,
            speed: config.speed,
            config,
        }
    }

    pub fn tick<R: Rng>(&mut self, now_ms: f64, viewport: Size, rng: &mut R) {
        let due = self
            .last_spawn
            .map_or(true, |last| now_ms - last > self.config.spawn_interval_ms);
        if due {
            let variant = rng.gen_range(0..OBSTACLE_FRAMES.len());
            let gap_center_y = self.random_gap_center(viewport.height, rng);
            let frame = sprite::obstacle_frame(variant);
            self.spawn(Obstacle {
                x: viewport.width,
                gap_center_y,
                gap_half_height: self.config.gap_height / 2.0,
                width: frame.width(),
                height: frame.height(),
                passed: false,
                variant,
            });
            self.last_spawn = Some(now_ms);
        }

        let speed = self.speed;
        self.obstacles.retain_mut(|obstacle| {
            obstacle.x -= speed;
            obstacle.x > -obstacle.width
        });
    }

    /// Uniform in [margin, height - margin - gap], collapsing to `margin`
    /// when the viewport is too short for that range
    fn random_gap_center<R: Rng>(&self, viewport_height: f64, rng: &mut R) -> f64 {
        let min = self.config.margin;
        let max = (viewport_height - self.config.margin - self.config.gap_height).max(min);
        min + rng.gen::<f64>() * (max - min)
    }

    pub fn spawn(&mut self, obstacle: Obstacle) {
        log::trace!("obstacles: spawned at gap {:.1}", obstacle.gap_center_y);
        self.obstacles.push(obstacle);
    }

    pub fn active(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Stop scrolling, existing obstacles stay where they are
    pub fn freeze(&mut self) {
        self.speed = 0.0;
    }

    pub fn is_frozen(&self) -> bool {
        self.speed == 0.0
    }

    /// Flags every obstacle whose right edge is behind `player_x`, returns
    /// how many were newly passed
    pub fn mark_passed(&mut self, player_x: f64) -> usize {
        let mut newly_passed = 0;
        for obstacle in self
            .obstacles
            .iter_mut()
            .filter(|obstacle| !obstacle.passed && obstacle.right() < player_x)
        {
            obstacle.passed = true;
            newly_passed += 1;
        }
        newly_passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const VIEWPORT: Size = Size {
        width: 400.0,
        height: 600.0,
    };

    fn obstacle_at(x: f64) -> Obstacle {
        Obstacle {
            x,
            gap_center_y: 300.0,
            gap_half_height: 75.0,
            width: 60.0,
            height: 110.0,
            passed: false,
            variant: 0,
        }
    }

    #[test]
    fn first_tick_spawns_then_waits_for_the_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut manager = ObstacleManager::new(ObstacleConfig::default());

        manager.tick(0.0, VIEWPORT, &mut rng);
        assert_eq!(manager.active().len(), 1);
        assert_eq!(manager.active()[0].x, 396.0);

        manager.tick(1000.0, VIEWPORT, &mut rng);
        assert_eq!(manager.active().len(), 1);

        manager.tick(1000.5, VIEWPORT, &mut rng);
        assert_eq!(manager.active().len(), 2);
    }

    #[test]
    fn gap_centers_stay_inside_margins() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut manager = ObstacleManager::new(ObstacleConfig::default());

        for tick in 0..500 {
            manager.tick(f64::from(tick) * 1001.0, VIEWPORT, &mut rng);
            let newest = manager.active().last().unwrap();
            assert!(newest.gap_center_y >= 50.0);
            assert!(newest.gap_center_y <= 600.0 - 50.0 - 150.0);
            assert!(newest.variant < OBSTACLE_FRAMES.len());
        }
    }

    #[test]
    fn short_viewport_collapses_gap_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut manager = ObstacleManager::new(ObstacleConfig::default());
        manager.tick(
            0.0,
            Size {
                width: 400.0,
                height: 100.0,
            },
            &mut rng,
        );
        assert_eq!(manager.active()[0].gap_center_y, 50.0);
    }

    #[test]
    fn pruned_once_fully_off_screen() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = ObstacleConfig {
            spawn_interval_ms: f64::INFINITY,
            ..ObstacleConfig::default()
        };
        let mut manager = ObstacleManager::new(config);
        manager.tick(0.0, VIEWPORT, &mut rng);
        manager.spawn(obstacle_at(-50.0));

        for _ in 0..200 {
            manager.tick(1.0, VIEWPORT, &mut rng);
            for obstacle in manager.active() {
                assert!(obstacle.x >= -obstacle.width);
            }
        }
        assert!(manager.active().is_empty());
    }

    #[test]
    fn frozen_obstacles_do_not_move() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = ObstacleConfig {
            spawn_interval_ms: f64::INFINITY,
            ..ObstacleConfig::default()
        };
        let mut manager = ObstacleManager::new(config);
        manager.spawn(obstacle_at(200.0));
        manager.last_spawn = Some(0.0);
        manager.freeze();
        manager.tick(5.0, VIEWPORT, &mut rng);

        assert!(manager.is_frozen());
        assert_eq!(manager.active()[0].x, 200.0);
    }

    #[test]
    fn passing_is_counted_once() {
        let mut manager = ObstacleManager::new(ObstacleConfig::default());
        manager.spawn(obstacle_at(-20.0));
        manager.spawn(obstacle_at(0.0));
        manager.spawn(obstacle_at(100.0));

        assert_eq!(manager.mark_passed(50.0), 1);
        assert_eq!(manager.mark_passed(50.0), 0);
        assert_eq!(manager.mark_passed(70.0), 1);
        assert!(manager.active()[0].passed);
        assert!(!manager.active()[2].passed);
    }

    #[test]
    fn scrolled_obstacle_hits_only_the_lower_player() {
        use crate::config::PlayerConfig;
        use crate::sprite::piggy::Piggy;

        let mut rng = StdRng::seed_from_u64(3);
        let config = ObstacleConfig {
            spawn_interval_ms: f64::INFINITY,
            speed: 5.0,
            ..ObstacleConfig::default()
        };
        let mut manager = ObstacleManager::new(config);
        manager.last_spawn = Some(0.0);
        manager.spawn(obstacle_at(400.0));
        for _ in 0..70 {
            manager.tick(1.0, VIEWPORT, &mut rng);
        }
        let obstacle = &manager.active()[0];
        assert_eq!(obstacle.x, 50.0);

        let camera_y = 100.0;
        assert_eq!(obstacle.hitbox(camera_y).top(), 275.0);

        let piggy_at = |start_y: f64| {
            let player = PlayerConfig {
                start_y,
                ..PlayerConfig::default()
            };
            Piggy::new(player, VIEWPORT.width)
        };
        assert!(piggy_at(300.0).check_collision_with_obstacle(obstacle, camera_y));
        assert!(!piggy_at(200.0).check_collision_with_obstacle(obstacle, camera_y));
    }

    #[test]
    fn hitbox_starts_at_gap_bottom_in_screen_space() {
        let obstacle = obstacle_at(50.0);
        assert_eq!(obstacle.hitbox(0.0), Rect::new_from_x_y(50.0, 375.0, 60.0, 110.0));
        assert_eq!(obstacle.hitbox(100.0).top(), 275.0);
    }
}
