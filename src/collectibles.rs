use crate::config::CollectibleConfig;
use crate::engine::{Rect, Size};
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct Collectible {
    pub x: f64,
    /// world space
    pub world_y: f64,
    pub size: f64,
    /// flips once on pickup, collected items are skipped by queries and
    /// drawing but scroll off like the rest
    pub collected: bool,
}

impl Collectible {
    pub fn screen_box(&self, camera_y: f64) -> Rect {
        Rect::new_from_x_y(self.x, self.world_y - camera_y, self.size, self.size)
    }
}

/// Same lifecycle as obstacles : timed spawn at the right edge, scroll left,
/// prune past the left edge
#[derive(Debug, Clone)]
pub struct CollectibleManager {
    collectibles: Vec<Collectible>,
    last_spawn: Option<f64>,
    config: CollectibleConfig,
}

impl CollectibleManager {
    pub fn new(config: CollectibleConfig) -> Self {
        CollectibleManager {
            collectibles: Vec::new(),
            last_spawn: None,
            config,
        }
    }

    pub fn tick<R: Rng>(&mut self, now_ms: f64, viewport: Size, rng: &mut R) {
        let due = self
            .last_spawn
            .map_or(true, |last| now_ms - last > self.config.spawn_interval_ms);
        if due {
            let max_y = (viewport.height - self.config.size).max(0.0);
            self.spawn(Collectible {
                x: viewport.width,
                world_y: rng.gen::<f64>() * max_y,
                size: self.config.size,
                collected: false,
            });
            self.last_spawn = Some(now_ms);
        }

        let speed = self.config.speed;
        self.collectibles.retain_mut(|collectible| {
            collectible.x -= speed;
            collectible.x > -collectible.size
        });
    }

    pub fn spawn(&mut self, collectible: Collectible) {
        self.collectibles.push(collectible);
    }

    pub fn active(&self) -> &[Collectible] {
        &self.collectibles
    }

    /// Not-yet-collected items overlapping `player_box` (screen space),
    /// each is marked collected so it is returned at most once
    pub fn check_collision(&mut self, player_box: &Rect, camera_y: f64) -> Vec<Collectible> {
        let mut hits = Vec::new();
        for collectible in self
            .collectibles
            .iter_mut()
            .filter(|collectible| !collectible.collected)
        {
            if collectible.screen_box(camera_y).intersects(player_box) {
                collectible.collected = true;
                hits.push(collectible.clone());
            }
        }
        hits
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

    fn coin(x: f64, world_y: f64) -> Collectible {
        Collectible {
            x,
            world_y,
            size: 25.0,
            collected: false,
        }
    }

    #[test]
    fn spawns_across_the_full_height() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut manager = CollectibleManager::new(CollectibleConfig::default());
        for tick in 0..300 {
            manager.tick(f64::from(tick) * 1001.0, VIEWPORT, &mut rng);
            let newest = manager.active().last().unwrap();
            assert!((0.0..=575.0).contains(&newest.world_y));
        }
    }

    #[test]
    fn collision_is_reported_once() {
        let mut manager = CollectibleManager::new(CollectibleConfig::default());
        manager.spawn(coin(40.0, 190.0));
        manager.spawn(coin(300.0, 190.0));
        let player = Rect::new_from_x_y(25.0, 175.0, 50.0, 50.0);

        let hits = manager.check_collision(&player, 0.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].x, 40.0);
        assert!(manager.active()[0].collected);

        assert!(manager.check_collision(&player, 0.0).is_empty());
    }

    #[test]
    fn collision_uses_camera_offset() {
        let mut manager = CollectibleManager::new(CollectibleConfig::default());
        manager.spawn(coin(40.0, 490.0));
        let player = Rect::new_from_x_y(25.0, 175.0, 50.0, 50.0);

        assert!(manager.check_collision(&player, 0.0).is_empty());
        assert_eq!(manager.check_collision(&player, 300.0).len(), 1);
    }

    #[test]
    fn collected_items_still_scroll_off() {
        let mut rng = StdRng::seed_from_u64(4);
        let config = CollectibleConfig {
            spawn_interval_ms: f64::INFINITY,
            ..CollectibleConfig::default()
        };
        let mut manager = CollectibleManager::new(config);
        manager.last_spawn = Some(0.0);
        manager.spawn(Collectible {
            collected: true,
            ..coin(10.0, 100.0)
        });

        for _ in 0..10 {
            manager.tick(1.0, VIEWPORT, &mut rng);
            assert!(manager.active().iter().all(|c| c.x >= -c.size));
        }
        assert!(manager.active().is_empty());
    }
}
