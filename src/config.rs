//! Tunables for one game instance.
//!
//! Every default is the value the game shipped with. A `config.json` next to
//! the page may override any subset of fields (missing fields keep their
//! default thanks to `#[serde(default)]`).
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GameConfig {
    /// Localized HUD strings; off means English everywhere
    pub localized: bool,
    /// Forced language code, None resolves from storage / navigator
    pub language: Option<String>,
    /// Fixed rng seed, None seeds from entropy
    pub seed: Option<u64>,
    pub player: PlayerConfig,
    pub obstacles: ObstacleConfig,
    pub collectibles: CollectibleConfig,
    pub camera: CameraConfig,
    pub fall: FallConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub start_x: f64,
    pub start_y: f64,
    pub width: f64,
    pub height: f64,
    pub step_x: f64,
    pub step_y: f64,
    pub ease_x: f64,
    pub ease_y: f64,
    /// below this distance the eased position snaps onto the target
    pub snap_threshold: f64,
    /// score points per speed level
    pub speed_band: u32,
    pub max_step_x: f64,
    pub max_step_y: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObstacleConfig {
    pub spawn_interval_ms: f64,
    pub speed: f64,
    pub gap_height: f64,
    /// space kept free above and below the gap range
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectibleConfig {
    pub spawn_interval_ms: f64,
    pub speed: f64,
    pub size: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub follow_ease: f64,
    pub fall_ease: f64,
    /// fraction of the viewport kept above the player while falling
    pub fall_bias: f64,
    /// background scroll on top of the obstacle speed
    pub extra_scroll: f64,
    /// offset used by the (self-referential) vertical clamp
    pub clamp_offset: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FallConfig {
    pub gravity: f64,
    pub ground_delay_ms: f64,
    pub ground_world_y: f64,
    pub ground_height: f64,
    /// force the ground when the player gets this close to the visible bottom
    pub ground_margin: f64,
    pub landing_epsilon: f64,
    pub min_landing_velocity: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            localized: true,
            language: None,
            seed: None,
            player: PlayerConfig::default(),
            obstacles: ObstacleConfig::default(),
            collectibles: CollectibleConfig::default(),
            camera: CameraConfig::default(),
            fall: FallConfig::default(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            start_x: 50.0,
            start_y: 200.0,
            width: 50.0,
            height: 50.0,
            step_x: 40.0,
            step_y: 40.0,
            ease_x: 0.16,
            ease_y: 0.22,
            snap_threshold: 0.5,
            speed_band: 10,
            max_step_x: 48.0,
            max_step_y: 60.0,
        }
    }
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        ObstacleConfig {
            spawn_interval_ms: 1000.0,
            speed: 4.0,
            gap_height: 150.0,
            margin: 50.0,
        }
    }
}

impl Default for CollectibleConfig {
    fn default() -> Self {
        CollectibleConfig {
            spawn_interval_ms: 1000.0,
            speed: 4.0,
            size: 25.0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            follow_ease: 0.08,
            fall_ease: 0.12,
            fall_bias: 0.35,
            extra_scroll: 0.5,
            clamp_offset: 200.0,
        }
    }
}

impl Default for FallConfig {
    fn default() -> Self {
        FallConfig {
            gravity: 0.45,
            ground_delay_ms: 1200.0,
            ground_world_y: 1601.0,
            ground_height: 60.0,
            ground_margin: 200.0,
            landing_epsilon: 1.5,
            min_landing_velocity: 2.0,
        }
    }
}

impl GameConfig {
    pub fn with_localization(mut self, localized: bool) -> Self {
        self.localized = localized;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_only_touch_their_field() {
        let config = GameConfig::default()
            .with_localization(false)
            .with_language("pt")
            .with_seed(7);

        assert!(!config.localized);
        assert_eq!(config.language.as_deref(), Some("pt"));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.player, PlayerConfig::default());
        assert_eq!(config.fall, FallConfig::default());
    }

    #[test]
    fn shipped_constants() {
        let config = GameConfig::default();

        assert_eq!(config.obstacles.gap_height, 150.0);
        assert_eq!(config.fall.ground_world_y, 1601.0);
        assert_eq!(config.fall.ground_delay_ms, 1200.0);
        assert_eq!(config.camera.clamp_offset, 200.0);
    }
}
