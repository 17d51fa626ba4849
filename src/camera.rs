use crate::config::CameraConfig;

/// How the vertical follow frames the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// player roughly centered, regular play
    Centered,
    /// player in the upper third, faster follow, used for the death fall
    UpperThird,
}

/// 2-D camera : horizontal auto-scroll plus an eased vertical follow
/// - `vertical_offset` is the only world -> screen conversion in the game :
/// screen_y = world_y - vertical_offset
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    horizontal_offset: f64,
    vertical_offset: f64,
    vertical_target: f64,
    vertical_ease: f64,
    config: CameraConfig,
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        Camera {
            horizontal_offset: 0.0,
            vertical_offset: 0.0,
            vertical_target: 0.0,
            vertical_ease: config.follow_ease,
            config,
        }
    }

    pub fn horizontal_offset(&self) -> f64 {
        self.horizontal_offset
    }

    pub fn vertical_offset(&self) -> f64 {
        self.vertical_offset
    }

    pub fn vertical_target(&self) -> f64 {
        self.vertical_target
    }

    pub fn vertical_ease(&self) -> f64 {
        self.vertical_ease
    }

    pub fn to_screen_y(&self, world_y: f64) -> f64 {
        world_y - self.vertical_offset
    }

    pub fn to_world_y(&self, screen_y: f64) -> f64 {
        screen_y + self.vertical_offset
    }

    /// Scroll right by the obstacle speed plus the parallax extra
    pub fn scroll(&mut self, obstacle_speed: f64) {
        self.horizontal_offset += obstacle_speed + self.config.extra_scroll;
    }

    /// Moves the world directly, the fall integrates through here
    pub fn displace(&mut self, amount: f64) {
        self.vertical_offset += amount;
    }

    /// Aim at `player_y` (screen space) for the given viewport height
    pub fn frame(&mut self, player_y: f64, visible_height: f64, framing: Framing) {
        match framing {
            Framing::Centered => {
                self.vertical_target = player_y - visible_height / 2.0;
                self.vertical_ease = self.config.follow_ease;
            }
            Framing::UpperThird => {
                self.vertical_target = player_y - visible_height * self.config.fall_bias;
                self.vertical_ease = self.config.fall_ease;
            }
        }
    }

    pub fn set_target(&mut self, target: f64) {
        self.vertical_target = target;
    }

    /// Clamp the target then ease the offset toward it
    ///
    /// The upper bound is computed from the *current* offset :
    /// max(0, -clamp_offset + offset - 0.1). While the offset stays under
    /// clamp_offset the camera is pinned at 0, once a fall pushes it past
    /// that the bound trails the offset and the camera may drift down
    /// without limit.
    pub fn advance(&mut self) {
        let max_offset = (-self.config.clamp_offset + self.vertical_offset - 0.1).max(0.0);
        self.vertical_target = self.vertical_target.max(0.0).min(max_offset);
        self.vertical_offset += (self.vertical_target - self.vertical_offset) * self.vertical_ease;
    }
}
