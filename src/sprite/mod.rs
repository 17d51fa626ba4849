// TABLE:
// ┌──────────────────────────────────────────────────────────────────────────┐
// │                         What lives in sprite/                            │
// ├────────────────┬──────────────────────┬──────────────────────────────────┤
// │   Code File    │   Code Component     │         Role on screen           │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │                │ OBSTACLE_FRAMES      │ enemy sheet cells (hitbox size)  │
// │   mod.rs       │ PiggyVisual          │ normal / sad / failed pig image  │
// │                │ MATCH_VARIANTS       │ score -> match character table   │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │                │ PiggyState<Flying>   │ player steering                  │
// │   piggy.rs     │ PiggyState<Falling>  │ death fall (camera driven)       │
// │                │ Piggy                │ facade the world talks to        │
// └────────────────┴──────────────────────┴──────────────────────────────────┘
pub mod piggy;

use crate::engine::Rect;

pub const OBSTACLE_SHEET: &str = "ENEMY.png";

/// Enemy sheet cells, the native size doubles as the obstacle hitbox size
pub const OBSTACLE_FRAMES: [Rect; 3] = [
    Rect::new_from_x_y(7.0, 136.0, 105.0, 114.0),
    Rect::new_from_x_y(13.0, 279.0, 92.0, 105.0),
    Rect::new_from_x_y(17.0, 416.0, 102.0, 109.0),
];

/// Drawn for every obstacle once they are frozen by a game over
pub const GAME_OVER_FRAME: Rect = Rect::new_from_x_y(2.0, 9.0, 96.0, 104.0);

pub fn obstacle_frame(variant: usize) -> &'static Rect {
    OBSTACLE_FRAMES.get(variant).unwrap_or(&OBSTACLE_FRAMES[0])
}

/// Image the player is shown with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiggyVisual {
    Normal,
    /// from the moment the fall starts
    Sad,
    /// after landing
    Failed,
}

impl PiggyVisual {
    pub const ALL: [PiggyVisual; 3] = [PiggyVisual::Normal, PiggyVisual::Sad, PiggyVisual::Failed];

    pub fn image_path(self) -> &'static str {
        match self {
            PiggyVisual::Normal => "Minion_pig_copy.webp",
            PiggyVisual::Sad => "Sad_Minion_Pig.webp",
            PiggyVisual::Failed => "Mition_Failled.webp",
        }
    }
}

/// Character shown above the ground at the end of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchVariant {
    Angry,
    Happy,
    Final,
}

/// (minimum score, variant), checked top-down, first match wins
pub const MATCH_VARIANTS: [(u32, MatchVariant); 3] = [
    (90, MatchVariant::Final),
    (10, MatchVariant::Happy),
    (0, MatchVariant::Angry),
];

impl MatchVariant {
    pub const ALL: [MatchVariant; 3] = [MatchVariant::Angry, MatchVariant::Happy, MatchVariant::Final];

    pub fn for_score(score: u32) -> MatchVariant {
        MATCH_VARIANTS
            .iter()
            .find(|(threshold, _)| score >= *threshold)
            .map(|(_, variant)| *variant)
            .unwrap_or(MatchVariant::Angry)
    }

    pub fn video_path(self) -> &'static str {
        match self {
            MatchVariant::Angry => "https://files.catbox.moe/ge3y58.mp4",
            MatchVariant::Happy | MatchVariant::Final => "https://files.catbox.moe/8ih792.mp4",
        }
    }

    /// seconds into the video of the frozen frame
    pub fn freeze_at(self) -> f64 {
        match self {
            MatchVariant::Angry | MatchVariant::Happy => 6.7,
            MatchVariant::Final => 151.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_variant_thresholds() {
        assert_eq!(MatchVariant::for_score(0), MatchVariant::Angry);
        assert_eq!(MatchVariant::for_score(9), MatchVariant::Angry);
        assert_eq!(MatchVariant::for_score(10), MatchVariant::Happy);
        assert_eq!(MatchVariant::for_score(89), MatchVariant::Happy);
        assert_eq!(MatchVariant::for_score(90), MatchVariant::Final);
        assert_eq!(MatchVariant::for_score(u32::MAX), MatchVariant::Final);
    }

    #[test]
    fn unknown_variant_falls_back_to_first_frame() {
        assert_eq!(obstacle_frame(7), &OBSTACLE_FRAMES[0]);
        assert_eq!(obstacle_frame(2).width(), 102.0);
    }
}
