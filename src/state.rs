use thiserror::Error;

/// Lifecycle of one life, strictly in this order :
/// Normal -> GameOverFalling -> GroundSpawned -> Finalized
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GameState {
    #[default]
    Normal,
    GameOverFalling,
    GroundSpawned,
    Finalized,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("already in {0:?}")]
    Duplicate(GameState),
    #[error("cannot go from {from:?} to {to:?}")]
    Invalid { from: GameState, to: GameState },
}

impl GameState {
    /// The only state `self` may move to, None for the terminal state
    pub fn next(self) -> Option<GameState> {
        use GameState::*;
        match self {
            Normal => Some(GameOverFalling),
            GameOverFalling => Some(GroundSpawned),
            GroundSpawned => Some(Finalized),
            Finalized => None,
        }
    }

    /// Guarded transition, rejects repeats and skipped steps
    pub fn transition_to(&mut self, to: GameState) -> Result<(), TransitionError> {
        if *self == to {
            return Err(TransitionError::Duplicate(to));
        }
        if self.next() != Some(to) {
            return Err(TransitionError::Invalid { from: *self, to });
        }
        *self = to;
        Ok(())
    }

    pub fn reset(&mut self) {
        *self = GameState::Normal;
    }

    pub fn is_game_over(self) -> bool {
        self != GameState::Normal
    }

    /// the death sequence is running (player falling, loop alive)
    pub fn is_falling(self) -> bool {
        matches!(self, GameState::GameOverFalling | GameState::GroundSpawned)
    }

    pub fn ground_visible(self) -> bool {
        matches!(self, GameState::GroundSpawned | GameState::Finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_the_whole_sequence() {
        let mut state = GameState::default();
        assert_eq!(state.transition_to(GameState::GameOverFalling), Ok(()));
        assert_eq!(state.transition_to(GameState::GroundSpawned), Ok(()));
        assert_eq!(state.transition_to(GameState::Finalized), Ok(()));
        assert_eq!(state, GameState::Finalized);
    }

    #[test]
    fn rejects_repeats() {
        let mut state = GameState::Finalized;
        assert_eq!(
            state.transition_to(GameState::Finalized),
            Err(TransitionError::Duplicate(GameState::Finalized))
        );
    }

    #[test]
    fn cannot_land_without_ground() {
        let mut state = GameState::GameOverFalling;
        assert_eq!(
            state.transition_to(GameState::Finalized),
            Err(TransitionError::Invalid {
                from: GameState::GameOverFalling,
                to: GameState::Finalized,
            })
        );
        assert_eq!(state, GameState::GameOverFalling);
    }

    #[test]
    fn reset_from_anywhere() {
        let mut state = GameState::GroundSpawned;
        state.reset();
        assert_eq!(state, GameState::Normal);
        assert!(!state.is_game_over());
    }
}
