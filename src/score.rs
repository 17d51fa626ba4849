/// Monotonic score, only ever incremented (or reset on restart)
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScoreTracker {
    value: u32,
}

impl ScoreTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self) {
        self.value = self.value.saturating_add(1);
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_every_increment() {
        let mut score = ScoreTracker::new();
        for _ in 0..5 {
            score.increment();
        }
        assert_eq!(score.value(), 5);

        score.reset();
        assert_eq!(score.value(), 0);
    }
}
