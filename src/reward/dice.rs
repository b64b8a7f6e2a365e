use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Source of uniform integer draws over closed ranges
pub trait Dice: Send + Sync {
    /// Returns a value in `low..=high`
    fn roll(&self, low: u32, high: u32) -> u32;
}

/// Production dice backed by the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngDice;

impl Dice for ThreadRngDice {
    fn roll(&self, low: u32, high: u32) -> u32 {
        rand::rng().random_range(low..=high)
    }
}

/// Dice that replays a fixed script, then repeats a fallback value.
/// Every value is clamped into the requested range.
pub struct ScriptedDice {
    script: Mutex<VecDeque<u32>>,
    fallback: u32,
}

impl ScriptedDice {
    pub fn new(script: Vec<u32>, fallback: u32) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
        }
    }

    pub fn fallback(value: u32) -> Self {
        Self::new(Vec::new(), value)
    }

    /// Number of scripted values not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|script| script.len()).unwrap_or(0)
    }
}

impl Dice for ScriptedDice {
    fn roll(&self, low: u32, high: u32) -> u32 {
        let next = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front())
            .unwrap_or(self.fallback);
        next.clamp(low, high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_rng_dice_stays_in_range() {
        let dice = ThreadRngDice;
        for _ in 0..1000 {
            let value = dice.roll(1, 100);
            assert!((1..=100).contains(&value));
        }
        assert_eq!(dice.roll(7, 7), 7);
    }

    #[test]
    fn test_scripted_dice_replays_then_falls_back() {
        let dice = ScriptedDice::new(vec![1, 42], 80);
        assert_eq!(dice.roll(1, 100), 1);
        assert_eq!(dice.roll(1, 100), 42);
        assert_eq!(dice.remaining(), 0);
        assert_eq!(dice.roll(1, 100), 80);
    }

    #[test]
    fn test_scripted_dice_clamps() {
        let dice = ScriptedDice::new(vec![9], 50);
        assert_eq!(dice.roll(0, 3), 3);
        assert_eq!(dice.roll(60, 100), 60);
    }
}
