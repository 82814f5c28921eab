use std::collections::VecDeque;
use std::sync::Mutex;

use rand::Rng;

/// Source of uniform random values in `[0, 1)`.
///
/// The probabilistic approve/reject decisions in tokenization and
/// settlement draw from this trait so tests can script deterministic
/// outcomes without touching the retry logic.
pub trait RandomSource: Send + Sync {
    /// Draws the next uniform value in `[0, 1)`.
    fn draw(&self) -> f64;
}

/// Production source backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }
}

/// Test source replaying a fixed sequence of values.
///
/// Once the sequence is exhausted, every further draw returns the
/// last scripted value.
#[derive(Debug, Default)]
pub struct ScriptedRandom {
    values: Mutex<VecDeque<f64>>,
    fallback: f64,
}

impl ScriptedRandom {
    /// Creates a source that replays `values` in order.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let values: VecDeque<f64> = values.into_iter().collect();
        let fallback = values.back().copied().unwrap_or(0.0);
        Self {
            values: Mutex::new(values),
            fallback,
        }
    }

    /// Creates a source that always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }
}

impl RandomSource for ScriptedRandom {
    fn draw(&self) -> f64 {
        let mut values = self.values.lock().unwrap();
        if values.len() > 1 {
            values.pop_front().unwrap()
        } else {
            values.front().copied().unwrap_or(self.fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_unit_interval() {
        let source = ThreadRandom;
        for _ in 0..100 {
            let v = source.draw();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn scripted_random_replays_then_repeats_last() {
        let source = ScriptedRandom::new([0.9, 0.1, 0.5]);
        assert_eq!(source.draw(), 0.9);
        assert_eq!(source.draw(), 0.1);
        assert_eq!(source.draw(), 0.5);
        assert_eq!(source.draw(), 0.5);
    }

    #[test]
    fn constant_always_returns_value() {
        let source = ScriptedRandom::constant(0.0);
        assert_eq!(source.draw(), 0.0);
        assert_eq!(source.draw(), 0.0);
    }
}
