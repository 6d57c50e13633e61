//! Consecutive-frame debouncing of per-frame threshold tests

/// Turns a per-frame condition into a sustained signal once it has held
/// for `required` consecutive frames. Any frame where the condition does
/// not hold resets the count.
#[derive(Debug, Clone)]
pub struct FrameDebouncer {
    required: u32,
    count: u32,
}

impl FrameDebouncer {
    pub fn new(required: u32) -> Self {
        Self { required, count: 0 }
    }

    /// Feed one frame. Returns true on the `required`-th consecutive
    /// qualifying frame and on every qualifying frame after it.
    pub fn observe(&mut self, condition_holds: bool) -> bool {
        if condition_holds {
            self.count = self.count.saturating_add(1);
        } else {
            self.count = 0;
        }
        self.is_sustained()
    }

    pub fn is_sustained(&self) -> bool {
        self.count > 0 && self.count >= self.required
    }

    /// Current run of consecutive qualifying frames
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn required(&self) -> u32 {
        self.required
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_short_never_sustains() {
        let mut debouncer = FrameDebouncer::new(8);
        for _ in 0..7 {
            assert!(!debouncer.observe(true));
        }
        assert!(!debouncer.observe(false));
        assert_eq!(debouncer.count(), 0);
    }

    #[test]
    fn test_sustains_on_threshold_frame_and_after() {
        let mut debouncer = FrameDebouncer::new(6);
        let results: Vec<bool> = (0..10).map(|_| debouncer.observe(true)).collect();
        assert_eq!(&results[..5], &[false; 5]);
        assert!(results[5..].iter().all(|&s| s));
    }

    #[test]
    fn test_false_frame_resets_long_run() {
        let mut debouncer = FrameDebouncer::new(3);
        for _ in 0..50 {
            debouncer.observe(true);
        }
        assert!(debouncer.is_sustained());
        assert!(!debouncer.observe(false));
        assert_eq!(debouncer.count(), 0);
        assert!(!debouncer.observe(true));
    }

    proptest! {
        #[test]
        fn sustained_iff_trailing_run_reaches_threshold(
            required in 1u32..12,
            frames in proptest::collection::vec(any::<bool>(), 0..200),
        ) {
            let mut debouncer = FrameDebouncer::new(required);
            let mut run = 0u32;
            for holds in frames {
                run = if holds { run + 1 } else { 0 };
                let sustained = debouncer.observe(holds);
                prop_assert_eq!(debouncer.count(), run);
                prop_assert_eq!(sustained, run >= required);
            }
        }
    }
}
