//! Process-relative virtual time.
//!
//! The clock only moves when the engine runs out of immediate work and
//! jumps to the next timer. Nothing here ever reads the wall clock, so a
//! delay of 100 ticks costs exactly as much as a delay of 1.

/// A point on the virtual clock, measured in ticks since the engine started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualTime(u64);

impl VirtualTime {
    /// The instant the engine is created at.
    pub const ZERO: VirtualTime = VirtualTime(0);

    #[inline]
    pub fn new(ticks: u64) -> Self {
        VirtualTime(ticks)
    }

    #[inline]
    pub fn ticks(self) -> u64 {
        self.0
    }

    /// The instant `delay` ticks after `self`, or `None` on overflow.
    #[inline]
    pub fn checked_add(self, delay: u64) -> Option<VirtualTime> {
        self.0.checked_add(delay).map(VirtualTime)
    }

    /// Ticks elapsed since `earlier`. `None` if `earlier` is actually later.
    #[inline]
    pub fn since(self, earlier: VirtualTime) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }
}

impl std::fmt::Display for VirtualTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t={}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_default() {
        assert_eq!(VirtualTime::default(), VirtualTime::ZERO);
        assert_eq!(VirtualTime::ZERO.ticks(), 0);
    }

    #[test]
    fn test_checked_add() {
        let t = VirtualTime::new(100);
        assert_eq!(t.checked_add(0), Some(t));
        assert_eq!(t.checked_add(5).map(VirtualTime::ticks), Some(105));
        assert!(VirtualTime::new(u64::MAX).checked_add(1).is_none());
    }

    #[test]
    fn test_since() {
        let early = VirtualTime::new(3);
        let late = VirtualTime::new(10);
        assert_eq!(late.since(early), Some(7));
        assert_eq!(early.since(late), None);
    }

    #[test]
    fn test_ordering_and_display() {
        assert!(VirtualTime::new(1) < VirtualTime::new(2));
        assert_eq!(VirtualTime::new(42).to_string(), "t=42");
    }
}
