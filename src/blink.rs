//! Cursor blink state machine (§4.7): on/off/disabled, driven by an
//! external timer tick rather than owning a clock itself so the embedder
//! controls the actual interval. `Disabled` is reached automatically once
//! `idle_timeout` elapses with no reported activity, distinct from the DEC
//! private mode 12 toggle which switches blinking off outright via `enabled`.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    On,
    Off,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkState {
    enabled: bool,
    phase: Phase,
    elapsed: Duration,
    interval: Duration,
    idle: Duration,
    idle_timeout: Duration,
}

impl Default for BlinkState {
    fn default() -> Self {
        Self {
            enabled: true,
            phase: Phase::On,
            elapsed: Duration::ZERO,
            interval: Duration::from_millis(600),
            idle: Duration::ZERO,
            idle_timeout: Duration::ZERO,
        }
    }
}

impl BlinkState {
    /// `idle_timeout` of `Duration::ZERO` means the idle-disable feature is
    /// off entirely; the phase then only ever alternates on/off.
    pub fn new(interval: Duration, idle_timeout: Duration) -> Self {
        Self {
            interval,
            idle_timeout,
            ..Self::default()
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.phase = Phase::On;
        self.elapsed = Duration::ZERO;
        self.idle = Duration::ZERO;
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn set_idle_timeout(&mut self, idle_timeout: Duration) {
        self.idle_timeout = idle_timeout;
    }

    /// Cursor should currently be painted. Disabled (manually via mode 12,
    /// or automatically via idle timeout) always paints solid.
    pub fn visible(&self) -> bool {
        !self.enabled || matches!(self.phase, Phase::On | Phase::Disabled)
    }

    /// Reset to "on" and restart both timers — called on any keystroke or
    /// mouse activity so a disabled or mid-blink cursor snaps back solid.
    pub fn restart(&mut self) {
        self.phase = Phase::On;
        self.elapsed = Duration::ZERO;
        self.idle = Duration::ZERO;
    }

    /// Advance the timers by `dt`. Past `idle_timeout` with no intervening
    /// [`BlinkState::restart`], the phase pins to `Disabled` and stops
    /// alternating; otherwise it flips between on/off each time `interval`
    /// elapses. Returns true if the visible phase changed (callers use this
    /// to decide whether a repaint is actually needed).
    pub fn tick(&mut self, dt: Duration) -> bool {
        if !self.enabled {
            return false;
        }
        if self.idle_timeout > Duration::ZERO && self.phase != Phase::Disabled {
            self.idle += dt;
            if self.idle >= self.idle_timeout {
                let was_visible = self.visible();
                self.phase = Phase::Disabled;
                return was_visible != self.visible();
            }
        }
        if self.phase == Phase::Disabled {
            return false;
        }
        self.elapsed += dt;
        let mut flipped = false;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            self.phase = match self.phase {
                Phase::On => Phase::Off,
                Phase::Off => Phase::On,
                Phase::Disabled => Phase::Disabled,
            };
            flipped = true;
        }
        flipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_blink_is_always_visible() {
        let mut b = BlinkState::new(Duration::from_millis(500), Duration::ZERO);
        b.set_enabled(false);
        assert!(b.visible());
        b.tick(Duration::from_secs(10));
        assert!(b.visible());
    }

    #[test]
    fn tick_flips_phase_at_interval_boundary() {
        let mut b = BlinkState::new(Duration::from_millis(500), Duration::ZERO);
        assert!(b.visible());
        assert!(b.tick(Duration::from_millis(500)));
        assert!(!b.visible());
        assert!(b.tick(Duration::from_millis(500)));
        assert!(b.visible());
    }

    #[test]
    fn restart_snaps_back_to_visible() {
        let mut b = BlinkState::new(Duration::from_millis(500), Duration::ZERO);
        b.tick(Duration::from_millis(500));
        assert!(!b.visible());
        b.restart();
        assert!(b.visible());
    }

    #[test]
    fn idle_timeout_pins_the_cursor_solid_until_activity() {
        let mut b = BlinkState::new(Duration::from_millis(500), Duration::from_secs(5));
        assert!(b.tick(Duration::from_millis(500)));
        assert!(!b.visible());
        // crosses the idle timeout while mid-blink-off: disabling snaps it
        // back visible, so this still counts as a phase flip.
        assert!(b.tick(Duration::from_secs(10)));
        assert!(b.visible());
        b.restart();
        assert!(b.visible());
        assert!(b.tick(Duration::from_millis(500)));
        assert!(!b.visible());
    }
}
