use crate::hms::Hms;
use crate::settings::{TimerMode, TimerSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    Idle,
    Running,
    Paused,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPhaseChange {
    pub from: TimerPhase,
    pub to: TimerPhase,
}

/// Observable view of a [`TimerMachine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub mode: TimerMode,
    pub remaining: Hms,
    pub visible: bool,
    pub blinking: bool,
    pub manual_override: bool,
}

/// Countdown/chronometer state machine.
///
/// The machine never reads a wall clock. Every call to [`TimerMachine::tick`]
/// advances its logical clock by one second, and the blink deadline is
/// expressed on that clock.
#[derive(Debug, Clone)]
pub struct TimerMachine {
    phase: TimerPhase,
    mode: TimerMode,
    remaining: u64,
    configured: Hms,
    manual: Option<Hms>,
    blink_secs: u32,
    clock: u64,
    blink_until: Option<u64>,
    visible: bool,
}

impl TimerMachine {
    pub fn new(settings: &TimerSettings) -> Self {
        let configured = settings.duration.normalized();
        let mut sm = Self {
            phase: TimerPhase::Idle,
            mode: settings.mode,
            remaining: 0,
            configured,
            manual: None,
            blink_secs: settings.blink_secs,
            clock: 0,
            blink_until: None,
            visible: true,
        };
        sm.remaining = sm.initial_value();
        sm
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    pub fn remaining(&self) -> Hms {
        Hms::from_seconds(self.remaining)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn blink_until(&self) -> Option<u64> {
        self.blink_until
    }

    pub fn has_manual_override(&self) -> bool {
        self.manual.is_some()
    }

    /// Whether the owner should be delivering ticks.
    pub fn wants_ticks(&self) -> bool {
        matches!(self.phase, TimerPhase::Running | TimerPhase::Complete)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            phase: self.phase,
            mode: self.mode,
            remaining: self.remaining(),
            visible: self.visible,
            blinking: self.phase == TimerPhase::Complete,
            manual_override: self.manual.is_some(),
        }
    }

    fn effective_duration(&self) -> Hms {
        self.manual.unwrap_or(self.configured)
    }

    fn initial_value(&self) -> u64 {
        match self.mode {
            TimerMode::Countdown => self.effective_duration().total_seconds(),
            TimerMode::Chronometer => 0,
        }
    }

    pub fn start(&mut self) -> Option<TimerPhaseChange> {
        match self.phase {
            TimerPhase::Running => None,
            TimerPhase::Paused => {
                self.visible = true;
                self.goto(TimerPhase::Running)
            }
            TimerPhase::Idle | TimerPhase::Complete => {
                let initial = self.initial_value();
                if self.mode == TimerMode::Countdown && initial == 0 {
                    return None;
                }
                self.remaining = initial;
                self.blink_until = None;
                self.visible = true;
                self.goto(TimerPhase::Running)
            }
        }
    }

    pub fn pause(&mut self) -> Option<TimerPhaseChange> {
        if self.phase != TimerPhase::Running {
            return None;
        }
        self.goto(TimerPhase::Paused)
    }

    pub fn tick(&mut self) -> Option<TimerPhaseChange> {
        match self.phase {
            TimerPhase::Idle | TimerPhase::Paused => None,
            TimerPhase::Running => {
                self.clock = self.clock.saturating_add(1);
                match self.mode {
                    TimerMode::Chronometer => {
                        self.remaining = self.remaining.saturating_add(1);
                        None
                    }
                    TimerMode::Countdown => {
                        self.remaining = self.remaining.saturating_sub(1);
                        if self.remaining > 0 {
                            return None;
                        }
                        if self.blink_secs == 0 {
                            self.finish_blink();
                            return Some(TimerPhaseChange {
                                from: TimerPhase::Running,
                                to: TimerPhase::Idle,
                            });
                        }
                        let until = self.clock.saturating_add(u64::from(self.blink_secs));
                        self.blink_until = Some(until);
                        self.goto(TimerPhase::Complete)
                    }
                }
            }
            TimerPhase::Complete => {
                self.clock = self.clock.saturating_add(1);
                match self.blink_until {
                    Some(until) if self.clock < until => None,
                    _ => self.finish_blink(),
                }
            }
        }
    }

    fn finish_blink(&mut self) -> Option<TimerPhaseChange> {
        self.blink_until = None;
        self.visible = false;
        self.remaining = self.initial_value();
        self.goto(TimerPhase::Idle)
    }

    pub fn reset(&mut self) -> Option<TimerPhaseChange> {
        self.manual = None;
        self.blink_until = None;
        self.visible = true;
        self.remaining = self.initial_value();
        self.goto(TimerPhase::Idle)
    }

    /// Override the countdown duration until the next [`TimerMachine::reset`].
    pub fn set_duration_manually(
        &mut self,
        hours: u64,
        minutes: u64,
        seconds: u64,
    ) -> Option<TimerPhaseChange> {
        let duration = Hms::new(hours, minutes, seconds).normalized();
        self.manual = Some(duration);
        if self.mode != TimerMode::Countdown {
            return None;
        }
        self.remaining = duration.total_seconds();
        if self.phase == TimerPhase::Complete {
            self.blink_until = None;
            self.visible = true;
            return self.goto(TimerPhase::Idle);
        }
        None
    }

    /// Fold a settings change into the machine.
    pub fn apply_settings(&mut self, settings: &TimerSettings) -> Option<TimerPhaseChange> {
        self.blink_secs = settings.blink_secs;
        let duration = settings.duration.normalized();
        let duration_changed = duration != self.configured;
        self.configured = duration;

        if settings.mode != self.mode {
            self.mode = settings.mode;
            return self.reset();
        }
        if duration_changed
            && self.manual.is_none()
            && self.phase == TimerPhase::Idle
            && self.mode == TimerMode::Countdown
        {
            self.remaining = duration.total_seconds();
        }
        None
    }

    fn goto(&mut self, to: TimerPhase) -> Option<TimerPhaseChange> {
        if self.phase == to {
            return None;
        }
        let ch = TimerPhaseChange {
            from: self.phase,
            to,
        };
        self.phase = to;
        Some(ch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countdown(secs: u64, blink: u32) -> TimerMachine {
        TimerMachine::new(&TimerSettings {
            enabled: true,
            mode: TimerMode::Countdown,
            duration: Hms::from_seconds(secs),
            blink_secs: blink,
            ..TimerSettings::default()
        })
    }

    fn chronometer() -> TimerMachine {
        TimerMachine::new(&TimerSettings {
            enabled: true,
            mode: TimerMode::Chronometer,
            ..TimerSettings::default()
        })
    }

    #[test]
    fn countdown_completes_after_duration_ticks() {
        let mut sm = countdown(90, 10);
        sm.start().unwrap();
        for _ in 0..89 {
            assert!(sm.tick().is_none());
        }
        let ch = sm.tick().unwrap();
        assert_eq!((ch.from, ch.to), (TimerPhase::Running, TimerPhase::Complete));
        assert_eq!(sm.remaining_seconds(), 0);

        assert!(sm.tick().is_none());
        assert_eq!(sm.phase(), TimerPhase::Complete);
        assert_eq!(sm.remaining_seconds(), 0);
    }

    #[test]
    fn blink_window_returns_to_hidden_idle() {
        let mut sm = countdown(10, 2);
        sm.start();
        for _ in 0..10 {
            sm.tick();
        }
        assert_eq!(sm.phase(), TimerPhase::Complete);
        assert!(sm.snapshot().blinking);
        assert_eq!(sm.blink_until(), Some(12));

        sm.tick();
        assert_eq!(sm.phase(), TimerPhase::Complete);
        let ch = sm.tick().unwrap();
        assert_eq!((ch.from, ch.to), (TimerPhase::Complete, TimerPhase::Idle));
        assert!(!sm.is_visible());
        assert_eq!(sm.blink_until(), None);
        assert_eq!(sm.remaining_seconds(), 10);
    }

    #[test]
    fn zero_blink_skips_complete_phase() {
        let mut sm = countdown(2, 0);
        sm.start();
        sm.tick();
        let ch = sm.tick().unwrap();
        assert_eq!((ch.from, ch.to), (TimerPhase::Running, TimerPhase::Idle));
        assert!(!sm.is_visible());
    }

    #[test]
    fn chronometer_counts_up() {
        let mut sm = chronometer();
        sm.start();
        for _ in 0..3661 {
            sm.tick();
        }
        assert_eq!(sm.remaining_seconds(), 3661);
        assert_eq!(sm.remaining(), Hms::new(1, 1, 1));
        assert_eq!(sm.phase(), TimerPhase::Running);
    }

    #[test]
    fn pause_and_resume_preserve_remaining() {
        let mut sm = countdown(60, 10);
        sm.start();
        for _ in 0..15 {
            sm.tick();
        }
        sm.pause().unwrap();
        for _ in 0..100 {
            assert!(sm.tick().is_none());
        }
        assert_eq!(sm.remaining_seconds(), 45);
        let ch = sm.start().unwrap();
        assert_eq!((ch.from, ch.to), (TimerPhase::Paused, TimerPhase::Running));
        assert_eq!(sm.remaining_seconds(), 45);
    }

    #[test]
    fn repeated_commands_are_noops() {
        let mut sm = countdown(60, 10);
        assert!(sm.pause().is_none());
        sm.start().unwrap();
        let before = sm.snapshot();
        assert!(sm.start().is_none());
        assert_eq!(sm.snapshot(), before);

        sm.pause().unwrap();
        let before = sm.snapshot();
        assert!(sm.pause().is_none());
        assert_eq!(sm.snapshot(), before);
    }

    #[test]
    fn manual_duration_sticks_until_reset() {
        let mut sm = countdown(600, 10);
        sm.set_duration_manually(0, 5, 0);
        assert_eq!(sm.remaining_seconds(), 300);

        let mut changed = TimerSettings {
            enabled: true,
            duration: Hms::new(0, 20, 0),
            ..TimerSettings::default()
        };
        sm.apply_settings(&changed);
        assert_eq!(sm.remaining_seconds(), 300);

        sm.start();
        sm.tick();
        changed.duration = Hms::new(0, 30, 0);
        sm.apply_settings(&changed);
        assert_eq!(sm.remaining_seconds(), 299);

        sm.reset();
        assert!(!sm.has_manual_override());
        assert_eq!(sm.remaining_seconds(), 1800);
    }

    #[test]
    fn idle_timer_follows_configured_duration_without_override() {
        let mut sm = countdown(600, 10);
        sm.apply_settings(&TimerSettings {
            duration: Hms::new(0, 2, 0),
            ..TimerSettings::default()
        });
        assert_eq!(sm.remaining_seconds(), 120);
    }

    #[test]
    fn mode_change_resets() {
        let mut sm = countdown(60, 10);
        sm.start();
        sm.tick();
        let ch = sm
            .apply_settings(&TimerSettings {
                mode: TimerMode::Chronometer,
                duration: Hms::from_seconds(60),
                ..TimerSettings::default()
            })
            .unwrap();
        assert_eq!(ch.to, TimerPhase::Idle);
        assert_eq!(sm.remaining_seconds(), 0);
        assert_eq!(sm.mode(), TimerMode::Chronometer);
    }

    #[test]
    fn zero_countdown_does_not_start() {
        let mut sm = countdown(0, 10);
        assert!(sm.start().is_none());
        assert_eq!(sm.phase(), TimerPhase::Idle);
    }

    #[test]
    fn restart_after_completion_reinitializes() {
        let mut sm = countdown(3, 10);
        sm.start();
        for _ in 0..3 {
            sm.tick();
        }
        assert_eq!(sm.phase(), TimerPhase::Complete);
        sm.start().unwrap();
        assert_eq!(sm.phase(), TimerPhase::Running);
        assert_eq!(sm.remaining_seconds(), 3);
        assert_eq!(sm.blink_until(), None);
    }
}
