use rand::Rng;
use rand::rngs::StdRng;

use crate::events::{Direction, ImageRecord};
use crate::settings::{MIN_ROTATION_INTERVAL_SECS, SlideshowOrder, SlideshowSettings};

/// An advance that has been requested but not yet applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdvance {
    pub direction: Direction,
    pub random: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexChange {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    /// The rotation interval elapsed and a transition is now pending.
    AdvanceRequested,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlideshowSnapshot {
    pub current_index: usize,
    pub image_count: usize,
    pub current: Option<ImageRecord>,
    pub order: SlideshowOrder,
    pub countdown_remaining: u32,
    pub is_transitioning: bool,
    /// Completed advances since the engine was created.
    pub advances: u64,
}

/// Decides which image is on screen and when to move on.
///
/// Transitions are two-step: [`Slideshow::advance`] marks a transition as
/// pending and [`Slideshow::finish_transition`] applies it once the owner's
/// transition delay has elapsed. The target index is computed at completion
/// so that a list refresh in between cannot produce an invalid index.
pub struct Slideshow {
    images: Vec<ImageRecord>,
    current: usize,
    order: SlideshowOrder,
    interval: u32,
    countdown: u32,
    pending: Option<PendingAdvance>,
    advances: u64,
    rng: StdRng,
}

impl Slideshow {
    pub fn new(settings: &SlideshowSettings, rng: StdRng) -> Self {
        let interval = settings
            .rotation_interval_secs
            .max(MIN_ROTATION_INTERVAL_SECS);
        Self {
            images: Vec::new(),
            current: 0,
            order: settings.order,
            interval,
            countdown: interval,
            pending: None,
            advances: 0,
            rng,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_image(&self) -> Option<&ImageRecord> {
        self.images.get(self.current)
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown
    }

    pub fn is_transitioning(&self) -> bool {
        self.pending.is_some()
    }

    pub fn advances(&self) -> u64 {
        self.advances
    }

    pub fn snapshot(&self) -> SlideshowSnapshot {
        SlideshowSnapshot {
            current_index: self.current,
            image_count: self.images.len(),
            current: self.current_image().cloned(),
            order: self.order,
            countdown_remaining: self.countdown,
            is_transitioning: self.is_transitioning(),
            advances: self.advances,
        }
    }

    fn can_rotate(&self) -> bool {
        self.images.len() >= 2
    }

    /// Returns `true` when a transition was started.
    pub fn advance(&mut self, direction: Direction, random: bool) -> bool {
        if !self.can_rotate() || self.pending.is_some() {
            return false;
        }
        self.pending = Some(PendingAdvance { direction, random });
        true
    }

    pub fn finish_transition(&mut self) -> Option<IndexChange> {
        let pending = self.pending.take()?;
        let n = self.images.len();
        if n < 2 {
            return None;
        }
        let from = self.current;
        let to = if pending.random {
            // Uniform over the n - 1 other slots.
            let pick = self.rng.random_range(0..n - 1);
            if pick >= from { pick + 1 } else { pick }
        } else {
            match pending.direction {
                Direction::Next => (from + 1) % n,
                Direction::Prev => (from + n - 1) % n,
            }
        };
        self.current = to;
        self.advances += 1;
        Some(IndexChange { from, to })
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.can_rotate() {
            self.countdown = self.interval;
            return TickOutcome::Idle;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return TickOutcome::Idle;
        }
        self.countdown = self.interval;
        if self.advance(Direction::Next, self.order == SlideshowOrder::Random) {
            TickOutcome::AdvanceRequested
        } else {
            TickOutcome::Idle
        }
    }

    /// Replace the image list wholesale.
    pub fn set_images(&mut self, images: Vec<ImageRecord>) {
        self.images = images;
        if self.current >= self.images.len() {
            self.current = 0;
        }
        if !self.can_rotate() {
            self.pending = None;
            self.countdown = self.interval;
        }
    }

    pub fn apply_settings(&mut self, settings: &SlideshowSettings) {
        self.order = settings.order;
        let interval = settings
            .rotation_interval_secs
            .max(MIN_ROTATION_INTERVAL_SECS);
        if interval != self.interval {
            self.interval = interval;
            self.countdown = interval;
        }
    }
}
