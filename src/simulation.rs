//! Deterministic, clock-free run of both engines.
//!
//! Each step delivers one tick to the slideshow and, while it wants them, to
//! the timer. Transition delays are shorter than a tick, so a pending advance
//! is completed within the same step.

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::events::ImageRecord;
use crate::settings::Settings;
use crate::slideshow::{IndexChange, Slideshow, SlideshowSnapshot, TickOutcome};
use crate::timer::{TimerMachine, TimerPhaseChange, TimerSnapshot};

#[derive(Debug, Clone)]
pub struct SimulationFrame {
    pub tick: u64,
    pub slideshow: SlideshowSnapshot,
    pub timer: TimerSnapshot,
    pub advanced: Option<IndexChange>,
    pub timer_change: Option<TimerPhaseChange>,
}

pub struct Simulation {
    slideshow: Slideshow,
    timer: TimerMachine,
    timer_enabled: bool,
    ticks: u64,
}

impl Simulation {
    pub fn new(settings: &Settings, images: Vec<ImageRecord>, seed: u64) -> Self {
        let mut slideshow = Slideshow::new(&settings.slideshow, StdRng::seed_from_u64(seed));
        slideshow.set_images(images);
        Self {
            slideshow,
            timer: TimerMachine::new(&settings.timer),
            timer_enabled: settings.timer.enabled,
            ticks: 0,
        }
    }

    pub fn slideshow(&self) -> &Slideshow {
        &self.slideshow
    }

    pub fn slideshow_mut(&mut self) -> &mut Slideshow {
        &mut self.slideshow
    }

    pub fn timer(&self) -> &TimerMachine {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut TimerMachine {
        &mut self.timer
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn step(&mut self) -> SimulationFrame {
        self.ticks += 1;
        let advanced = match self.slideshow.tick() {
            TickOutcome::AdvanceRequested => self.slideshow.finish_transition(),
            TickOutcome::Idle => None,
        };
        let timer_change = if self.timer_enabled && self.timer.wants_ticks() {
            self.timer.tick()
        } else {
            None
        };
        SimulationFrame {
            tick: self.ticks,
            slideshow: self.slideshow.snapshot(),
            timer: self.timer.snapshot(),
            advanced,
            timer_change,
        }
    }

    pub fn run(&mut self, ticks: u64) -> Vec<SimulationFrame> {
        (0..ticks).map(|_| self.step()).collect()
    }
}
