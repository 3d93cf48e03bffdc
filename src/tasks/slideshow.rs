use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::events::{ImageRecord, SlideshowCommand};
use crate::settings::Settings;
use crate::slideshow::{Slideshow, SlideshowSnapshot, TickOutcome};
use crate::tick::Ticker;

#[derive(Debug, Clone, Copy)]
pub struct SlideshowTiming {
    pub tick_period: Duration,
    pub transition_delay: Duration,
}

/// Owns the rotation engine for as long as the slideshow view is mounted.
///
/// The ticker starts with the task and is dropped with it; cancelling the
/// token is the unmount.
#[instrument(skip_all, fields(tick_ms = timing.tick_period.as_millis() as u64))]
pub async fn run(
    mut settings_rx: watch::Receiver<Settings>,
    mut images_rx: watch::Receiver<Vec<ImageRecord>>,
    mut commands: mpsc::Receiver<SlideshowCommand>,
    state_tx: watch::Sender<SlideshowSnapshot>,
    timing: SlideshowTiming,
    rng: StdRng,
    cancel: CancellationToken,
) -> Result<()> {
    let mut show = Slideshow::new(&settings_rx.borrow_and_update().slideshow, rng);
    show.set_images(images_rx.borrow_and_update().clone());
    let mut ticker = Ticker::new(timing.tick_period);
    ticker.start();
    let mut transition_deadline: Option<Instant> = None;
    let mut settings_open = true;
    let mut images_open = true;
    let mut commands_open = true;
    publish(&state_tx, &show);
    info!(images = show.image_count(), "slideshow mounted");

    loop {
        select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; unmounting slideshow");
                break;
            }

            changed = settings_rx.changed(), if settings_open => {
                if changed.is_err() {
                    settings_open = false;
                    continue;
                }
                let slideshow = settings_rx.borrow_and_update().slideshow.clone();
                show.apply_settings(&slideshow);
            }

            changed = images_rx.changed(), if images_open => {
                if changed.is_err() {
                    images_open = false;
                    continue;
                }
                let images = images_rx.borrow_and_update().clone();
                show.set_images(images);
                if !show.is_transitioning() {
                    transition_deadline = None;
                }
                info!(
                    images = show.image_count(),
                    index = show.current_index(),
                    "image list replaced"
                );
            }

            maybe_cmd = commands.recv(), if commands_open => {
                match maybe_cmd {
                    Some(SlideshowCommand::Advance(direction)) => {
                        if show.advance(direction, false) {
                            transition_deadline = Some(Instant::now() + timing.transition_delay);
                        } else {
                            debug!(?direction, "advance ignored");
                        }
                    }
                    None => commands_open = false,
                }
            }

            _ = ticker.tick() => {
                if show.tick() == TickOutcome::AdvanceRequested {
                    transition_deadline = Some(Instant::now() + timing.transition_delay);
                }
            }

            _ = sleep_until(transition_deadline.unwrap_or_else(Instant::now)),
                if transition_deadline.is_some() =>
            {
                transition_deadline = None;
                if let Some(ch) = show.finish_transition() {
                    info!(
                        from = ch.from,
                        to = ch.to,
                        image = show.current_image().map(|i| i.display_name.as_str()),
                        "slideshow advanced"
                    );
                }
            }
        }

        publish(&state_tx, &show);
    }

    ticker.stop();
    Ok(())
}

fn publish(state_tx: &watch::Sender<SlideshowSnapshot>, show: &Slideshow) {
    let snapshot = show.snapshot();
    state_tx.send_if_modified(|current| {
        if *current == snapshot {
            return false;
        }
        *current = snapshot;
        true
    });
}
