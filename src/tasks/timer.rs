use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::events::TimerCommand;
use crate::overlay::timer_label;
use crate::settings::{Settings, TimerSettings};
use crate::tick::Ticker;
use crate::timer::{TimerMachine, TimerPhaseChange, TimerSnapshot};

/// Owns the timer state machine and its only tick source.
///
/// Rules:
/// - The ticker runs only while the feature is enabled and the machine is
///   `Running` or blinking after completion.
/// - Disabling the feature discards the machine (manual override included)
///   and stops the ticker before anything else happens.
/// - Views observe `state_tx`; they never drive time themselves.
#[instrument(skip_all, fields(tick_ms = tick_period.as_millis() as u64))]
pub async fn run(
    mut settings_rx: watch::Receiver<Settings>,
    mut commands: mpsc::Receiver<TimerCommand>,
    state_tx: watch::Sender<TimerSnapshot>,
    tick_period: Duration,
    cancel: CancellationToken,
) -> Result<()> {
    let initial: TimerSettings = settings_rx.borrow_and_update().timer.clone();
    let mut enabled = initial.enabled;
    let mut sm = TimerMachine::new(&initial);
    let mut ticker = Ticker::new(tick_period);
    let mut settings_open = true;
    let mut commands_open = true;
    publish(&state_tx, &sm);

    loop {
        ticker.set_running(enabled && sm.wants_ticks());

        select! {
            _ = cancel.cancelled() => {
                debug!("cancel received; exiting timer task");
                break;
            }

            changed = settings_rx.changed(), if settings_open => {
                if changed.is_err() {
                    debug!("settings publisher closed");
                    settings_open = false;
                    continue;
                }
                let timer = settings_rx.borrow_and_update().timer.clone();
                if timer.enabled != enabled {
                    enabled = timer.enabled;
                    ticker.stop();
                    sm = TimerMachine::new(&timer);
                    info!(enabled, "timer feature toggled");
                } else if let Some(ch) = sm.apply_settings(&timer) {
                    log_change("settings", ch, &sm);
                }
            }

            maybe_cmd = commands.recv(), if commands_open => {
                let Some(cmd) = maybe_cmd else {
                    debug!("timer command channel closed");
                    commands_open = false;
                    continue;
                };
                if !enabled {
                    debug!(?cmd, "timer disabled; ignoring command");
                    continue;
                }
                let change = match cmd {
                    TimerCommand::Start => sm.start(),
                    TimerCommand::Pause => sm.pause(),
                    TimerCommand::Reset => sm.reset(),
                    TimerCommand::SetDuration(d) => {
                        info!(duration = %d, "timer duration set manually");
                        sm.set_duration_manually(d.hours, d.minutes, d.seconds)
                    }
                };
                match change {
                    Some(ch) => log_change("command", ch, &sm),
                    None => debug!(?cmd, phase = ?sm.phase(), "timer command had no effect"),
                }
            }

            _ = ticker.tick() => {
                if let Some(ch) = sm.tick() {
                    log_change("tick", ch, &sm);
                }
            }
        }

        publish(&state_tx, &sm);
    }

    ticker.stop();
    Ok(())
}

fn publish(state_tx: &watch::Sender<TimerSnapshot>, sm: &TimerMachine) {
    let snapshot = sm.snapshot();
    state_tx.send_if_modified(|current| {
        if *current == snapshot {
            return false;
        }
        *current = snapshot;
        true
    });
}

fn log_change(cause: &str, ch: TimerPhaseChange, sm: &TimerMachine) {
    info!(
        cause,
        from = ?ch.from,
        to = ?ch.to,
        timer = %timer_label(sm.remaining(), sm.phase()),
        "timer phase changed"
    );
}
