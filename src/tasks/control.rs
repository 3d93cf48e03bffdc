use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{ControlCommand, SlideshowCommand, TimerCommand};
use crate::store::SettingsStore;

/// Operator input, one command per line.
///
/// Button presses in a graphical frame map onto the same commands. When
/// `shutdown_on_eof` is set, closing the input (Ctrl-D) cancels everything.
pub async fn run<R>(
    input: R,
    store: SettingsStore,
    to_timer: Sender<TimerCommand>,
    to_slideshow: Sender<SlideshowCommand>,
    cancel: CancellationToken,
    shutdown_on_eof: bool,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            if shutdown_on_eof {
                info!("control input closed; initiating shutdown");
                cancel.cancel();
            } else {
                debug!("control input closed");
            }
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cmd: ControlCommand = match line.parse() {
            Ok(cmd) => cmd,
            Err(err) => {
                warn!(input = line, "ignoring control input: {err:#}");
                continue;
            }
        };
        debug!(?cmd, "control command");
        match cmd {
            ControlCommand::Timer(cmd) => {
                if to_timer.send(cmd).await.is_err() {
                    warn!("timer task gone; dropping command");
                }
            }
            ControlCommand::Slideshow(cmd) => {
                if to_slideshow.send(cmd).await.is_err() {
                    warn!("slideshow task gone; dropping command");
                }
            }
            ControlCommand::Settings(patch) => {
                let store = store.clone();
                match tokio::task::spawn_blocking(move || store.update(patch)).await? {
                    Ok(_) => info!(input = line, "settings updated"),
                    Err(err) => warn!(error = %err, "settings update not saved"),
                }
            }
            ControlCommand::Quit => {
                info!("quit requested");
                cancel.cancel();
                break;
            }
        }
    }
    Ok(())
}
