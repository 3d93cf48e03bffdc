use std::str::FromStr;

use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};

use crate::hms::Hms;
use crate::settings::{SettingsPatch, SlideshowOrder, TimerMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub display_name: String,
}

impl ImageRecord {
    pub fn new(url: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Pause,
    Reset,
    SetDuration(Hms),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideshowCommand {
    Advance(Direction),
}

/// One line of operator input.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Timer(TimerCommand),
    Slideshow(SlideshowCommand),
    Settings(SettingsPatch),
    Quit,
}

impl FromStr for ControlCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let verb = words
            .next()
            .ok_or_else(|| anyhow!("empty command"))?
            .to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            bail!("too many arguments in {line:?}");
        }
        let need = |name: &str| arg.ok_or_else(|| anyhow!("{name} requires an argument"));

        let cmd = match verb.as_str() {
            "start" => Self::Timer(TimerCommand::Start),
            "pause" => Self::Timer(TimerCommand::Pause),
            "reset" => Self::Timer(TimerCommand::Reset),
            "duration" => Self::Timer(TimerCommand::SetDuration(need("duration")?.parse()?)),
            "next" => Self::Slideshow(SlideshowCommand::Advance(Direction::Next)),
            "prev" | "previous" => Self::Slideshow(SlideshowCommand::Advance(Direction::Prev)),
            "interval" => {
                let secs: u32 = need("interval")?
                    .parse()
                    .map_err(|e| anyhow!("interval must be whole seconds: {e}"))?;
                Self::Settings(SettingsPatch {
                    rotation_interval_secs: Some(secs),
                    ..SettingsPatch::default()
                })
            }
            "order" => {
                let order = match need("order")? {
                    "sequential" => SlideshowOrder::Sequential,
                    "random" => SlideshowOrder::Random,
                    other => bail!("unknown order {other:?}; expected sequential or random"),
                };
                Self::Settings(SettingsPatch {
                    slideshow_order: Some(order),
                    ..SettingsPatch::default()
                })
            }
            "mode" => {
                let mode = match need("mode")? {
                    "countdown" => TimerMode::Countdown,
                    "chronometer" => TimerMode::Chronometer,
                    other => bail!("unknown mode {other:?}; expected countdown or chronometer"),
                };
                Self::Settings(SettingsPatch {
                    timer_mode: Some(mode),
                    ..SettingsPatch::default()
                })
            }
            "timer" => {
                let enabled = match need("timer")? {
                    "on" => true,
                    "off" => false,
                    other => bail!("unknown timer switch {other:?}; expected on or off"),
                };
                Self::Settings(SettingsPatch {
                    timer_enabled: Some(enabled),
                    ..SettingsPatch::default()
                })
            }
            "quit" | "exit" => Self::Quit,
            other => bail!("unknown command {other:?}"),
        };
        let takes_arg = matches!(cmd, ControlCommand::Settings(_))
            || matches!(cmd, ControlCommand::Timer(TimerCommand::SetDuration(_)));
        if arg.is_some() && !takes_arg {
            bail!("{verb} takes no argument");
        }
        Ok(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timer_commands() {
        assert_eq!(
            "start".parse::<ControlCommand>().unwrap(),
            ControlCommand::Timer(TimerCommand::Start)
        );
        assert_eq!(
            "duration 0:05:00".parse::<ControlCommand>().unwrap(),
            ControlCommand::Timer(TimerCommand::SetDuration(Hms::new(0, 5, 0)))
        );
    }

    #[test]
    fn parses_settings_commands() {
        match "interval 45".parse::<ControlCommand>().unwrap() {
            ControlCommand::Settings(patch) => {
                assert_eq!(patch.rotation_interval_secs, Some(45))
            }
            other => panic!("unexpected command: {other:?}"),
        }
        match "timer off".parse::<ControlCommand>().unwrap() {
            ControlCommand::Settings(patch) => assert_eq!(patch.timer_enabled, Some(false)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<ControlCommand>().is_err());
        assert!("jump".parse::<ControlCommand>().is_err());
        assert!("interval".parse::<ControlCommand>().is_err());
        assert!("order shuffled".parse::<ControlCommand>().is_err());
        assert!("next 2".parse::<ControlCommand>().is_err());
    }
}
