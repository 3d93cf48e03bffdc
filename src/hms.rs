use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Non-negative duration expressed as hours, minutes and seconds.
///
/// Values coming from user input may carry minutes or seconds above 59;
/// [`Hms::normalized`] folds them back into the larger units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Hms {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Hms {
    pub const ZERO: Self = Self {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub const fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub const fn from_seconds(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    pub const fn total_seconds(&self) -> u64 {
        self.hours
            .saturating_mul(3600)
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }

    pub const fn normalized(self) -> Self {
        Self::from_seconds(self.total_seconds())
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.normalized();
        write!(f, "{:02}:{:02}:{:02}", n.hours, n.minutes, n.seconds)
    }
}

/// Accepts `SS`, `MM:SS` or `H:MM:SS`.
impl FromStr for Hms {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let mut values = Vec::with_capacity(parts.len());
        for part in &parts {
            let value: u64 = part
                .trim()
                .parse()
                .with_context(|| format!("invalid duration component {part:?} in {s:?}"))?;
            values.push(value);
        }
        let hms = match values.as_slice() {
            [s] => Self::new(0, 0, *s),
            [m, s] => Self::new(0, *m, *s),
            [h, m, s] => Self::new(*h, *m, *s),
            _ => bail!("duration {s:?} must look like SS, MM:SS or H:MM:SS"),
        };
        Ok(hms.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::Hms;

    #[test]
    fn decomposes_seconds() {
        assert_eq!(Hms::from_seconds(3661), Hms::new(1, 1, 1));
        assert_eq!(Hms::from_seconds(59), Hms::new(0, 0, 59));
        assert_eq!(Hms::new(0, 90, 75).normalized(), Hms::new(1, 31, 15));
    }

    #[test]
    fn parses_clock_notation() {
        assert_eq!("0:05:00".parse::<Hms>().unwrap(), Hms::new(0, 5, 0));
        assert_eq!("90".parse::<Hms>().unwrap(), Hms::new(0, 1, 30));
        assert_eq!("2:03".parse::<Hms>().unwrap(), Hms::new(0, 2, 3));
        assert!("1:2:3:4".parse::<Hms>().is_err());
        assert!("abc".parse::<Hms>().is_err());
    }

    #[test]
    fn displays_padded() {
        assert_eq!(Hms::new(1, 2, 3).to_string(), "01:02:03");
        assert_eq!(Hms::from_seconds(36_000).to_string(), "10:00:00");
    }
}
