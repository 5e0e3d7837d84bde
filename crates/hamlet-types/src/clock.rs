//! The simulated clock
//!
//! A day is three periods. The coordinator is the single writer of the
//! clock; everyone else only ever holds snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three slots composing a simulated day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Noon,
    Evening,
}

impl Period {
    /// The period that follows this one within a day, wrapping to Morning.
    pub fn next(self) -> Self {
        match self {
            Self::Morning => Self::Noon,
            Self::Noon => Self::Evening,
            Self::Evening => Self::Morning,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Morning => write!(f, "morning"),
            Self::Noon => write!(f, "noon"),
            Self::Evening => write!(f, "evening"),
        }
    }
}

/// The global simulation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// Day counter, starts at 1
    pub day: u32,
    pub period: Period,
}

impl Clock {
    pub fn new(day: u32, period: Period) -> Self {
        Self { day, period }
    }

    /// The clock after one barrier completion.
    ///
    /// Morning -> Noon -> Evening -> Morning of the next day.
    pub fn advanced(self) -> Self {
        let period = self.period.next();
        let day = if self.period == Period::Evening {
            self.day + 1
        } else {
            self.day
        };
        Self { day, period }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(1, Period::Morning)
    }
}

impl fmt::Display for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {} {}", self.day, self.period)
    }
}
