//! Signal names and numbers

pub use nix::sys::signal::Signal;

use crate::error::{Error, Result};

/// Anything that can name a Unix signal: a [`Signal`], its number, or its name
pub trait IntoSignal {
    /// Resolve to a concrete signal
    fn into_signal(self) -> Result<Signal>;
}

impl IntoSignal for Signal {
    fn into_signal(self) -> Result<Signal> {
        Ok(self)
    }
}

impl IntoSignal for i32 {
    fn into_signal(self) -> Result<Signal> {
        Signal::try_from(self).map_err(|_| Error::InvalidSignal {
            signal: self.to_string(),
        })
    }
}

impl IntoSignal for &str {
    fn into_signal(self) -> Result<Signal> {
        parse_signal(self)
    }
}

impl IntoSignal for String {
    fn into_signal(self) -> Result<Signal> {
        parse_signal(&self)
    }
}

/// Parse `SIGHUP`, `HUP`, `hup` or `1` into a signal
pub fn parse_signal(name: &str) -> Result<Signal> {
    let trimmed = name.trim();
    if let Ok(number) = trimmed.parse::<i32>() {
        return number.into_signal();
    }

    let upper = trimmed.to_ascii_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{upper}")
    };
    full.parse::<Signal>().map_err(|_| Error::InvalidSignal {
        signal: name.to_string(),
    })
}

/// Short name of a signal as used on command lines (`HUP` for `SIGHUP`)
pub fn signal_name(signal: Signal) -> &'static str {
    let full = signal.as_str();
    full.strip_prefix("SIG").unwrap_or(full)
}
