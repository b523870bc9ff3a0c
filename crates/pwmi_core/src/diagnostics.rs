//!Reporting of the recoverable error conditions hit by `PwmInterface`.
use std::fmt::{Display, Formatter};

use tracing::{error, warn};

///A condition worth reporting. The operation that hit it is skipped, nothing else is affected.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    InvalidChannel {
        operation: &'static str,
        channel: usize,
    },
    InvalidScale {
        channel: usize,
        scale: f32,
    },
    DeviceNotFound {
        address: u8,
    },
    LengthMismatch {
        operation: &'static str,
        channels: usize,
        values: usize,
    },
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChannel { operation, channel } => f.write_fmt(format_args!(
                "PwmInterface: invalid pwm channel {} in {}",
                channel, operation
            )),
            Self::InvalidScale { channel, scale } => f.write_fmt(format_args!(
                "PwmInterface: rejected scale factor {} for channel {}",
                scale, channel
            )),
            Self::DeviceNotFound { address } => f.write_fmt(format_args!(
                "PWM extension (PCA9685) board not found at {:#04x}",
                address
            )),
            Self::LengthMismatch {
                operation,
                channels,
                values,
            } => f.write_fmt(format_args!(
                "PwmInterface: {} got {} channels and {} values",
                operation, channels, values
            )),
        }
    }
}

pub trait Diagnostics {
    fn report(&self, diagnostic: &Diagnostic);
}

///Sends diagnostics to `tracing`. A missing device is an error, everything else a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, diagnostic: &Diagnostic) {
        match diagnostic {
            Diagnostic::DeviceNotFound { .. } => error!("{}", diagnostic),
            _ => warn!("{}", diagnostic),
        }
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for &D {
    fn report(&self, diagnostic: &Diagnostic) {
        (**self).report(diagnostic)
    }
}
