//!A mod for the error types
use std::fmt::{Debug, Display, Formatter};

///Errors returned by `PwmInterface` operations. `E` is the error type of the transport collaborator.
pub enum Error<E> {
    ///channel index outside of [0, CHANNEL_COUNT)
    InvalidChannel(usize),
    ///scale factor that is zero, negative or not finite
    InvalidScale(f32),
    ///the presence probe at initialization got no answer from this bus address
    DeviceNotFound(u8),
    ///batch operation with a channel list and value list of different lengths
    LengthMismatch { channels: usize, values: usize },
    ///bus error surfaced by the transport, passed through untouched
    Transport(E),
}

impl<E> Error<E> {
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl<E: Debug> Debug for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChannel(channel) => f.write_fmt(format_args!("InvalidChannel({})", channel)),
            Self::InvalidScale(scale) => f.write_fmt(format_args!("InvalidScale({})", scale)),
            Self::DeviceNotFound(address) => {
                f.write_fmt(format_args!("DeviceNotFound({:#04x})", address))
            }
            Self::LengthMismatch { channels, values } => f.write_fmt(format_args!(
                "LengthMismatch {{ channels: {}, values: {} }}",
                channels, values
            )),
            Self::Transport(err) => f.write_fmt(format_args!("Transport({:?})", err)),
        }
    }
}

impl<E: Debug> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidChannel(channel) => {
                f.write_fmt(format_args!("invalid pwm channel {}", channel))
            }
            Self::InvalidScale(scale) => f.write_fmt(format_args!(
                "invalid scale factor {}, it must be a finite value greater than 0",
                scale
            )),
            Self::DeviceNotFound(address) => f.write_fmt(format_args!(
                "pwm device (PCA9685) not found at address {:#04x}",
                address
            )),
            Self::LengthMismatch { channels, values } => f.write_fmt(format_args!(
                "got {} channels but {} values",
                channels, values
            )),
            Self::Transport(err) => f.write_fmt(format_args!("transport error: {:?}", err)),
        }
    }
}

impl<E: Debug> std::error::Error for Error<E> {}
