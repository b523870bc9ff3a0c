//!Core of the pwmi project: calibration, register encoding and the `PwmInterface` for a PCA9685 16 channel, 12 bit
//! pwm generator. Nothing in here knows about a concrete bus, see `pwmi_devices` for that.
//!
//! Application pwm values are integers, 0 to 1024 with the default scale factor of 4. Each channel can be given its
//! own scale and phase offset with `PwmInterface::configure`.

pub mod calibration;
pub mod codec;
pub mod diagnostics;
pub mod error;
pub mod interface;
pub mod transport;

pub use calibration::{CalibrationTable, ChannelCalibration, CHANNEL_COUNT};
pub use codec::RegisterPayload;
pub use diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
pub use error::Error;
pub use interface::{LifecycleState, PwmInterface, DEFAULT_ADDRESS, INVALID_CHANNEL_VALUE};
pub use transport::Transport;
