//!Hardware side of pwmi. `I2cTransport` puts a `PwmInterface` on any `embedded_hal` I2C bus, and `Pca9685Device` turns
//! a config file worth of named, calibrated channels into outputs fed by tokio tasks.

pub mod error;

///I2C transport for the PCA9685 register protocol.
pub mod i2c;

///The PCA9685 is an i2c device from NXP with 16 pwm output channels with 12 bit resolution.
pub mod pca9685;
