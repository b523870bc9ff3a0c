use std::{
    collections::{hash_map::Entry, HashMap},
    sync::{Arc, Mutex},
};

use embedded_hal::i2c::I2c;
use futures::future::join_all;
use pwmi_core::{calibration::DEFAULT_SCALE, Error, PwmInterface, DEFAULT_ADDRESS};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{error::DeviceConfigError, i2c::I2cTransport};

pub type Pca9685Interface<I2C> = PwmInterface<I2cTransport<I2C>>;

//system level config -- corresponds to 1 pwm chip instance
#[derive(Debug, Deserialize)]
pub struct Pca9685DeviceConfig {
    #[serde(default = "default_bus")]
    pub i2c_bus: u8,
    #[serde(default = "default_address")]
    pub i2c_address: u8,
    #[serde(default)]
    pub outputs: HashMap<String, Pca9685OutputConfig>,
}

//one named output of the chip
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct Pca9685OutputConfig {
    pub channel: usize,
    #[serde(default)]
    pub offset: i32,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_bus() -> u8 {
    1
}

fn default_address() -> u8 {
    DEFAULT_ADDRESS
}

fn default_scale() -> f32 {
    DEFAULT_SCALE
}

///Sends pwm values to the task driving one channel.
pub struct Pca9685PwmOutput {
    tx: mpsc::Sender<i32>,
}

impl Pca9685PwmOutput {
    pub fn sink(&self) -> mpsc::Sender<i32> {
        self.tx.clone()
    }
}

//connected pwm chip instance
pub struct Pca9685Device<I2C> {
    pub join_handle: JoinHandle<()>,
    pub outputs: HashMap<String, Pca9685PwmOutput>,
    interface: Arc<Mutex<Pca9685Interface<I2C>>>,
}

///Initialize the chip and apply the calibration of every configured output.
///
/// A board that does not answer the probe is logged and the interface is returned anyway, all writes to it will
/// fail. Every invalid output, including a second output on an already used channel, is collected into the
/// returned error.
pub fn connect<I2C>(
    config: &Pca9685DeviceConfig,
    i2c: I2C,
) -> Result<Pca9685Interface<I2C>, DeviceConfigError>
where
    I2C: I2c,
{
    let mut interface = PwmInterface::new(I2cTransport::new(i2c), config.i2c_address);
    match interface.initialize() {
        Ok(()) => info!("PCA9685 ready at {:#04x}", config.i2c_address),
        Err(Error::DeviceNotFound(address)) => {
            warn!("continuing without a PCA9685 at {:#04x}, outputs will not work", address)
        }
        Err(err) => return Err(err.into()),
    }

    let mut errs = Vec::new();
    //sorted so the same config always keeps the same output of a shared channel
    let mut outputs: Vec<_> = config.outputs.iter().collect();
    outputs.sort_by(|(a, _), (b, _)| a.cmp(b));
    let mut claimed: HashMap<usize, &str> = HashMap::with_capacity(outputs.len());
    for (name, output) in outputs {
        match claimed.entry(output.channel) {
            Entry::Occupied(owner) => {
                errs.push(DeviceConfigError::new(format!(
                    "output '{}': channel {} is already driven by output '{}'",
                    name,
                    output.channel,
                    owner.get()
                )));
                continue;
            }
            Entry::Vacant(slot) => {
                slot.insert(name.as_str());
            }
        }
        if let Err(err) = interface.configure(output.channel, output.offset, output.scale) {
            errs.push(DeviceConfigError::new(format!("output '{}': {}", name, err)));
        }
    }
    if errs.is_empty() {
        Ok(interface)
    } else {
        Err(DeviceConfigError::from_errs(errs))
    }
}

fn spawn_pca_output_task<I2C>(
    device: Arc<Mutex<Pca9685Interface<I2C>>>,
    channel: usize,
    mut rx: mpsc::Receiver<i32>,
    cancel_token: CancellationToken,
) -> JoinHandle<()>
where
    I2C: I2c + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let new_value = tokio::select! {
                _ = cancel_token.cancelled() => break,
                received = rx.recv() => match received {
                    Some(value) => value,
                    None => break,
                },
            };
            let mut device = match device.lock() {
                Ok(device) => device,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Err(err) = device.set_channel(channel, new_value) {
                error!("error setting PCA9685 channel {} output! {}", channel, err);
            }
        }
        debug!("Pca9685Device output task for channel {} shutting down.", channel)
    })
}

impl<I2C> Pca9685Device<I2C>
where
    I2C: I2c + Send + 'static,
{
    pub fn build(
        config: &Pca9685DeviceConfig,
        i2c: I2C,
        cancel_token: CancellationToken,
    ) -> Result<Pca9685Device<I2C>, DeviceConfigError> {
        let interface = Arc::new(Mutex::new(connect(config, i2c)?));

        let mut outputs = HashMap::with_capacity(config.outputs.len());
        let mut join_handles: Vec<JoinHandle<()>> = Vec::with_capacity(config.outputs.len());
        for (name, output) in &config.outputs {
            let (tx, rx) = mpsc::channel(1);
            let join_handle =
                spawn_pca_output_task(interface.clone(), output.channel, rx, cancel_token.clone());
            outputs.insert(name.to_string(), Pca9685PwmOutput { tx });
            join_handles.push(join_handle);
        }

        let join_handle = tokio::spawn(async move {
            join_all(join_handles).await;
            debug!("pca 9685 tasks all done!")
        });

        Ok(Pca9685Device {
            join_handle,
            outputs,
            interface,
        })
    }

    ///the interface shared with the output tasks. lock it around any get/set sequence.
    pub fn interface(&self) -> Arc<Mutex<Pca9685Interface<I2C>>> {
        self.interface.clone()
    }
}

pub struct Pca9685DeviceBuilder<I2C, F>
where
    I2C: I2c + Send + 'static,
    F: Fn(u8) -> Result<I2C, DeviceConfigError>,
{
    i2c_bus_provider: F,
}

impl<I2C, F> Pca9685DeviceBuilder<I2C, F>
where
    I2C: I2c + Send + 'static,
    F: Fn(u8) -> Result<I2C, DeviceConfigError>,
{
    pub fn new(i2c_bus_provider: F) -> Self {
        Pca9685DeviceBuilder { i2c_bus_provider }
    }

    pub fn connect(
        &self,
        cfg: &Pca9685DeviceConfig,
    ) -> Result<Pca9685Interface<I2C>, DeviceConfigError> {
        connect(cfg, (self.i2c_bus_provider)(cfg.i2c_bus)?)
    }

    pub fn try_build(
        &self,
        cfg: &Pca9685DeviceConfig,
        cancel_token: CancellationToken,
    ) -> Result<Pca9685Device<I2C>, DeviceConfigError> {
        Pca9685Device::build(cfg, (self.i2c_bus_provider)(cfg.i2c_bus)?, cancel_token)
    }
}
