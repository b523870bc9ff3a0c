use pwmi_devices::{
    error::DeviceConfigError,
    pca9685::{Pca9685Device, Pca9685DeviceBuilder},
};
use rppal::i2c::I2c;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    command::{parse_output_line, Command},
    config::PwmiConfig,
};

//rpi (for i2c source)
fn i2c_bus_provider(bus: u8) -> Result<I2c, DeviceConfigError> {
    I2c::with_bus(bus).map_err(|err| {
        DeviceConfigError::new(format!("could not open i2c bus {}: {}", bus, err))
    })
}

fn resolve_all<'a>(
    config: &PwmiConfig,
    keys: impl IntoIterator<Item = &'a String>,
) -> Result<Vec<usize>, DeviceConfigError> {
    let mut channels = Vec::new();
    let mut errs = Vec::new();
    for key in keys {
        match config.resolve_channel(key) {
            Some(channel) => channels.push(channel),
            None => errs.push(DeviceConfigError::new(format!("unknown output '{}'", key))),
        }
    }
    if errs.is_empty() {
        Ok(channels)
    } else {
        Err(DeviceConfigError::from_errs(errs))
    }
}

pub async fn execute(command: Command, config: &PwmiConfig) -> Result<(), DeviceConfigError> {
    let builder = Pca9685DeviceBuilder::new(i2c_bus_provider);
    match command {
        Command::Set(assignments) => {
            let channels = resolve_all(config, assignments.iter().map(|(key, _)| key))?;
            let values: Vec<i32> = assignments.iter().map(|(_, value)| *value).collect();
            let mut pwm = builder.connect(&config.device)?;
            pwm.set_channels(&channels, &values)?;
            info!("set {} channel(s)", channels.len());
        }
        Command::Get(keys) => {
            let channels = resolve_all(config, &keys)?;
            let mut values = vec![0i32; channels.len()];
            let mut pwm = builder.connect(&config.device)?;
            pwm.get_channels(&channels, &mut values)?;
            for (key, value) in keys.iter().zip(values) {
                println!("{} {}", key, value);
            }
        }
        Command::Reset => {
            let mut pwm = builder.connect(&config.device)?;
            pwm.reset()?;
        }
        Command::Run => {
            let cancel_token = CancellationToken::new();
            let device = builder.try_build(&config.device, cancel_token.clone())?;
            info!("{} output(s) ready, reading '<output> <value>' lines", device.outputs.len());
            forward_stdin(&device).await;
            cancel_token.cancel();
            if let Err(err) = device.join_handle.await {
                error!("pwm output tasks did not shut down cleanly: {}", err);
            }
        }
    }
    Ok(())
}

async fn forward_stdin(device: &Pca9685Device<I2c>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("got ctrl-c, shutting down");
                break;
            }
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match parse_output_line(&line) {
                Ok((name, value)) => match device.outputs.get(name) {
                    Some(output) => {
                        if let Err(err) = output.sink().send(value).await {
                            warn!("output '{}' is not running: {}", name, err);
                        }
                    }
                    None => warn!("no output named '{}'", name),
                },
                Err(msg) => warn!("{}", msg),
            },
            Ok(None) => {
                debug!("end of input");
                break;
            }
            Err(err) => {
                error!("error reading stdin: {}", err);
                break;
            }
        }
    }
}
