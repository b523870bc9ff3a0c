use std::fmt::{Debug, Display, Formatter};

pub struct DeviceConfigError {
    pub messages: Vec<String>,
}

impl DeviceConfigError {
    pub fn new(message: String) -> Self {
        Self {
            messages: vec![message],
        }
    }

    pub fn from_errs(errs: Vec<DeviceConfigError>) -> Self {
        Self {
            messages: errs.into_iter().flat_map(|err| err.messages).collect(),
        }
    }
}

impl Debug for DeviceConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.messages.as_slice() {
            [message] => f.write_fmt(format_args!("DeviceConfigError: {}", message)),
            messages => f.write_fmt(format_args!(
                "DeviceConfigError (multiple): \n{}",
                messages.join("\n")
            )),
        }
    }
}

impl Display for DeviceConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.messages.join("; "))
    }
}

impl std::error::Error for DeviceConfigError {}

impl<E> From<pwmi_core::Error<E>> for DeviceConfigError
where
    E: Debug,
{
    fn from(err: pwmi_core::Error<E>) -> DeviceConfigError {
        let message = match err {
            pwmi_core::Error::Transport(err) => {
                format!("Could not configure PCA9685 Device: {:?}", err)
            }
            other => format!("PCA9685: {}", other),
        };
        DeviceConfigError::new(message)
    }
}
