use embedded_hal::i2c::{Error as _, ErrorKind, I2c};
use pwmi_core::Transport;

///Register transfers for a PCA9685 over an already opened I2C bus.
pub struct I2cTransport<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> I2cTransport<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn destroy(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> Transport for I2cTransport<I2C> {
    type Error = I2C::Error;

    //the bus handle is opened by whoever hands it to us
    fn open_connection(&mut self) -> Result<(), I2C::Error> {
        Ok(())
    }

    fn probe_device(&mut self, address: u8, register: u8) -> Result<bool, I2C::Error> {
        let mut buffer = [0u8; 1];
        match self.i2c.write_read(address, &[register], &mut buffer) {
            Ok(()) => Ok(true),
            Err(err) if matches!(err.kind(), ErrorKind::NoAcknowledge(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn write_registers(
        &mut self,
        address: u8,
        start_register: u8,
        bytes: &[u8],
    ) -> Result<(), I2C::Error> {
        //register address first, auto-increment spreads the rest over the following registers
        let mut frame = Vec::with_capacity(bytes.len() + 1);
        frame.push(start_register);
        frame.extend_from_slice(bytes);
        self.i2c.write(address, &frame)
    }

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, I2C::Error> {
        let mut buffer = [0u8; 1];
        self.i2c.write_read(address, &[register], &mut buffer)?;
        Ok(buffer[0])
    }
}
