//!The bus the chip hangs off. Timeouts and retries, if any, are the business of the implementation.
use std::fmt::Debug;

pub trait Transport {
    type Error: Debug;

    ///bring up the bus connection
    fn open_connection(&mut self) -> Result<(), Self::Error>;

    ///Ok(false) when nothing answers at `address` when reading `register`
    fn probe_device(&mut self, address: u8, register: u8) -> Result<bool, Self::Error>;

    ///write `bytes` to consecutive registers starting at `start_register`. relies on the chip's auto-increment.
    fn write_registers(
        &mut self,
        address: u8,
        start_register: u8,
        bytes: &[u8],
    ) -> Result<(), Self::Error>;

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    type Error = T::Error;

    fn open_connection(&mut self) -> Result<(), Self::Error> {
        (**self).open_connection()
    }

    fn probe_device(&mut self, address: u8, register: u8) -> Result<bool, Self::Error> {
        (**self).probe_device(address, register)
    }

    fn write_registers(
        &mut self,
        address: u8,
        start_register: u8,
        bytes: &[u8],
    ) -> Result<(), Self::Error> {
        (**self).write_registers(address, start_register, bytes)
    }

    fn read_register(&mut self, address: u8, register: u8) -> Result<u8, Self::Error> {
        (**self).read_register(address, register)
    }
}
