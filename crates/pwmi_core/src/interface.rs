use tracing::{debug, info};

use crate::{
    calibration::{CalibrationError, CalibrationTable, ChannelCalibration},
    codec::{self, RegisterPayload},
    diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics},
    error::Error,
    transport::Transport,
};

///7 bit bus address of the board, 0x80 when written as an 8 bit write address
pub const DEFAULT_ADDRESS: u8 = 0x40;

pub const MODE1_REGISTER: u8 = 0x00;

///MODE1 with auto-increment and all-call enabled
pub const MODE1_AUTO_INCREMENT: u8 = 0x21;

///MODE1 with the restart bit set. returns the chip to its defaults, every output full off.
pub const MODE1_RESTART: u8 = 0xA1;

///written in place of a value by `get_channels` when a channel is invalid
pub const INVALID_CHANNEL_VALUE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Probing,
    Configured,
    ///the probe got no answer. calibration is usable but every transfer will fail.
    DeviceAbsent,
}

///Drives the 16 pwm outputs of one PCA9685.
///
/// Holds the calibration of every channel and nothing else: register values are read from and written to the chip
/// on every call. Not synchronized. Callers that share an interface between threads wrap it in a mutex.
pub struct PwmInterface<T, D = TracingDiagnostics> {
    transport: T,
    diagnostics: D,
    address: u8,
    calibration: CalibrationTable,
    state: LifecycleState,
}

impl<T: Transport> PwmInterface<T> {
    pub fn new(transport: T, address: u8) -> Self {
        Self::with_diagnostics(transport, address, TracingDiagnostics)
    }
}

impl<T, D> PwmInterface<T, D>
where
    T: Transport,
    D: Diagnostics,
{
    pub fn with_diagnostics(transport: T, address: u8, diagnostics: D) -> Self {
        Self {
            transport,
            diagnostics,
            address,
            calibration: CalibrationTable::new(),
            state: LifecycleState::Uninitialized,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn calibration(&self) -> &CalibrationTable {
        &self.calibration
    }

    ///give back the transport, e.g. to close the bus
    pub fn release(self) -> T {
        self.transport
    }

    ///Open the bus, check the board answers, reset the calibration table and enable auto-increment.
    ///
    /// A missing board is reported and returned as `DeviceNotFound`, but the calibration table is still set up so
    /// the interface can keep running degraded.
    pub fn initialize(&mut self) -> Result<(), Error<T::Error>> {
        self.state = LifecycleState::Probing;
        if let Err(err) = self.transport.open_connection() {
            self.state = LifecycleState::Uninitialized;
            return Err(Error::Transport(err));
        }

        let present = match self.transport.probe_device(self.address, MODE1_REGISTER) {
            Ok(present) => present,
            Err(err) => {
                self.state = LifecycleState::Uninitialized;
                return Err(Error::Transport(err));
            }
        };

        self.calibration.initialize();

        if !present {
            self.diagnostics.report(&Diagnostic::DeviceNotFound {
                address: self.address,
            });
            self.state = LifecycleState::DeviceAbsent;
            return Err(Error::DeviceNotFound(self.address));
        }

        self.transport
            .write_registers(self.address, MODE1_REGISTER, &[MODE1_AUTO_INCREMENT])
            .map_err(Error::Transport)?;
        self.state = LifecycleState::Configured;
        debug!("PCA9685 at {:#04x} configured", self.address);
        Ok(())
    }

    ///Restart the chip. Every output goes full off, calibration and lifecycle state are kept.
    pub fn reset(&mut self) -> Result<(), Error<T::Error>> {
        self.transport
            .write_registers(self.address, MODE1_REGISTER, &[MODE1_RESTART])
            .map_err(Error::Transport)?;
        info!("PCA9685 at {:#04x} reset, all outputs off", self.address);
        Ok(())
    }

    ///Set the phase offset and scale factor of one channel.
    pub fn configure(
        &mut self,
        channel: usize,
        offset: i32,
        scale: f32,
    ) -> Result<(), Error<T::Error>> {
        match self.calibration.configure(channel, offset, scale) {
            Ok(()) => Ok(()),
            Err(CalibrationError::InvalidChannel(channel)) => {
                Err(self.invalid_channel("configure", channel))
            }
            Err(CalibrationError::InvalidScale(scale)) => {
                self.diagnostics
                    .report(&Diagnostic::InvalidScale { channel, scale });
                Err(Error::InvalidScale(scale))
            }
        }
    }

    pub fn set_channel(&mut self, channel: usize, pwm_value: i32) -> Result<(), Error<T::Error>> {
        let cal = self.channel_calibration("set_channel", channel)?;
        let payload = codec::encode(pwm_value, &cal);
        self.transport
            .write_registers(self.address, cal.base_register(), payload.as_bytes())
            .map_err(Error::Transport)
    }

    pub fn get_channel(&mut self, channel: usize) -> Result<i32, Error<T::Error>> {
        let cal = self.channel_calibration("get_channel", channel)?;
        let payload = self.read_payload_at(cal.base_register())?;
        Ok(codec::decode(&payload, &cal))
    }

    ///raw register content of a channel
    pub fn read_payload(&mut self, channel: usize) -> Result<RegisterPayload, Error<T::Error>> {
        let cal = self.channel_calibration("read_payload", channel)?;
        self.read_payload_at(cal.base_register())
    }

    ///Set each channel to the value at the same index, in order.
    ///
    /// Invalid channels are reported and skipped. A transport error stops the batch, earlier writes stay applied.
    pub fn set_channels(
        &mut self,
        channels: &[usize],
        pwm_values: &[i32],
    ) -> Result<(), Error<T::Error>> {
        self.check_lengths("set_channels", channels.len(), pwm_values.len())?;
        for (&channel, &value) in channels.iter().zip(pwm_values) {
            match self.set_channel(channel, value) {
                Ok(()) | Err(Error::InvalidChannel(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    ///Read each channel into the slot at the same index of `pwm_values`.
    ///
    /// Invalid channels are reported and read as `INVALID_CHANNEL_VALUE`. A transport error stops the batch.
    pub fn get_channels(
        &mut self,
        channels: &[usize],
        pwm_values: &mut [i32],
    ) -> Result<(), Error<T::Error>> {
        self.check_lengths("get_channels", channels.len(), pwm_values.len())?;
        for (&channel, slot) in channels.iter().zip(pwm_values.iter_mut()) {
            *slot = match self.get_channel(channel) {
                Ok(value) => value,
                Err(Error::InvalidChannel(_)) => INVALID_CHANNEL_VALUE,
                Err(err) => return Err(err),
            };
        }
        Ok(())
    }

    fn channel_calibration(
        &self,
        operation: &'static str,
        channel: usize,
    ) -> Result<ChannelCalibration, Error<T::Error>> {
        match self.calibration.get(channel) {
            Some(cal) => Ok(*cal),
            None => Err(self.invalid_channel(operation, channel)),
        }
    }

    fn invalid_channel(&self, operation: &'static str, channel: usize) -> Error<T::Error> {
        self.diagnostics
            .report(&Diagnostic::InvalidChannel { operation, channel });
        Error::InvalidChannel(channel)
    }

    fn check_lengths(
        &self,
        operation: &'static str,
        channels: usize,
        values: usize,
    ) -> Result<(), Error<T::Error>> {
        if channels == values {
            Ok(())
        } else {
            self.diagnostics.report(&Diagnostic::LengthMismatch {
                operation,
                channels,
                values,
            });
            Err(Error::LengthMismatch { channels, values })
        }
    }

    fn read_payload_at(&mut self, base_register: u8) -> Result<RegisterPayload, Error<T::Error>> {
        let mut bytes = [0u8; 4];
        for (register, byte) in (base_register..).zip(bytes.iter_mut()) {
            *byte = self
                .transport
                .read_register(self.address, register)
                .map_err(Error::Transport)?;
        }
        Ok(RegisterPayload(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Open,
        Probe(u8, u8),
        Write(u8, u8, Vec<u8>),
        Read(u8, u8),
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct BusFault;

    //register file of a PCA9685 that logs every transfer
    struct FakeChip {
        present: bool,
        fail: bool,
        registers: [u8; 256],
        calls: Vec<Call>,
    }

    impl FakeChip {
        fn new() -> Self {
            let mut chip = FakeChip {
                present: true,
                fail: false,
                registers: [0u8; 256],
                calls: Vec::new(),
            };
            chip.restart();
            chip
        }

        fn restart(&mut self) {
            for channel in 0..16 {
                let base = 6 + 4 * channel;
                self.registers[base..base + 4].copy_from_slice(&RegisterPayload::FULL_OFF.0);
            }
        }

        fn writes(&self) -> Vec<Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Write(..)))
                .cloned()
                .collect()
        }
    }

    impl Transport for FakeChip {
        type Error = BusFault;

        fn open_connection(&mut self) -> Result<(), BusFault> {
            self.calls.push(Call::Open);
            Ok(())
        }

        fn probe_device(&mut self, address: u8, register: u8) -> Result<bool, BusFault> {
            self.calls.push(Call::Probe(address, register));
            Ok(self.present)
        }

        fn write_registers(&mut self, address: u8, start: u8, bytes: &[u8]) -> Result<(), BusFault> {
            self.calls.push(Call::Write(address, start, bytes.to_vec()));
            if self.fail || !self.present {
                return Err(BusFault);
            }
            if start == MODE1_REGISTER && bytes == [MODE1_RESTART] {
                self.restart();
            } else {
                let start = start as usize;
                self.registers[start..start + bytes.len()].copy_from_slice(bytes);
            }
            Ok(())
        }

        fn read_register(&mut self, address: u8, register: u8) -> Result<u8, BusFault> {
            self.calls.push(Call::Read(address, register));
            if self.fail || !self.present {
                return Err(BusFault);
            }
            Ok(self.registers[register as usize])
        }
    }

    #[derive(Default)]
    struct Recorder {
        reported: RefCell<Vec<Diagnostic>>,
    }

    impl Diagnostics for Recorder {
        fn report(&self, diagnostic: &Diagnostic) {
            self.reported.borrow_mut().push(diagnostic.clone());
        }
    }

    fn ready<'a>(
        chip: &'a mut FakeChip,
        recorder: &'a Recorder,
    ) -> PwmInterface<&'a mut FakeChip, &'a Recorder> {
        let mut pwm = PwmInterface::with_diagnostics(chip, DEFAULT_ADDRESS, recorder);
        pwm.initialize().unwrap();
        pwm
    }

    #[test]
    fn initialize_probes_then_enables_auto_increment() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let pwm = ready(&mut chip, &recorder);
        assert_eq!(pwm.state(), LifecycleState::Configured);
        assert_eq!(pwm.address(), 0x40);
        let chip = pwm.release();

        assert_eq!(
            chip.calls,
            vec![
                Call::Open,
                Call::Probe(0x40, 0x00),
                Call::Write(0x40, 0x00, vec![0x21]),
            ]
        );
        assert!(recorder.reported.borrow().is_empty());
    }

    #[test]
    fn missing_device_is_reported_not_fatal() {
        let mut chip = FakeChip::new();
        chip.present = false;
        let recorder = Recorder::default();
        let mut pwm = PwmInterface::with_diagnostics(&mut chip, DEFAULT_ADDRESS, &recorder);

        assert!(matches!(pwm.initialize(), Err(Error::DeviceNotFound(0x40))));
        assert_eq!(pwm.state(), LifecycleState::DeviceAbsent);
        assert_eq!(pwm.calibration().get(3).unwrap().base_register(), 18);
        //degraded: transfers fail at the transport
        assert!(matches!(pwm.set_channel(0, 10), Err(Error::Transport(BusFault))));
        drop(pwm);

        assert_eq!(
            *recorder.reported.borrow(),
            vec![Diagnostic::DeviceNotFound { address: 0x40 }]
        );
        assert!(!chip.calls.contains(&Call::Write(0x40, 0x00, vec![0x21])));
    }

    #[test]
    fn set_channel_writes_four_bytes_at_base_register() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);
        pwm.set_channel(0, 512).unwrap();
        pwm.set_channel(15, 1).unwrap();
        pwm.set_channel(3, 1024).unwrap();
        pwm.set_channel(4, 0).unwrap();
        drop(pwm);

        assert_eq!(
            chip.writes()[1..],
            [
                Call::Write(0x40, 6, vec![0x00, 0x08, 0x00, 0x00]),
                Call::Write(0x40, 66, vec![0xFC, 0x0F, 0x00, 0x00]),
                Call::Write(0x40, 18, vec![0x00, 0x10, 0x00, 0x00]),
                Call::Write(0x40, 22, vec![0x00, 0x00, 0x00, 0x10]),
            ]
        );
    }

    #[test]
    fn set_then_get() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);
        pwm.configure(2, 0, 2.0).unwrap();

        for (channel, value) in [(0, 700), (2, 1500), (9, 2)] {
            pwm.set_channel(channel, value).unwrap();
            assert_eq!(pwm.get_channel(channel).unwrap(), value);
        }
        pwm.set_channel(5, 2000).unwrap();
        assert_eq!(pwm.get_channel(5).unwrap(), 1024);
    }

    #[test]
    fn get_channel_reads_the_four_channel_registers() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);
        pwm.get_channel(1).unwrap();
        drop(pwm);

        assert_eq!(
            chip.calls[3..],
            [
                Call::Read(0x40, 10),
                Call::Read(0x40, 11),
                Call::Read(0x40, 12),
                Call::Read(0x40, 13),
            ]
        );
    }

    #[test]
    fn invalid_channel_does_not_touch_the_bus() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);

        assert!(matches!(pwm.get_channel(16), Err(Error::InvalidChannel(16))));
        assert!(matches!(pwm.set_channel(16, 100), Err(Error::InvalidChannel(16))));
        let mut out = [0i32; 1];
        pwm.get_channels(&[16], &mut out).unwrap();
        assert_eq!(out, [INVALID_CHANNEL_VALUE]);
        drop(pwm);

        assert_eq!(chip.calls.len(), 3);
        assert_eq!(recorder.reported.borrow().len(), 3);
        assert_eq!(
            recorder.reported.borrow()[0],
            Diagnostic::InvalidChannel {
                operation: "get_channel",
                channel: 16
            }
        );
    }

    #[test]
    fn configure_rejects_and_reports() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);

        assert!(matches!(pwm.configure(20, 0, 4.0), Err(Error::InvalidChannel(20))));
        assert!(matches!(pwm.configure(1, 0, 0.0), Err(Error::InvalidScale(_))));
        assert!(matches!(pwm.configure(1, 0, -1.0), Err(Error::InvalidScale(_))));
        assert_eq!(pwm.calibration().get(1).unwrap().scale_factor, 4.0);
        drop(pwm);

        assert_eq!(
            recorder.reported.borrow()[1],
            Diagnostic::InvalidScale {
                channel: 1,
                scale: 0.0
            }
        );
    }

    #[test]
    fn batch_set_matches_sequential_sets() {
        let mut batch_chip = FakeChip::new();
        let mut single_chip = FakeChip::new();
        let recorder = Recorder::default();

        let mut pwm = ready(&mut batch_chip, &recorder);
        pwm.set_channels(&[2, 5], &[1024, 0]).unwrap();
        drop(pwm);

        let mut pwm = ready(&mut single_chip, &recorder);
        pwm.set_channel(2, 1024).unwrap();
        pwm.set_channel(5, 0).unwrap();
        drop(pwm);

        assert_eq!(batch_chip.calls, single_chip.calls);
        assert_eq!(
            batch_chip.writes()[1..],
            [
                Call::Write(0x40, 14, vec![0x00, 0x10, 0x00, 0x00]),
                Call::Write(0x40, 26, vec![0x00, 0x00, 0x00, 0x10]),
            ]
        );
    }

    #[test]
    fn batch_skips_invalid_channels() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);

        pwm.set_channels(&[1, 99, 3], &[100, 200, 300]).unwrap();
        let mut out = [0i32; 3];
        pwm.get_channels(&[3, 99, 1], &mut out).unwrap();
        assert_eq!(out, [300, INVALID_CHANNEL_VALUE, 100]);
    }

    #[test]
    fn batch_length_mismatch() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);

        assert!(matches!(
            pwm.set_channels(&[1, 2], &[5]),
            Err(Error::LengthMismatch {
                channels: 2,
                values: 1
            })
        ));
        let mut out = [0i32; 3];
        assert!(pwm.get_channels(&[1], &mut out).is_err());
        drop(pwm);
        assert_eq!(chip.writes().len(), 1);
    }

    #[test]
    fn transport_errors_stop_the_batch() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);
        pwm.transport.fail = true;

        let res = pwm.set_channels(&[0, 1, 2], &[1, 2, 3]);
        assert!(res.as_ref().is_err_and(|err| err.is_transport()));
        drop(pwm);
        //only the first channel was attempted
        assert_eq!(chip.writes().len(), 2);
        assert!(recorder.reported.borrow().is_empty());
    }

    #[test]
    fn reset_turns_every_channel_off() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = ready(&mut chip, &recorder);
        pwm.configure(4, 0, 8.0).unwrap();
        pwm.set_channels(&[0, 4, 15], &[1024, 300, 77]).unwrap();
        assert_eq!(pwm.get_channel(4).unwrap(), 300);

        pwm.reset().unwrap();
        let channels: Vec<usize> = (0..16).collect();
        let mut out = [1i32; 16];
        pwm.get_channels(&channels, &mut out).unwrap();
        assert_eq!(out, [0i32; 16]);
        assert_eq!(pwm.read_payload(4).unwrap(), RegisterPayload::FULL_OFF);
        //calibration survives the reset
        assert_eq!(pwm.calibration().get(4).unwrap().scale_factor, 8.0);

        pwm.set_channel(4, 300).unwrap();
        assert_eq!(pwm.get_channel(4).unwrap(), 300);
        drop(pwm);

        assert!(chip.calls.contains(&Call::Write(0x40, 0x00, vec![0xA1])));
    }

    #[test]
    fn reset_does_not_stand_in_for_initialize() {
        let mut chip = FakeChip::new();
        let recorder = Recorder::default();
        let mut pwm = PwmInterface::with_diagnostics(&mut chip, DEFAULT_ADDRESS, &recorder);

        pwm.reset().unwrap();
        assert_eq!(pwm.state(), LifecycleState::Uninitialized);

        pwm.initialize().unwrap();
        pwm.reset().unwrap();
        assert_eq!(pwm.state(), LifecycleState::Configured);
    }
}
