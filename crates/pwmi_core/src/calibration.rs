///number of pwm output channels on the chip
pub const CHANNEL_COUNT: usize = 16;

///register address of LED0_ON_L. each channel owns 4 consecutive registers from here on.
pub const FIRST_CHANNEL_REGISTER: u8 = 0x06;

///default scale factor, maps inputs of 0..=1024 onto the 0..=4095 register domain
pub const DEFAULT_SCALE: f32 = 4.0;

///Per channel calibration used to map application pwm values onto register values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCalibration {
    base_register: u8,
    ///phase shift in input units. note that the scale factor is applied to it, so offset 4 with scale 4 shifts by 16 counts
    pub phase_offset: i32,
    ///always > 0
    pub scale_factor: f32,
}

impl ChannelCalibration {
    fn for_channel(channel: usize) -> Self {
        Self {
            base_register: (4 * channel) as u8 + FIRST_CHANNEL_REGISTER,
            phase_offset: 0,
            scale_factor: DEFAULT_SCALE,
        }
    }

    ///first of the four registers [ON_L, ON_H, OFF_L, OFF_H] of this channel
    pub fn base_register(&self) -> u8 {
        self.base_register
    }

    ///largest input value that still maps inside the register domain, floor(4096 / scale)
    pub fn ceiling(&self) -> i32 {
        (4096.0 / self.scale_factor).floor() as i32
    }
}

///Calibration for every channel, indexed by channel number.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    channels: [ChannelCalibration; CHANNEL_COUNT],
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationTable {
    ///a table with every channel at its default calibration
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(ChannelCalibration::for_channel),
        }
    }

    ///puts every channel back to offset 0 and the default scale. base registers never change.
    pub fn initialize(&mut self) {
        for (channel, cal) in self.channels.iter_mut().enumerate() {
            *cal = ChannelCalibration::for_channel(channel);
        }
    }

    pub fn get(&self, channel: usize) -> Option<&ChannelCalibration> {
        self.channels.get(channel)
    }

    ///Overwrite offset and scale of one channel. Nothing is changed if either argument is rejected.
    pub fn configure(
        &mut self,
        channel: usize,
        offset: i32,
        scale: f32,
    ) -> Result<(), CalibrationError> {
        let cal = self
            .channels
            .get_mut(channel)
            .ok_or(CalibrationError::InvalidChannel(channel))?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CalibrationError::InvalidScale(scale));
        }
        cal.phase_offset = offset;
        cal.scale_factor = scale;
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelCalibration> {
        self.channels.iter()
    }
}

///Reasons `CalibrationTable::configure` can refuse an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationError {
    InvalidChannel(usize),
    InvalidScale(f32),
}
