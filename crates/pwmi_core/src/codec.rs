//!Mapping between application pwm values and the four ON/OFF registers of a PCA9685 channel.
//!
//! Each channel has two 12 bit trigger points between 0 and 4095: the ON point, where the output goes high, and
//! the OFF point, where it goes low. They are stored little endian over 4 registers [ON_L, ON_H, OFF_L, OFF_H].
//! The chip races if ON point == OFF point, so bit 4 of ON_H (full on) and bit 4 of OFF_H (full off) force the
//! output high or low instead. Full off wins when both are set.
//!
//! The OFF point is pinned to the phase offset and only the ON point moves. A higher pwm value gives a lower
//! ON point, e.g. pwm 1 with scale 4 is an ON point of 4092.
use crate::calibration::ChannelCalibration;

///counts per pwm period
pub const PERIOD_COUNTS: i32 = 4096;

///override flag in the high byte of a trigger point
pub const OVERRIDE_BIT: u8 = 0x10;

const POINT_MASK: u16 = 0x0FFF;

///Raw content of the 4 registers of one channel, in register order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterPayload(pub [u8; 4]);

impl RegisterPayload {
    pub const FULL_ON: RegisterPayload = RegisterPayload([0x00, OVERRIDE_BIT, 0x00, 0x00]);
    pub const FULL_OFF: RegisterPayload = RegisterPayload([0x00, 0x00, 0x00, OVERRIDE_BIT]);

    pub fn from_points(on_point: u16, off_point: u16) -> Self {
        let [on_l, on_h] = pack_point(on_point);
        let [off_l, off_h] = pack_point(off_point);
        RegisterPayload([on_l, on_h, off_l, off_h])
    }

    pub fn is_full_on(&self) -> bool {
        self.0[1] & OVERRIDE_BIT != 0
    }

    pub fn is_full_off(&self) -> bool {
        self.0[3] & OVERRIDE_BIT != 0
    }

    pub fn on_point(&self) -> u16 {
        unpack_point(self.0[0], self.0[1])
    }

    pub fn off_point(&self) -> u16 {
        unpack_point(self.0[2], self.0[3])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

///split a 12 bit point into [low, high]. bits above 11 are dropped so the override flag stays clear.
pub fn pack_point(point: u16) -> [u8; 2] {
    let point = point & POINT_MASK;
    [(point & 0xFF) as u8, (point >> 8) as u8]
}

///join [low, high] back into a 12 bit point, ignoring the override flag
pub fn unpack_point(low: u8, high: u8) -> u16 {
    ((low as u16) | ((high as u16) << 8)) & POINT_MASK
}

///Encode a pwm value for a channel.
///
/// Values at or below 0 give the full off payload, values that scale to 4096 or more give full on. Anything in
/// between becomes an ON/OFF pair. Points pushed outside the period by the phase offset wrap around it. A pair
/// that would put ON on top of OFF, e.g. the ceiling when 4096 is not a multiple of the scale, is sent as the
/// matching override instead.
pub fn encode(pwm_value: i32, cal: &ChannelCalibration) -> RegisterPayload {
    let scale = cal.scale_factor;
    //full off is tested first so it wins over full on
    if pwm_value <= 0 {
        RegisterPayload::FULL_OFF
    } else if pwm_value as f32 * scale >= PERIOD_COUNTS as f32 {
        RegisterPayload::FULL_ON
    } else {
        let inverted = cal.ceiling() - pwm_value;
        let on_point = (inverted.saturating_add(cal.phase_offset) as f32 * scale).floor() as i32;
        let off_point = unwrapped_off_point(cal);
        //ON must not land on OFF, the span decides which override takes its place
        match on_point.saturating_sub(off_point) {
            span if span <= 0 => RegisterPayload::FULL_ON,
            span if span >= PERIOD_COUNTS => RegisterPayload::FULL_OFF,
            _ => RegisterPayload::from_points(wrap_to_period(on_point), wrap_to_period(off_point)),
        }
    }
}

///Decode a channel's registers back into a pwm value. Full off reads as 0 and full on as the channel ceiling.
///
/// The ON point is unwrapped to the period that starts at the OFF point before it is inverted, so offsets that
/// pushed it past 4095 read back as written. The result always lies in 0..=ceiling.
pub fn decode(payload: &RegisterPayload, cal: &ChannelCalibration) -> i32 {
    if payload.is_full_off() {
        0
    } else if payload.is_full_on() {
        cal.ceiling()
    } else {
        let start = unwrapped_off_point(cal);
        let span = (payload.on_point() as i64 - start as i64).rem_euclid(PERIOD_COUNTS as i64) as i32;
        let raw = start.saturating_add(span) as f32;
        let inverted = raw / cal.scale_factor - cal.phase_offset as f32;
        ((cal.ceiling() as f32 - inverted).floor() as i32).clamp(0, cal.ceiling())
    }
}

//unwrapped OFF point of a channel
fn unwrapped_off_point(cal: &ChannelCalibration) -> i32 {
    (cal.phase_offset as f32 * cal.scale_factor).floor() as i32
}

fn wrap_to_period(point: i32) -> u16 {
    point.rem_euclid(PERIOD_COUNTS) as u16
}
