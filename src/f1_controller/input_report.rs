use super::controls::{
    AnalogChannel, AnalogKind, ButtonId, ControlButton, MatrixPos, SpecialButton, StopButton,
};
use super::error::DecodeError;

pub const INPUT_REPORT_SIZE: usize = 22;
pub const INPUT_REPORT_ID: u8 = 0x01;

const MATRIX_BYTE: usize = 1;
const SPECIAL_BYTE: usize = 3;
const STOP_AND_CONTROL_BYTE: usize = 4;
const WHEEL_BYTE: usize = 5;
const KNOB_BYTE: usize = 6;
const FADER_BYTE: usize = 14;
const ANALOG_STRIDE: usize = 2;
const CONTROL_FIRST_BIT: usize = 3;
const MASK_12BIT: u16 = 0x0FFF;

/// A validated 22-byte input report.
///
/// Decoding checks the length and report id; every accessor afterwards is a
/// pure read of the stored bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputReport {
    bytes: [u8; INPUT_REPORT_SIZE],
}

impl InputReport {
    /// Parse a report from the raw transport buffer. Trailing bytes past the
    /// fixed report size are ignored.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        if buf.len() < INPUT_REPORT_SIZE {
            return Err(DecodeError::TooShort {
                len: buf.len(),
                expected: INPUT_REPORT_SIZE,
            });
        }
        if buf[0] != INPUT_REPORT_ID {
            return Err(DecodeError::BadReportId {
                found: buf[0],
                expected: INPUT_REPORT_ID,
            });
        }

        let mut bytes = [0u8; INPUT_REPORT_SIZE];
        bytes.copy_from_slice(&buf[..INPUT_REPORT_SIZE]);
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; INPUT_REPORT_SIZE] {
        &self.bytes
    }

    /// Rows 0/1 live in byte 1, rows 2/3 in byte 2. Even rows take the upper
    /// nibble; within a nibble column 0 is the most significant bit.
    pub fn is_matrix_pressed(&self, pos: MatrixPos) -> bool {
        let row = pos.row() as usize;
        let nibble_shift = if row % 2 == 0 { 4 } else { 0 };
        let mask = (0x01u8 << (3 - pos.col())) << nibble_shift;
        self.bytes[MATRIX_BYTE + row / 2] & mask != 0
    }

    pub fn is_stop_pressed(&self, stop: StopButton) -> bool {
        self.bit(STOP_AND_CONTROL_BYTE, 7 - stop.index())
    }

    pub fn is_special_pressed(&self, button: SpecialButton) -> bool {
        self.bit(SPECIAL_BYTE, 7 - button.index())
    }

    /// Control buttons share byte 4 with the stop buttons, below them.
    pub fn is_control_pressed(&self, button: ControlButton) -> bool {
        self.bit(STOP_AND_CONTROL_BYTE, CONTROL_FIRST_BIT - button.index())
    }

    pub fn is_pressed(&self, id: ButtonId) -> bool {
        match id {
            ButtonId::Matrix(pos) => self.is_matrix_pressed(pos),
            ButtonId::Stop(stop) => self.is_stop_pressed(stop),
            ButtonId::Special(button) => self.is_special_pressed(button),
            ButtonId::Control(button) => self.is_control_pressed(button),
        }
    }

    pub fn raw_knob(&self, index: usize) -> u16 {
        self.analog_at(KNOB_BYTE + index * ANALOG_STRIDE)
    }

    pub fn raw_fader(&self, index: usize) -> u16 {
        self.analog_at(FADER_BYTE + index * ANALOG_STRIDE)
    }

    pub fn raw_analog(&self, channel: AnalogChannel) -> u16 {
        match channel.kind() {
            AnalogKind::Knob => self.raw_knob(channel.index()),
            AnalogKind::Fader => self.raw_fader(channel.index()),
        }
    }

    /// Free-running selector wheel counter.
    pub fn wheel_position(&self) -> u8 {
        self.bytes[WHEEL_BYTE]
    }

    fn bit(&self, byte: usize, bit: usize) -> bool {
        self.bytes[byte] & (1u8 << bit) != 0
    }

    fn analog_at(&self, lsb: usize) -> u16 {
        // The device leaves the upper nibble clear; mask it anyway.
        u16::from_le_bytes([self.bytes[lsb], self.bytes[lsb + 1]]) & MASK_12BIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank() -> [u8; INPUT_REPORT_SIZE] {
        let mut buf = [0u8; INPUT_REPORT_SIZE];
        buf[0] = INPUT_REPORT_ID;
        buf
    }

    fn pressed_buttons(report: &InputReport) -> usize {
        ButtonId::all().filter(|id| report.is_pressed(*id)).count()
    }

    #[test]
    fn shift_bit_decodes_as_only_pressed_button() {
        let mut buf = blank();
        buf[3] = 0x80;
        let report = InputReport::decode(&buf).unwrap();

        assert!(report.is_special_pressed(SpecialButton::Shift));
        assert_eq!(pressed_buttons(&report), 1);
    }

    #[test]
    fn rejects_wrong_report_id_regardless_of_payload() {
        for id in [0x00, 0x02, 0x80, 0xFF] {
            let mut buf = [0xFFu8; INPUT_REPORT_SIZE];
            buf[0] = id;
            assert_eq!(
                InputReport::decode(&buf),
                Err(DecodeError::BadReportId {
                    found: id,
                    expected: INPUT_REPORT_ID
                })
            );
        }
    }

    #[test]
    fn rejects_truncated_report() {
        let buf = blank();
        assert_eq!(
            InputReport::decode(&buf[..21]),
            Err(DecodeError::TooShort {
                len: 21,
                expected: INPUT_REPORT_SIZE
            })
        );
        assert!(InputReport::decode(&[]).is_err());
    }

    #[test]
    fn ignores_trailing_bytes() {
        let mut buf = [0u8; 64];
        buf[0] = INPUT_REPORT_ID;
        buf[4] = 0x80;
        let report = InputReport::decode(&buf).unwrap();
        assert!(report.is_stop_pressed(StopButton::new(0).unwrap()));
    }

    #[test]
    fn matrix_bits_map_to_exactly_one_cell() {
        let expected = [
            (1, 0x80, (0, 0)),
            (1, 0x10, (0, 3)),
            (1, 0x08, (1, 0)),
            (1, 0x01, (1, 3)),
            (2, 0x40, (2, 1)),
            (2, 0x02, (3, 2)),
        ];
        for (byte, mask, (row, col)) in expected {
            let mut buf = blank();
            buf[byte] = mask;
            let report = InputReport::decode(&buf).unwrap();
            assert!(report.is_matrix_pressed(MatrixPos::new(row, col).unwrap()));
            assert_eq!(pressed_buttons(&report), 1, "byte {byte} mask {mask:#04x}");
        }
    }

    #[test]
    fn every_matrix_bit_is_distinct() {
        let mut buf = blank();
        buf[1] = 0xFF;
        buf[2] = 0xFF;
        let report = InputReport::decode(&buf).unwrap();
        assert!(MatrixPos::all().all(|p| report.is_matrix_pressed(p)));
    }

    #[test]
    fn stop_and_control_share_byte_four() {
        let mut buf = blank();
        buf[4] = 0b0100_1010;
        let report = InputReport::decode(&buf).unwrap();

        assert!(report.is_stop_pressed(StopButton::new(1).unwrap()));
        assert!(report.is_control_pressed(ControlButton::Sync));
        assert!(report.is_control_pressed(ControlButton::Capture));
        assert!(!report.is_control_pressed(ControlButton::Quant));
        assert_eq!(pressed_buttons(&report), 3);
    }

    #[test]
    fn special_buttons_are_msb_first() {
        let mut buf = blank();
        buf[3] = 0x04;
        let report = InputReport::decode(&buf).unwrap();
        assert!(report.is_special_pressed(SpecialButton::SelectorWheel));
        assert_eq!(pressed_buttons(&report), 1);
    }

    #[test]
    fn analog_values_are_little_endian_12bit() {
        let mut buf = blank();
        buf[6] = 0x34;
        buf[7] = 0x12;
        buf[12] = 0xFF;
        buf[13] = 0xFF;
        buf[20] = 0x01;
        buf[21] = 0x08;
        let report = InputReport::decode(&buf).unwrap();

        assert_eq!(report.raw_knob(0), 0x234);
        assert_eq!(report.raw_knob(3), 0xFFF);
        assert_eq!(report.raw_fader(3), 0x801);
        assert_eq!(report.raw_analog(AnalogChannel::fader(3).unwrap()), 0x801);
        assert_eq!(report.raw_fader(0), 0);
    }

    #[test]
    fn exposes_wheel_counter() {
        let mut buf = blank();
        buf[5] = 0x2A;
        assert_eq!(InputReport::decode(&buf).unwrap().wheel_position(), 0x2A);
    }
}
