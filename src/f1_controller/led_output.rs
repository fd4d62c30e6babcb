use std::fmt::Write as _;

use super::color::{Color, Rgb};
use super::controls::{ButtonId, ButtonLed, MatrixPos, StopButton};
use super::error::{F1Error, Result};
use super::led_state::{LedIntent, LedStateStore};

pub const OUTPUT_REPORT_SIZE: usize = 81;
pub const OUTPUT_REPORT_ID: u8 = 0x80;

const SEGMENT_RIGHT_START: usize = 1;
const SEGMENT_LEFT_START: usize = 9;
const SPECIAL_START: usize = 17;
const CONTROL_START: usize = 22;
const MATRIX_START: usize = 25;
const STOP_START: usize = 73;
const BYTES_PER_CELL: usize = 3;

/// Largest value a hardware LED byte accepts.
pub const LED_MAX: u8 = 0x7F;

/// The persistent 81-byte LED report. Byte 0 is the report id; the
/// 7-segment bytes (1..17) belong to the display and are never written here.
#[derive(Clone, PartialEq, Eq)]
pub struct OutputBuffer {
    bytes: [u8; OUTPUT_REPORT_SIZE],
}

impl Default for OutputBuffer {
    fn default() -> Self {
        let mut bytes = [0u8; OUTPUT_REPORT_SIZE];
        bytes[0] = OUTPUT_REPORT_ID;
        Self { bytes }
    }
}

impl std::fmt::Debug for OutputBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&hex_dump(&self.bytes))
    }
}

impl OutputBuffer {
    pub fn as_bytes(&self) -> &[u8; OUTPUT_REPORT_SIZE] {
        &self.bytes
    }

    fn write(&mut self, offset: usize, values: &[u8]) {
        self.bytes[offset..offset + values.len()].copy_from_slice(values);
    }

    fn clear_leds(&mut self) {
        self.bytes[SPECIAL_START..].fill(0);
    }
}

fn clamp_brightness(brightness: f32) -> f32 {
    if brightness.is_nan() {
        0.0
    } else {
        brightness.clamp(0.0, 1.0)
    }
}

/// Scale an 8-bit channel into the 7-bit hardware range, dimmed by
/// `brightness`.
pub fn quantize(channel: u8, brightness: f32) -> u8 {
    let value = channel as f32 * 127.0 / 255.0 * clamp_brightness(brightness);
    value.round().clamp(0.0, LED_MAX as f32) as u8
}

fn matrix_offset(pos: MatrixPos) -> usize {
    MATRIX_START + pos.index() * BYTES_PER_CELL
}

fn button_offset(led: ButtonLed) -> usize {
    match led {
        ButtonLed::Browse => SPECIAL_START,
        ButtonLed::Size => SPECIAL_START + 1,
        ButtonLed::Type => SPECIAL_START + 2,
        ButtonLed::Reverse => SPECIAL_START + 3,
        ButtonLed::Shift => SPECIAL_START + 4,
        ButtonLed::Capture => CONTROL_START,
        ButtonLed::Quant => CONTROL_START + 1,
        ButtonLed::Sync => CONTROL_START + 2,
    }
}

/// Stop buttons are laid out right to left, right LED first.
fn stop_offsets(stop: StopButton) -> (usize, usize) {
    let left = STOP_START + 7 - stop.index() * 2;
    (left, left - 1)
}

/// Owner of the LED report and of the logical state behind it.
///
/// Setters only touch the bytes of the addressed LED and mark the buffer
/// dirty; sending it is a separate step (`F1Controller::flush_leds`).
#[derive(Debug, Default)]
pub struct LedOutput {
    buffer: OutputBuffer,
    states: LedStateStore,
    dirty: bool,
}

impl LedOutput {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }

    pub fn states(&self) -> &LedStateStore {
        &self.states
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Light a pad. The palette's RGB is written in the hardware's blue, red,
    /// green order.
    pub fn set_matrix_led(&mut self, pos: MatrixPos, color: Color, brightness: f32, record: bool) {
        let brightness = clamp_brightness(brightness);
        let Rgb { red, green, blue } = color.rgb();
        let brg = [
            quantize(blue, brightness),
            quantize(red, brightness),
            quantize(green, brightness),
        ];
        self.buffer.write(matrix_offset(pos), &brg);
        if record {
            self.states.record_matrix(pos, color, brightness);
        }
        self.dirty = true;
    }

    pub fn set_button_led(&mut self, led: ButtonLed, brightness: f32, record: bool) {
        let brightness = clamp_brightness(brightness);
        self.buffer
            .write(button_offset(led), &[quantize(u8::MAX, brightness)]);
        if record {
            self.states.record_mono(led.into(), brightness);
        }
        self.dirty = true;
    }

    /// Set both LEDs of a stop button.
    pub fn set_stop_led(&mut self, stop: StopButton, brightness: f32, record: bool) {
        let brightness = clamp_brightness(brightness);
        let value = quantize(u8::MAX, brightness);
        let (left, right) = stop_offsets(stop);
        self.buffer.write(left, &[value]);
        self.buffer.write(right, &[value]);
        if record {
            self.states.record_mono(ButtonId::Stop(stop), brightness);
        }
        self.dirty = true;
    }

    /// Apply `intent` to whatever LED `id` carries.
    ///
    /// Fails with `F1Error::NoLed` for the selector wheel push, or when a
    /// color intent targets a single-color LED.
    pub fn apply(&mut self, id: ButtonId, intent: LedIntent, record: bool) -> Result<()> {
        match (id, intent) {
            (ButtonId::Matrix(pos), LedIntent::Rgb { color, brightness }) => {
                self.set_matrix_led(pos, color, brightness, record)
            }
            (ButtonId::Matrix(pos), LedIntent::Mono { brightness }) => {
                self.set_matrix_led(pos, Color::White, brightness, record)
            }
            (ButtonId::Stop(stop), LedIntent::Mono { brightness }) => {
                self.set_stop_led(stop, brightness, record)
            }
            (other, LedIntent::Mono { brightness }) => {
                self.set_button_led(ButtonLed::try_from(other)?, brightness, record)
            }
            (other, LedIntent::Rgb { .. }) => {
                return Err(F1Error::NoLed(other));
            }
        }
        Ok(())
    }

    /// Put an LED back to its last recorded intent, e.g. after a transient
    /// highlight. The store is left unchanged.
    pub fn restore(&mut self, id: ButtonId) {
        let intent = self.states.get(id);
        if self.apply(id, intent, false).is_err() {
            log::trace!("{id:?} has no LED to restore");
        }
    }

    /// Turn every LED off and forget the recorded intents. The display
    /// bytes are left alone.
    pub fn clear_all(&mut self) {
        self.buffer.clear_leds();
        self.states.clear();
        self.dirty = true;
    }

    pub fn hex_dump(&self) -> String {
        hex_dump(self.buffer.as_bytes())
    }
}

fn hex_dump(bytes: &[u8; OUTPUT_REPORT_SIZE]) -> String {
    let regions = [
        ("report id", 0, SEGMENT_RIGHT_START),
        ("7-seg right", SEGMENT_RIGHT_START, SEGMENT_LEFT_START),
        ("7-seg left", SEGMENT_LEFT_START, SPECIAL_START),
        ("special", SPECIAL_START, CONTROL_START),
        ("control", CONTROL_START, MATRIX_START),
        ("matrix", MATRIX_START, STOP_START),
        ("stop", STOP_START, OUTPUT_REPORT_SIZE),
    ];
    let mut out = String::new();
    for (name, start, end) in regions {
        let _ = write!(out, "{name:>11} ({start:>2}-{:>2}):", end - 1);
        for byte in &bytes[start..end] {
            let _ = write!(out, " {byte:02x}");
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::f1_controller::controls::{ControlButton, SpecialButton};

    fn changed_bytes(before: &OutputBuffer, after: &OutputBuffer) -> Vec<usize> {
        (0..OUTPUT_REPORT_SIZE)
            .filter(|&i| before.as_bytes()[i] != after.as_bytes()[i])
            .collect()
    }

    #[test]
    fn starts_with_report_id_and_everything_off() {
        let leds = LedOutput::new();
        assert_eq!(leds.buffer().as_bytes()[0], OUTPUT_REPORT_ID);
        assert!(leds.buffer().as_bytes()[1..].iter().all(|b| *b == 0));
        assert!(leds.is_dirty());
    }

    #[test]
    fn red_pad_at_origin_is_brg_encoded() {
        let mut leds = LedOutput::new();
        let origin = MatrixPos::new(0, 0).unwrap();
        leds.set_matrix_led(origin, Color::Red, 1.0, true);

        assert_eq!(&leds.buffer().as_bytes()[25..28], &[0, 127, 0]);
        assert_eq!(
            leds.states().get(ButtonId::Matrix(origin)),
            LedIntent::Rgb {
                color: Color::Red,
                brightness: 1.0
            }
        );
    }

    #[test]
    fn matrix_cell_round_trips_every_palette_entry() {
        let pos = MatrixPos::new(2, 3).unwrap();
        let offset = 25 + 11 * 3;
        for color in Color::all() {
            let mut leds = LedOutput::new();
            leds.set_matrix_led(pos, color, 1.0, true);
            let rgb = color.rgb();
            let bytes = &leds.buffer().as_bytes()[offset..offset + 3];
            assert_eq!(
                bytes,
                &[
                    quantize(rgb.blue, 1.0),
                    quantize(rgb.red, 1.0),
                    quantize(rgb.green, 1.0)
                ]
            );
            assert_eq!(
                leds.states().get(ButtonId::Matrix(pos)),
                LedIntent::Rgb {
                    color,
                    brightness: 1.0
                }
            );
        }
    }

    #[test]
    fn quantize_scales_and_clamps() {
        assert_eq!(quantize(255, 1.0), 127);
        assert_eq!(quantize(255, 0.5), 64);
        assert_eq!(quantize(0, 1.0), 0);
        assert_eq!(quantize(255, 3.0), 127);
        assert_eq!(quantize(255, -1.0), 0);
        assert_eq!(quantize(255, f32::NAN), 0);
        assert_eq!(quantize(97, 1.0), 48);
    }

    #[test]
    fn writes_touch_only_the_addressed_led() {
        let mut leds = LedOutput::new();
        for pos in MatrixPos::all() {
            let before = leds.buffer().clone();
            leds.set_matrix_led(pos, Color::White, 1.0, false);
            let offset = 25 + pos.index() * 3;
            assert_eq!(
                changed_bytes(&before, leds.buffer()),
                vec![offset, offset + 1, offset + 2]
            );
        }
        for led in ButtonLed::ALL {
            let before = leds.buffer().clone();
            leds.set_button_led(led, 1.0, false);
            assert_eq!(changed_bytes(&before, leds.buffer()).len(), 1);
        }
        for stop in StopButton::all() {
            let before = leds.buffer().clone();
            leds.set_stop_led(stop, 1.0, false);
            assert_eq!(changed_bytes(&before, leds.buffer()).len(), 2);
        }
        assert!(leds.buffer().as_bytes()[1..17].iter().all(|b| *b == 0));
        assert!(leds.buffer().as_bytes()[17..].iter().all(|b| *b == LED_MAX));
    }

    #[test]
    fn stop_buttons_run_right_to_left() {
        let mut leds = LedOutput::new();
        leds.set_stop_led(StopButton::new(0).unwrap(), 1.0, false);
        assert_eq!(&leds.buffer().as_bytes()[79..81], &[127, 127]);

        leds.set_stop_led(StopButton::new(3).unwrap(), 0.5, false);
        assert_eq!(&leds.buffer().as_bytes()[73..75], &[64, 64]);
    }

    #[test]
    fn single_leds_use_fixed_offsets() {
        let mut leds = LedOutput::new();
        leds.set_button_led(ButtonLed::Browse, 1.0, false);
        leds.set_button_led(ButtonLed::Shift, 1.0, false);
        leds.set_button_led(ButtonLed::Capture, 1.0, false);
        leds.set_button_led(ButtonLed::Sync, 1.0, false);
        let bytes = leds.buffer().as_bytes();
        assert_eq!(bytes[17], 127);
        assert_eq!(bytes[21], 127);
        assert_eq!(bytes[22], 127);
        assert_eq!(bytes[24], 127);
        assert_eq!(bytes[23], 0);
    }

    #[test]
    fn recording_is_opt_in() {
        let mut leds = LedOutput::new();
        let stop = StopButton::new(1).unwrap();
        leds.set_stop_led(stop, 0.7, true);
        leds.set_stop_led(stop, 0.1, false);
        assert_eq!(leds.states().get(ButtonId::Stop(stop)).brightness(), 0.7);

        leds.set_button_led(ButtonLed::Quant, 2.0, true);
        let quant = ButtonId::Control(ControlButton::Quant);
        assert_eq!(leds.states().get(quant).brightness(), 1.0);
    }

    #[test]
    fn restore_reapplies_recorded_intent() {
        let mut leds = LedOutput::new();
        let pos = MatrixPos::new(1, 1).unwrap();
        leds.set_matrix_led(pos, Color::Violet, 0.4, true);
        let recorded = leds.buffer().clone();

        leds.set_matrix_led(pos, Color::White, 1.0, false);
        assert_ne!(leds.buffer(), &recorded);

        leds.restore(ButtonId::Matrix(pos));
        assert_eq!(leds.buffer(), &recorded);

        // No LED behind the wheel push; restoring it is a no-op.
        let before = leds.buffer().clone();
        leds.restore(ButtonId::Special(SpecialButton::SelectorWheel));
        assert_eq!(leds.buffer(), &before);
    }

    #[test]
    fn apply_rejects_color_on_single_leds() {
        let mut leds = LedOutput::new();
        let intent = LedIntent::Rgb {
            color: Color::Red,
            brightness: 1.0,
        };
        assert!(leds
            .apply(ButtonId::Control(ControlButton::Sync), intent, true)
            .is_err());
        assert!(leds
            .apply(
                ButtonId::Special(SpecialButton::Reverse),
                LedIntent::Mono { brightness: 1.0 },
                true
            )
            .is_ok());
        assert_eq!(leds.buffer().as_bytes()[20], 127);
    }

    #[test]
    fn clear_all_keeps_id_and_display() {
        let mut leds = LedOutput::new();
        leds.buffer.write(1, &[0x3f; 16]);
        leds.set_matrix_led(MatrixPos::new(3, 3).unwrap(), Color::Cyan, 1.0, true);
        leds.set_button_led(ButtonLed::Size, 1.0, true);
        leds.mark_clean();

        leds.clear_all();

        let bytes = leds.buffer().as_bytes();
        assert_eq!(bytes[0], OUTPUT_REPORT_ID);
        assert!(bytes[1..17].iter().all(|b| *b == 0x3f));
        assert!(bytes[17..].iter().all(|b| *b == 0));
        assert_eq!(leds.states().lit().count(), 0);
        assert!(leds.is_dirty());
    }

    #[test]
    fn hex_dump_lists_every_region() {
        let dump = LedOutput::new().hex_dump();
        assert_eq!(dump.lines().count(), 7);
        assert!(dump.starts_with("  report id ( 0- 0): 80"));
    }
}
