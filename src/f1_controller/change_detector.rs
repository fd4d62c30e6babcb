use std::time::{Duration, Instant};

use super::analog::normalize_12bit;
use super::controls::{AnalogChannel, AnalogKind, ButtonId, ANALOG_COUNT};
use super::input_report::InputReport;
use super::wheel::{Direction, WheelSample};

/// Timestamp used for controller events.
pub type Timestamp = Instant;

/// How long a fader has to sit still before its value is reported.
pub const FADER_QUIESCENCE: Duration = Duration::from_millis(50);

const BUTTON_COUNT: usize = 16 + 4 + 6 + 3;
const ANALOG_SLOTS: usize = ANALOG_COUNT as usize;

/// Classification for button state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEventKind {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    Button {
        id: ButtonId,
        kind: ButtonEventKind,
    },
    /// `value` is the normalized sample in `0.0..=127.0`; rounding is left to
    /// the consumer.
    Analog {
        channel: AnalogChannel,
        value: f32,
    },
    Wheel(Direction),
}

/// Everything decoded from the previous frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    buttons: [bool; BUTTON_COUNT],
    knobs: [Option<f32>; ANALOG_SLOTS],
    faders: [Option<f32>; ANALOG_SLOTS],
    wheel: WheelSample,
}

impl Default for FrameSnapshot {
    fn default() -> Self {
        Self {
            buttons: [false; BUTTON_COUNT],
            knobs: [None; ANALOG_SLOTS],
            faders: [None; ANALOG_SLOTS],
            wheel: WheelSample::new(),
        }
    }
}

impl FrameSnapshot {
    pub fn is_pressed(&self, id: ButtonId) -> bool {
        self.buttons[button_slot(id)]
    }

    /// Last normalized value seen for `channel`, if any frame has been decoded.
    pub fn analog(&self, channel: AnalogChannel) -> Option<f32> {
        match channel.kind() {
            AnalogKind::Knob => self.knobs[channel.index()],
            AnalogKind::Fader => self.faders[channel.index()],
        }
    }
}

fn button_slot(id: ButtonId) -> usize {
    match id {
        ButtonId::Matrix(pos) => pos.index(),
        ButtonId::Stop(stop) => 16 + stop.index(),
        ButtonId::Special(button) => 20 + button.index(),
        ButtonId::Control(button) => 26 + button.index(),
    }
}

/// Whole-step value the knob and fader policies compare on.
fn step(value: f32) -> i32 {
    value as i32
}

#[derive(Debug, Clone, Copy, Default)]
struct FaderGate {
    dirty: bool,
    last_change: Option<Timestamp>,
}

/// Turns successive input reports into edge and delta events.
///
/// Buttons report every transition. Knobs report every whole-step change.
/// Faders are coalesced: after a change, nothing is reported until the value
/// has been still for the quiescence window, then the settled value is
/// reported once. The previous frame is always replaced by the current one,
/// whether or not anything was emitted.
#[derive(Debug)]
pub struct ChangeDetector {
    snapshot: FrameSnapshot,
    faders: [FaderGate; ANALOG_SLOTS],
    quiescence: Duration,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(FADER_QUIESCENCE)
    }
}

impl ChangeDetector {
    pub fn new(quiescence: Duration) -> Self {
        Self {
            snapshot: FrameSnapshot::default(),
            faders: [FaderGate::default(); ANALOG_SLOTS],
            quiescence,
        }
    }

    pub fn snapshot(&self) -> &FrameSnapshot {
        &self.snapshot
    }

    /// Compare `report` against the previous frame and advance the snapshot.
    pub fn process(&mut self, report: &InputReport, now: Timestamp) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        self.handle_button_changes(report, &mut events);
        self.handle_knob_changes(report, &mut events);
        self.handle_fader_changes(report, now, &mut events);
        self.handle_wheel_changes(report, &mut events);
        events
    }

    /// Release faders whose quiescence window ran out on a poll where no
    /// report arrived. The device stops reporting once nothing moves, so a
    /// settled fader would otherwise wait for an unrelated frame.
    pub fn settle(&mut self, now: Timestamp) -> Vec<ControlEvent> {
        let mut events = Vec::new();
        for channel in AnalogChannel::all(AnalogKind::Fader) {
            if let Some(value) = self.snapshot.faders[channel.index()] {
                self.release_fader(channel, value, now, &mut events);
            }
        }
        events
    }

    fn handle_button_changes(&mut self, report: &InputReport, events: &mut Vec<ControlEvent>) {
        for id in ButtonId::all() {
            let slot = button_slot(id);
            let new = report.is_pressed(id);
            let old = self.snapshot.buttons[slot];
            self.snapshot.buttons[slot] = new;
            emit_button(events, id, new, old);
        }
    }

    fn handle_knob_changes(&mut self, report: &InputReport, events: &mut Vec<ControlEvent>) {
        for channel in AnalogChannel::all(AnalogKind::Knob) {
            let value = normalize_12bit(report.raw_analog(channel));
            let previous = self.snapshot.knobs[channel.index()].replace(value);
            if previous.map(step) != Some(step(value)) {
                events.push(ControlEvent::Analog { channel, value });
            }
        }
    }

    fn handle_fader_changes(
        &mut self,
        report: &InputReport,
        now: Timestamp,
        events: &mut Vec<ControlEvent>,
    ) {
        for channel in AnalogChannel::all(AnalogKind::Fader) {
            let value = normalize_12bit(report.raw_analog(channel));
            let previous = self.snapshot.faders[channel.index()].replace(value);
            if previous.map(step) != Some(step(value)) {
                let gate = &mut self.faders[channel.index()];
                gate.dirty = true;
                gate.last_change = Some(now);
            }
            self.release_fader(channel, value, now, events);
        }
    }

    fn release_fader(
        &mut self,
        channel: AnalogChannel,
        value: f32,
        now: Timestamp,
        events: &mut Vec<ControlEvent>,
    ) {
        let quiescence = self.quiescence;
        let gate = &mut self.faders[channel.index()];
        if !gate.dirty {
            return;
        }
        let settled = gate
            .last_change
            .map(|changed| now.saturating_duration_since(changed) >= quiescence)
            .unwrap_or(true);
        if settled {
            gate.dirty = false;
            events.push(ControlEvent::Analog { channel, value });
        }
    }

    fn handle_wheel_changes(&mut self, report: &InputReport, events: &mut Vec<ControlEvent>) {
        let direction = self.snapshot.wheel.update(report.wheel_position());
        if direction != Direction::None {
            events.push(ControlEvent::Wheel(direction));
        }
    }
}

fn emit_button(events: &mut Vec<ControlEvent>, id: ButtonId, new: bool, old: bool) {
    if new == old {
        return;
    }
    let kind = if new {
        ButtonEventKind::Pressed
    } else {
        ButtonEventKind::Released
    };
    events.push(ControlEvent::Button { id, kind });
}
