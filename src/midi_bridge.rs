use std::sync::mpsc::{self, Receiver};

use midir::{Ignore, MidiIO, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};
#[cfg(unix)]
use midir::os::unix::{VirtualInput, VirtualOutput};
use thiserror::Error;

use crate::config::MidiConfig;
use crate::f1_controller::{
    AnalogKind, ButtonEventKind, ButtonId, ControlButton, ControlEvent, Direction, MatrixPos,
    SpecialButton, StopButton,
};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const VELOCITY_ON: u8 = 127;
const VELOCITY_OFF: u8 = 0;
const VIRTUAL_OUT_NAME: &str = "F1_Controller_Out";
const VIRTUAL_IN_NAME: &str = "F1_Controller_In";
const PAGE_MIN: u8 = 1;
const PAGE_MAX: u8 = 99;

const MATRIX_NOTES: u8 = 16;
const STOP_NOTE_OFFSET: u8 = 0;
const SPECIAL_NOTE_OFFSET: u8 = 4;
const CONTROL_NOTE_OFFSET: u8 = 10;
const BUTTON_NOTES: u8 = 13;

#[derive(Debug, Error)]
pub enum MidiBridgeError {
    #[error("failed to initialise MIDI: {0}")]
    MidiInit(String),
    #[error("no MIDI port matching \"{0}\" was found")]
    PortNotFound(String),
    #[error("failed to open MIDI connection: {0}")]
    Connection(String),
    #[error("virtual MIDI ports are not available on this platform; set a port name")]
    VirtualPortUnsupported,
    #[error("failed to send MIDI message: {0}")]
    Send(#[from] midir::SendError),
}

/// Note and controller numbers used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMapping {
    channel: u8,
    matrix_note_base: u8,
    button_note_base: u8,
    knob_cc_base: u8,
    fader_cc_base: u8,
    wheel_cc: u8,
}

impl From<&MidiConfig> for MidiMapping {
    fn from(config: &MidiConfig) -> Self {
        Self {
            channel: config.channel & 0x0F,
            matrix_note_base: config.matrix_note_base,
            button_note_base: config.button_note_base,
            knob_cc_base: config.knob_cc_base,
            fader_cc_base: config.fader_cc_base,
            wheel_cc: config.wheel_cc,
        }
    }
}

/// An LED change requested by the host over MIDI. Velocity 0 means off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedFeedback {
    pub id: ButtonId,
    pub velocity: u8,
}

/// Effect page selected with the wheel, 1..=99.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WheelPage(u8);

impl Default for WheelPage {
    fn default() -> Self {
        WheelPage(PAGE_MIN)
    }
}

impl WheelPage {
    pub fn get(self) -> u8 {
        self.0
    }

    pub fn step(&mut self, direction: Direction) {
        self.0 = match direction {
            Direction::Clockwise => (self.0 + 1).min(PAGE_MAX),
            Direction::CounterClockwise => self.0.saturating_sub(1).max(PAGE_MIN),
            Direction::None => self.0,
        };
    }
}

impl MidiMapping {
    pub fn button_note(&self, id: ButtonId) -> u8 {
        let (base, offset) = match id {
            ButtonId::Matrix(pos) => (self.matrix_note_base, pos.index() as u8),
            ButtonId::Stop(stop) => (self.button_note_base, STOP_NOTE_OFFSET + stop.index() as u8),
            ButtonId::Special(button) => (
                self.button_note_base,
                SPECIAL_NOTE_OFFSET + button.index() as u8,
            ),
            ButtonId::Control(button) => (
                self.button_note_base,
                CONTROL_NOTE_OFFSET + button.index() as u8,
            ),
        };
        base.wrapping_add(offset) & 0x7F
    }

    pub fn button_for_note(&self, note: u8) -> Option<ButtonId> {
        let matrix = note.wrapping_sub(self.matrix_note_base);
        if matrix < MATRIX_NOTES {
            return MatrixPos::from_index(matrix).ok().map(ButtonId::Matrix);
        }
        let offset = note.wrapping_sub(self.button_note_base);
        if offset >= BUTTON_NOTES {
            return None;
        }
        if offset < SPECIAL_NOTE_OFFSET {
            StopButton::new(offset - STOP_NOTE_OFFSET)
                .ok()
                .map(ButtonId::Stop)
        } else if offset < CONTROL_NOTE_OFFSET {
            SpecialButton::from_index(offset - SPECIAL_NOTE_OFFSET)
                .ok()
                .map(ButtonId::Special)
        } else {
            ControlButton::from_index(offset - CONTROL_NOTE_OFFSET)
                .ok()
                .map(ButtonId::Control)
        }
    }

    /// Translate a control event into a MIDI message. Wheel events move
    /// `page` and send the new page number.
    pub fn encode(&self, event: &ControlEvent, page: &mut WheelPage) -> Option<[u8; 3]> {
        match *event {
            ControlEvent::Button { id, kind } => {
                let note = self.button_note(id);
                Some(match kind {
                    ButtonEventKind::Pressed => [NOTE_ON | self.channel, note, VELOCITY_ON],
                    ButtonEventKind::Released => [NOTE_OFF | self.channel, note, VELOCITY_OFF],
                })
            }
            ControlEvent::Analog { channel, value } => {
                let base = match channel.kind() {
                    AnalogKind::Knob => self.knob_cc_base,
                    AnalogKind::Fader => self.fader_cc_base,
                };
                let cc = base.wrapping_add(channel.index() as u8) & 0x7F;
                let value = (value as i32).clamp(0, 127) as u8;
                Some([CONTROL_CHANGE | self.channel, cc, value])
            }
            ControlEvent::Wheel(Direction::None) => None,
            ControlEvent::Wheel(direction) => {
                page.step(direction);
                Some([CONTROL_CHANGE | self.channel, self.wheel_cc, page.get()])
            }
        }
    }

    /// Parse an incoming message as LED feedback. Only note messages on the
    /// bridge's channel that hit a known button are accepted.
    pub fn decode_feedback(&self, message: &[u8]) -> Option<LedFeedback> {
        let [status, note, velocity] = *message else {
            return None;
        };
        if status & 0x0F != self.channel {
            return None;
        }
        let velocity = match status & 0xF0 {
            NOTE_ON => velocity & 0x7F,
            NOTE_OFF => VELOCITY_OFF,
            _ => return None,
        };
        let id = self.button_for_note(note)?;
        Some(LedFeedback { id, velocity })
    }
}

fn find_port<T: MidiIO>(io: &T, hint: &str) -> Result<(T::Port, String), MidiBridgeError> {
    let hint_lower = hint.to_lowercase();
    io.ports()
        .into_iter()
        .find_map(|port| {
            let name = io.port_name(&port).ok()?;
            name.to_lowercase()
                .contains(&hint_lower)
                .then_some((port, name))
        })
        .ok_or_else(|| MidiBridgeError::PortNotFound(hint.to_string()))
}

/// Sends decoded controller events to the host.
pub struct MidiBridge {
    connection: MidiOutputConnection,
    port_name: String,
    mapping: MidiMapping,
    page: WheelPage,
}

impl MidiBridge {
    pub fn connect(config: &MidiConfig) -> Result<Self, MidiBridgeError> {
        let midi_out = MidiOutput::new(&config.client_name)
            .map_err(|err| MidiBridgeError::MidiInit(err.to_string()))?;

        let (connection, port_name) = if config.output_port.trim().is_empty() {
            (create_virtual_output(midi_out)?, VIRTUAL_OUT_NAME.to_string())
        } else {
            let (port, name) = find_port(&midi_out, config.output_port.trim())?;
            let connection = midi_out
                .connect(&port, VIRTUAL_OUT_NAME)
                .map_err(|err| MidiBridgeError::Connection(err.to_string()))?;
            (connection, name)
        };

        log::info!("sending MIDI to {port_name}");
        Ok(Self {
            connection,
            port_name,
            mapping: MidiMapping::from(config),
            page: WheelPage::default(),
        })
    }

    pub fn forward(&mut self, event: &ControlEvent) -> Result<(), MidiBridgeError> {
        if let Some(message) = self.mapping.encode(event, &mut self.page) {
            log::debug!("midi out {message:02x?}");
            self.connection.send(&message)?;
        }
        Ok(())
    }
}

impl Drop for MidiBridge {
    fn drop(&mut self) {
        log::debug!("closing MIDI output {}", self.port_name);
    }
}

#[cfg(unix)]
fn create_virtual_output(midi_out: MidiOutput) -> Result<MidiOutputConnection, MidiBridgeError> {
    midi_out
        .create_virtual(VIRTUAL_OUT_NAME)
        .map_err(|err| MidiBridgeError::Connection(err.to_string()))
}

#[cfg(not(unix))]
fn create_virtual_output(_: MidiOutput) -> Result<MidiOutputConnection, MidiBridgeError> {
    Err(MidiBridgeError::VirtualPortUnsupported)
}

/// Receives LED feedback from the host.
///
/// The MIDI callback runs on midir's thread and only forwards parsed
/// feedback; LEDs are changed by whoever drains [`FeedbackListener::drain`],
/// which is the polling loop.
pub struct FeedbackListener {
    _connection: MidiInputConnection<()>,
    rx: Receiver<LedFeedback>,
}

impl FeedbackListener {
    pub fn connect(config: &MidiConfig) -> Result<Self, MidiBridgeError> {
        let mut midi_in = MidiInput::new(&config.client_name)
            .map_err(|err| MidiBridgeError::MidiInit(err.to_string()))?;
        midi_in.ignore(Ignore::All);

        let mapping = MidiMapping::from(config);
        let (tx, rx) = mpsc::channel::<LedFeedback>();
        let callback = move |_stamp: u64, message: &[u8], _: &mut ()| {
            match mapping.decode_feedback(message) {
                Some(feedback) => {
                    let _ = tx.send(feedback);
                }
                None => log::trace!("ignoring midi in {message:02x?}"),
            }
        };

        let (connection, port_name) = if config.input_port.trim().is_empty() {
            (
                create_virtual_input(midi_in, callback)?,
                VIRTUAL_IN_NAME.to_string(),
            )
        } else {
            let (port, name) = find_port(&midi_in, config.input_port.trim())?;
            let connection = midi_in
                .connect(&port, VIRTUAL_IN_NAME, callback, ())
                .map_err(|err| MidiBridgeError::Connection(err.to_string()))?;
            (connection, name)
        };

        log::info!("listening for LED feedback on {port_name}");
        Ok(Self {
            _connection: connection,
            rx,
        })
    }

    /// Feedback received since the last call.
    pub fn drain(&self) -> impl Iterator<Item = LedFeedback> + '_ {
        self.rx.try_iter()
    }
}

#[cfg(unix)]
fn create_virtual_input<F>(
    midi_in: MidiInput,
    callback: F,
) -> Result<MidiInputConnection<()>, MidiBridgeError>
where
    F: FnMut(u64, &[u8], &mut ()) + Send + 'static,
{
    midi_in
        .create_virtual(VIRTUAL_IN_NAME, callback, ())
        .map_err(|err| MidiBridgeError::Connection(err.to_string()))
}

#[cfg(not(unix))]
fn create_virtual_input<F>(
    _: MidiInput,
    _: F,
) -> Result<MidiInputConnection<()>, MidiBridgeError>
where
    F: FnMut(u64, &[u8], &mut ()) + Send + 'static,
{
    Err(MidiBridgeError::VirtualPortUnsupported)
}

/// Names of the MIDI input and output ports currently visible.
pub fn list_ports(client_name: &str) -> Result<(Vec<String>, Vec<String>), MidiBridgeError> {
    let midi_in =
        MidiInput::new(client_name).map_err(|err| MidiBridgeError::MidiInit(err.to_string()))?;
    let midi_out =
        MidiOutput::new(client_name).map_err(|err| MidiBridgeError::MidiInit(err.to_string()))?;
    Ok((port_names(&midi_in), port_names(&midi_out)))
}

fn port_names<T: MidiIO>(io: &T) -> Vec<String> {
    io.ports()
        .iter()
        .map(|port| {
            io.port_name(port)
                .unwrap_or_else(|_| "<unknown>".into())
        })
        .collect()
}
