//! Addressable controls of the Kontrol F1.
//!
//! Every index is range-checked once, when the id is built. Accessors on the
//! input report and setters on the LED buffer only take these validated ids.

use super::error::{F1Error, Result};

pub const MATRIX_ROWS: u8 = 4;
pub const MATRIX_COLS: u8 = 4;
pub const STOP_COUNT: u8 = 4;
pub const ANALOG_COUNT: u8 = 4;

fn check(control: &'static str, index: u8, count: u8) -> Result<()> {
    if index < count {
        Ok(())
    } else {
        Err(F1Error::OutOfRange {
            control,
            index: index as usize,
            max: count as usize - 1,
        })
    }
}

/// A cell of the 4x4 pad matrix, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixPos {
    row: u8,
    col: u8,
}

impl MatrixPos {
    pub fn new(row: u8, col: u8) -> Result<Self> {
        check("matrix row", row, MATRIX_ROWS)?;
        check("matrix column", col, MATRIX_COLS)?;
        Ok(Self { row, col })
    }

    /// Cell from its row-major position (0..16).
    pub fn from_index(index: u8) -> Result<Self> {
        check("matrix cell", index, MATRIX_ROWS * MATRIX_COLS)?;
        Ok(Self {
            row: index / MATRIX_COLS,
            col: index % MATRIX_COLS,
        })
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    /// Row-major position, 0..16.
    pub fn index(self) -> usize {
        (self.row * MATRIX_COLS + self.col) as usize
    }

    pub fn all() -> impl Iterator<Item = MatrixPos> {
        (0..MATRIX_ROWS).flat_map(|row| (0..MATRIX_COLS).map(move |col| MatrixPos { row, col }))
    }
}

/// One of the four stop buttons, left to right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StopButton(u8);

impl StopButton {
    pub fn new(index: u8) -> Result<Self> {
        check("stop button", index, STOP_COUNT)?;
        Ok(Self(index))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = StopButton> {
        (0..STOP_COUNT).map(StopButton)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialButton {
    Shift,
    Reverse,
    Type,
    Size,
    Browse,
    SelectorWheel,
}

impl SpecialButton {
    pub const ALL: [SpecialButton; 6] = [
        SpecialButton::Shift,
        SpecialButton::Reverse,
        SpecialButton::Type,
        SpecialButton::Size,
        SpecialButton::Browse,
        SpecialButton::SelectorWheel,
    ];

    pub fn from_index(index: u8) -> Result<Self> {
        check("special button", index, Self::ALL.len() as u8)?;
        Ok(Self::ALL[index as usize])
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlButton {
    Sync,
    Quant,
    Capture,
}

impl ControlButton {
    pub const ALL: [ControlButton; 3] = [
        ControlButton::Sync,
        ControlButton::Quant,
        ControlButton::Capture,
    ];

    pub fn from_index(index: u8) -> Result<Self> {
        check("control button", index, Self::ALL.len() as u8)?;
        Ok(Self::ALL[index as usize])
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Matrix(MatrixPos),
    Stop(StopButton),
    Special(SpecialButton),
    Control(ControlButton),
}

impl ButtonId {
    /// Every button on the device, matrix first.
    pub fn all() -> impl Iterator<Item = ButtonId> {
        MatrixPos::all()
            .map(ButtonId::Matrix)
            .chain(StopButton::all().map(ButtonId::Stop))
            .chain(SpecialButton::ALL.into_iter().map(ButtonId::Special))
            .chain(ControlButton::ALL.into_iter().map(ButtonId::Control))
    }
}

/// The buttons that carry exactly one LED. The selector wheel push has none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonLed {
    Browse,
    Size,
    Type,
    Reverse,
    Shift,
    Capture,
    Quant,
    Sync,
}

impl ButtonLed {
    pub const ALL: [ButtonLed; 8] = [
        ButtonLed::Browse,
        ButtonLed::Size,
        ButtonLed::Type,
        ButtonLed::Reverse,
        ButtonLed::Shift,
        ButtonLed::Capture,
        ButtonLed::Quant,
        ButtonLed::Sync,
    ];
}

impl From<ButtonLed> for ButtonId {
    fn from(led: ButtonLed) -> Self {
        match led {
            ButtonLed::Browse => ButtonId::Special(SpecialButton::Browse),
            ButtonLed::Size => ButtonId::Special(SpecialButton::Size),
            ButtonLed::Type => ButtonId::Special(SpecialButton::Type),
            ButtonLed::Reverse => ButtonId::Special(SpecialButton::Reverse),
            ButtonLed::Shift => ButtonId::Special(SpecialButton::Shift),
            ButtonLed::Capture => ButtonId::Control(ControlButton::Capture),
            ButtonLed::Quant => ButtonId::Control(ControlButton::Quant),
            ButtonLed::Sync => ButtonId::Control(ControlButton::Sync),
        }
    }
}

impl TryFrom<ButtonId> for ButtonLed {
    type Error = F1Error;

    fn try_from(id: ButtonId) -> Result<Self> {
        match id {
            ButtonId::Special(SpecialButton::Browse) => Ok(ButtonLed::Browse),
            ButtonId::Special(SpecialButton::Size) => Ok(ButtonLed::Size),
            ButtonId::Special(SpecialButton::Type) => Ok(ButtonLed::Type),
            ButtonId::Special(SpecialButton::Reverse) => Ok(ButtonLed::Reverse),
            ButtonId::Special(SpecialButton::Shift) => Ok(ButtonLed::Shift),
            ButtonId::Control(ControlButton::Capture) => Ok(ButtonLed::Capture),
            ButtonId::Control(ControlButton::Quant) => Ok(ButtonLed::Quant),
            ButtonId::Control(ControlButton::Sync) => Ok(ButtonLed::Sync),
            other => Err(F1Error::NoLed(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalogKind {
    Knob,
    Fader,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalogChannel {
    kind: AnalogKind,
    index: u8,
}

impl AnalogChannel {
    pub fn new(kind: AnalogKind, index: u8) -> Result<Self> {
        let control = match kind {
            AnalogKind::Knob => "knob",
            AnalogKind::Fader => "fader",
        };
        check(control, index, ANALOG_COUNT)?;
        Ok(Self { kind, index })
    }

    pub fn knob(index: u8) -> Result<Self> {
        Self::new(AnalogKind::Knob, index)
    }

    pub fn fader(index: u8) -> Result<Self> {
        Self::new(AnalogKind::Fader, index)
    }

    pub fn kind(self) -> AnalogKind {
        self.kind
    }

    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn all(kind: AnalogKind) -> impl Iterator<Item = AnalogChannel> {
        (0..ANALOG_COUNT).map(move |index| AnalogChannel { kind, index })
    }
}
