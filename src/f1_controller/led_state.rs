use super::color::Color;
use super::controls::{ButtonId, MatrixPos};

/// What a caller last asked an LED to show, before hardware quantization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LedIntent {
    Rgb { color: Color, brightness: f32 },
    Mono { brightness: f32 },
}

impl LedIntent {
    pub fn brightness(self) -> f32 {
        match self {
            LedIntent::Rgb { brightness, .. } | LedIntent::Mono { brightness } => brightness,
        }
    }

    fn off_for(id: ButtonId) -> Self {
        match id {
            ButtonId::Matrix(_) => LedIntent::Rgb {
                color: Color::Black,
                brightness: 0.0,
            },
            _ => LedIntent::Mono { brightness: 0.0 },
        }
    }
}

const MATRIX_OFF: (Color, f32) = (Color::Black, 0.0);

/// Shadow of the logical LED values, keyed by button.
///
/// Unset entries (and buttons without an LED) read back as off.
#[derive(Debug, Clone, PartialEq)]
pub struct LedStateStore {
    matrix: [(Color, f32); 16],
    stop: [f32; 4],
    special: [f32; 6],
    control: [f32; 3],
}

impl Default for LedStateStore {
    fn default() -> Self {
        Self {
            matrix: [MATRIX_OFF; 16],
            stop: [0.0; 4],
            special: [0.0; 6],
            control: [0.0; 3],
        }
    }
}

impl LedStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ButtonId) -> LedIntent {
        match id {
            ButtonId::Matrix(pos) => {
                let (color, brightness) = self.matrix[pos.index()];
                LedIntent::Rgb { color, brightness }
            }
            ButtonId::Stop(stop) => LedIntent::Mono {
                brightness: self.stop[stop.index()],
            },
            ButtonId::Special(button) => LedIntent::Mono {
                brightness: self.special[button.index()],
            },
            ButtonId::Control(button) => LedIntent::Mono {
                brightness: self.control[button.index()],
            },
        }
    }

    pub(crate) fn record_matrix(&mut self, pos: MatrixPos, color: Color, brightness: f32) {
        self.matrix[pos.index()] = (color, brightness);
    }

    pub(crate) fn record_mono(&mut self, id: ButtonId, brightness: f32) {
        match id {
            // Matrix intents always carry a color; see `record_matrix`.
            ButtonId::Matrix(_) => {}
            ButtonId::Stop(stop) => self.stop[stop.index()] = brightness,
            ButtonId::Special(button) => self.special[button.index()] = brightness,
            ButtonId::Control(button) => self.control[button.index()] = brightness,
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Every button whose recorded intent is not off.
    pub fn lit(&self) -> impl Iterator<Item = (ButtonId, LedIntent)> + '_ {
        ButtonId::all()
            .map(|id| (id, self.get(id)))
            .filter(|(id, intent)| *intent != LedIntent::off_for(*id))
    }
}
