mod analog;
mod change_detector;
mod color;
mod controls;
mod error;
#[allow(clippy::module_inception)]
mod f1_controller;
mod input_report;
mod led_output;
mod led_state;
mod wheel;

pub use change_detector::{ButtonEventKind, ControlEvent};
pub use color::Color;
#[allow(unused_imports)]
pub use controls::{
    AnalogChannel, AnalogKind, ButtonId, ControlButton, MatrixPos, SpecialButton, StopButton,
};
pub use error::F1Error;
pub use f1_controller::{F1Controller, PollOutcome, ReportTransport};
pub use led_output::LedOutput;
pub use led_state::LedIntent;
pub use wheel::Direction;
