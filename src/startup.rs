use std::{thread, time::Duration};

use crate::config::LedConfig;
use crate::f1_controller::{Color, F1Controller, F1Error, LedOutput, MatrixPos, ReportTransport};

pub const STEP: Duration = Duration::from_millis(50);
const WAVE_COLOR: Color = Color::Green;
const WAVE_PROFILE: [f32; 3] = [0.3, 1.0, 0.3];
const LAST_DIAGONAL: usize = 6;

/// Brightness of `pos` at `step` of the wave. Diagonals light up starting
/// from the bottom-right pad and the wave runs toward the top-left.
fn wave_brightness(pos: MatrixPos, step: usize) -> f32 {
    let distance = LAST_DIAGONAL - (pos.row() + pos.col()) as usize;
    step.checked_sub(distance)
        .and_then(|phase| WAVE_PROFILE.get(phase).copied())
        .unwrap_or(0.0)
}

pub fn step_count() -> usize {
    LAST_DIAGONAL + WAVE_PROFILE.len() + 1
}

fn draw_step(leds: &mut LedOutput, step: usize) {
    for pos in MatrixPos::all() {
        leds.set_matrix_led(pos, WAVE_COLOR, wave_brightness(pos, step), false);
    }
}

/// Play the power-on wave. Nothing is recorded, so the pads can be restored
/// to whatever was set before.
pub fn play<T: ReportTransport>(
    controller: &mut F1Controller<T>,
    step: Duration,
) -> Result<(), F1Error> {
    log::debug!("playing startup animation");
    for index in 0..step_count() {
        draw_step(controller.leds_mut(), index);
        controller.flush_leds()?;
        thread::sleep(step);
    }
    Ok(())
}

/// Set every pad to the configured idle color.
pub fn idle_layout(leds: &mut LedOutput, config: &LedConfig) {
    for pos in MatrixPos::all() {
        leds.set_matrix_led(
            pos,
            config.matrix_idle_color,
            config.matrix_idle_brightness,
            true,
        );
    }
}
