mod config;
mod f1_controller;
mod midi_bridge;
mod startup;

use std::{path::PathBuf, thread, time::Instant};

use anyhow::{Context, Result};
use clap::Parser;

use config::{Config, LedConfig, DEFAULT_CONFIG_PATH};
use f1_controller::{
    ButtonEventKind, ButtonId, Color, ControlEvent, F1Controller, LedIntent, LedOutput,
    PollOutcome,
};
use midi_bridge::{FeedbackListener, LedFeedback, MidiBridge};

/// Bridge a Native Instruments Kontrol F1 to MIDI.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// YAML settings file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the available MIDI ports and exit.
    #[arg(long)]
    list_ports: bool,

    /// Skip the startup animation.
    #[arg(long)]
    no_startup: bool,

    /// Log filter, e.g. `debug` or `f1_midi_bridge=trace`. Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let config = Config::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if args.list_ports {
        return list_ports(&config.midi.client_name);
    }

    let mut controller =
        F1Controller::connect(&config.usb, config.analog.fader_quiescence())
            .context("opening the Kontrol F1")?;

    controller.leds_mut().clear_all();
    controller.flush_leds()?;
    if config.startup_animation && !args.no_startup {
        startup::play(&mut controller, startup::STEP)?;
    }
    startup::idle_layout(controller.leds_mut(), &config.leds);
    controller.flush_leds()?;

    let mut bridge = MidiBridge::connect(&config.midi).context("opening MIDI output")?;
    let feedback = FeedbackListener::connect(&config.midi).context("opening MIDI input")?;

    let highlight = config.leds.highlight_color;
    controller.set_event_callback(move |event, _timestamp, leds| {
        if let Err(err) = bridge.forward(event) {
            log::warn!("{err}");
        }
        highlight_pad(event, leds, highlight);
    });

    log::info!("running");
    loop {
        match controller.poll_once(Instant::now())? {
            PollOutcome::Malformed(err) => log::debug!("skipped frame: {err}"),
            PollOutcome::NoData | PollOutcome::Events(_) => {}
        }

        for message in feedback.drain() {
            apply_feedback(controller.leds_mut(), message, &config.leds);
        }

        controller.flush_leds()?;
        thread::sleep(config.poll_interval());
    }
}

fn init_logging(filter: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(filter) = filter {
        builder.parse_filters(filter);
    }
    builder.init();
}

fn list_ports(client_name: &str) -> Result<()> {
    let (inputs, outputs) = midi_bridge::list_ports(client_name)?;
    println!("MIDI inputs:");
    for name in inputs {
        println!("  {name}");
    }
    println!("MIDI outputs:");
    for name in outputs {
        println!("  {name}");
    }
    Ok(())
}

/// Light a pad while it is held and put back its recorded color on release.
fn highlight_pad(event: &ControlEvent, leds: &mut LedOutput, color: Color) {
    let ControlEvent::Button {
        id: id @ ButtonId::Matrix(pos),
        kind,
    } = *event
    else {
        return;
    };
    match kind {
        ButtonEventKind::Pressed => leds.set_matrix_led(pos, color, 1.0, false),
        ButtonEventKind::Released => leds.restore(id),
    }
}

fn apply_feedback(leds: &mut LedOutput, message: LedFeedback, config: &LedConfig) {
    let level = f32::from(message.velocity) / 127.0;
    let result = match message.id {
        ButtonId::Matrix(pos) if message.velocity > 0 => {
            leds.set_matrix_led(pos, config.feedback_on_color, level, true);
            Ok(())
        }
        ButtonId::Matrix(pos) => {
            leds.set_matrix_led(
                pos,
                config.feedback_off_color,
                config.feedback_off_brightness,
                true,
            );
            Ok(())
        }
        id => leds.apply(id, LedIntent::Mono { brightness: level }, true),
    };
    if let Err(err) = result {
        log::debug!("ignoring feedback for {:?}: {err}", message.id);
    }
}
