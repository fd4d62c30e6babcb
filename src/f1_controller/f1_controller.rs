use std::time::Duration;

use rusb::{Context, DeviceHandle, UsbContext};

use super::change_detector::{ChangeDetector, ControlEvent, FrameSnapshot, Timestamp};
use super::error::{DecodeError, F1Error, Result};
use super::input_report::InputReport;
use super::led_output::{LedOutput, OUTPUT_REPORT_SIZE};
use crate::config::UsbConfig;

/// Byte-level access to the device's HID reports.
pub trait ReportTransport {
    /// Read one input report into `buf`. `Ok(None)` means nothing arrived
    /// this frame, which is normal for a non-blocking poll.
    fn read_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>>;

    /// Send a complete output report and return the number of bytes written.
    fn write_report(&mut self, report: &[u8]) -> Result<usize>;
}

/// Interrupt-endpoint transport backed by libusb.
pub struct UsbTransport {
    _context: Context,
    handle: DeviceHandle<Context>,
    interface: u8,
    read_endpoint: u8,
    write_endpoint: u8,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl UsbTransport {
    /// Open the first Kontrol F1 discovered on the USB bus.
    pub fn open(config: &UsbConfig) -> Result<Self> {
        let context = Context::new()?;
        let mut handle = None;

        for device in context.devices()?.iter() {
            let desc = device.device_descriptor()?;
            if desc.vendor_id() == config.vendor_id && desc.product_id() == config.product_id {
                handle = Some(device.open()?);
                break;
            }
        }

        let mut handle = handle.ok_or(F1Error::DeviceNotFound {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
        })?;

        match handle.set_auto_detach_kernel_driver(true) {
            Ok(()) | Err(rusb::Error::NotSupported) => {}
            Err(err) => return Err(err.into()),
        }
        handle.claim_interface(config.interface)?;

        Ok(Self {
            _context: context,
            handle,
            interface: config.interface,
            read_endpoint: config.read_endpoint,
            write_endpoint: config.write_endpoint,
            read_timeout: Duration::from_millis(config.read_timeout_ms),
            write_timeout: Duration::from_millis(config.write_timeout_ms),
        })
    }
}

impl Drop for UsbTransport {
    fn drop(&mut self) {
        if let Err(err) = self.handle.release_interface(self.interface) {
            log::debug!("releasing USB interface {}: {err}", self.interface);
        }
    }
}

impl ReportTransport for UsbTransport {
    fn read_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        match self
            .handle
            .read_interrupt(self.read_endpoint, buf, self.read_timeout)
        {
            Ok(0) | Err(rusb::Error::Timeout) => Ok(None),
            Ok(len) => Ok(Some(len)),
            Err(err) => Err(err.into()),
        }
    }

    fn write_report(&mut self, report: &[u8]) -> Result<usize> {
        Ok(self
            .handle
            .write_interrupt(self.write_endpoint, report, self.write_timeout)?)
    }
}

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Nothing was read and no settled fader was pending.
    NoData,
    /// A report arrived but failed validation; the frame was discarded and
    /// the previous snapshot kept.
    Malformed(DecodeError),
    /// Events produced this poll (possibly none).
    Events(Vec<ControlEvent>),
}

type EventCallback = Box<dyn FnMut(&ControlEvent, Timestamp, &mut LedOutput) + 'static>;

/// High-level interface for working with the F1.
///
/// Each call to [`F1Controller::poll_once`] is one frame: one read, one pass
/// through change detection, then the registered callback for every event.
/// LED writes made anywhere during the frame are sent together by
/// [`F1Controller::flush_leds`].
pub struct F1Controller<T: ReportTransport = UsbTransport> {
    transport: T,
    input_buf: [u8; 64],
    detector: ChangeDetector,
    leds: LedOutput,
    event_callback: Option<EventCallback>,
}

impl F1Controller<UsbTransport> {
    pub fn connect(config: &UsbConfig, fader_quiescence: Duration) -> Result<Self> {
        let transport = UsbTransport::open(config)?;
        log::info!(
            "opened Kontrol F1 ({:04x}:{:04x})",
            config.vendor_id,
            config.product_id
        );
        Ok(Self::with_transport(transport, fader_quiescence))
    }
}

impl<T: ReportTransport> F1Controller<T> {
    pub fn with_transport(transport: T, fader_quiescence: Duration) -> Self {
        Self {
            transport,
            input_buf: [0; 64],
            detector: ChangeDetector::new(fader_quiescence),
            leds: LedOutput::new(),
            event_callback: None,
        }
    }

    /// Perform a single poll, firing the event callback as needed.
    pub fn poll_once(&mut self, now: Timestamp) -> Result<PollOutcome> {
        let len = match self.transport.read_report(&mut self.input_buf)? {
            Some(len) => len,
            None => {
                let events = self.detector.settle(now);
                if events.is_empty() {
                    return Ok(PollOutcome::NoData);
                }
                self.dispatch(&events, now);
                return Ok(PollOutcome::Events(events));
            }
        };

        let report = match InputReport::decode(&self.input_buf[..len]) {
            Ok(report) => report,
            Err(err) => {
                log::warn!("discarding input report: {err}");
                return Ok(PollOutcome::Malformed(err));
            }
        };

        let events = self.detector.process(&report, now);
        self.dispatch(&events, now);
        Ok(PollOutcome::Events(events))
    }

    /// Install a callback to be notified about every control event.
    pub fn set_event_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&ControlEvent, Timestamp, &mut LedOutput) + 'static,
    {
        self.event_callback = Some(Box::new(callback));
    }

    pub fn leds(&self) -> &LedOutput {
        &self.leds
    }

    pub fn leds_mut(&mut self) -> &mut LedOutput {
        &mut self.leds
    }

    pub fn snapshot(&self) -> &FrameSnapshot {
        self.detector.snapshot()
    }

    /// Send the LED report if anything changed since the last send.
    ///
    /// Returns whether a report went out. Failed writes are logged and leave
    /// the buffer dirty so the next flush retries; a vanished device is
    /// returned as an error.
    pub fn flush_leds(&mut self) -> Result<bool> {
        if !self.leds.is_dirty() {
            return Ok(false);
        }

        log::trace!("LED report:\n{}", self.leds.hex_dump());
        match self.transport.write_report(self.leds.buffer().as_bytes()) {
            Ok(written) if written == OUTPUT_REPORT_SIZE => {
                self.leds.mark_clean();
                Ok(true)
            }
            Ok(written) => {
                let err = F1Error::ShortWrite {
                    written,
                    expected: OUTPUT_REPORT_SIZE,
                };
                log::error!("LED write failed: {err}");
                Ok(false)
            }
            Err(F1Error::Usb(rusb::Error::NoDevice)) => Err(rusb::Error::NoDevice.into()),
            Err(err) => {
                log::error!("LED write failed: {err}");
                Ok(false)
            }
        }
    }

    fn dispatch(&mut self, events: &[ControlEvent], now: Timestamp) {
        for event in events {
            log::debug!("{event:?}");
        }
        if let Some(mut cb) = self.event_callback.take() {
            for event in events {
                cb(event, now, &mut self.leds);
            }
            self.event_callback = Some(cb);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;
    use std::time::Instant;

    use super::*;
    use crate::f1_controller::change_detector::{ButtonEventKind, FADER_QUIESCENCE};
    use crate::f1_controller::color::Color;
    use crate::f1_controller::controls::{ButtonId, MatrixPos, SpecialButton};
    use crate::f1_controller::input_report::{INPUT_REPORT_ID, INPUT_REPORT_SIZE};

    #[derive(Default)]
    struct MockTransport {
        reads: VecDeque<Option<Vec<u8>>>,
        writes: Rc<RefCell<Vec<Vec<u8>>>>,
        short_writes: bool,
    }

    impl MockTransport {
        fn with_reads(reads: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
                ..Self::default()
            }
        }
    }

    impl ReportTransport for MockTransport {
        fn read_report(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
            match self.reads.pop_front().flatten() {
                Some(bytes) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(Some(bytes.len()))
                }
                None => Ok(None),
            }
        }

        fn write_report(&mut self, report: &[u8]) -> Result<usize> {
            self.writes.borrow_mut().push(report.to_vec());
            if self.short_writes {
                Ok(report.len() / 2)
            } else {
                Ok(report.len())
            }
        }
    }

    fn report(set: &[(usize, u8)]) -> Option<Vec<u8>> {
        let mut buf = vec![0u8; INPUT_REPORT_SIZE];
        buf[0] = INPUT_REPORT_ID;
        for &(idx, value) in set {
            buf[idx] = value;
        }
        Some(buf)
    }

    fn controller(reads: Vec<Option<Vec<u8>>>) -> F1Controller<MockTransport> {
        F1Controller::with_transport(MockTransport::with_reads(reads), FADER_QUIESCENCE)
    }

    #[test]
    fn no_data_is_not_an_error() {
        let mut ctl = controller(vec![None]);
        assert_eq!(ctl.poll_once(Instant::now()).unwrap(), PollOutcome::NoData);
    }

    #[test]
    fn malformed_frame_keeps_previous_snapshot() {
        let mut bad = report(&[(3, 0x00)]).unwrap();
        bad[0] = 0x02;
        let mut ctl = controller(vec![
            report(&[(3, 0x80)]),
            Some(bad),
            Some(vec![INPUT_REPORT_ID; 5]),
        ]);
        let start = Instant::now();
        ctl.poll_once(start).unwrap();
        let shift = ButtonId::Special(SpecialButton::Shift);
        assert!(ctl.snapshot().is_pressed(shift));
        let before = ctl.snapshot().clone();

        assert!(matches!(
            ctl.poll_once(start).unwrap(),
            PollOutcome::Malformed(DecodeError::BadReportId { found: 0x02, .. })
        ));
        assert!(matches!(
            ctl.poll_once(start).unwrap(),
            PollOutcome::Malformed(DecodeError::TooShort { len: 5, .. })
        ));
        assert_eq!(ctl.snapshot(), &before);
    }

    #[test]
    fn callback_sees_events_and_can_drive_leds() {
        let mut ctl = controller(vec![report(&[(1, 0x80)]), report(&[])]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        ctl.set_event_callback(move |event, _, leds| {
            if let ControlEvent::Button {
                id: ButtonId::Matrix(pos),
                kind,
            } = *event
            {
                log.borrow_mut().push(kind);
                match kind {
                    ButtonEventKind::Pressed => leds.set_matrix_led(pos, Color::White, 1.0, false),
                    ButtonEventKind::Released => leds.restore(ButtonId::Matrix(pos)),
                }
            }
        });

        let origin = MatrixPos::new(0, 0).unwrap();
        ctl.leds_mut().set_matrix_led(origin, Color::Blue, 0.5, true);
        let idle = ctl.leds().buffer().clone();

        let start = Instant::now();
        ctl.poll_once(start).unwrap();
        assert_eq!(&ctl.leds().buffer().as_bytes()[25..28], &[127, 127, 127]);

        ctl.poll_once(start).unwrap();
        assert_eq!(ctl.leds().buffer(), &idle);
        assert_eq!(
            *seen.borrow(),
            vec![ButtonEventKind::Pressed, ButtonEventKind::Released]
        );
    }

    #[test]
    fn flush_only_sends_dirty_buffers() {
        let mut ctl = controller(vec![]);
        let writes = Rc::clone(&ctl.transport.writes);

        assert!(ctl.flush_leds().unwrap());
        assert!(!ctl.flush_leds().unwrap());

        ctl.leds_mut()
            .set_matrix_led(MatrixPos::new(3, 0).unwrap(), Color::Green, 1.0, true);
        ctl.leds_mut()
            .set_matrix_led(MatrixPos::new(3, 1).unwrap(), Color::Green, 1.0, true);
        assert!(ctl.flush_leds().unwrap());

        let writes = writes.borrow();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].len(), OUTPUT_REPORT_SIZE);
        assert_eq!(writes[1][0], 0x80);
    }

    #[test]
    fn short_write_keeps_buffer_dirty() {
        let mut ctl = controller(vec![]);
        ctl.transport.short_writes = true;
        assert!(!ctl.flush_leds().unwrap());
        assert!(ctl.leds().is_dirty());
    }

    #[test]
    fn settled_fader_is_reported_without_a_new_report() {
        let mut ctl = controller(vec![
            report(&[]),
            report(&[]),
            report(&[(20, 0xFF), (21, 0x0F)]),
            None,
            None,
        ]);
        let start = Instant::now();
        ctl.poll_once(start).unwrap();
        ctl.poll_once(start + Duration::from_millis(60)).unwrap();
        ctl.poll_once(start + Duration::from_millis(100)).unwrap();

        assert_eq!(
            ctl.poll_once(start + Duration::from_millis(110)).unwrap(),
            PollOutcome::NoData
        );
        match ctl.poll_once(start + Duration::from_millis(160)).unwrap() {
            PollOutcome::Events(events) => assert_eq!(events.len(), 1),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
