//! Send a single event.

use std::io::Write;
use std::time::Duration;

use anyhow::Result;
use pa_core::Status;
use pa_recorder::{EventRecorder, GestureOptions, StatOptions};

use crate::RecordEvent;

/// Records `event`, waits for delivery and prints the resulting status.
pub fn run<W: Write>(
    writer: &mut W,
    recorder: &EventRecorder,
    event: &RecordEvent,
    timeout: Duration,
) -> Result<Status> {
    let status = match event {
        RecordEvent::Gain { identifier, value } => recorder.gain(identifier, *value),
        RecordEvent::Loss { identifier, value } => recorder.loss(identifier, *value),
        RecordEvent::CustomStat {
            identifier,
            value,
            measurement,
            formula,
            subject,
        } => recorder.custom_stat_with(
            identifier,
            *value,
            StatOptions {
                measurement: *measurement,
                formula: *formula,
                fallback_subject: subject,
            },
        ),
        RecordEvent::Keyword { keyword, subject } => recorder.keyword(keyword, subject),
        RecordEvent::Gesture {
            identifier,
            gesture,
            hold_length,
            subject,
        } => recorder.gesture_with(
            identifier,
            GestureOptions {
                hold_length: *hold_length,
                gesture: *gesture,
                fallback_subject: subject,
            },
        ),
    };

    let status = if status.is_success() {
        recorder.flush(timeout)
    } else {
        status
    };
    writeln!(writer, "Status: {status}")?;
    // HTTP failures surface here after the flush, not in `status`.
    if let Some(message) = recorder.last_error_message() {
        writeln!(writer, "Last error: {message}")?;
    }
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use pa_core::{EventKind, Formula, GestureType, Measurement};
    use pa_transport::MemoryTransport;

    fn recorder() -> (EventRecorder, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let recorder = EventRecorder::new(transport.clone());
        recorder.configure("key");
        (recorder, transport)
    }

    fn record(recorder: &EventRecorder, event: &RecordEvent) -> (Status, String) {
        let mut output = Vec::new();
        let status = run(&mut output, recorder, event, Duration::from_secs(1)).unwrap();
        (status, String::from_utf8(output).unwrap())
    }

    #[test]
    fn gain_is_recorded() {
        let (recorder, transport) = recorder();
        let (status, output) = record(
            &recorder,
            &RecordEvent::Gain {
                identifier: "Coins".to_string(),
                value: 5.0,
            },
        );

        assert!(status.is_success());
        assert_eq!(output, "Status: 0 (Success.)\n");
        assert_eq!(transport.events()[0].kind, EventKind::Gain);
    }

    #[test]
    fn custom_stat_carries_policy_and_subject() {
        let (recorder, transport) = recorder();
        record(
            &recorder,
            &RecordEvent::CustomStat {
                identifier: "Distance".to_string(),
                value: 3.5,
                measurement: Measurement::Meter,
                formula: Formula::Average,
                subject: "Track".to_string(),
            },
        );

        let event = &transport.events()[0];
        assert_eq!(event.measurement, Measurement::Meter);
        assert_eq!(event.formula, Formula::Average);
        assert_eq!(event.subject_str(), "Track");
    }

    #[test]
    fn hold_gesture_becomes_hold_event() {
        let (recorder, transport) = recorder();
        record(
            &recorder,
            &RecordEvent::Gesture {
                identifier: "Door".to_string(),
                gesture: GestureType::Hold,
                hold_length: 2.0,
                subject: String::new(),
            },
        );

        let event = &transport.events()[0];
        assert_eq!(event.kind, EventKind::Hold);
        assert_eq!(event.subject_str(), "Door");
    }

    #[test]
    fn failing_backend_status_is_printed() {
        let (recorder, transport) = recorder();
        transport.push_status(Status::from_code(3));

        let (status, output) = record(
            &recorder,
            &RecordEvent::Keyword {
                keyword: "hello".to_string(),
                subject: String::new(),
            },
        );

        assert_eq!(status.code(), 3);
        assert_eq!(
            output,
            "Status: 3 (API key is invalid.)\nLast error: API key is invalid.\n"
        );
    }
}
