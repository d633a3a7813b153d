//! Replay a recorded interaction session.
//!
//! Input is one JSON signal per line, tagged by `signal`:
//!
//! ```text
//! {"signal":"add_object","name":"Mesh-1","layer":31}
//! {"signal":"include_mapping"}
//! {"signal":"focus_enter","name":"Mesh-1"}
//! {"signal":"wait","seconds":2.0}
//! {"signal":"focus_exit"}
//! ```
//!
//! Time only moves on `wait`, so replays are deterministic.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use pa_core::{Formula, GestureType, ManualClock, Measurement, SceneObject, Status, SubjectOverride};
use pa_recorder::{EventRecorder, GestureOptions, Interactions, Scene, StatOptions};
use pa_transport::{MemoryTransport, Transport};
use serde::Deserialize;

use crate::Config;
use crate::commands::{api_key, build_transport};

/// Key used for dry runs when none is configured.
const DRY_RUN_KEY: &str = "dry-run";

/// One host input signal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum Signal {
    /// Register an interactive object, optionally already grouped.
    AddObject {
        name: String,
        #[serde(default)]
        layer: u32,
        group: Option<String>,
    },
    FocusEnter {
        name: String,
    },
    FocusExit,
    Gesture {
        identifier: String,
        #[serde(default)]
        gesture: GestureType,
        #[serde(default)]
        hold_length: f64,
        #[serde(default)]
        subject: String,
    },
    HoldStarted,
    HoldCompleted {
        identifier: String,
    },
    Keyword {
        keyword: String,
        #[serde(default)]
        subject: String,
    },
    CustomStat {
        identifier: String,
        value: f64,
        #[serde(default)]
        measurement: Measurement,
        #[serde(default)]
        formula: Formula,
        #[serde(default)]
        subject: String,
    },
    Gain {
        identifier: String,
        value: f64,
    },
    Loss {
        identifier: String,
        value: f64,
    },
    IncludeMapping,
    /// Advance the replay clock.
    Wait {
        seconds: f64,
    },
}

/// Counts from one replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub signals: usize,
    /// Events printed; only counted on dry runs.
    pub events: usize,
    /// Recording calls that returned a nonzero status.
    pub failed: usize,
}

/// Replays signals from `reader`.
///
/// With `dry_run` events go to an in-memory transport and are written to
/// `writer` as JSONL as they are emitted. Otherwise they go to the
/// configured transport and a one-line summary is written at the end.
pub fn run<R: BufRead, W: Write>(
    reader: R,
    writer: &mut W,
    config: &Config,
    dry_run: bool,
) -> Result<ReplaySummary> {
    let memory = dry_run.then(|| Arc::new(MemoryTransport::new()));
    let transport: Arc<dyn Transport> = match &memory {
        Some(memory) => memory.clone(),
        None => build_transport(config)?,
    };
    let key = if dry_run {
        config.api_key.as_deref().unwrap_or(DRY_RUN_KEY)
    } else {
        api_key(config)?
    };

    let clock = Arc::new(ManualClock::new());
    let scene = Arc::new(Scene::new());
    let recorder = EventRecorder::new(transport)
        .with_focus(scene.clone())
        .with_clock(clock.clone())
        .with_options(config.recorder_options());
    let status = recorder.configure(key);
    if !status.is_success() {
        anyhow::bail!("configuration failed: {status}");
    }
    let interactions = Interactions::new(Arc::new(recorder), scene);

    let mut summary = ReplaySummary::default();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }

        let signal: Signal = serde_json::from_str(&line)
            .with_context(|| format!("invalid signal on line {line_no}"))?;
        let status = apply(&interactions, &clock, signal)
            .with_context(|| format!("failed to replay line {line_no}"))?;
        summary.signals += 1;
        if status.is_some_and(|status| !status.is_success()) {
            summary.failed += 1;
        }

        if let Some(memory) = &memory {
            for event in memory.take_events() {
                serde_json::to_writer(&mut *writer, &event)?;
                writeln!(writer)?;
                summary.events += 1;
            }
        }
    }

    if dry_run {
        tracing::info!(
            signals = summary.signals,
            events = summary.events,
            failed = summary.failed,
            "dry run complete"
        );
    } else {
        let status = interactions.recorder().flush(config.timeout());
        if !status.is_success() {
            tracing::warn!(%status, "flush did not complete");
        }
        writeln!(
            writer,
            "Replayed {} signals ({} failed)",
            summary.signals, summary.failed
        )?;
        if let Some(message) = interactions.recorder().last_error_message() {
            writeln!(writer, "Last error: {message}")?;
        }
    }

    Ok(summary)
}

/// Applies one signal. Returns the recording status for signals that record.
fn apply(
    interactions: &Interactions,
    clock: &ManualClock,
    signal: Signal,
) -> Result<Option<Status>> {
    let recorder = interactions.recorder();
    let status = match signal {
        Signal::AddObject { name, layer, group } => {
            let mut object = SceneObject::new(name, layer);
            object.subject_override = group.map(SubjectOverride::group);
            interactions.scene().add_object(object);
            None
        }
        Signal::FocusEnter { name } => Some(interactions.focus_enter(&name)),
        Signal::FocusExit => Some(interactions.focus_exit()),
        Signal::Gesture {
            identifier,
            gesture,
            hold_length,
            subject,
        } => Some(recorder.gesture_with(
            &identifier,
            GestureOptions {
                hold_length,
                gesture,
                fallback_subject: &subject,
            },
        )),
        Signal::HoldStarted => {
            interactions.hold_started();
            None
        }
        Signal::HoldCompleted { identifier } => Some(interactions.hold_completed(&identifier)),
        Signal::Keyword { keyword, subject } => Some(recorder.keyword(&keyword, &subject)),
        Signal::CustomStat {
            identifier,
            value,
            measurement,
            formula,
            subject,
        } => Some(recorder.custom_stat_with(
            &identifier,
            value,
            StatOptions {
                measurement,
                formula,
                fallback_subject: &subject,
            },
        )),
        Signal::Gain { identifier, value } => Some(recorder.gain(&identifier, value)),
        Signal::Loss { identifier, value } => Some(recorder.loss(&identifier, value)),
        Signal::IncludeMapping => {
            let enrolled = recorder.include_mapping(interactions.scene());
            tracing::debug!(enrolled, "mapping layer grouped");
            None
        }
        Signal::Wait { seconds } => {
            let by = Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("invalid wait of {seconds} seconds"))?;
            clock.advance(by);
            None
        }
    };
    Ok(status)
}
