//! Glue between focus changes and the recorder.
//!
//! Hosts forward raw input here instead of calling the recorder directly:
//! focus enter and exit drive the gaze timer, and gestures are attributed
//! to whatever the scene says is focused.

use std::sync::Arc;

use pa_core::Status;

use crate::recorder::EventRecorder;
use crate::scene::Scene;

/// Routes host input signals to an [`EventRecorder`] through a [`Scene`].
#[derive(Debug, Clone)]
pub struct Interactions {
    recorder: Arc<EventRecorder>,
    scene: Arc<Scene>,
}

impl Interactions {
    /// `scene` should be the same focus source the recorder was built with.
    pub const fn new(recorder: Arc<EventRecorder>, scene: Arc<Scene>) -> Self {
        Self { recorder, scene }
    }

    pub const fn recorder(&self) -> &Arc<EventRecorder> {
        &self.recorder
    }

    pub const fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    /// The user started looking at `name`.
    ///
    /// Any gaze in progress is closed first, so moving focus from one object
    /// to another records the first gaze.
    pub fn focus_enter(&self, name: &str) -> Status {
        let status = match self.scene.focused_name() {
            Some(_) => self.recorder.gaze_off(),
            None => Status::Success,
        };
        self.scene.set_focus(Some(name));
        let subject = self
            .scene
            .object(name)
            .map_or_else(|| name.to_string(), |object| object.effective_id().to_string());
        self.recorder.gaze_on(&subject);
        status
    }

    /// The user stopped looking at the focused object.
    pub fn focus_exit(&self) -> Status {
        let status = self.recorder.gaze_off();
        self.scene.set_focus(None);
        status
    }

    /// A tap on the focused object.
    pub fn tapped(&self, identifier: &str) -> Status {
        self.recorder.gesture(identifier)
    }

    pub fn hold_started(&self) {
        self.recorder.hold_started();
    }

    pub fn hold_completed(&self, identifier: &str) -> Status {
        self.recorder.hold_complete(identifier)
    }
}
