//! Focus tracking and the registry of interactive objects.
//!
//! The recorder never looks up "what the user is looking at" on its own. It
//! asks an injected [`FocusQuery`]. [`Scene`] is the stock implementation:
//! a registry of named objects on layers, plus the currently focused one.

use std::collections::BTreeMap;
use pa_core::grouping::{self, SceneObject, SubjectOverride};
use parking_lot::RwLock;

/// The object currently under the user's gaze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedObject {
    pub name: String,
    pub subject_override: Option<SubjectOverride>,
}

impl FocusedObject {
    /// The identifier events attributed to this object report under.
    pub fn effective_id(&self) -> &str {
        grouping::resolve(&self.name, self.subject_override.as_ref())
    }

    /// The group identifier, if an enabled override is attached.
    pub fn group(&self) -> Option<&str> {
        self.subject_override
            .as_ref()
            .and_then(SubjectOverride::active_group)
    }
}

/// Answers "what is the user looking at right now?".
pub trait FocusQuery: Send + Sync {
    fn focused(&self) -> Option<FocusedObject>;
}

/// A focus source that never reports an object.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFocus;

impl FocusQuery for NoFocus {
    fn focused(&self) -> Option<FocusedObject> {
        None
    }
}

/// Interactive objects known to the host, keyed by name.
#[derive(Debug, Default)]
pub struct Scene {
    state: RwLock<SceneState>,
}

#[derive(Debug, Default)]
struct SceneState {
    objects: BTreeMap<String, SceneObject>,
    focused: Option<String>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an object, replacing any object with the same name.
    pub fn add_object(&self, object: SceneObject) {
        self.state.write().objects.insert(object.name.clone(), object);
    }

    /// Removes an object, clearing focus if it was focused.
    pub fn remove_object(&self, name: &str) -> bool {
        let mut state = self.state.write();
        if state.focused.as_deref() == Some(name) {
            state.focused = None;
        }
        state.objects.remove(name).is_some()
    }

    pub fn object(&self, name: &str) -> Option<SceneObject> {
        self.state.read().objects.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().objects.is_empty()
    }

    /// Attaches an override to one object. Returns `false` if it is unknown.
    pub fn attach_override(&self, name: &str, subject_override: SubjectOverride) -> bool {
        match self.state.write().objects.get_mut(name) {
            Some(object) => {
                object.subject_override = Some(subject_override);
                true
            }
            None => false,
        }
    }

    /// Marks `name` as focused, or clears focus with `None`.
    ///
    /// Focusing a name that was never registered is allowed; it simply has
    /// no override.
    pub fn set_focus(&self, name: Option<&str>) {
        self.state.write().focused = name.map(str::to_string);
    }

    pub fn focused_name(&self) -> Option<String> {
        self.state.read().focused.clone()
    }

    /// Groups every object currently on `layer` under `group_identifier`.
    ///
    /// Objects added afterwards are not enrolled. Returns how many objects
    /// were enrolled.
    pub fn enroll_by_layer(&self, layer: u32, group_identifier: &str) -> usize {
        grouping::enroll_by_layer(self.state.write().objects.values_mut(), layer, group_identifier)
    }
}

impl FocusQuery for Scene {
    fn focused(&self) -> Option<FocusedObject> {
        let state = self.state.read();
        let name = state.focused.as_ref()?;
        let subject_override = state
            .objects
            .get(name)
            .and_then(|object| object.subject_override.clone());
        Some(FocusedObject {
            name: name.clone(),
            subject_override,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pa_core::grouping::{DEFAULT_MAPPING_GROUP, DEFAULT_MAPPING_LAYER};

    fn scene() -> Scene {
        let scene = Scene::new();
        scene.add_object(SceneObject::new("Cube", 0));
        scene.add_object(SceneObject::new("Mesh-1", DEFAULT_MAPPING_LAYER));
        scene.add_object(SceneObject::new("Mesh-2", DEFAULT_MAPPING_LAYER));
        scene
    }

    #[test]
    fn no_focus_by_default() {
        assert_eq!(scene().focused(), None);
        assert_eq!(NoFocus.focused(), None);
    }

    #[test]
    fn focused_object_reports_own_name() {
        let scene = scene();
        scene.set_focus(Some("Cube"));
        let focused = scene.focused().unwrap();
        assert_eq!(focused.effective_id(), "Cube");
        assert_eq!(focused.group(), None);
    }

    #[test]
    fn enrolled_objects_report_group() {
        let scene = scene();
        assert_eq!(scene.enroll_by_layer(DEFAULT_MAPPING_LAYER, DEFAULT_MAPPING_GROUP), 2);

        scene.set_focus(Some("Mesh-2"));
        let focused = scene.focused().unwrap();
        assert_eq!(focused.name, "Mesh-2");
        assert_eq!(focused.effective_id(), "Mapping");
        assert_eq!(focused.group(), Some("Mapping"));
    }

    #[test]
    fn enrollment_is_not_a_subscription() {
        let scene = scene();
        scene.enroll_by_layer(DEFAULT_MAPPING_LAYER, DEFAULT_MAPPING_GROUP);
        scene.add_object(SceneObject::new("Mesh-3", DEFAULT_MAPPING_LAYER));

        scene.set_focus(Some("Mesh-3"));
        assert_eq!(scene.focused().unwrap().effective_id(), "Mesh-3");

        assert_eq!(scene.enroll_by_layer(DEFAULT_MAPPING_LAYER, DEFAULT_MAPPING_GROUP), 3);
        assert_eq!(scene.focused().unwrap().effective_id(), "Mapping");
    }

    #[test]
    fn unknown_focus_has_no_override() {
        let scene = scene();
        scene.set_focus(Some("Ghost"));
        assert_eq!(scene.focused().unwrap().effective_id(), "Ghost");
    }

    #[test]
    fn attach_override_to_single_object() {
        let scene = scene();
        assert!(scene.attach_override("Cube", SubjectOverride::group("Props")));
        assert!(!scene.attach_override("Ghost", SubjectOverride::group("Props")));
        assert_eq!(scene.object("Cube").unwrap().effective_id(), "Props");
    }

    #[test]
    fn removing_focused_object_clears_focus() {
        let scene = scene();
        scene.set_focus(Some("Cube"));
        assert!(scene.remove_object("Cube"));
        assert_eq!(scene.focused_name(), None);
        assert_eq!(scene.len(), 2);
    }
}
