//! Subject grouping: letting many objects report under one identifier.
//!
//! An object carries an optional [`SubjectOverride`]. When the override is
//! enabled, events attributed to the object use the override's group
//! identifier instead of the object's own name. Enrollment is a one-shot
//! bulk operation over the objects known at the time of the call.

use serde::{Deserialize, Serialize};

/// Default layer spatial-mapping meshes live on.
pub const DEFAULT_MAPPING_LAYER: u32 = 31;

/// Default group identifier for spatial-mapping meshes.
pub const DEFAULT_MAPPING_GROUP: &str = "Mapping";

/// A per-object identifier override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectOverride {
    pub enabled: bool,
    pub group_identifier: String,
}

impl SubjectOverride {
    /// An enabled override reporting as `group_identifier`.
    pub fn group(group_identifier: impl Into<String>) -> Self {
        Self {
            enabled: true,
            group_identifier: group_identifier.into(),
        }
    }

    /// The group identifier, if this override is in effect.
    pub fn active_group(&self) -> Option<&str> {
        (self.enabled && !self.group_identifier.is_empty()).then_some(self.group_identifier.as_str())
    }
}

/// Returns the identifier events for `object_id` should report under.
pub fn resolve<'a>(object_id: &'a str, subject_override: Option<&'a SubjectOverride>) -> &'a str {
    subject_override
        .and_then(SubjectOverride::active_group)
        .unwrap_or(object_id)
}

/// An interactive object the host application knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneObject {
    pub name: String,
    pub layer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_override: Option<SubjectOverride>,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, layer: u32) -> Self {
        Self {
            name: name.into(),
            layer,
            subject_override: None,
        }
    }

    /// The identifier this object reports under.
    pub fn effective_id(&self) -> &str {
        resolve(&self.name, self.subject_override.as_ref())
    }
}

/// Attaches an enabled `group_identifier` override to every object on `layer`.
///
/// Objects that already carry an override have it replaced. Returns the
/// number of objects enrolled.
pub fn enroll_by_layer<'a, I>(objects: I, layer: u32, group_identifier: &str) -> usize
where
    I: IntoIterator<Item = &'a mut SceneObject>,
{
    let mut enrolled = 0;
    for object in objects.into_iter().filter(|o| o.layer == layer) {
        object.subject_override = Some(SubjectOverride::group(group_identifier));
        enrolled += 1;
    }
    tracing::debug!(layer, group = group_identifier, enrolled, "enrolled objects by layer");
    enrolled
}
