use serde::{Deserialize, Serialize};

use crate::spec::{GrantIdentity, GrantSpec};

/// The tracking system's view of one declared grant.
pub trait ResourceState {
    fn spec(&self) -> &GrantSpec;

    fn identity(&self) -> Option<&GrantIdentity>;

    fn set_identity(&mut self, id: GrantIdentity);

    fn clear_identity(&mut self);

    fn exists(&self) -> bool {
        self.identity().is_some()
    }
}

/// Plain in-memory [`ResourceState`], serializable for state files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantState {
    pub spec: GrantSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<GrantIdentity>,
}

impl GrantState {
    pub fn new(spec: GrantSpec) -> Self {
        Self { spec, id: None }
    }
}

impl ResourceState for GrantState {
    fn spec(&self) -> &GrantSpec {
        &self.spec
    }

    fn identity(&self) -> Option<&GrantIdentity> {
        self.id.as_ref()
    }

    fn set_identity(&mut self, id: GrantIdentity) {
        self.id = Some(id);
    }

    fn clear_identity(&mut self) {
        self.id = None;
    }
}
