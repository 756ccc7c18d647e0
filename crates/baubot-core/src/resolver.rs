//! Project reference resolution.
//!
//! Users refer to projects loosely: a name fragment ("Alpha"), a full
//! number ("25-003"), or a partial one. Resolution is a permissive
//! case-insensitive substring match, first against names, then against
//! project numbers, with most-recently-created winning among multiple
//! hits. That tie-break is the documented disambiguation policy.

use baubot_store::{Project, ProjectStore};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Resolves free-text project references against the store.
#[derive(Clone)]
pub struct ProjectResolver {
    projects: ProjectStore,
}

impl ProjectResolver {
    pub fn new(projects: ProjectStore) -> Self {
        Self { projects }
    }

    /// Resolve `identifier` to a project, or fail with
    /// [`CoreError::ProjectNotFound`].
    pub async fn resolve(&self, identifier: &str) -> CoreResult<Project> {
        let needle = identifier.trim();
        if needle.is_empty() {
            return Err(CoreError::ProjectNotFound(identifier.to_string()));
        }

        if let Some(project) = self.projects.find_by_name_fragment(needle).await? {
            debug!(%needle, project_id = %project.id, "resolved by name");
            return Ok(project);
        }
        if let Some(project) = self.projects.find_by_number_fragment(needle).await? {
            debug!(%needle, project_id = %project.id, "resolved by number");
            return Ok(project);
        }

        Err(CoreError::ProjectNotFound(needle.to_string()))
    }
}
