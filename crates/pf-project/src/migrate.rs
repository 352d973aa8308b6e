//! Schema migration framework.

use crate::ProjectError;
use crate::schema::Project;

pub const LATEST_VERSION: u32 = 1;

pub fn migrate_to_latest(mut project: Project) -> Result<Project, ProjectError> {
    while project.version < LATEST_VERSION {
        project = migrate_one_version(project)?;
    }
    Ok(project)
}

fn migrate_one_version(mut project: Project) -> Result<Project, ProjectError> {
    match project.version {
        // Unversioned files share the version 1 layout.
        0 => {
            project.version = 1;
            Ok(project)
        }
        v => Err(ProjectError::Migration {
            what: format!("No migration path from version {}", v),
        }),
    }
}
