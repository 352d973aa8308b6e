//! Project loading, saving and introspection.

use std::collections::BTreeSet;
use std::path::Path;

use pf_project::schema::Project;

use crate::error::AppResult;

/// Summary of a project for listing and `validate` output.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub name: String,
    pub pack_id: String,
    pub cell_count: usize,
    pub group_count: usize,
    pub drive_cycle_id: String,
    pub step_count: usize,
}

/// Load a project (YAML or JSON by extension), migrated and validated.
pub fn load_project(path: &Path) -> AppResult<Project> {
    Ok(pf_project::load(path)?)
}

/// Save a project; `.json` files are written as JSON, anything else as YAML.
pub fn save_project(path: &Path, project: &Project) -> AppResult<()> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        pf_project::save_json(path, project)?;
    } else {
        pf_project::save_yaml(path, project)?;
    }
    Ok(())
}

/// Summarize a project; an external steps file is read to count its rows.
pub fn summarize_project(project: &Project, project_path: &Path) -> AppResult<ProjectSummary> {
    let dir = crate::runtime_compile::project_dir(project_path);
    let steps = pf_project::resolve_steps(project, dir)?;
    let groups: BTreeSet<u32> = project.pack.cells.iter().map(|c| c.group).collect();
    Ok(ProjectSummary {
        name: project.name.clone(),
        pack_id: project.pack.id.clone(),
        cell_count: project.pack.cells.len(),
        group_count: groups.len(),
        drive_cycle_id: project.drive_cycle.id.clone(),
        step_count: steps.len(),
    })
}
