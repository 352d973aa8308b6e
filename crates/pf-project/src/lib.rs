//! pf-project: project file format and validation.

pub mod migrate;
pub mod schema;
pub mod validate;

use std::path::{Path, PathBuf};

pub use migrate::{LATEST_VERSION, migrate_to_latest};
pub use schema::*;
pub use validate::{ValidationError, validate_project};

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Migration error: {what}")]
    Migration { what: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn read(path: &Path) -> ProjectResult<String> {
    std::fs::read_to_string(path).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// Load a project, picking JSON or YAML by file extension.
pub fn load(path: &Path) -> ProjectResult<Project> {
    if is_json(path) {
        load_json(path)
    } else {
        load_yaml(path)
    }
}

pub fn load_yaml(path: &Path) -> ProjectResult<Project> {
    let project: Project = serde_yaml::from_str(&read(path)?)?;
    finish_load(project)
}

pub fn load_json(path: &Path) -> ProjectResult<Project> {
    let project: Project = serde_json::from_str(&read(path)?)?;
    finish_load(project)
}

fn finish_load(project: Project) -> ProjectResult<Project> {
    let project = migrate_to_latest(project)?;
    validate_project(&project)?;
    Ok(project)
}

pub fn save_yaml(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_yaml::to_string(project)?;
    std::fs::write(path, content).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_json(path: &Path, project: &Project) -> ProjectResult<()> {
    validate_project(project)?;
    let content = serde_json::to_string_pretty(project)?;
    std::fs::write(path, content).map_err(|source| ProjectError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Step rows of the drive cycle; `steps_file` is resolved against
/// `project_dir`.
pub fn resolve_steps(project: &Project, project_dir: &Path) -> ProjectResult<Vec<StepRowDef>> {
    let cycle = &project.drive_cycle;
    let Some(file) = &cycle.steps_file else {
        return Ok(cycle.steps.clone());
    };
    let path = project_dir.join(file);
    let content = read(&path)?;
    let parsed: StepsFile = if is_json(&path) {
        serde_json::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };
    let rows = parsed.into_rows();
    if rows.is_empty() {
        return Err(ValidationError::Empty {
            what: format!("steps file {}", path.display()),
        }
        .into());
    }
    Ok(rows)
}
