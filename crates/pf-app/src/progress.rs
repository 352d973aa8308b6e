use pf_sim::SimProgress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    LoadingProject,
    CompilingRuntime,
    ValidatingCheckpoint,
    Simulating,
    WritingCheckpoint,
    Completed,
}

impl RunStage {
    pub fn label(self) -> &'static str {
        match self {
            RunStage::LoadingProject => "Loading project",
            RunStage::CompilingRuntime => "Compiling runtime",
            RunStage::ValidatingCheckpoint => "Validating checkpoint",
            RunStage::Simulating => "Simulating",
            RunStage::WritingCheckpoint => "Writing checkpoint",
            RunStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub run_id: String,
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub sim: Option<SimProgress>,
}

impl RunProgressEvent {
    pub fn stage(
        run_id: &str,
        stage: RunStage,
        elapsed_wall_s: f64,
        message: Option<String>,
    ) -> Self {
        Self {
            run_id: run_id.to_string(),
            stage,
            elapsed_wall_s,
            message,
            sim: None,
        }
    }
}
