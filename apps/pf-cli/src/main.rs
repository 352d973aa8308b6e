use clap::{ArgGroup, Parser, Subcommand};
use pf_app::{
    AppResult, ResumeRequest, RunOptions, RunProgressEvent, RunRequest, RunResponse, RunStage,
    project_service, query, run_service, runtime_compile,
};
use pf_sim::{RunOutcome, StopMode};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "packflow")]
#[command(about = "packflow - battery pack drive-cycle simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project and compile its pack and drive cycle
    Validate {
        /// Path to the project file (YAML or JSON)
        project_path: PathBuf,
    },
    /// Start a new run
    Run {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID (a random UUID if omitted)
        #[arg(long)]
        run_id: Option<String>,
    },
    /// Resume a paused, stopped or terminated run
    Resume {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Resume from this checkpoint directory instead of the run's own
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
    /// Ask a running run to pause
    Pause {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
    },
    /// Stop a run, keeping (--retain) or dropping (--discard) its checkpoint
    #[command(group(ArgGroup::new("mode").required(true).args(["retain", "discard"])))]
    Stop {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Keep the checkpoint so the run can be resumed
        #[arg(long)]
        retain: bool,
        /// Drop the checkpoint
        #[arg(long)]
        discard: bool,
    },
    /// List runs for a project
    Runs {
        /// Path to the project file
        project_path: PathBuf,
    },
    /// Show details of a run
    ShowRun {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export one cell variable from a run as CSV
    ExportSeries {
        /// Path to the project file
        project_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Cell label or index
        cell: String,
        /// Variable name (e.g., soc, v_term, current, temperature)
        variable: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "packflow starting");

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            project_path,
            run_id,
        } => cmd_run(&project_path, run_id),
        Commands::Resume {
            project_path,
            run_id,
            checkpoint,
        } => cmd_resume(&project_path, &run_id, checkpoint.as_deref()),
        Commands::Pause {
            project_path,
            run_id,
        } => {
            run_service::request_pause(&project_path, &run_id)?;
            println!("✓ Pause requested for {}", run_id);
            Ok(())
        }
        Commands::Stop {
            project_path,
            run_id,
            retain: _,
            discard,
        } => {
            let mode = if discard {
                StopMode::Discard
            } else {
                StopMode::Retain
            };
            let manifest = run_service::request_stop(&project_path, &run_id, mode)?;
            println!(
                "✓ Stop ({}) requested for {} (status {})",
                mode.as_str(),
                run_id,
                manifest.status.as_str()
            );
            Ok(())
        }
        Commands::Runs { project_path } => cmd_runs(&project_path),
        Commands::ShowRun {
            project_path,
            run_id,
        } => cmd_show_run(&project_path, &run_id),
        Commands::ExportSeries {
            project_path,
            run_id,
            cell,
            variable,
            output,
        } => cmd_export_series(&project_path, &run_id, &cell, &variable, output.as_deref()),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    let runtime = runtime_compile::compile_project(&project, project_path)?;
    let summary = project_service::summarize_project(&project, project_path)?;
    println!("✓ Project is valid");
    println!(
        "  {} - pack {} ({} cells in {} groups, {:.2} Ah)",
        summary.name,
        summary.pack_id,
        summary.cell_count,
        summary.group_count,
        runtime.topology.pack_capacity_ah()
    );
    println!(
        "  drive cycle {} ({} rows)",
        summary.drive_cycle_id, summary.step_count
    );
    Ok(())
}

/// Progress renderer that redraws at most every 100 ms or on a stage change.
fn progress_printer() -> impl FnMut(RunProgressEvent) {
    let mut last_emit = Instant::now();
    let mut last_stage = None;
    move |event: RunProgressEvent| {
        let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
        if emit_now {
            render_cli_progress(&event);
            last_stage = Some(event.stage);
            last_emit = Instant::now();
        }
    }
}

fn cmd_run(project_path: &Path, run_id: Option<String>) -> AppResult<()> {
    let request = RunRequest {
        project_path,
        options: RunOptions {
            run_id,
            ..RunOptions::default()
        },
    };
    let mut printer = progress_printer();
    let response = run_service::start_run_with_progress(&request, Some(&mut printer))?;
    clear_progress_line();
    report(&response);
    Ok(())
}

fn cmd_resume(project_path: &Path, run_id: &str, checkpoint: Option<&Path>) -> AppResult<()> {
    let request = ResumeRequest {
        project_path,
        run_id,
        checkpoint_dir: checkpoint,
        options: RunOptions::default(),
    };
    let mut printer = progress_printer();
    let response = run_service::resume_run_with_progress(&request, Some(&mut printer))?;
    clear_progress_line();
    if let Some(row) = response.resumed_from_row {
        println!("Resumed at row {}", row);
    }
    report(&response);
    Ok(())
}

fn report(response: &RunResponse) {
    let manifest = &response.manifest;
    match &response.outcome {
        RunOutcome::Completed { reason } => {
            println!("✓ Run completed: {} ({})", response.run_id, reason.as_str())
        }
        RunOutcome::Paused => println!("⏸ Run paused: {}", response.run_id),
        RunOutcome::Stopped { mode } => {
            println!("■ Run stopped ({}): {}", mode.as_str(), response.run_id)
        }
        RunOutcome::TerminatedEarly { reason } => {
            println!("⚠ Run terminated early: {} ({})", response.run_id, reason)
        }
    }
    if manifest.resumable {
        println!("  Resumable from checkpoint");
    }
    println!(
        "  Simulated {:.1} s in {} sub-steps, {} result rows",
        manifest.sim_time_s, manifest.substeps, manifest.rows
    );
    if manifest.skipped_groups > 0 {
        println!("  Skipped groups: {}", manifest.skipped_groups);
    }
    print_timing_summary(&response.timing);
}

fn clear_progress_line() {
    print!("\r{:<120}\r", "");
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.sim) {
        (RunStage::Simulating, Some(p)) => {
            print!(
                "\r[{:>5.1}%] t={:.0}s/{:.0}s  row={}/{}  day={}  steps={}  elapsed={:.1}s",
                p.fraction_complete * 100.0,
                p.sim_time_s,
                p.time_cap_s,
                p.row_idx,
                p.rows_total,
                p.days_elapsed,
                p.substeps,
                event.elapsed_wall_s
            );
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn print_timing_summary(timing: &pf_app::RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    println!(
        "  Compile:    {:.3}s ({:.1}%)",
        timing.compile_time_s,
        100.0 * timing.compile_time_s / total
    );
    println!(
        "  Simulate:   {:.3}s ({:.1}%)",
        timing.simulate_time_s,
        100.0 * timing.simulate_time_s / total
    );
    if timing.checkpoint_time_s > 0.0 {
        println!("  Checkpoint: {:.3}s", timing.checkpoint_time_s);
    }
    println!("  Total:      {:.3}s", timing.total_time_s);
    println!("  Sub-steps this session: {}", timing.substeps);
}

fn cmd_runs(project_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(project_path)?;

    if runs.is_empty() {
        println!("No runs found for project: {}", project_path.display());
    } else {
        println!("Runs (most recent first):");
        for manifest in runs {
            println!(
                "  {}  {:<16} {}{}",
                manifest.run_id,
                manifest.status.as_str(),
                manifest.created_at,
                if manifest.resumable { "  [resumable]" } else { "" }
            );
        }
    }
    Ok(())
}

fn cmd_show_run(project_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = run_service::load_run(project_path, run_id)?;
    println!("\nRun {}:", manifest.run_id);
    println!("  Project: {}", manifest.project_name);
    println!("  Status:  {}", manifest.status.as_str());
    if let Some(reason) = &manifest.reason {
        println!("  Reason:  {}", reason);
    }
    println!("  Pack:    {}", manifest.fingerprints.pack_id);
    println!("  Cycle:   {}", manifest.fingerprints.drive_cycle_id);
    println!("  Created: {}", manifest.created_at);
    println!("  Updated: {}", manifest.updated_at);

    if records.is_empty() {
        println!("\nNo results recorded");
        return Ok(());
    }
    let summary = query::get_run_summary(&records)?;
    println!("\nResults:");
    println!("  Rows: {}", summary.record_count);
    println!(
        "  Time range: {:.3} - {:.3} s",
        summary.time_range.0, summary.time_range.1
    );
    println!("  Final module voltage: {:.4} V", summary.final_v_module);
    println!("  Lowest final cell SOC: {:.4}", summary.min_cell_soc);
    println!("  Peak temperature: {:.2} K", summary.max_temperature_k);

    println!("\nCells:");
    for label in query::list_cell_labels(&records) {
        println!("  {}", label);
    }
    Ok(())
}

fn cmd_export_series(
    project_path: &Path,
    run_id: &str,
    cell: &str,
    variable: &str,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, records) = run_service::load_run(project_path, run_id)?;
    let series = query::extract_cell_series(&records, cell, variable)?;

    let mut csv = String::from("time_s,value\n");
    for (t, val) in &series {
        csv.push_str(&format!("{},{}\n", t, val));
    }

    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!(
            "✓ Exported {} data points to {}",
            series.len(),
            path.display()
        );
    } else {
        print!("{}", csv);
    }

    Ok(())
}
