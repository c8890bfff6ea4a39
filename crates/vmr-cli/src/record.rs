// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `vmr record`: reset the VM for each task and hand it to the recorder UI

use crate::tasks;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;
use vmr_domain_types::{Size, TaskSpec};
use vmr_recorder::{OutputLayout, SessionSummary, TrajectoryRecorder, format_score};
use vmr_tui::{
    RecorderConfig, RecorderDependencies, RecorderExit, RecorderSettings, TerminalConfig, Theme,
    run_recorder,
};
use vmr_vm::{HttpController, VmInterface};

#[derive(Args, Clone, Debug)]
#[command(about = "Record demonstrations for a list of tasks")]
pub struct RecordArgs {
    /// JSON file mapping each domain to its task names
    #[arg(long, help = "Task list (default: <test-config-base-dir>/test_all.json)")]
    pub task_file: Option<PathBuf>,

    #[arg(long, default_value = "evaluation_examples")]
    pub test_config_base_dir: PathBuf,

    /// Only record tasks of this domain
    #[arg(long)]
    pub domain: Option<String>,

    #[arg(long, default_value = "./SFT")]
    pub result_dir: PathBuf,

    /// Automation server running inside the VM
    #[arg(long, env = "VMR_SERVER_URL", default_value = "http://localhost:5000")]
    pub server_url: Url,

    /// Harness that resets and scores tasks
    #[arg(long, env = "VMR_HARNESS_URL")]
    pub harness_url: Option<Url>,

    #[arg(long, default_value_t = 1920)]
    pub screen_width: u32,

    #[arg(long, default_value_t = 1080)]
    pub screen_height: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub request_timeout: u64,

    /// Recorder configuration file (TOML)
    #[arg(long, env = "VMR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seconds to wait after each action; overrides the configuration file
    #[arg(long)]
    pub action_settle: Option<f64>,

    /// Drag duration in seconds; overrides the configuration file
    #[arg(long)]
    pub drag_duration: Option<f64>,
}

impl RecordArgs {
    fn task_file(&self) -> PathBuf {
        self.task_file
            .clone()
            .unwrap_or_else(|| self.test_config_base_dir.join("test_all.json"))
    }

    /// The configuration file with command-line overrides applied.
    pub fn recorder_config(&self) -> Result<RecorderConfig> {
        let mut config = match &self.config {
            Some(path) => RecorderConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => RecorderConfig::default(),
        };
        if self.action_settle.is_some() || self.drag_duration.is_some() {
            let timing = config.timing.get_or_insert_with(Default::default);
            if let Some(v) = self.action_settle {
                timing.action_settle = Some(v);
            }
            if let Some(v) = self.drag_duration {
                timing.drag_duration = Some(v);
            }
        }
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.recorder_config()?;
        let settings = config.settings().context("Invalid recorder configuration")?;

        let tasks = tasks::load_tasks(
            &self.task_file(),
            &self.test_config_base_dir,
            self.domain.as_deref(),
        )?;
        info!(count = tasks.len(), "Loaded tasks");

        let controller = HttpController::new(
            self.server_url.clone(),
            self.harness_url.clone(),
            Duration::from_secs(self.request_timeout),
        )
        .context("Failed to create HTTP client")?;
        let vm = Arc::new(VmInterface::new(Arc::new(controller), config.vm_timings()));

        let total = tasks.len();
        for (i, task) in tasks.iter().enumerate() {
            println!(
                "[{}/{}] {}/{}: {}",
                i + 1,
                total,
                task.domain,
                task.name,
                task.instruction
            );
            match self.record_task(&vm, task, &settings).await? {
                Some((exit, summary)) => {
                    print_summary(&exit, &summary);
                    if exit.score.is_none() {
                        info!("Recording stopped, skipping remaining tasks");
                        break;
                    }
                }
                None => println!("  skipped: environment reset failed"),
            }
        }
        Ok(())
    }

    /// Record one task. Returns `None` when the VM could not be reset.
    async fn record_task(
        &self,
        vm: &Arc<VmInterface>,
        task: &TaskSpec,
        settings: &RecorderSettings,
    ) -> Result<Option<(RecorderExit, SessionSummary)>> {
        info!(domain = %task.domain, task = %task.name, "Starting task");
        if let Err(e) = vm.reset(task).await {
            error!(task = %task.name, error = %e, "Skipping task");
            return Ok(None);
        }

        let layout = OutputLayout::for_task(&self.result_dir, &task.domain, &task.name);
        let recorder = TrajectoryRecorder::create(layout, task)?.shared();

        if !vm.start_recording().await {
            warn!("Screen recording unavailable, continuing without video");
        }
        let initial_frame = match vm.screenshot_with_retry().await {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "No initial screenshot");
                None
            }
        };

        let exit = run_recorder(RecorderDependencies {
            vm: vm.clone(),
            recorder: recorder.clone(),
            settings: settings.clone(),
            instruction: task.instruction.clone(),
            screen_size: Size::new(self.screen_width, self.screen_height),
            initial_frame,
            terminal_config: TerminalConfig::default(),
            theme: Theme::default(),
        })
        .await?;

        let summary = recorder
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .summary();
        info!(
            steps = exit.steps,
            score = ?exit.score,
            duration = summary.duration_seconds,
            "Task finished"
        );
        Ok(Some((exit, summary)))
    }
}

fn print_summary(exit: &RecorderExit, summary: &SessionSummary) {
    let score = exit
        .score
        .map(format_score)
        .unwrap_or_else(|| "not evaluated".into());
    println!("  steps:    {}", summary.total_steps);
    println!("  duration: {}s", summary.duration_seconds);
    println!("  score:    {}", score);
    println!("  saved to: {}", summary.task_dir.display());
}
