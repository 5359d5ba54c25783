//! File job pipeline.
//!
//! This module handles:
//! - Deriving file jobs from flattened items
//! - Running PREPROCESS, POSTPROCESS and PERSIST in order per job
//! - Isolating job failures and collecting outcomes into a run report

pub mod commands;
pub mod job;
pub mod report;

pub use commands::{copy_dir_recursive, persist, postprocess, preprocess, run_stage};
pub use job::{FileJob, Stage};
pub use report::{EnvironmentReport, JobOutcome, JobStatus, RunReport};

use crate::adapters::Adapters;
use crate::context::{EnvironmentContext, FlatItem};
use rayon::prelude::*;
use std::path::Path;

/// Run a job's stages in order, stopping at the first failure.
pub fn run_job(mut job: FileJob, adapters: &Adapters) -> JobOutcome {
	let mut stages_run = Vec::with_capacity(job.stages.len());

	while let Some(stage) = job.stages.pop_front() {
		tracing::debug!(
			source = %job.source.display(),
			target = %job.target().display(),
			"Iterate '{}' file item",
			stage
		);

		if let Err(e) = run_stage(stage, &mut job, adapters) {
			tracing::error!(key = %job.key, stage = %stage, error = %e, "job failed");
			return JobOutcome {
				key: job.key.clone(),
				source: Some(job.source.clone()),
				target: Some(job.target()),
				stages_run,
				status: JobStatus::failed(Some(stage), &e),
			};
		}
		stages_run.push(stage);
	}

	JobOutcome {
		key: job.key.clone(),
		source: Some(job.source.clone()),
		target: Some(job.target()),
		stages_run,
		status: JobStatus::Succeeded,
	}
}

/// Derive and run the job for one item.
pub fn run_item(
	key: &str,
	item: &FlatItem,
	source_root: &Path,
	target_root: &Path,
	adapters: &Adapters,
) -> JobOutcome {
	match FileJob::from_item(key, item, source_root, target_root) {
		Ok(job) => run_job(job, adapters),
		Err(e) => {
			tracing::error!(key, error = %e, "job failed");
			JobOutcome {
				key: key.to_string(),
				source: Some(source_root.join(item.source_path())),
				target: None,
				stages_run: Vec::new(),
				status: JobStatus::failed(None, &e),
			}
		}
	}
}

/// Run every job of an expanded environment.
///
/// Jobs run in parallel on the current rayon pool and are joined before
/// returning. A failing job never stops its siblings.
pub fn run_environment(
	env: &EnvironmentContext,
	source_root: &Path,
	output_root: &Path,
	adapters: &Adapters,
) -> EnvironmentReport {
	let target_root = output_root.join(&env.key);
	tracing::info!(environment = %env.key, jobs = env.value.len(), "Compiling Environment");

	let outcomes = env
		.value
		.par_iter()
		.map(|(key, item)| run_item(key, item, source_root, &target_root, adapters))
		.collect();

	EnvironmentReport {
		name: env.key.clone(),
		outcomes,
	}
}
