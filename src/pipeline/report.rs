//! Run report types.
//!
//! Contains types for representing the outcome of a build run.

use crate::error::{FailureKind, TreeprocessError};
use crate::pipeline::job::Stage;
use colored::Colorize;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Status of a single job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
	Succeeded,
	Failed {
		/// Stage that failed; `None` when the job could not be derived.
		stage: Option<Stage>,
		kind: FailureKind,
		message: String,
	},
}

impl JobStatus {
	pub fn failed(stage: Option<Stage>, error: &TreeprocessError) -> Self {
		JobStatus::Failed {
			stage,
			kind: error.kind(),
			message: error_chain(error),
		}
	}

	pub fn is_failure(&self) -> bool {
		matches!(self, JobStatus::Failed { .. })
	}
}

/// Render an error and its sources on one line.
fn error_chain(error: &TreeprocessError) -> String {
	let mut message = error.to_string();
	let mut source = std::error::Error::source(error);
	while let Some(cause) = source {
		let _ = write!(message, ": {cause}");
		source = cause.source();
	}
	message
}

/// Outcome of one job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
	pub key: String,
	pub source: Option<PathBuf>,
	pub target: Option<PathBuf>,
	/// Stages that completed successfully, in order.
	pub stages_run: Vec<Stage>,
	pub status: JobStatus,
}

/// Outcomes of every job in one environment.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentReport {
	pub name: String,
	pub outcomes: Vec<JobOutcome>,
}

impl EnvironmentReport {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			outcomes: Vec::new(),
		}
	}

	pub fn success_count(&self) -> usize {
		self.outcomes
			.iter()
			.filter(|outcome| !outcome.status.is_failure())
			.count()
	}

	pub fn failure_count(&self) -> usize {
		self.outcomes.len() - self.success_count()
	}
}

/// Report of a whole multi-environment run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
	pub environments: Vec<EnvironmentReport>,
}

impl RunReport {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, environment: EnvironmentReport) {
		self.environments.push(environment);
	}

	pub fn success_count(&self) -> usize {
		self.environments
			.iter()
			.map(EnvironmentReport::success_count)
			.sum()
	}

	pub fn failure_count(&self) -> usize {
		self.environments
			.iter()
			.map(EnvironmentReport::failure_count)
			.sum()
	}

	pub fn has_failures(&self) -> bool {
		self.failure_count() > 0
	}

	/// Failed jobs with their environment name.
	pub fn failures(&self) -> impl Iterator<Item = (&str, &JobOutcome)> {
		self.environments.iter().flat_map(|env| {
			env.outcomes
				.iter()
				.filter(|outcome| outcome.status.is_failure())
				.map(move |outcome| (env.name.as_str(), outcome))
		})
	}

	/// Human-readable summary with failures highlighted.
	pub fn render(&self) -> String {
		let mut out = String::new();

		for env in &self.environments {
			let _ = writeln!(
				out,
				"{} {} ({} ok, {} failed)",
				"Environment".green(),
				env.name.bold(),
				env.success_count(),
				env.failure_count()
			);
		}

		for (env, outcome) in self.failures() {
			if let JobStatus::Failed {
				stage,
				kind,
				message,
			} = &outcome.status
			{
				let stage = stage.map_or("PREPARE", |s| s.as_str());
				let _ = writeln!(
					out,
					"  {} [{}] {} {}: {}",
					"error".red().bold(),
					env,
					outcome.key,
					format!("({} {})", stage, kind.as_str()).dimmed(),
					message.red()
				);
			}
		}

		let summary = format!(
			"{} jobs succeeded, {} failed",
			self.success_count(),
			self.failure_count()
		);
		let _ = writeln!(
			out,
			"{}",
			if self.has_failures() {
				summary.red().bold()
			} else {
				summary.green().bold()
			}
		);
		out
	}
}
