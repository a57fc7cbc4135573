use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{Result, MuxError};
use crate::matcher::{EpisodeId, EpisodeMatcher};
use crate::media::{list_media_files, MediaFile};
use crate::mux::{MergeToolFactory, MergeToolTrait, MuxCommand, MuxCommandBuilder, OutputSink, TracingSink};

/// One video ready to be merged with its audio tracks
#[derive(Debug, Clone)]
pub struct MergeTask {
    pub video: MediaFile,
    pub episode: EpisodeId,
    /// Matched audio files in match order
    pub audios: Vec<MediaFile>,
    pub output_path: PathBuf,
    pub command: MuxCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    Succeeded,
    Failed,
    SkippedNoEpisode,
    SkippedNoAudio,
    SkippedExisting,
    /// Another video of the batch already produces the same output file
    SkippedDuplicate,
}

impl MergeStatus {
    pub fn is_skip(&self) -> bool {
        matches!(
            self,
            MergeStatus::SkippedNoEpisode
                | MergeStatus::SkippedNoAudio
                | MergeStatus::SkippedExisting
                | MergeStatus::SkippedDuplicate
        )
    }
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Video file name the outcome belongs to
    pub label: String,
    pub status: MergeStatus,
    pub output_path: Option<PathBuf>,
}

/// Decision taken for one video before anything runs
#[derive(Debug, Clone)]
pub enum PlanEntry {
    Ready(MergeTask),
    Skipped { label: String, status: MergeStatus, reason: String },
}

#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<MergeOutcome>,
}

impl BatchSummary {
    pub fn count(&self, status: MergeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(MergeStatus::Succeeded)
    }

    pub fn failed(&self) -> usize {
        self.count(MergeStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_skip()).count()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Batch orchestrator: pairs every video with its audio tracks and runs the
/// merge tool on them with bounded parallelism
pub struct Workflow {
    config: Config,
    matcher: EpisodeMatcher,
    command_builder: MuxCommandBuilder,
    tool: Arc<dyn MergeToolTrait>,
}

impl Workflow {
    pub fn new(config: Config) -> Result<Self> {
        let sink: Arc<dyn OutputSink> = Arc::new(TracingSink::new());
        let tool = MergeToolFactory::create_tool(config.mux.clone(), sink);
        Self::with_tool(config, tool)
    }

    /// Build a workflow around an already constructed merge tool
    pub fn with_tool(config: Config, tool: Arc<dyn MergeToolTrait>) -> Result<Self> {
        config.validate()?;
        let matcher = EpisodeMatcher::from_config(&config.matching)?;
        let command_builder = MuxCommandBuilder::new(&config.mux.binary_path);

        Ok(Self {
            config,
            matcher,
            command_builder,
            tool,
        })
    }

    /// Whether the merge tool can be launched
    pub async fn check_tool(&self) -> bool {
        self.tool.is_available().await
    }

    /// Fail with the single fatal log line when the merge tool cannot be launched
    pub async fn ensure_tool(&self) -> Result<()> {
        if self.check_tool().await {
            return Ok(());
        }
        let e = MuxError::ToolUnavailable(format!("no '{}' in the PATH", self.config.mux.binary_path));
        error!("{}", e);
        Err(e)
    }

    /// Decide what would happen to every video without running anything
    pub fn plan(&self) -> Result<Vec<PlanEntry>> {
        let matching = &self.config.matching;
        let videos = list_media_files(&self.config.paths.video_dir, &matching.video_extension, matching.sort_files)?;
        let audios = list_media_files(&self.config.paths.audio_dir, &matching.audio_extension, matching.sort_files)?;

        info!("Found {} video and {} audio files", videos.len(), audios.len());

        let mut outputs = HashSet::new();
        let mut plan = Vec::with_capacity(videos.len());
        for video in videos {
            let entry = match self.plan_video(video, &audios)? {
                PlanEntry::Ready(task) if !outputs.insert(task.output_path.clone()) => PlanEntry::Skipped {
                    reason: format!("Output {} is already produced by another video", task.output_path.display()),
                    label: task.video.name,
                    status: MergeStatus::SkippedDuplicate,
                },
                entry => entry,
            };
            plan.push(entry);
        }
        Ok(plan)
    }

    fn plan_video(&self, video: MediaFile, audios: &[MediaFile]) -> Result<PlanEntry> {
        let label = video.name.clone();
        let stem = video.stem();

        let Some(episode) = self.matcher.extract_episode_id(&stem) else {
            return Ok(PlanEntry::Skipped {
                label,
                status: MergeStatus::SkippedNoEpisode,
                reason: MuxError::NoEpisodeId(stem).to_string(),
            });
        };

        let matched = self.matcher.match_audios(&episode, audios)?;
        if matched.is_empty() {
            return Ok(PlanEntry::Skipped {
                label,
                status: MergeStatus::SkippedNoAudio,
                reason: MuxError::NoMatchingAudio(episode.to_string()).to_string(),
            });
        }

        let output_path = self.output_path(&stem);
        if !self.config.mux.overwrite && output_path.exists() {
            return Ok(PlanEntry::Skipped {
                label,
                status: MergeStatus::SkippedExisting,
                reason: format!("Output {} already exists", output_path.display()),
            });
        }

        let audio_paths: Vec<&Path> = matched.iter().map(|a| a.path.as_path()).collect();
        let command = self.command_builder.merge_audio(
            video.path.as_path(),
            &audio_paths,
            output_path.as_path(),
            &self.config.mux.language,
            &self.config.mux.track_name,
        );

        Ok(PlanEntry::Ready(MergeTask {
            video,
            episode,
            audios: matched,
            output_path,
            command,
        }))
    }

    fn output_path(&self, stem: &str) -> PathBuf {
        let extension = self.config.mux.container_extension.trim_start_matches('.');
        self.config.paths.output_dir.join(format!("{}.{}", stem, extension))
    }

    /// Merge every video that has matching audio. Only an unusable merge tool
    /// or unreadable input directories fail the run; per-video problems end
    /// up in the summary.
    pub async fn run(&self) -> Result<BatchSummary> {
        self.ensure_tool().await?;

        fs::create_dir_all(&self.config.paths.output_dir).await?;

        let plan = self.plan()?;
        let semaphore = Arc::new(Semaphore::new(self.config.mux.max_concurrency));
        let mut summary = BatchSummary::default();
        let mut tasks = JoinSet::new();
        let mut launched = Vec::new();

        for entry in plan {
            match entry {
                PlanEntry::Skipped { label, status, reason } => {
                    info!("Merge processing: {}", label);
                    warn!("[{}] {}. Skip.", label, reason);
                    summary.outcomes.push(MergeOutcome {
                        label,
                        status,
                        output_path: None,
                    });
                }
                PlanEntry::Ready(task) => {
                    info!("Merge processing: {}", task.video.name);
                    launched.push(task.video.name.clone());
                    tasks.spawn(execute_task(Arc::clone(&self.tool), Arc::clone(&semaphore), task));
                }
            }
        }

        let mut finished = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => {
                    finished.insert(outcome.label.clone());
                    summary.outcomes.push(outcome);
                }
                Err(e) => error!("Merge task aborted: {}", e),
            }
        }

        for label in launched.into_iter().filter(|label| !finished.contains(label)) {
            summary.outcomes.push(MergeOutcome {
                label,
                status: MergeStatus::Failed,
                output_path: None,
            });
        }

        info!(
            "Merge done: {} succeeded, {} failed, {} skipped",
            summary.succeeded(),
            summary.failed(),
            summary.skipped()
        );

        Ok(summary)
    }
}

async fn execute_task(
    tool: Arc<dyn MergeToolTrait>,
    semaphore: Arc<Semaphore>,
    task: MergeTask,
) -> MergeOutcome {
    let label = task.video.name.clone();

    let status = match semaphore.acquire().await {
        Ok(_permit) => {
            info!("[{}] Launch {}", label, task.command.display_line());
            if tool.run(&task.command, &label).await {
                info!("[{}] Merge success: {}", label, task.output_path.display());
                MergeStatus::Succeeded
            } else {
                error!("[{}] Error in merge.", label);
                MergeStatus::Failed
            }
        }
        Err(e) => {
            error!("[{}] No merge slot available: {}", label, e);
            MergeStatus::Failed
        }
    };

    MergeOutcome {
        label,
        status,
        output_path: Some(task.output_path),
    }
}
