//! The editing engine a host application owns.
//!
//! An [`Editor`] bundles one project with its selection, gesture controller,
//! playback synchronizer, undo history and importer. Everything is injected
//! at construction; there is no process-wide state. All model changes go
//! through [`Editor::apply`], which records undo history and keeps the
//! selection and previews in step with the model.

use std::sync::Arc;

use montage_asset_importer::{AssetImporter, ImportQueue, ImportSource, MetadataProbe};
use montage_common::clock::FrameClock;
use montage_common::config::AppConfig;
use montage_common::error::{MontageError, MontageResult};
use montage_project_model::{
    AssetId, ClipId, CommandOutcome, EditCommand, GroupId, MediaKind, Project, ProjectError,
    TrackId,
};

use crate::history::History;
use crate::interaction::{
    GestureKind, GesturePhase, Intent, InteractionController, PointerEvent, TimelineGeometry,
};
use crate::playback::{PlaybackState, PlaybackSynchronizer, PreviewSurface, Resolution};
use crate::selection::Selection;

pub struct Editor {
    project: Project,
    selection: Selection,
    controller: InteractionController,
    playback: PlaybackSynchronizer,
    history: History,
    importer: AssetImporter,
    preview_fps: u32,
    resize_preview: Option<(ClipId, f64)>,
}

impl Editor {
    /// Engine for `project` using ffprobe for imports.
    pub fn new(project: Project, config: &AppConfig) -> Self {
        let importer = AssetImporter::with_ffprobe(config.import.clone());
        Self::with_importer(project, config, importer)
    }

    /// Engine with an explicit metadata probe.
    pub fn with_probe(project: Project, config: &AppConfig, probe: Arc<dyn MetadataProbe>) -> Self {
        let importer = AssetImporter::new(probe, config.import.clone());
        Self::with_importer(project, config, importer)
    }

    pub fn with_importer(project: Project, config: &AppConfig, importer: AssetImporter) -> Self {
        let geometry = TimelineGeometry::from_config(&config.editor, project.zoom_factor);
        Self {
            project,
            selection: Selection::new(),
            controller: InteractionController::new(geometry),
            playback: PlaybackSynchronizer::new(config.playback.drift_tolerance_secs),
            history: History::new(config.editor.history_depth),
            importer,
            preview_fps: config.playback.preview_fps,
            resize_preview: None,
        }
    }

    pub fn attach_surface(&mut self, kind: MediaKind, surface: Box<dyn PreviewSurface>) {
        self.playback.attach_surface(kind, surface);
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn resolution(&self) -> &Resolution {
        self.playback.last_resolution()
    }

    pub fn gesture_phase(&self) -> GesturePhase {
        self.controller.phase()
    }

    pub fn active_gesture(&self) -> Option<GestureKind> {
        self.controller.active_gesture()
    }

    /// Duration shown for a clip being resized, before it is committed.
    pub fn resize_preview(&self) -> Option<(ClipId, f64)> {
        self.resize_preview
    }

    pub fn import_queue(&self) -> &ImportQueue {
        self.importer.queue()
    }

    // ── Edits ───────────────────────────────────────────────────────────

    /// Apply a command to the project, recording it for undo.
    pub fn apply(&mut self, command: EditCommand) -> Result<CommandOutcome, ProjectError> {
        let label = command.label();
        let content_edit = command.is_content_edit();
        let before = (content_edit && !self.history.in_batch()).then(|| self.project.clone());
        if let EditCommand::SetZoom { pixels_per_second } = &command {
            self.controller.set_pixels_per_second(*pixels_per_second);
        }

        let outcome = self.project.apply(command)?;
        if content_edit {
            // Inside a batch this only marks the batch as changed.
            self.history
                .record(label, before.as_ref().unwrap_or(&self.project));
        }
        if let CommandOutcome::ClipRemoved(clip) = &outcome {
            self.selection.remove_clip(clip.id);
        }
        self.selection.sync(&self.project);
        self.playback.refresh(&self.project);
        Ok(outcome)
    }

    /// Place an asset on a track.
    pub fn add_clip(
        &mut self,
        track_id: TrackId,
        asset_id: AssetId,
        start_secs: f64,
    ) -> Result<ClipId, ProjectError> {
        match self.apply(EditCommand::AddClip {
            track_id,
            asset_id,
            start_secs,
            group_id: None,
        })? {
            CommandOutcome::ClipAdded(id) => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    /// Drop a picture and its audio sibling at once, linked in a new group.
    pub fn add_linked_clips(
        &mut self,
        video: (TrackId, AssetId),
        audio: (TrackId, AssetId),
        start_secs: f64,
    ) -> Result<(ClipId, ClipId), ProjectError> {
        let group = self.project.allocate_group_id();
        self.history.begin_batch("Add linked clips", &self.project);
        let result = self.add_grouped(video, start_secs, group).and_then(|picture| {
            self.add_grouped(audio, start_secs, group)
                .map(|sound| (picture, sound))
        });
        if result.is_err() {
            self.rollback_batch();
        } else {
            self.history.end_batch();
        }
        result
    }

    fn add_grouped(
        &mut self,
        (track_id, asset_id): (TrackId, AssetId),
        start_secs: f64,
        group: GroupId,
    ) -> Result<ClipId, ProjectError> {
        match self.apply(EditCommand::AddClip {
            track_id,
            asset_id,
            start_secs,
            group_id: Some(group),
        })? {
            CommandOutcome::ClipAdded(id) => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    /// Drop the open batch and restore the project it started from.
    fn rollback_batch(&mut self) {
        if let Some(before) = self.history.abort_batch() {
            self.restore(before);
        }
    }

    // ── Selection ───────────────────────────────────────────────────────

    pub fn select(&mut self, clip_id: ClipId, additive: bool) -> bool {
        self.selection.select(&self.project, clip_id, additive)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Link all selected clips under a fresh group id.
    pub fn group_selection(&mut self) -> Result<GroupId, ProjectError> {
        let command = self.selection.group_command(&mut self.project)?;
        let EditCommand::SetGroup {
            group_id: Some(group),
            ..
        } = &command
        else {
            return Err(ProjectError::InvalidGroup {
                count: self.selection.len(),
            });
        };
        let group = *group;
        self.apply(command)?;
        Ok(group)
    }

    /// Clear the group of every selected clip, then keep only the focused
    /// clip selected.
    pub fn ungroup_selection(&mut self) -> Result<(), ProjectError> {
        if let Some(command) = self.selection.ungroup_command() {
            self.apply(command)?;
        }
        self.selection.narrow_to_focused();
        Ok(())
    }

    /// Delete every selected clip as one undo step.
    pub fn delete_selected(&mut self) -> Result<usize, ProjectError> {
        let ids = self.selection.clip_ids();
        if ids.is_empty() {
            return Ok(0);
        }
        self.history.begin_batch("Delete clips", &self.project);
        for clip_id in &ids {
            if let Err(e) = self.apply(EditCommand::DeleteClip { clip_id: *clip_id }) {
                self.rollback_batch();
                return Err(e);
            }
        }
        self.history.end_batch();
        Ok(ids.len())
    }

    /// Split every selected clip under the playhead. Returns the new pieces.
    pub fn split_at_playhead(&mut self) -> Result<Vec<ClipId>, ProjectError> {
        let at_secs = self.project.current_time_secs;
        let targets: Vec<ClipId> = self
            .selection
            .clip_ids()
            .into_iter()
            .filter(|id| {
                self.project
                    .clip(*id)
                    .is_some_and(|c| c.start_secs < at_secs && at_secs < c.end_secs())
            })
            .collect();
        if targets.is_empty() {
            return Ok(vec![]);
        }

        self.history.begin_batch("Split clips", &self.project);
        let mut created = vec![];
        for clip_id in targets {
            match self.apply(EditCommand::SplitClip { clip_id, at_secs }) {
                Ok(CommandOutcome::ClipSplit { created: id, .. }) => created.push(id),
                Ok(other) => {
                    self.rollback_batch();
                    return Err(unexpected(other));
                }
                Err(e) => {
                    self.rollback_batch();
                    return Err(e);
                }
            }
        }
        self.history.end_batch();
        Ok(created)
    }

    // ── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.project) {
            Some(previous) => {
                self.restore(previous);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.project) {
            Some(next) => {
                self.restore(next);
                true
            }
            None => false,
        }
    }

    /// Swap in a snapshot, keeping the playhead, zoom and asset library
    /// where they are.
    fn restore(&mut self, mut snapshot: Project) {
        snapshot.adopt_library(&self.project);
        snapshot.current_time_secs = self.project.current_time_secs;
        snapshot.zoom_factor = self.project.zoom_factor;
        self.project = snapshot;
        self.selection.sync(&self.project);
        self.playback.refresh(&self.project);
    }

    // ── Pointer input ───────────────────────────────────────────────────

    pub fn pointer_press(&mut self, event: PointerEvent) -> Result<(), ProjectError> {
        let intents = self
            .controller
            .press(&self.project, &self.selection, event);
        self.dispatch(intents)
    }

    pub fn pointer_move(&mut self, event: PointerEvent) -> Result<(), ProjectError> {
        let intents = self
            .controller
            .pointer_move(&self.project, &self.selection, event);
        self.dispatch(intents)
    }

    pub fn pointer_release(&mut self, event: PointerEvent) -> Result<(), ProjectError> {
        let intents = self
            .controller
            .release(&self.project, &self.selection, event);
        self.resize_preview = None;
        self.dispatch(intents)
    }

    /// Handle controller intents in order. Stops at the first failed edit;
    /// an open batch is still closed so history stays consistent.
    fn dispatch(&mut self, intents: Vec<Intent>) -> Result<(), ProjectError> {
        let mut failure = None;
        for intent in intents {
            match intent {
                Intent::Edit(command) if failure.is_none() => {
                    if let Err(e) = self.apply(command) {
                        tracing::warn!(error = %e, "Gesture edit rejected");
                        failure = Some(e);
                    }
                }
                Intent::Edit(_) => {}
                Intent::Seek(time) => {
                    self.playback.seek(&mut self.project, time);
                }
                Intent::ClearSelection => self.selection.clear(),
                Intent::Select { clip_id, additive } => {
                    self.selection.select(&self.project, clip_id, additive);
                }
                Intent::PreviewLevel { clip_id, level } => {
                    self.playback.preview_level(clip_id, level);
                }
                Intent::PreviewResize {
                    clip_id,
                    duration_secs,
                } => self.resize_preview = Some((clip_id, duration_secs)),
                Intent::BeginBatch { label } => self.history.begin_batch(label, &self.project),
                Intent::EndBatch => {
                    self.history.end_batch();
                }
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ── Playback ────────────────────────────────────────────────────────

    pub fn play(&mut self) -> Resolution {
        self.playback.play(&mut self.project)
    }

    pub fn pause(&mut self) {
        self.playback.pause();
    }

    pub fn stop(&mut self) -> Resolution {
        self.playback.stop(&mut self.project)
    }

    pub fn seek(&mut self, time_secs: f64) -> Resolution {
        self.playback.seek(&mut self.project, time_secs)
    }

    /// Advance playback by `elapsed_secs` and apply finished imports.
    pub fn tick(&mut self, elapsed_secs: f64) -> Resolution {
        if self.importer.poll_completions(&mut self.project) > 0 {
            self.playback.refresh(&self.project);
        }
        self.playback.tick(&mut self.project, elapsed_secs)
    }

    /// Drive playback from a frame timer until it stops playing.
    ///
    /// Starts playback if it is not already running. Returns the number of
    /// ticks run.
    pub async fn run_playback(&mut self) -> u64 {
        let mut interval = tokio::time::interval(FrameClock::interval_for_fps(self.preview_fps));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut clock = FrameClock::default();
        let mut ticks = 0;

        if !self.playback.is_playing() {
            self.play();
        }
        clock.tick();
        tracing::info!(fps = self.preview_fps, time = self.project.current_time_secs, "Preview loop started");

        while self.playback.is_playing() {
            interval.tick().await;
            let elapsed = clock.tick();
            self.tick(elapsed);
            ticks += 1;
        }

        tracing::info!(ticks, time = self.project.current_time_secs, "Preview loop finished");
        ticks
    }

    // ── Imports ─────────────────────────────────────────────────────────

    /// Start importing a file. The returned asset is processing until a
    /// later tick applies the probe result.
    pub fn import_asset(&mut self, source: ImportSource) -> MontageResult<AssetId> {
        self.importer.import_asset(&mut self.project, source)
    }

    /// Apply import results that are already available.
    pub fn poll_imports(&mut self) -> usize {
        let applied = self.importer.poll_completions(&mut self.project);
        if applied > 0 {
            self.playback.refresh(&self.project);
        }
        applied
    }

    /// Wait for every running import to finish.
    pub async fn wait_for_imports(&mut self) {
        self.importer.wait_idle(&mut self.project).await;
        self.playback.refresh(&self.project);
    }

    /// Remove an asset no clip uses. Like imports, this is not an undo step.
    pub fn remove_asset(&mut self, asset_id: AssetId) -> MontageResult<()> {
        self.project
            .remove_asset(asset_id)
            .map_err(MontageError::from)?;
        Ok(())
    }
}

fn unexpected(outcome: CommandOutcome) -> ProjectError {
    ProjectError::ValidationError {
        message: format!("unexpected command outcome {outcome:?}"),
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("project", &self.project.name)
            .field("selection", &self.selection)
            .field("playback", &self.playback)
            .field("gesture", &self.controller.phase())
            .finish()
    }
}
