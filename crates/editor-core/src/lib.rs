//! Montage Editor Core
//!
//! The interactive side of the timeline engine:
//!
//! - **Selection:** clip selection with group propagation
//! - **Interaction:** pointer gesture state machines (move, resize,
//!   level-fade, track reorder, scrub) that translate events into intents
//! - **Playback:** playhead advance, per-kind active clip resolution and
//!   preview surface synchronization
//! - **History:** snapshot undo/redo
//! - **Editor:** the engine instance tying them to one project

pub mod editor;
pub mod history;
pub mod interaction;
pub mod playback;
pub mod selection;

pub use editor::Editor;
pub use history::History;
pub use interaction::{
    GestureKind, GesturePhase, HitTarget, Intent, InteractionController, PointerEvent,
    TimelineGeometry,
};
pub use playback::{
    resolve, resolve_active, ActiveClip, PlaybackState, PlaybackSynchronizer, PreviewSurface,
    PriorityRule, Resolution,
};
pub use selection::{SelectedClip, Selection};
