//! Montage Project Model
//!
//! Defines the core data contracts for Montage projects:
//! - **Assets:** Imported media, their kind, length and import status
//! - **Tracks & clips:** Time-ordered placements of assets on typed lanes
//! - **Commands:** Explicit edit objects applied through [`Project::apply`]
//! - **Persistence:** The store interface and its disk/memory implementations
//!
//! All times are in seconds on the timeline unless a name says otherwise.

pub mod asset;
pub mod command;
pub mod ids;
pub mod project;
pub mod store;
pub mod track;

pub use asset::*;
pub use command::*;
pub use ids::*;
pub use project::*;
pub use store::*;
pub use track::*;
