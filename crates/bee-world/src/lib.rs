//! Bee World - the simulated game world
//!
//! - `ObjectTemplate` - shared sprite, mask, flags and event hooks
//! - `Instance` - one live entity with a physics body, alarms and data
//! - `Path` / `PathFollower` - waypoint routes and per-instance progress
//! - `Timeline` - frame-keyed actions
//! - `Registry` - named resources, closed once loading finishes
//! - `Room` - owns instances, physics and particle systems and steps them
//!   through the frame schedule

pub mod data;
pub mod instance;
pub mod object;
pub mod path;
pub mod registry;
pub mod room;
pub mod timeline;

pub use data::InstanceData;
pub use instance::{Instance, Relation, ALARM_COUNT};
pub use object::{EventSet, InstanceEvent, ObjectTemplate};
pub use path::{NodeUpdate, Path, PathEndAction, PathFollower, Waypoint};
pub use registry::Registry;
pub use room::{Room, RoomAction, RoomTimeline, TimelineHandle};
pub use timeline::{Timeline, TimelineStep};
