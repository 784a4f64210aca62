// Latest published cycle: pull via query, push via broadcast.
pub mod events;
pub mod state;

pub use events::PublishEvent;
pub use state::{DistributionState, Published};

/// Broadcast buffer: each cycle emits two events, so this covers a subscriber
/// falling several cycles behind before it has to resync.
pub const DEFAULT_EVENT_CAPACITY: usize = 16;
