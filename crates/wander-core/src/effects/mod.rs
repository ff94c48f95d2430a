//! Collaborator effect traits
//!
//! The synchronizer reaches the outside world only through these traits,
//! so hosts inject production transports and tests inject scripted
//! fakes. Each trait carries an `Arc<T>` blanket impl so components can
//! share one collaborator instance.

pub mod api;
pub mod bus;
pub mod time;

pub use api::{EngagementApi, FollowToggled, LikeToggled};
pub use bus::{ChannelName, EventReceiver, PushEvent, RealtimeBus};
pub use time::{Clock, SystemClock};
