pub mod channel;
pub mod members;
pub mod state;

pub use channel::PresenceChannel;
pub use members::MemberList;
pub use state::{ConnectionStatus, PresenceState, PresenceView};
