use serde::Serialize;
use tracing::debug;

use crate::models::{Member, ReceivedMessage, ScopeKey};
use crate::presence::MemberList;

/// Lifecycle of the socket behind a published view
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Open,
    /// The socket ended without being asked to (error, timeout or server close)
    Closed,
}

/// What renderers see: the scope, the socket status and who is present.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceView {
    pub scope: Option<ScopeKey>,
    pub status: ConnectionStatus,
    pub members: Vec<Member>,
}

impl PresenceView {
    pub fn connecting(scope: ScopeKey) -> Self {
        Self {
            scope: Some(scope),
            status: ConnectionStatus::Connecting,
            members: Vec::new(),
        }
    }
}

/// Presence of one scope, driven by inbound socket events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PresenceState {
    #[default]
    Disconnected,
    Connected {
        scope: ScopeKey,
        members: MemberList,
    },
}

impl PresenceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter `Connected` for `scope` with an empty member list.
    pub fn open(&mut self, scope: ScopeKey) {
        *self = PresenceState::Connected {
            scope,
            members: MemberList::new(),
        };
    }

    /// Apply an inbound event. Returns whether the member list changed.
    pub fn receive(&mut self, msg: ReceivedMessage) -> bool {
        let members = match self {
            PresenceState::Connected { members, .. } => members,
            PresenceState::Disconnected => {
                debug!("Ignoring {} event while disconnected", msg.name());
                return false;
            }
        };

        match msg {
            ReceivedMessage::MemberJoined {
                member_id,
                name,
                avatar,
            } => members.join(Member {
                id: member_id,
                name,
                avatar,
            }),
            ReceivedMessage::MemberLeft { member_id } => members.leave(&member_id),
            ReceivedMessage::Unknown => false,
        }
    }

    /// Merge a snapshot of members into the current list.
    pub fn seed(&mut self, snapshot: impl IntoIterator<Item = Member>) -> bool {
        match self {
            PresenceState::Connected { members, .. } => members.seed(snapshot),
            PresenceState::Disconnected => false,
        }
    }

    /// Enter `Disconnected`. Returns whether a connection was closed.
    pub fn close(&mut self) -> bool {
        !matches!(std::mem::take(self), PresenceState::Disconnected)
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, PresenceState::Connected { .. })
    }

    pub fn scope(&self) -> Option<&ScopeKey> {
        match self {
            PresenceState::Connected { scope, .. } => Some(scope),
            PresenceState::Disconnected => None,
        }
    }

    pub fn members(&self) -> &[Member] {
        match self {
            PresenceState::Connected { members, .. } => members.as_slice(),
            PresenceState::Disconnected => &[],
        }
    }

    pub fn view(&self, status: ConnectionStatus) -> PresenceView {
        PresenceView {
            scope: self.scope().cloned(),
            status,
            members: self.members().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(id: &str, name: &str) -> ReceivedMessage {
        ReceivedMessage::MemberJoined {
            member_id: id.to_string(),
            name: name.to_string(),
            avatar: format!("https://avatars/{id}.png"),
        }
    }

    fn left(id: &str) -> ReceivedMessage {
        ReceivedMessage::MemberLeft {
            member_id: id.to_string(),
        }
    }

    fn ids(state: &PresenceState) -> Vec<&str> {
        state.members().iter().map(|m| m.id.as_str()).collect()
    }

    fn scope(version: u32) -> ScopeKey {
        ScopeKey::new("p1", "w1", version).unwrap()
    }

    #[test]
    fn tracks_joined_but_not_left_members() {
        let mut state = PresenceState::new();
        state.open(scope(1));

        let events = vec![
            joined("a", "Ada"),
            joined("b", "Bob"),
            left("a"),
            joined("c", "Cy"),
            joined("a", "Ada"),
            left("b"),
            joined("c", "Cyrus"),
        ];
        for event in events {
            state.receive(event);
        }

        assert_eq!(ids(&state), vec!["c", "a"]);
        assert_eq!(state.members()[0].name, "Cy");
    }

    #[test]
    fn removal_keeps_survivor_order() {
        let mut state = PresenceState::new();
        state.open(scope(1));
        state.receive(joined("a", "Ada"));
        state.receive(joined("b", "Bob"));
        assert!(state.receive(left("a")));
        assert_eq!(ids(&state), vec!["b"]);
    }

    #[test]
    fn duplicate_join_and_unknown_leave_are_no_ops() {
        let mut state = PresenceState::new();
        state.open(scope(1));
        assert!(state.receive(joined("a", "Ada")));
        assert!(!state.receive(joined("a", "Ada")));
        assert!(!state.receive(left("nobody")));
        assert_eq!(ids(&state), vec!["a"]);
    }

    #[test]
    fn rejoin_after_leave_takes_the_new_profile() {
        let mut state = PresenceState::new();
        state.open(scope(1));
        state.receive(joined("a", "Ada"));
        assert!(!state.receive(joined("a", "Eve")));
        assert_eq!(state.members()[0].name, "Ada");

        state.receive(left("a"));
        assert!(state.receive(joined("a", "Eve")));
        assert_eq!(state.members()[0].name, "Eve");
    }

    #[test]
    fn unknown_events_leave_members_untouched() {
        let mut state = PresenceState::new();
        state.open(scope(1));
        state.receive(joined("a", "Ada"));
        let before = state.clone();
        assert!(!state.receive(ReceivedMessage::Unknown));
        assert_eq!(state, before);
    }

    #[test]
    fn reopening_discards_previous_members() {
        let mut state = PresenceState::new();
        state.open(scope(1));
        state.receive(joined("a", "Ada"));
        state.open(scope(2));
        assert_eq!(state.scope(), Some(&scope(2)));
        assert!(state.members().is_empty());
    }

    #[test]
    fn disconnected_state_ignores_events() {
        let mut state = PresenceState::new();
        assert!(!state.receive(joined("a", "Ada")));
        assert!(!state.seed(vec![Member::new("a", "Ada", "a.png")]));
        assert!(state.members().is_empty());
        assert_eq!(state.scope(), None);
    }

    #[test]
    fn close_is_idempotent() {
        let mut state = PresenceState::new();
        state.open(scope(1));
        state.receive(joined("a", "Ada"));
        assert!(state.close());
        assert!(!state.close());
        assert!(!state.is_connected());
        assert_eq!(state.view(ConnectionStatus::Disconnected), PresenceView::default());
    }

    #[test]
    fn seed_then_events_converge() {
        let mut state = PresenceState::new();
        state.open(scope(1));
        state.receive(joined("b", "Bob"));
        state.seed(vec![
            Member::new("a", "Ada", "a.png"),
            Member::new("b", "Bob", "https://avatars/b.png"),
        ]);
        state.receive(left("a"));
        assert_eq!(ids(&state), vec!["b"]);
    }
}
