use crate::models::Member;

/// Members of a scope in arrival order, unique by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberList {
    members: Vec<Member>,
}

impl MemberList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member unless its id is already present.
    ///
    /// A repeated join keeps the first profile received. Returns whether the
    /// list changed.
    pub fn join(&mut self, member: Member) -> bool {
        if self.contains(&member.id) {
            return false;
        }
        self.members.push(member);
        true
    }

    /// Remove a member by id. Unknown ids are ignored.
    pub fn leave(&mut self, member_id: &str) -> bool {
        match self.members.iter().position(|m| m.id == member_id) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn seed(&mut self, members: impl IntoIterator<Item = Member>) -> bool {
        members
            .into_iter()
            .fold(false, |changed, member| self.join(member) || changed)
    }

    pub fn contains(&self, member_id: &str) -> bool {
        self.members.iter().any(|m| m.id == member_id)
    }

    pub fn as_slice(&self) -> &[Member] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &MemberList) -> Vec<&str> {
        list.as_slice().iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn repeated_join_does_not_duplicate() {
        let mut list = MemberList::new();
        assert!(list.join(Member::new("a", "Ada", "a.png")));
        assert!(!list.join(Member::new("a", "Ada", "a.png")));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn rejoin_keeps_the_first_profile() {
        let mut list = MemberList::new();
        list.join(Member::new("a", "Ada", "1"));
        list.join(Member::new("b", "Bob", "b.png"));
        assert!(!list.join(Member::new("a", "Eve", "2")));
        assert_eq!(ids(&list), vec!["a", "b"]);
        assert_eq!(list.as_slice()[0], Member::new("a", "Ada", "1"));
    }

    #[test]
    fn leave_of_unknown_member_is_a_no_op() {
        let mut list = MemberList::new();
        list.join(Member::new("a", "Ada", "a.png"));
        let before = list.clone();
        assert!(!list.leave("zz"));
        assert_eq!(list, before);
    }

    #[test]
    fn leave_preserves_arrival_order() {
        let mut list = MemberList::new();
        list.join(Member::new("a", "Ada", "a.png"));
        list.join(Member::new("b", "Bob", "b.png"));
        list.join(Member::new("c", "Cy", "c.png"));
        assert!(list.leave("a"));
        assert_eq!(ids(&list), vec!["b", "c"]);
        assert!(list.leave("c"));
        assert_eq!(ids(&list), vec!["b"]);
    }

    #[test]
    fn seed_merges_without_duplicates() {
        let mut list = MemberList::new();
        list.join(Member::new("b", "Bob", "b.png"));
        let changed = list.seed(vec![
            Member::new("a", "Ada", "a.png"),
            Member::new("b", "Bob", "b.png"),
        ]);
        assert!(changed);
        assert_eq!(ids(&list), vec!["b", "a"]);
        assert!(!list.seed(Vec::new()));
        assert!(list.contains("a"));
    }
}
