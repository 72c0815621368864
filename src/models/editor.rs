use serde::{Deserialize, Serialize};

use crate::models::Member;

/// Editor snapshot returned by the console for one workflow version
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorState {
    pub members: Vec<Member>,
}
