use serde::{Deserialize, Serialize};

/// The six remote calls a directory supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryOperation {
    ListGroups,
    CreateGroup,
    DeleteGroup,
    ListMembers,
    AddMember,
    RemoveMember,
}

impl DirectoryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListGroups => "list_groups",
            Self::CreateGroup => "create_group",
            Self::DeleteGroup => "delete_group",
            Self::ListMembers => "list_members",
            Self::AddMember => "add_member",
            Self::RemoveMember => "remove_member",
        }
    }
}

impl std::fmt::Display for DirectoryOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
