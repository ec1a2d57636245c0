use std::fmt;

/// Owner or group of a filesystem object.
///
/// `name` is absent when the id has no entry in the user/group database.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub id: u32,
    pub name: Option<String>,
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(unix)]
pub fn owner(metadata: &std::fs::Metadata) -> Option<Identity> {
    use nix::unistd::{Uid, User};
    use std::os::unix::fs::MetadataExt;

    let id = metadata.uid();
    let name = User::from_uid(Uid::from_raw(id))
        .ok()
        .flatten()
        .map(|user| user.name);
    Some(Identity { id, name })
}

#[cfg(unix)]
pub fn group(metadata: &std::fs::Metadata) -> Option<Identity> {
    use nix::unistd::{Gid, Group};
    use std::os::unix::fs::MetadataExt;

    let id = metadata.gid();
    let name = Group::from_gid(Gid::from_raw(id))
        .ok()
        .flatten()
        .map(|group| group.name);
    Some(Identity { id, name })
}

#[cfg(not(unix))]
pub fn owner(_metadata: &std::fs::Metadata) -> Option<Identity> {
    None
}

#[cfg(not(unix))]
pub fn group(_metadata: &std::fs::Metadata) -> Option<Identity> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefers_name() {
        let named = Identity {
            id: 33,
            name: Some("www-data".into()),
        };
        let bare = Identity { id: 1234, name: None };
        assert_eq!(named.to_string(), "www-data");
        assert_eq!(bare.to_string(), "1234");
    }

    #[cfg(unix)]
    #[test]
    fn test_owner_of_own_file_is_effective_user() {
        let dir = tempfile::tempdir().unwrap();
        let meta = std::fs::metadata(dir.path()).unwrap();
        let owner = owner(&meta).unwrap();
        assert_eq!(owner.id, nix::unistd::Uid::effective().as_raw());
        assert!(group(&meta).is_some());
    }
}
