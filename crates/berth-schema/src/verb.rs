use crate::DefinitionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the ten canonical package-management actions.
///
/// The set is closed: every verb maps to exactly one template field of a
/// [`PackageManager`](crate::PackageManager), and adding a variant fails to
/// compile until each exhaustive `match` over it is extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Verb {
    Install,
    Update,
    Remove,
    Purge,
    AutoRemove,
    Clean,
    List,
    Search,
    Show,
    Upgrade,
}

impl Verb {
    /// All verbs, in the order a user is asked for them when defining a
    /// package manager.
    pub const ALL: [Verb; 10] = [
        Verb::Install,
        Verb::Update,
        Verb::Remove,
        Verb::Purge,
        Verb::AutoRemove,
        Verb::Clean,
        Verb::List,
        Verb::Search,
        Verb::Show,
        Verb::Upgrade,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Install => "install",
            Verb::Update => "update",
            Verb::Remove => "remove",
            Verb::Purge => "purge",
            Verb::AutoRemove => "autoRemove",
            Verb::Clean => "clean",
            Verb::List => "list",
            Verb::Search => "search",
            Verb::Show => "show",
            Verb::Upgrade => "upgrade",
        }
    }

    /// Verb whose template is used when this one is left blank.
    pub fn fallback(self) -> Option<Verb> {
        match self {
            Verb::Purge | Verb::AutoRemove => Some(Verb::Remove),
            Verb::Install
            | Verb::Update
            | Verb::Remove
            | Verb::Clean
            | Verb::List
            | Verb::Search
            | Verb::Show
            | Verb::Upgrade => None,
        }
    }

    /// Whether the verb operates on package names given by the caller.
    pub fn takes_packages(self) -> bool {
        matches!(
            self,
            Verb::Install | Verb::Remove | Verb::Purge | Verb::Search | Verb::Show
        )
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.as_str()).collect()
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "autoremove" is what people type on the command line.
        if s == "autoremove" {
            return Ok(Verb::AutoRemove);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| DefinitionError::UnknownVerb(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verb_parses_from_its_name() {
        for verb in Verb::ALL {
            assert_eq!(verb.as_str().parse::<Verb>().unwrap(), verb);
        }
    }

    #[test]
    fn autoremove_alias() {
        assert_eq!("autoremove".parse::<Verb>().unwrap(), Verb::AutoRemove);
    }

    #[test]
    fn unknown_verb_rejected() {
        let err = "dist-upgrade".parse::<Verb>().unwrap_err();
        assert!(matches!(err, DefinitionError::UnknownVerb(ref v) if v == "dist-upgrade"));
        assert!("Install".parse::<Verb>().is_err());
        assert!("".parse::<Verb>().is_err());
    }

    #[test]
    fn only_purge_and_autoremove_fall_back() {
        let with_fallback: Vec<Verb> = Verb::ALL
            .iter()
            .copied()
            .filter(|v| v.fallback().is_some())
            .collect();
        assert_eq!(with_fallback, vec![Verb::Purge, Verb::AutoRemove]);
        assert_eq!(Verb::Purge.fallback(), Some(Verb::Remove));
    }

    #[test]
    fn all_verbs_are_distinct() {
        let mut names = Verb::names();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Verb::ALL.len());
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_string(&Verb::AutoRemove).unwrap();
        assert_eq!(json, "\"autoRemove\"");
    }
}
