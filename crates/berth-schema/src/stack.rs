use crate::definition::Definition;
use crate::types::{PkgManagerName, StackName};
use crate::DefinitionError;
use serde::{Deserialize, Serialize};

/// A base image, the package manager used inside it, and packages to
/// preinstall when a subsystem is provisioned from it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Stack {
    pub name: StackName,
    pub base: String,
    #[serde(default)]
    pub packages: Vec<String>,
    pub pkg_manager: PkgManagerName,
    #[serde(default)]
    pub built_in: bool,
}

impl Stack {
    pub fn new(
        name: impl Into<StackName>,
        base: impl Into<String>,
        pkg_manager: impl Into<PkgManagerName>,
        packages: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            packages,
            pkg_manager: pkg_manager.into(),
            built_in: false,
        }
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        let checks = [
            ("name", self.name.trim().is_empty()),
            ("base", self.base.trim().is_empty()),
            ("pkgManager", self.pkg_manager.trim().is_empty()),
        ];
        match checks.iter().find(|(_, empty)| *empty) {
            Some(&(field, _)) => Err(DefinitionError::EmptyField {
                kind: Self::KIND,
                name: self.name.to_string(),
                field,
            }),
            None => Ok(()),
        }
    }
}

impl Definition for Stack {
    const KIND: &'static str = "stack";
    const DIR: &'static str = "stacks";

    fn name(&self) -> &str {
        &self.name
    }

    fn is_built_in(&self) -> bool {
        self.built_in
    }

    fn set_built_in(&mut self, built_in: bool) {
        self.built_in = built_in;
    }

    fn prepare(&mut self) -> Result<(), DefinitionError> {
        self.packages.retain(|p| !p.trim().is_empty());
        self.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::parse_definition_str;

    #[test]
    fn parses_yaml_with_camel_case_keys() {
        let yaml = r"
name: ubuntu-dev
base: docker.io/library/ubuntu:24.04
packages:
  - git
  - build-essential
pkgManager: apt
";
        let stack: Stack = parse_definition_str(yaml).unwrap();
        assert_eq!(stack.name, "ubuntu-dev");
        assert_eq!(stack.pkg_manager, "apt");
        assert_eq!(stack.packages, vec!["git", "build-essential"]);
        assert!(!stack.built_in);
    }

    #[test]
    fn packages_default_to_empty() {
        let yaml = "name: bare\nbase: alpine:3\npkgManager: apk\n";
        let stack: Stack = parse_definition_str(yaml).unwrap();
        assert!(stack.packages.is_empty());
    }

    #[test]
    fn missing_pkg_manager_is_parse_error() {
        let yaml = "name: bare\nbase: alpine:3\n";
        assert!(parse_definition_str::<Stack>(yaml).is_err());
    }

    #[test]
    fn prepare_drops_blank_packages() {
        let mut stack = Stack::new(
            "s",
            "fedora:40",
            "dnf",
            vec!["vim".into(), " ".into(), String::new()],
        );
        stack.prepare().unwrap();
        assert_eq!(stack.packages, vec!["vim"]);
    }

    #[test]
    fn validate_names_the_empty_field() {
        let stack = Stack::new("s", "  ", "dnf", vec![]);
        assert!(matches!(
            stack.validate(),
            Err(DefinitionError::EmptyField { field: "base", .. })
        ));
        let stack = Stack::new("s", "fedora:40", "", vec![]);
        assert!(matches!(
            stack.validate(),
            Err(DefinitionError::EmptyField {
                field: "pkgManager",
                ..
            })
        ));
    }
}
