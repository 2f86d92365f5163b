use crate::definition::{parse_definition_str, Definition};
use crate::pkgmanager::PackageManager;
use crate::stack::Stack;
use crate::DefinitionError;

/// A definition bundled with berth, kept as the YAML it is installed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinSource {
    pub name: &'static str,
    pub source: &'static str,
}

pub const BUILTIN_PKG_MANAGERS: &[BuiltinSource] = &[
    BuiltinSource {
        name: "apt",
        source: r"name: apt
needSudo: true
cmdInstall: apt install -y
cmdUpdate: apt update
cmdRemove: apt remove -y
cmdPurge: apt purge -y
cmdAutoRemove: apt autoremove -y
cmdClean: apt clean
cmdList: apt list --installed
cmdSearch: apt search
cmdShow: apt show
cmdUpgrade: apt upgrade -y
builtIn: true
",
    },
    BuiltinSource {
        name: "dnf",
        source: r"name: dnf
needSudo: true
cmdInstall: dnf install -y
cmdUpdate: dnf check-update --refresh
cmdRemove: dnf remove -y
cmdPurge: dnf remove -y
cmdAutoRemove: dnf autoremove -y
cmdClean: dnf clean all
cmdList: dnf list --installed
cmdSearch: dnf search
cmdShow: dnf info
cmdUpgrade: dnf upgrade -y
builtIn: true
",
    },
    BuiltinSource {
        name: "pacman",
        source: r"name: pacman
needSudo: true
cmdInstall: pacman -S --noconfirm
cmdUpdate: pacman -Sy
cmdRemove: pacman -R --noconfirm
cmdPurge: pacman -Rn --noconfirm
cmdAutoRemove: pacman -Rs --noconfirm
cmdClean: pacman -Sc --noconfirm
cmdList: pacman -Q
cmdSearch: pacman -Ss
cmdShow: pacman -Si
cmdUpgrade: pacman -Syu --noconfirm
builtIn: true
",
    },
    BuiltinSource {
        name: "zypper",
        source: r"name: zypper
needSudo: true
cmdInstall: zypper --non-interactive install
cmdUpdate: zypper refresh
cmdRemove: zypper --non-interactive remove
cmdPurge: zypper --non-interactive remove --clean-deps
cmdAutoRemove: zypper --non-interactive remove --clean-deps
cmdClean: zypper clean --all
cmdList: zypper search --installed-only
cmdSearch: zypper search
cmdShow: zypper info
cmdUpgrade: zypper --non-interactive update
builtIn: true
",
    },
    BuiltinSource {
        name: "apk",
        source: r"name: apk
needSudo: true
cmdInstall: apk add
cmdUpdate: apk update
cmdRemove: apk del
cmdPurge: apk del --purge
cmdAutoRemove: apk del
cmdClean: apk cache clean
cmdList: apk list --installed
cmdSearch: apk search
cmdShow: apk info -a
cmdUpgrade: apk upgrade
builtIn: true
",
    },
];

pub const BUILTIN_STACKS: &[BuiltinSource] = &[
    BuiltinSource {
        name: "ubuntu",
        source: r"name: ubuntu
base: docker.io/library/ubuntu:24.04
packages: []
pkgManager: apt
builtIn: true
",
    },
    BuiltinSource {
        name: "debian",
        source: r"name: debian
base: docker.io/library/debian:stable
packages: []
pkgManager: apt
builtIn: true
",
    },
    BuiltinSource {
        name: "fedora",
        source: r"name: fedora
base: registry.fedoraproject.org/fedora-toolbox:latest
packages: []
pkgManager: dnf
builtIn: true
",
    },
    BuiltinSource {
        name: "arch",
        source: r"name: arch
base: docker.io/library/archlinux:latest
packages: []
pkgManager: pacman
builtIn: true
",
    },
    BuiltinSource {
        name: "opensuse",
        source: r"name: opensuse
base: registry.opensuse.org/opensuse/tumbleweed:latest
packages: []
pkgManager: zypper
builtIn: true
",
    },
    BuiltinSource {
        name: "alpine",
        source: r"name: alpine
base: docker.io/library/alpine:latest
packages:
  - bash
  - shadow
pkgManager: apk
builtIn: true
",
    },
];

fn parse_all<D: Definition>(sources: &[BuiltinSource]) -> Result<Vec<D>, DefinitionError> {
    sources
        .iter()
        .map(|s| {
            let mut def: D = parse_definition_str(s.source)?;
            def.set_built_in(true);
            def.prepare()?;
            Ok(def)
        })
        .collect()
}

pub fn builtin_pkg_managers() -> Result<Vec<PackageManager>, DefinitionError> {
    parse_all(BUILTIN_PKG_MANAGERS)
}

pub fn builtin_stacks() -> Result<Vec<Stack>, DefinitionError> {
    parse_all(BUILTIN_STACKS)
}

pub fn find_builtin(sources: &[BuiltinSource], name: &str) -> Option<BuiltinSource> {
    sources.iter().find(|s| s.name == name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_builtins_parse_and_validate() {
        let pms = builtin_pkg_managers().unwrap();
        assert_eq!(pms.len(), BUILTIN_PKG_MANAGERS.len());
        for (pm, src) in pms.iter().zip(BUILTIN_PKG_MANAGERS) {
            assert_eq!(pm.name, src.name);
            assert!(pm.built_in);
            assert!(pm.missing_templates().is_empty(), "{}", pm.name);
        }
        let stacks = builtin_stacks().unwrap();
        for (stack, src) in stacks.iter().zip(BUILTIN_STACKS) {
            assert_eq!(stack.name, src.name);
            assert!(stack.built_in);
        }
    }

    #[test]
    fn builtin_names_are_unique() {
        let mut seen = HashSet::new();
        for src in BUILTIN_PKG_MANAGERS {
            assert!(seen.insert(src.name), "duplicate package manager {}", src.name);
        }
        seen.clear();
        for src in BUILTIN_STACKS {
            assert!(seen.insert(src.name), "duplicate stack {}", src.name);
        }
    }

    #[test]
    fn builtin_stacks_reference_builtin_pkg_managers() {
        for stack in builtin_stacks().unwrap() {
            assert!(
                find_builtin(BUILTIN_PKG_MANAGERS, &stack.pkg_manager).is_some(),
                "stack {} references unknown package manager {}",
                stack.name,
                stack.pkg_manager
            );
        }
    }

    #[test]
    fn find_builtin_by_name() {
        assert_eq!(find_builtin(BUILTIN_STACKS, "fedora").unwrap().name, "fedora");
        assert!(find_builtin(BUILTIN_STACKS, "nonexistent").is_none());
    }
}
