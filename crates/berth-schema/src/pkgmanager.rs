use crate::definition::Definition;
use crate::types::PkgManagerName;
use crate::verb::Verb;
use crate::DefinitionError;
use serde::{Deserialize, Serialize};

/// Privilege-elevation token prepended when a package manager needs root.
pub const SUDO: &str = "sudo";

/// Named set of command templates, one per [`Verb`].
///
/// Templates are whitespace-separated command prefixes such as
/// `"apt install -y"`; package names are appended at generation time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PackageManager {
    pub name: PkgManagerName,
    #[serde(default)]
    pub need_sudo: bool,
    #[serde(default)]
    pub cmd_auto_remove: String,
    #[serde(default)]
    pub cmd_clean: String,
    #[serde(default)]
    pub cmd_install: String,
    #[serde(default)]
    pub cmd_list: String,
    #[serde(default)]
    pub cmd_purge: String,
    #[serde(default)]
    pub cmd_remove: String,
    #[serde(default)]
    pub cmd_search: String,
    #[serde(default)]
    pub cmd_show: String,
    #[serde(default)]
    pub cmd_update: String,
    #[serde(default)]
    pub cmd_upgrade: String,
    #[serde(default)]
    pub built_in: bool,
}

impl PackageManager {
    /// Create an in-memory, user-owned definition with no templates set.
    pub fn new(name: impl Into<PkgManagerName>, need_sudo: bool) -> Self {
        Self {
            name: name.into(),
            need_sudo,
            ..Self::default()
        }
    }

    /// Builder-style setter for a single template.
    #[must_use]
    pub fn with_template(mut self, verb: Verb, template: impl Into<String>) -> Self {
        *self.template_mut(verb) = template.into();
        self
    }

    /// The raw template stored for `verb`, possibly empty.
    pub fn template(&self, verb: Verb) -> &str {
        match verb {
            Verb::Install => &self.cmd_install,
            Verb::Update => &self.cmd_update,
            Verb::Remove => &self.cmd_remove,
            Verb::Purge => &self.cmd_purge,
            Verb::AutoRemove => &self.cmd_auto_remove,
            Verb::Clean => &self.cmd_clean,
            Verb::List => &self.cmd_list,
            Verb::Search => &self.cmd_search,
            Verb::Show => &self.cmd_show,
            Verb::Upgrade => &self.cmd_upgrade,
        }
    }

    pub fn template_mut(&mut self, verb: Verb) -> &mut String {
        match verb {
            Verb::Install => &mut self.cmd_install,
            Verb::Update => &mut self.cmd_update,
            Verb::Remove => &mut self.cmd_remove,
            Verb::Purge => &mut self.cmd_purge,
            Verb::AutoRemove => &mut self.cmd_auto_remove,
            Verb::Clean => &mut self.cmd_clean,
            Verb::List => &mut self.cmd_list,
            Verb::Search => &mut self.cmd_search,
            Verb::Show => &mut self.cmd_show,
            Verb::Upgrade => &mut self.cmd_upgrade,
        }
    }

    /// The template that will actually run for `verb`, applying the
    /// fallback for blank purge/autoRemove templates. `None` when both the
    /// template and its fallback are blank.
    pub fn resolve_template(&self, verb: Verb) -> Option<&str> {
        let own = self.template(verb).trim();
        if !own.is_empty() {
            return Some(own);
        }
        let fallback = self.template(verb.fallback()?).trim();
        (!fallback.is_empty()).then_some(fallback)
    }

    /// Verbs with no usable template, in prompt order.
    pub fn missing_templates(&self) -> Vec<Verb> {
        Verb::ALL
            .iter()
            .copied()
            .filter(|v| self.resolve_template(*v).is_none())
            .collect()
    }

    /// Copy the remove template into blank purge/autoRemove templates.
    pub fn fill_defaults(&mut self) {
        for verb in Verb::ALL {
            if let Some(fallback) = verb.fallback() {
                if self.template(verb).trim().is_empty() {
                    let value = self.template(fallback).trim().to_owned();
                    *self.template_mut(verb) = value;
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(DefinitionError::EmptyField {
                kind: Self::KIND,
                name: self.name.to_string(),
                field: "name",
            });
        }
        let missing = self.missing_templates();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DefinitionError::MissingTemplates {
                name: self.name.to_string(),
                verbs: missing,
            })
        }
    }

    /// Expand `verb` into an argument vector.
    ///
    /// The result is `[sudo]` (when `need_sudo`), the template split on
    /// whitespace, then each of `extra_args` as a literal token.
    pub fn generate_command<S: AsRef<str>>(
        &self,
        verb: Verb,
        extra_args: &[S],
    ) -> Result<Vec<String>, DefinitionError> {
        let template =
            self.resolve_template(verb)
                .ok_or_else(|| DefinitionError::MissingTemplates {
                    name: self.name.to_string(),
                    verbs: vec![verb],
                })?;

        let mut argv = Vec::with_capacity(extra_args.len() + 4);
        if self.need_sudo {
            argv.push(SUDO.to_owned());
        }
        argv.extend(template.split_whitespace().map(str::to_owned));
        argv.extend(extra_args.iter().map(|a| a.as_ref().to_owned()));
        Ok(argv)
    }
}

impl Definition for PackageManager {
    const KIND: &'static str = "package manager";
    const DIR: &'static str = "package-managers";

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
        self.fill_defaults();
        self.validate()
    }
}
