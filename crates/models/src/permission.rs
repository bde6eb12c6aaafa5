//! Permission grids shared by clinic role permissions and agent permissions.
//!
//! A grid lists modules, each with a set of action flags and optional
//! sub-module overrides. Module names are compared after stripping a role
//! prefix (`clinic_`, `agent_`, ...) and folding case, dashes and spaces.

use std::{fmt, str::FromStr};

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

const ROLE_PREFIXES: [&str; 5] = ["clinic_", "agent_", "doctor_", "staff_", "admin_"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Print,
    Export,
    Approve,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Create,
        Action::Read,
        Action::Update,
        Action::Delete,
        Action::Print,
        Action::Export,
        Action::Approve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Print => "print",
            Action::Export => "export",
            Action::Approve => "approve",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Action {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ModelError::Validation(format!("unknown action '{s}'")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionSet {
    pub all: bool,
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
    pub print: bool,
    pub export: bool,
    pub approve: bool,
}

impl ActionSet {
    pub fn full() -> Self { Self { all: true, ..Self::default() } }

    pub fn read_only() -> Self { Self { read: true, ..Self::default() } }

    pub fn allows(&self, action: Action) -> bool {
        self.all
            || match action {
                Action::Create => self.create,
                Action::Read => self.read,
                Action::Update => self.update,
                Action::Delete => self.delete,
                Action::Print => self.print,
                Action::Export => self.export,
                Action::Approve => self.approve,
            }
    }

    pub fn is_empty(&self) -> bool {
        !self.all && !Action::ALL.into_iter().any(|a| self.allows(a))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubModulePermission {
    pub name: String,
    #[serde(default)]
    pub actions: ActionSet,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModulePermission {
    pub module: String,
    #[serde(default)]
    pub actions: ActionSet,
    #[serde(default)]
    pub sub_modules: Vec<SubModulePermission>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct PermissionGrid(pub Vec<ModulePermission>);

/// Canonical module key: lowercase, `-` and spaces folded to `_`, role prefix removed.
pub fn normalize_module(name: &str) -> String {
    let folded: String = name
        .trim()
        .chars()
        .map(|c| if c == '-' || c == ' ' { '_' } else { c.to_ascii_lowercase() })
        .collect();
    for prefix in ROLE_PREFIXES {
        if let Some(rest) = folded.strip_prefix(prefix) {
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    folded
}

impl PermissionGrid {
    pub fn module(&self, module: &str) -> Option<&ModulePermission> {
        let key = normalize_module(module);
        self.0.iter().find(|m| normalize_module(&m.module) == key)
    }

    /// Whether the grid grants `action` on `module` (and `sub_module`, when given).
    ///
    /// `all` on a module covers its sub-modules. An unlisted sub-module falls
    /// back to the module flags. Unknown modules deny.
    pub fn check(&self, module: &str, sub_module: Option<&str>, action: Action) -> bool {
        let Some(m) = self.module(module) else { return false };
        if m.actions.all {
            return true;
        }
        if let Some(sub) = sub_module {
            let key = normalize_module(sub);
            if let Some(s) = m.sub_modules.iter().find(|s| normalize_module(&s.name) == key) {
                return s.actions.allows(action);
            }
        }
        m.actions.allows(action)
    }

    /// Rejects blank or duplicated module names.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen: Vec<String> = Vec::with_capacity(self.0.len());
        for m in &self.0 {
            let key = normalize_module(&m.module);
            if key.is_empty() {
                return Err(ModelError::validation("module name required"));
            }
            if seen.contains(&key) {
                return Err(ModelError::Validation(format!("duplicate module '{}'", m.module)));
            }
            seen.push(key);
            if m.sub_modules.iter().any(|s| s.name.trim().is_empty()) {
                return Err(ModelError::Validation(format!("blank sub-module in '{}'", m.module)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> PermissionGrid {
        PermissionGrid(vec![
            ModulePermission {
                module: "clinic_leads".into(),
                actions: ActionSet { read: true, update: true, ..Default::default() },
                sub_modules: vec![SubModulePermission {
                    name: "Follow-Ups".into(),
                    actions: ActionSet { create: true, ..Default::default() },
                }],
            },
            ModulePermission { module: "Petty Cash".into(), actions: ActionSet::full(), sub_modules: vec![] },
        ])
    }

    #[test]
    fn prefixes_and_case_are_ignored() {
        assert_eq!(normalize_module("agent_Leads"), "leads");
        assert_eq!(normalize_module("Petty-Cash"), "petty_cash");
        assert_eq!(normalize_module("clinic_"), "clinic_");
        let g = grid();
        assert!(g.check("leads", None, Action::Read));
        assert!(g.check("AGENT_LEADS", None, Action::Update));
        assert!(!g.check("leads", None, Action::Delete));
    }

    #[test]
    fn all_grants_everything_including_sub_modules() {
        let g = grid();
        for a in Action::ALL {
            assert!(g.check("petty_cash", Some("expenses"), a));
        }
    }

    #[test]
    fn sub_module_rules_override_then_fall_back() {
        let g = grid();
        assert!(g.check("leads", Some("follow_ups"), Action::Create));
        assert!(!g.check("leads", Some("follow ups"), Action::Read));
        // unlisted sub-module uses the module flags
        assert!(g.check("leads", Some("notes"), Action::Read));
        assert!(!g.check("leads", Some("notes"), Action::Create));
    }

    #[test]
    fn unknown_module_denies() {
        assert!(!grid().check("vendors", None, Action::Read));
        assert!(!PermissionGrid::default().check("leads", None, Action::Read));
    }

    #[test]
    fn validation_rejects_duplicates() {
        let mut g = grid();
        assert!(g.validate().is_ok());
        g.0.push(ModulePermission { module: "staff_leads".into(), actions: ActionSet::read_only(), sub_modules: vec![] });
        assert!(g.validate().is_err());
    }

    #[test]
    fn action_parsing() {
        assert_eq!("Approve".parse::<Action>().unwrap(), Action::Approve);
        assert!("launch".parse::<Action>().is_err());
        assert!(ActionSet::default().is_empty());
        assert!(!ActionSet::read_only().is_empty());
    }

    #[test]
    fn grid_json_shape() {
        let raw = r#"[{"module":"vendors","actions":{"read":true},"sub_modules":[]}]"#;
        let g: PermissionGrid = serde_json::from_str(raw).unwrap();
        assert!(g.check("vendors", None, Action::Read));
        assert!(!g.check("vendors", None, Action::Create));
    }
}
