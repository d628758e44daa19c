//! Monitor-role resolution: mapping physical outputs to logical
//! primary/secondary/tertiary roles, independent of their compositor-given
//! names (which vary across reconnects and docking stations), plus the
//! workspace-to-output assignment built on top of it.

use std::collections::HashMap;

use i3pm_types::{Application, MonitorRole, Output, OutputRole};

const ROLES: [OutputRole; 3] = [OutputRole::Primary, OutputRole::Secondary, OutputRole::Tertiary];

/// Per-role ordered list of preferred output names, consulted before outputs
/// are assigned by connection order. A role with no entry (or an empty one)
/// just never matches in pass 1 and gets filled from the remaining pool in
/// pass 2 instead.
#[derive(Debug, Clone, Default)]
pub struct OutputPreferences {
    preferred: HashMap<OutputRole, Vec<String>>,
}

impl OutputPreferences {
    #[must_use]
    pub fn new(preferred: HashMap<OutputRole, Vec<String>>) -> Self {
        Self { preferred }
    }

    fn names_for(&self, role: OutputRole) -> &[String] {
        self.preferred.get(&role).map_or(&[], Vec::as_slice)
    }
}

/// The outputs from one `resolve_roles` call, each carrying its resolved
/// role (`Unassigned` for inactive outputs, and for active outputs beyond
/// the third preferred/connection-order slot).
#[derive(Debug, Clone, Default)]
pub struct RoleAssignment {
    outputs: Vec<Output>,
}

impl RoleAssignment {
    #[must_use]
    pub fn output_for_role(&self, role: OutputRole) -> Option<&Output> {
        self.outputs.iter().find(|o| o.role == role)
    }

    #[must_use]
    pub fn into_outputs(self) -> Vec<Output> {
        self.outputs
    }
}

/// Assigns `PRIMARY`/`SECONDARY`/`TERTIARY` roles to a set of outputs.
///
/// Two passes:
/// 1. For each role in turn, take the first still-available active output
///    named in that role's preference list, removing it from the pool.
/// 2. Assign any roles still unfilled from the remaining pool in connection
///    order (the order `outputs` was given in).
///
/// Inactive outputs are never assigned a role. A role with no candidate left
/// comes out `Unassigned` rather than as an error; callers resolve that
/// through [`resolve_workspace_output`]'s fallback chain.
#[must_use]
pub fn resolve_roles(outputs: &[Output], prefs: &OutputPreferences) -> RoleAssignment {
    let mut outputs: Vec<Output> = outputs.to_vec();
    for output in &mut outputs {
        output.role = OutputRole::Unassigned;
    }

    let mut pool: Vec<usize> = outputs.iter().enumerate().filter(|(_, o)| o.active).map(|(i, _)| i).collect();

    let mut assigned: Vec<(OutputRole, usize)> = Vec::new();
    for role in ROLES {
        let preferred_pos =
            prefs.names_for(role).iter().find_map(|name| pool.iter().position(|&i| outputs[i].name == *name));
        if let Some(pos) = preferred_pos {
            assigned.push((role, pool.remove(pos)));
        }
    }

    for role in ROLES {
        if assigned.iter().any(|(r, _)| *r == role) {
            continue;
        }
        let Some(idx) = (!pool.is_empty()).then(|| pool.remove(0)) else { break };
        assigned.push((role, idx));
    }

    for (role, idx) in assigned {
        outputs[idx].role = role;
    }

    RoleAssignment { outputs }
}

/// A workspace's configured identity and default output role, as loaded from
/// `workspace-config.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceConfigEntry {
    pub number: u8,
    pub default_output_role: OutputRole,
}

/// Never-cyclic fallback chain for a role with no output assigned: tertiary
/// falls back through secondary to primary, secondary falls back to
/// primary, and primary has nowhere left to go.
fn fallback_chain(role: OutputRole) -> &'static [OutputRole] {
    match role {
        OutputRole::Tertiary => &[OutputRole::Tertiary, OutputRole::Secondary, OutputRole::Primary],
        OutputRole::Secondary => &[OutputRole::Secondary, OutputRole::Primary],
        OutputRole::Primary | OutputRole::Unassigned => &[OutputRole::Primary],
    }
}

fn monitor_role_to_output_role(role: MonitorRole) -> OutputRole {
    match role {
        MonitorRole::Primary => OutputRole::Primary,
        MonitorRole::Secondary => OutputRole::Secondary,
        MonitorRole::Tertiary => OutputRole::Tertiary,
    }
}

/// Resolves which output a workspace number should appear on.
///
/// The workspace's role starts at its configured `default_output_role`
/// (`PRIMARY` if the workspace has no config entry). Every app or PWA
/// declaring this workspace as its `preferred_workspace` then overrides that
/// role with its own `preferred_monitor_role`, regular apps first and PWAs
/// last, so a PWA's declaration wins a tie over a regular app's for the same
/// workspace number. The resolved role is mapped to an output through
/// `assignment`, falling back `TERTIARY -> SECONDARY -> PRIMARY` when that
/// role has no output.
#[must_use]
pub fn resolve_workspace_output<'a>(
    workspace_num: u8,
    assignment: &'a RoleAssignment,
    workspace_config: &[WorkspaceConfigEntry],
    applications: &[Application],
) -> Option<&'a str> {
    let mut role = workspace_config
        .iter()
        .find(|entry| entry.number == workspace_num)
        .map_or(OutputRole::Primary, |entry| entry.default_output_role);

    let mut declarations: Vec<&Application> =
        applications.iter().filter(|app| app.preferred_workspace == workspace_num).collect();
    declarations.sort_by_key(|app| app.ulid.is_some());

    for app in declarations {
        if let Some(monitor_role) = app.preferred_monitor_role {
            role = monitor_role_to_output_role(monitor_role);
        }
    }

    fallback_chain(role).iter().find_map(|&r| assignment.output_for_role(r)).map(|o| o.name.as_str())
}
