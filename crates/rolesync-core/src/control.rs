//! Control Surface: operator commands
//!
//! Invocations arrive from a command-dispatch surface as a command name and
//! string arguments, together with the caller's identity and privilege flag.
//! Every command requires the administrator flag, checked before anything
//! else runs. Each invocation produces exactly one [`Response`], always
//! visible only to the caller.

use serde::{Deserialize, Serialize};

use crate::coordinator::Coordinator;
use crate::model::{GroupId, RoleId, UserId};
use crate::sync::SyncOptions;
use crate::{Error, Result};

/// A command invocation as delivered by the command surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub caller: UserId,
    /// Caller holds administrator privilege in the primary group
    #[serde(default)]
    pub is_admin: bool,
    /// Group the command was issued from
    #[serde(default)]
    pub origin: Option<GroupId>,
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(caller: UserId, is_admin: bool, name: impl Into<String>, args: &[&str]) -> Self {
        Self {
            caller,
            is_admin,
            origin: None,
            name: name.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Reply to one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub text: String,
    /// Visible only to the caller
    pub ephemeral: bool,
    pub success: bool,
}

impl Response {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: true,
            success: true,
        }
    }

    fn rejected(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ephemeral: true,
            success: false,
        }
    }
}

/// Parsed command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SyncNow,
    SyncOn,
    SyncOff,
    Give { user: UserId, role: RoleId },
    Remove { user: UserId, role: RoleId },
    AddSyncRole(RoleId),
    RemoveSyncRole(RoleId),
}

impl Command {
    /// Parse a command name and its arguments.
    ///
    /// Accepts the sync option either as a separate argument (`sync now`) or
    /// embedded in the name.
    pub fn parse(name: &str, args: &[String]) -> Result<Self> {
        let mut words: Vec<&str> = name.split_whitespace().collect();
        words.extend(args.iter().map(|a| a.trim()));

        match words.as_slice() {
            ["sync", "now"] => Ok(Self::SyncNow),
            ["sync", "on"] => Ok(Self::SyncOn),
            ["sync", "off"] => Ok(Self::SyncOff),
            ["sync", other] => Err(Error::invalid_input(format!("unknown sync option {other:?}"))),
            ["sync"] => Err(Error::invalid_input("sync requires one of: now, on, off")),
            ["give", user, role] => Ok(Self::Give {
                user: user.parse()?,
                role: role.parse()?,
            }),
            ["remove", user, role] => Ok(Self::Remove {
                user: user.parse()?,
                role: role.parse()?,
            }),
            ["addsyncrole", role] => Ok(Self::AddSyncRole(role.parse()?)),
            ["removesyncrole", role] => Ok(Self::RemoveSyncRole(role.parse()?)),
            [cmd @ ("give" | "remove" | "addsyncrole" | "removesyncrole"), ..] => Err(
                Error::invalid_input(format!("wrong number of arguments for {cmd}")),
            ),
            [cmd, ..] => Err(Error::invalid_input(format!("unknown command {cmd:?}"))),
            [] => Err(Error::invalid_input("empty command")),
        }
    }
}

/// Executes invocations against a [`Coordinator`]
pub struct ControlSurface<'a> {
    coordinator: &'a Coordinator,
}

impl<'a> ControlSurface<'a> {
    pub fn new(coordinator: &'a Coordinator) -> Self {
        Self { coordinator }
    }

    pub async fn handle(&self, invocation: &Invocation) -> Response {
        if let Some(expected) = self.coordinator.command_group()
            && invocation.origin != Some(expected)
        {
            return Response::rejected("This command is not available here.");
        }

        if !invocation.is_admin {
            tracing::warn!(caller = %invocation.caller, command = %invocation.name, "rejected command from non-administrator");
            return Response::rejected("You need administrator permissions to use this command.");
        }

        let command = match Command::parse(&invocation.name, &invocation.args) {
            Ok(command) => command,
            Err(e) => return Response::rejected(format!("Invalid command: {}", invalid_message(&e))),
        };

        tracing::info!(caller = %invocation.caller, ?command, "running command");
        self.execute(command).await
    }

    async fn execute(&self, command: Command) -> Response {
        match command {
            Command::SyncNow => self.sync_now().await,
            Command::SyncOn => {
                self.coordinator.set_auto_sync(true);
                Response::ok("Automatic sync enabled.")
            }
            Command::SyncOff => {
                self.coordinator.set_auto_sync(false);
                Response::ok("Automatic sync disabled.")
            }
            Command::Give { user, role } => self.set_primary_role(user, role, true).await,
            Command::Remove { user, role } => self.set_primary_role(user, role, false).await,
            Command::AddSyncRole(role) => self.add_sync_role(role).await,
            Command::RemoveSyncRole(role) => self.remove_sync_role(role),
        }
    }

    async fn sync_now(&self) -> Response {
        let report = self.coordinator.reconcile(&SyncOptions::default()).await;

        if let Some(reason) = &report.skipped {
            return Response::rejected(format!("Synchronization skipped: {reason}."));
        }
        if !report.failures.is_empty() {
            tracing::error!(failures = report.failures.len(), "manual sync finished with errors");
            return Response::rejected(format!(
                "Synchronization finished with errors ({}).",
                report.summary()
            ));
        }
        Response::ok(format!("Role synchronization complete ({}).", report.summary()))
    }

    async fn set_primary_role(&self, user: UserId, role: RoleId, grant: bool) -> Response {
        let directory = self.coordinator.directory();
        let group = self.coordinator.groups().primary;

        match directory.resolve_group(group).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                tracing::warn!(%group, "primary group not found");
                return Response::rejected("The primary group is unavailable.");
            }
            Err(e) => {
                tracing::warn!(%group, error = %e, "primary group lookup failed");
                return Response::rejected(format!("The primary group is unavailable: {e}"));
            }
        }

        let member = directory.get_member(group, user).await;
        let role_info = directory.get_role(group, role).await;
        let (member, role_info) = match (member, role_info) {
            (Ok(Some(m)), Ok(Some(r))) => (m, r),
            (Err(e), _) | (_, Err(e)) => {
                tracing::error!(%user, %role, error = %e, "lookup failed");
                return Response::rejected(format!("Lookup failed: {e}"));
            }
            _ => return Response::rejected("Invalid member or role."),
        };

        let result = if grant {
            directory.add_role_to_member(group, user, role).await
        } else {
            directory.remove_role_from_member(group, user, role).await
        };

        match (result, grant) {
            (Ok(()), true) => {
                tracing::info!(%user, role = %role_info.name, "role assigned in primary group");
                Response::ok(format!("Assigned role `{}` to {}.", role_info.name, member.name))
            }
            (Ok(()), false) => {
                tracing::info!(%user, role = %role_info.name, "role removed in primary group");
                Response::ok(format!("Removed role `{}` from {}.", role_info.name, member.name))
            }
            (Err(e), _) => {
                tracing::error!(%user, %role, error = %e, "manual role change failed");
                Response::rejected(format!("Could not update role `{}`: {e}", role_info.name))
            }
        }
    }

    async fn add_sync_role(&self, role: RoleId) -> Response {
        if self.coordinator.is_sync_role(role) {
            return Response::rejected(format!("Role `{role}` is already in the sync list."));
        }

        let primary = self.coordinator.groups().primary;
        match self.coordinator.directory().get_role(primary, role).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Response::rejected(format!(
                    "Role `{role}` does not exist in the primary group."
                ));
            }
            Err(e) => return Response::rejected(format!("Could not verify role `{role}`: {e}")),
        }

        match self.coordinator.add_sync_role(role) {
            Ok(true) => Response::ok(format!("Role `{role}` added to the sync list.")),
            Ok(false) => Response::rejected(format!("Role `{role}` is already in the sync list.")),
            Err(e) => {
                tracing::error!(%role, error = %e, "failed to persist sync list");
                Response::rejected(format!("Could not save the sync list: {e}"))
            }
        }
    }

    fn remove_sync_role(&self, role: RoleId) -> Response {
        match self.coordinator.remove_sync_role(role) {
            Ok(true) => Response::ok(format!("Role `{role}` removed from the sync list.")),
            Ok(false) => Response::rejected(format!("Role `{role}` is not in the sync list.")),
            Err(e) => {
                tracing::error!(%role, error = %e, "failed to persist sync list");
                Response::rejected(format!("Could not save the sync list: {e}"))
            }
        }
    }
}

fn invalid_message(error: &Error) -> String {
    match error {
        Error::InvalidInput { message } => message.clone(),
        other => other.to_string(),
    }
}
