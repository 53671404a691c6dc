// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the saga components.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Telegram user identity (contractor, curator, assistant account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// Group identity in Bot API form (`-100…` for supergroups).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub i64);

/// Identifier of a message inside a specific chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRef(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MessageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user addressed either by numeric id or by public username.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserRef {
    Id(UserId),
    Username(String),
}

impl UserRef {
    /// Builds a username reference, stripping a leading `@`.
    ///
    /// Returns `None` for blank input.
    pub fn username(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix('@').unwrap_or(trimmed);
        if name.is_empty() {
            None
        } else {
            Some(Self::Username(name.to_string()))
        }
    }
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "@{name}"),
        }
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays in the process.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Notify,
    Fallback,
    Storage,
}

/// A tracked substitute message awaiting cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFallbackMessage {
    pub id: i64,
    pub contractor_id: UserId,
    pub group_id: GroupId,
    pub message_ref: MessageRef,
    pub created_at: String,
}

/// Administrator capability set used when promoting a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdminRights {
    pub manage_chat: bool,
    pub delete_messages: bool,
    pub manage_video_chats: bool,
    pub restrict_members: bool,
    pub promote_members: bool,
    pub change_info: bool,
    pub invite_users: bool,
    pub pin_messages: bool,
    pub anonymous: bool,
}

impl AdminRights {
    /// Rights for automation accounts: everything except promoting others, posted anonymously.
    pub fn assistant() -> Self {
        Self {
            manage_chat: true,
            delete_messages: true,
            manage_video_chats: true,
            restrict_members: true,
            promote_members: false,
            change_info: true,
            invite_users: true,
            pin_messages: true,
            anonymous: true,
        }
    }

    /// Full rights for the order curator, including promoting others.
    pub fn curator() -> Self {
        Self {
            promote_members: true,
            anonymous: false,
            ..Self::assistant()
        }
    }
}

/// A named unit of work in group provisioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStep {
    CreateGroup,
    SetDescription,
    SetPhoto,
    AddAssistant,
    PromoteAssistant,
    PromoteCurator,
    SetCuratorLabel,
    AddContractors,
    ClearHistory,
    OpenHistory,
    ExportInviteLink,
}

impl ProvisioningStep {
    /// Hard steps abort provisioning on failure; every other step is soft.
    pub fn is_hard(self) -> bool {
        matches!(self, Self::CreateGroup)
    }
}

/// Result of a single provisioning step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum StepOutcome {
    Done,
    /// Nothing to do (no description, empty contractor list, ...).
    Skipped,
    Failed(String),
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// One entry of the provisioning step log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: ProvisioningStep,
    /// Free-form qualifier, e.g. the assistant username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub outcome: StepOutcome,
}

/// Per-assistant outcome table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantOutcome {
    pub username: String,
    pub added: StepOutcome,
    pub promoted: StepOutcome,
}

impl AssistantOutcome {
    pub fn succeeded(&self) -> bool {
        self.added == StepOutcome::Done && self.promoted == StepOutcome::Done
    }
}

/// Terminal outcome of provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    Created {
        group_id: GroupId,
        invite_link: Option<String>,
    },
    Failed {
        reason: String,
    },
}

/// Immutable result returned by the group provisioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupProvisioningResult {
    pub outcome: ProvisioningOutcome,
    pub steps: Vec<StepReport>,
    pub assistants: Vec<AssistantOutcome>,
}

impl GroupProvisioningResult {
    pub fn ok(&self) -> bool {
        matches!(self.outcome, ProvisioningOutcome::Created { .. })
    }

    pub fn group_id(&self) -> Option<GroupId> {
        match &self.outcome {
            ProvisioningOutcome::Created { group_id, .. } => Some(*group_id),
            ProvisioningOutcome::Failed { .. } => None,
        }
    }

    pub fn invite_link(&self) -> Option<&str> {
        match &self.outcome {
            ProvisioningOutcome::Created { invite_link, .. } => invite_link.as_deref(),
            ProvisioningOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ProvisioningOutcome::Failed { reason } => Some(reason),
            ProvisioningOutcome::Created { .. } => None,
        }
    }

    /// Soft steps that failed, in execution order.
    pub fn soft_failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|r| r.outcome.is_failed())
    }
}

/// Outcome of a notify call through the primary-plus-fallback router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    DeliveredViaFallback,
    Failed(String),
}

impl DeliveryOutcome {
    /// Wire-level result code reported to the CRM.
    pub fn result_code(&self) -> &'static str {
        match self {
            Self::Delivered => "OK",
            Self::DeliveredViaFallback => "OK_FALLBACK",
            Self::Failed(_) => "ERROR",
        }
    }

    pub fn is_delivered(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Kind of membership change observed in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum MembershipChange {
    Joined,
    Left,
    /// Role or permission change for an existing member.
    Updated,
}

/// A membership-change notification from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipEvent {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub change: MembershipChange,
}

impl MembershipEvent {
    pub fn joined(group_id: GroupId, user_id: UserId) -> Self {
        Self {
            group_id,
            user_id,
            change: MembershipChange::Joined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curator_rights_extend_assistant_rights() {
        let assistant = AdminRights::assistant();
        let curator = AdminRights::curator();
        assert!(!assistant.promote_members);
        assert!(assistant.anonymous);
        assert!(curator.promote_members);
        assert!(!curator.anonymous);
        assert!(curator.manage_chat && curator.delete_messages && curator.restrict_members);
    }

    #[test]
    fn username_ref_strips_at_and_rejects_blank() {
        assert_eq!(
            UserRef::username("@bot_a"),
            Some(UserRef::Username("bot_a".into()))
        );
        assert_eq!(
            UserRef::username("bot_b"),
            Some(UserRef::Username("bot_b".into()))
        );
        assert_eq!(UserRef::username("  "), None);
        assert_eq!(UserRef::username("@"), None);
    }

    #[test]
    fn only_create_group_is_hard() {
        assert!(ProvisioningStep::CreateGroup.is_hard());
        assert!(!ProvisioningStep::SetPhoto.is_hard());
        assert!(!ProvisioningStep::ExportInviteLink.is_hard());
    }

    #[test]
    fn provisioning_result_accessors_follow_outcome() {
        let created = GroupProvisioningResult {
            outcome: ProvisioningOutcome::Created {
                group_id: GroupId(-100123),
                invite_link: None,
            },
            steps: vec![],
            assistants: vec![],
        };
        assert!(created.ok());
        assert_eq!(created.group_id(), Some(GroupId(-100123)));
        assert!(created.error().is_none());

        let failed = GroupProvisioningResult {
            outcome: ProvisioningOutcome::Failed {
                reason: "FLOOD_WAIT".into(),
            },
            steps: vec![],
            assistants: vec![],
        };
        assert!(!failed.ok());
        assert!(failed.group_id().is_none());
        assert_eq!(failed.error(), Some("FLOOD_WAIT"));
    }

    #[test]
    fn delivery_result_codes() {
        assert_eq!(DeliveryOutcome::Delivered.result_code(), "OK");
        assert_eq!(DeliveryOutcome::DeliveredViaFallback.result_code(), "OK_FALLBACK");
        assert_eq!(DeliveryOutcome::Failed("x".into()).result_code(), "ERROR");
    }

    #[test]
    fn step_names_are_snake_case() {
        assert_eq!(ProvisioningStep::ExportInviteLink.to_string(), "export_invite_link");
        assert_eq!(MembershipChange::Joined.to_string(), "joined");
    }
}
