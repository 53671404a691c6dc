// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fault-tolerant order-group setup.
//!
//! Only group creation can fail the operation. Every later step is soft: its
//! failure is logged, counted and recorded in the step list, and provisioning
//! carries on with the next step.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, info, warn};

use orderlink_core::types::{
    AdminRights, AssistantOutcome, GroupId, GroupProvisioningResult, ProvisioningOutcome,
    ProvisioningStep, StepOutcome, StepReport, UserId, UserRef,
};
use orderlink_core::{GroupTransport, OrderlinkError};

use crate::{SagaSettings, bounded, metrics};

/// Input to [`GroupProvisioner::provision`].
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// CRM order id, used only for log correlation.
    pub order_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    /// Group photo as standard base64 (JPEG or PNG).
    pub icon_base64: Option<String>,
    pub curator_id: UserId,
    /// Custom admin title shown next to the curator.
    pub curator_label: String,
    pub contractor_ids: Vec<UserId>,
    /// Automation accounts to add and promote, with or without a leading `@`.
    pub assistants: Vec<String>,
}

/// Ordered record of step outcomes for one provisioning run.
struct StepLog {
    group_id: GroupId,
    steps: Vec<StepReport>,
}

impl StepLog {
    fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            steps: Vec::new(),
        }
    }

    /// Folds a step result into the log and returns its outcome.
    fn record<T>(
        &mut self,
        step: ProvisioningStep,
        target: Option<&str>,
        result: Result<T, OrderlinkError>,
    ) -> (StepOutcome, Option<T>) {
        let (outcome, value) = match result {
            Ok(value) => (StepOutcome::Done, Some(value)),
            Err(e) => {
                warn!(
                    group_id = %self.group_id,
                    step = %step,
                    target = target.unwrap_or(""),
                    error = %e,
                    "provisioning step failed"
                );
                metrics::record_soft_failure(&step.to_string());
                (StepOutcome::Failed(e.to_string()), None)
            }
        };
        self.push(step, target, outcome.clone());
        (outcome, value)
    }

    fn skip(&mut self, step: ProvisioningStep, target: Option<&str>) -> StepOutcome {
        debug!(group_id = %self.group_id, step = %step, "provisioning step skipped");
        self.push(step, target, StepOutcome::Skipped);
        StepOutcome::Skipped
    }

    fn push(&mut self, step: ProvisioningStep, target: Option<&str>, outcome: StepOutcome) {
        self.steps.push(StepReport {
            step,
            target: target.map(str::to_string),
            outcome,
        });
    }
}

/// Runs the group setup sequence against a [`GroupTransport`].
pub struct GroupProvisioner {
    transport: Arc<dyn GroupTransport>,
    settings: SagaSettings,
}

impl GroupProvisioner {
    pub fn new(transport: Arc<dyn GroupTransport>, settings: SagaSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Creates and configures the group.
    ///
    /// Never returns an error: a failed creation is reported as
    /// [`ProvisioningOutcome::Failed`].
    pub async fn provision(&self, req: &ProvisionRequest) -> GroupProvisioningResult {
        let limit = self.settings.call_timeout;
        let order_id = req.order_id.as_deref().unwrap_or("");
        let t = &self.transport;

        let group_id = match bounded(limit, t.create_group(&req.title, req.curator_id)).await {
            Ok(group_id) => group_id,
            Err(e) => {
                warn!(order_id, title = %req.title, error = %e, "group creation failed");
                metrics::record_provision("failed");
                return GroupProvisioningResult {
                    outcome: ProvisioningOutcome::Failed {
                        reason: e.to_string(),
                    },
                    steps: vec![StepReport {
                        step: ProvisioningStep::CreateGroup,
                        target: None,
                        outcome: StepOutcome::Failed(e.to_string()),
                    }],
                    assistants: Vec::new(),
                };
            }
        };
        info!(order_id, group_id = %group_id, "group created");

        let mut log = StepLog::new(group_id);
        log.push(ProvisioningStep::CreateGroup, None, StepOutcome::Done);

        match req.description.as_deref().map(str::trim) {
            Some(description) if !description.is_empty() => {
                let result = bounded(limit, t.set_description(group_id, description)).await;
                log.record(ProvisioningStep::SetDescription, None, result);
            }
            _ => {
                log.skip(ProvisioningStep::SetDescription, None);
            }
        }

        match req.icon_base64.as_deref().map(str::trim) {
            Some(icon) if !icon.is_empty() => {
                let result = match STANDARD.decode(icon) {
                    Ok(bytes) => bounded(limit, t.set_photo(group_id, bytes)).await,
                    Err(e) => Err(OrderlinkError::InvalidInput(format!(
                        "icon is not valid base64: {e}"
                    ))),
                };
                log.record(ProvisioningStep::SetPhoto, None, result);
            }
            _ => {
                log.skip(ProvisioningStep::SetPhoto, None);
            }
        }

        let mut assistants = Vec::new();
        for user in req.assistants.iter().filter_map(|raw| UserRef::username(raw)) {
            let label = user.to_string();
            let result = bounded(limit, t.add_members(group_id, std::slice::from_ref(&user))).await;
            let (added, _) = log.record(ProvisioningStep::AddAssistant, Some(&label), result);

            let result = bounded(
                limit,
                t.promote_member(group_id, &user, AdminRights::assistant()),
            )
            .await;
            let (promoted, _) = log.record(ProvisioningStep::PromoteAssistant, Some(&label), result);

            let username = match user {
                UserRef::Username(name) => name,
                UserRef::Id(id) => id.to_string(),
            };
            assistants.push(AssistantOutcome {
                username,
                added,
                promoted,
            });
        }

        let curator = UserRef::from(req.curator_id);
        let result = bounded(
            limit,
            t.promote_member(group_id, &curator, AdminRights::curator()),
        )
        .await;
        log.record(ProvisioningStep::PromoteCurator, None, result);

        let label = req.curator_label.trim();
        if label.is_empty() {
            log.skip(ProvisioningStep::SetCuratorLabel, None);
        } else {
            let result = bounded(limit, t.set_member_label(group_id, &curator, label)).await;
            log.record(ProvisioningStep::SetCuratorLabel, None, result);
        }

        if req.contractor_ids.is_empty() {
            log.skip(ProvisioningStep::AddContractors, None);
        } else {
            let members: Vec<UserRef> = req.contractor_ids.iter().copied().map(UserRef::from).collect();
            let result = bounded(limit, t.add_members(group_id, &members)).await;
            log.record(ProvisioningStep::AddContractors, None, result);
        }

        self.clear_history(group_id, &mut log).await;

        let result = bounded(limit, t.set_history_visible(group_id, true)).await;
        log.record(ProvisioningStep::OpenHistory, None, result);

        let result = bounded(limit, t.export_invite_link(group_id)).await;
        let (_, invite_link) = log.record(ProvisioningStep::ExportInviteLink, None, result);

        let soft_failures = log.steps.iter().filter(|r| r.outcome.is_failed()).count();
        info!(
            order_id,
            group_id = %group_id,
            soft_failures,
            has_invite_link = invite_link.is_some(),
            "group provisioned"
        );
        metrics::record_provision("created");

        GroupProvisioningResult {
            outcome: ProvisioningOutcome::Created {
                group_id,
                invite_link,
            },
            steps: log.steps,
            assistants,
        }
    }

    /// Deletes the service messages left by creation and member adds.
    async fn clear_history(&self, group_id: GroupId, log: &mut StepLog) {
        let limit = self.settings.call_timeout;
        let scan = self.settings.history_scan_limit;
        let listed = bounded(limit, self.transport.list_recent_messages(group_id, scan)).await;
        let result = match listed {
            Ok(messages) if messages.is_empty() => {
                log.skip(ProvisioningStep::ClearHistory, None);
                return;
            }
            Ok(messages) => {
                bounded(limit, self.transport.delete_group_messages(group_id, &messages)).await
            }
            Err(e) => Err(e),
        };
        log.record(ProvisioningStep::ClearHistory, None, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use orderlink_core::types::MessageRef;
    use orderlink_test_utils::{MockTransport, TransportCall, TransportOp};

    const GROUP: GroupId = GroupId(-100123);

    fn request() -> ProvisionRequest {
        ProvisionRequest {
            order_id: Some("ORD-1".into()),
            title: "Order 1".into(),
            description: Some("Paint the fence".into()),
            icon_base64: Some(STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0])),
            curator_id: UserId(111),
            curator_label: "Curator".into(),
            contractor_ids: vec![UserId(222), UserId(333)],
            assistants: vec!["bot_a".into(), "@bot_b".into()],
        }
    }

    fn provisioner(transport: &Arc<MockTransport>) -> GroupProvisioner {
        GroupProvisioner::new(
            transport.clone(),
            SagaSettings {
                call_timeout: Duration::from_millis(200),
                history_scan_limit: 50,
            },
        )
    }

    fn steps(result: &GroupProvisioningResult) -> Vec<ProvisioningStep> {
        result.steps.iter().map(|r| r.step).collect()
    }

    #[tokio::test]
    async fn happy_path_runs_every_step_in_order() {
        let transport = Arc::new(MockTransport::new(GROUP));
        transport.set_recent_messages(vec![MessageRef(3), MessageRef(2), MessageRef(1)]);

        let result = provisioner(&transport).provision(&request()).await;

        assert!(result.ok());
        assert_eq!(result.group_id(), Some(GROUP));
        assert_eq!(result.invite_link(), Some("https://t.me/+mock100123"));
        assert_eq!(result.soft_failures().count(), 0);
        use ProvisioningStep::*;
        assert_eq!(
            steps(&result),
            vec![
                CreateGroup,
                SetDescription,
                SetPhoto,
                AddAssistant,
                PromoteAssistant,
                AddAssistant,
                PromoteAssistant,
                PromoteCurator,
                SetCuratorLabel,
                AddContractors,
                ClearHistory,
                OpenHistory,
                ExportInviteLink,
            ]
        );
        assert!(result.assistants.iter().all(AssistantOutcome::succeeded));
    }

    #[tokio::test]
    async fn group_is_created_with_only_the_curator() {
        let transport = Arc::new(MockTransport::new(GROUP));
        provisioner(&transport).provision(&request()).await;

        assert_eq!(
            transport.calls()[0],
            TransportCall::CreateGroup {
                title: "Order 1".into(),
                initial_member: UserId(111),
            }
        );
    }

    #[tokio::test]
    async fn rights_follow_role() {
        let transport = Arc::new(MockTransport::new(GROUP));
        provisioner(&transport).provision(&request()).await;

        let promotions = transport.calls_of(TransportOp::PromoteMember);
        assert_eq!(promotions.len(), 3);
        for call in promotions {
            let TransportCall::PromoteMember { user, rights, .. } = call else {
                unreachable!()
            };
            match user {
                UserRef::Username(_) => assert_eq!(rights, AdminRights::assistant()),
                UserRef::Id(id) => {
                    assert_eq!(id, UserId(111));
                    assert_eq!(rights, AdminRights::curator());
                }
            }
        }
    }

    #[tokio::test]
    async fn creation_failure_is_the_only_hard_failure() {
        let transport = Arc::new(MockTransport::new(GROUP));
        transport.fail(TransportOp::CreateGroup, "FLOOD_WAIT_X");

        let result = provisioner(&transport).provision(&request()).await;

        assert!(!result.ok());
        assert!(result.group_id().is_none());
        assert!(result.error().unwrap().contains("FLOOD_WAIT_X"));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn every_soft_step_failing_still_creates_the_group() {
        let transport = Arc::new(MockTransport::new(GROUP));
        transport.set_recent_messages(vec![MessageRef(1)]);
        transport.fail_everything_after_create("CHAT_ADMIN_REQUIRED");

        let result = provisioner(&transport).provision(&request()).await;

        assert!(result.ok());
        assert_eq!(result.group_id(), Some(GROUP));
        assert!(result.invite_link().is_none());
        assert!(result.error().is_none());
        assert_eq!(steps(&result).len(), 13);
        assert!(result.soft_failures().count() >= 10);
        // The promote is still attempted after each failed add.
        assert_eq!(transport.count(TransportOp::PromoteMember), 3);
    }

    #[tokio::test]
    async fn one_assistant_failing_does_not_block_the_next() {
        let transport = Arc::new(MockTransport::new(GROUP));
        transport.fail_for(TransportOp::AddMembers, "@bot_a", "USER_PRIVACY_RESTRICTED");

        let result = provisioner(&transport).provision(&request()).await;

        assert_eq!(result.assistants.len(), 2);
        assert!(result.assistants[0].added.is_failed());
        assert_eq!(result.assistants[0].promoted, StepOutcome::Done);
        assert!(result.assistants[1].succeeded());
        assert_eq!(result.assistants[1].username, "bot_b");
    }

    #[tokio::test]
    async fn blank_inputs_are_skipped() {
        let transport = Arc::new(MockTransport::new(GROUP));
        let req = ProvisionRequest {
            description: Some("   ".into()),
            icon_base64: None,
            contractor_ids: vec![],
            assistants: vec!["".into(), "@".into()],
            ..request()
        };

        let result = provisioner(&transport).provision(&req).await;

        let outcome_of = |step| {
            result
                .steps
                .iter()
                .find(|r| r.step == step)
                .map(|r| r.outcome.clone())
        };
        assert_eq!(outcome_of(ProvisioningStep::SetDescription), Some(StepOutcome::Skipped));
        assert_eq!(outcome_of(ProvisioningStep::SetPhoto), Some(StepOutcome::Skipped));
        assert_eq!(outcome_of(ProvisioningStep::AddContractors), Some(StepOutcome::Skipped));
        assert_eq!(outcome_of(ProvisioningStep::ClearHistory), Some(StepOutcome::Skipped));
        assert!(result.assistants.is_empty());
        assert_eq!(transport.count(TransportOp::SetPhoto), 0);
        assert_eq!(transport.count(TransportOp::DeleteGroupMessages), 0);
    }

    #[tokio::test]
    async fn bad_icon_is_a_soft_failure() {
        let transport = Arc::new(MockTransport::new(GROUP));
        let req = ProvisionRequest {
            icon_base64: Some("not base64!!".into()),
            ..request()
        };

        let result = provisioner(&transport).provision(&req).await;

        assert!(result.ok());
        let photo = result
            .steps
            .iter()
            .find(|r| r.step == ProvisioningStep::SetPhoto)
            .unwrap();
        assert!(photo.outcome.is_failed());
        assert_eq!(transport.count(TransportOp::SetPhoto), 0);
    }

    #[tokio::test]
    async fn history_scan_is_bounded() {
        let transport = Arc::new(MockTransport::new(GROUP));
        transport.set_recent_messages((1..=80).rev().map(MessageRef).collect());
        let p = GroupProvisioner::new(
            transport.clone(),
            SagaSettings {
                call_timeout: Duration::from_millis(200),
                history_scan_limit: 50,
            },
        );

        p.provision(&request()).await;

        let deletes = transport.calls_of(TransportOp::DeleteGroupMessages);
        let TransportCall::DeleteGroupMessages { messages, .. } = &deletes[0] else {
            unreachable!()
        };
        assert_eq!(messages.len(), 50);
        assert_eq!(messages[0], MessageRef(80));
    }

    #[tokio::test]
    async fn hung_soft_step_times_out_and_provisioning_continues() {
        let transport = Arc::new(MockTransport::new(GROUP));
        transport.hang(TransportOp::SetPhoto);

        let result = provisioner(&transport).provision(&request()).await;

        assert!(result.ok());
        let photo = result
            .steps
            .iter()
            .find(|r| r.step == ProvisioningStep::SetPhoto)
            .unwrap();
        assert!(matches!(&photo.outcome, StepOutcome::Failed(reason) if reason.contains("timed out")));
        assert!(result.invite_link().is_some());
    }

    #[tokio::test]
    async fn hung_creation_fails_provisioning() {
        let transport = Arc::new(MockTransport::new(GROUP));
        transport.hang(TransportOp::CreateGroup);

        let result = provisioner(&transport).provision(&request()).await;

        assert!(!result.ok());
        assert!(result.error().unwrap().contains("timed out"));
    }
}
