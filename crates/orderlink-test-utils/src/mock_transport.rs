// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock group transport for deterministic saga tests.
//!
//! `MockTransport` records every call in order, can be told to fail (or hang)
//! on specific operations, and lets tests push membership events into the
//! stream the watcher consumes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use orderlink_core::traits::adapter::PluginAdapter;
use orderlink_core::traits::transport::GroupTransport;
use orderlink_core::types::{
    AdapterType, AdminRights, GroupId, HealthStatus, MembershipEvent, MessageRef, UserId, UserRef,
};
use orderlink_core::OrderlinkError;

/// Names of the transport operations, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    CreateGroup,
    SetDescription,
    SetPhoto,
    AddMembers,
    PromoteMember,
    SetMemberLabel,
    BanMember,
    UnbanMember,
    SendPrivateMessage,
    DeletePrivateMessages,
    DeleteGroupMessages,
    ListRecentMessages,
    SetHistoryVisible,
    ExportInviteLink,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    CreateGroup { title: String, initial_member: UserId },
    SetDescription { group: GroupId, description: String },
    SetPhoto { group: GroupId, bytes: usize },
    AddMembers { group: GroupId, users: Vec<UserRef> },
    PromoteMember { group: GroupId, user: UserRef, rights: AdminRights },
    SetMemberLabel { group: GroupId, user: UserRef, label: String },
    BanMember { group: GroupId, user: UserId },
    UnbanMember { group: GroupId, user: UserId },
    SendPrivateMessage { user: UserId, text: String },
    DeletePrivateMessages { user: UserId, messages: Vec<MessageRef> },
    DeleteGroupMessages { group: GroupId, messages: Vec<MessageRef> },
    ListRecentMessages { group: GroupId, limit: usize },
    SetHistoryVisible { group: GroupId, visible: bool },
    ExportInviteLink { group: GroupId },
}

impl TransportCall {
    pub fn op(&self) -> TransportOp {
        match self {
            Self::CreateGroup { .. } => TransportOp::CreateGroup,
            Self::SetDescription { .. } => TransportOp::SetDescription,
            Self::SetPhoto { .. } => TransportOp::SetPhoto,
            Self::AddMembers { .. } => TransportOp::AddMembers,
            Self::PromoteMember { .. } => TransportOp::PromoteMember,
            Self::SetMemberLabel { .. } => TransportOp::SetMemberLabel,
            Self::BanMember { .. } => TransportOp::BanMember,
            Self::UnbanMember { .. } => TransportOp::UnbanMember,
            Self::SendPrivateMessage { .. } => TransportOp::SendPrivateMessage,
            Self::DeletePrivateMessages { .. } => TransportOp::DeletePrivateMessages,
            Self::DeleteGroupMessages { .. } => TransportOp::DeleteGroupMessages,
            Self::ListRecentMessages { .. } => TransportOp::ListRecentMessages,
            Self::SetHistoryVisible { .. } => TransportOp::SetHistoryVisible,
            Self::ExportInviteLink { .. } => TransportOp::ExportInviteLink,
        }
    }
}

#[derive(Debug, Clone)]
enum Fault {
    Fail(String),
    Hang,
}

/// A mock transport for testing.
pub struct MockTransport {
    calls: Mutex<Vec<TransportCall>>,
    /// Faults keyed by operation, optionally narrowed to one target (`"@bot_b"`, `"222"`).
    faults: Mutex<HashMap<(TransportOp, Option<String>), Fault>>,
    group_id: GroupId,
    recent_messages: Mutex<Vec<MessageRef>>,
    next_message_id: AtomicI64,
    send_delay: Mutex<Option<Duration>>,
    events_tx: mpsc::Sender<MembershipEvent>,
    events_rx: Mutex<Option<mpsc::Receiver<MembershipEvent>>>,
}

impl MockTransport {
    /// Creates a transport whose `create_group` returns `group_id`.
    pub fn new(group_id: GroupId) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        Self {
            calls: Mutex::new(Vec::new()),
            faults: Mutex::new(HashMap::new()),
            group_id,
            recent_messages: Mutex::new(Vec::new()),
            next_message_id: AtomicI64::new(1000),
            send_delay: Mutex::new(None),
            events_tx,
            events_rx: Mutex::new(Some(events_rx)),
        }
    }

    /// Every call to `op` fails with `message`.
    pub fn fail(&self, op: TransportOp, message: &str) {
        lock(&self.faults).insert((op, None), Fault::Fail(message.to_string()));
    }

    /// Calls to `op` whose target renders as `target` fail with `message`.
    pub fn fail_for(&self, op: TransportOp, target: &str, message: &str) {
        lock(&self.faults).insert(
            (op, Some(target.to_string())),
            Fault::Fail(message.to_string()),
        );
    }

    /// Calls to `op` never complete.
    pub fn hang(&self, op: TransportOp) {
        lock(&self.faults).insert((op, None), Fault::Hang);
    }

    /// Fails every operation except group creation.
    pub fn fail_everything_after_create(&self, message: &str) {
        use TransportOp::*;
        for op in [
            SetDescription,
            SetPhoto,
            AddMembers,
            PromoteMember,
            SetMemberLabel,
            ListRecentMessages,
            DeleteGroupMessages,
            SetHistoryVisible,
            ExportInviteLink,
        ] {
            self.fail(op, message);
        }
    }

    /// Messages returned by `list_recent_messages`.
    pub fn set_recent_messages(&self, messages: Vec<MessageRef>) {
        *lock(&self.recent_messages) = messages;
    }

    /// Delays `send_private_message` before it records and returns.
    pub fn set_send_delay(&self, delay: Duration) {
        *lock(&self.send_delay) = Some(delay);
    }

    /// Pushes an event into the membership stream.
    pub async fn emit(&self, event: MembershipEvent) {
        let _ = self.events_tx.send(event).await;
    }

    pub fn calls(&self) -> Vec<TransportCall> {
        lock(&self.calls).clone()
    }

    pub fn calls_of(&self, op: TransportOp) -> Vec<TransportCall> {
        lock(&self.calls)
            .iter()
            .filter(|c| c.op() == op)
            .cloned()
            .collect()
    }

    pub fn count(&self, op: TransportOp) -> usize {
        self.calls_of(op).len()
    }

    /// Records the call, then applies any matching fault.
    async fn enter(&self, call: TransportCall, target: Option<String>) -> Result<(), OrderlinkError> {
        let op = call.op();
        lock(&self.calls).push(call);
        let fault = {
            let faults = lock(&self.faults);
            target
                .and_then(|t| faults.get(&(op, Some(t))).cloned())
                .or_else(|| faults.get(&(op, None)).cloned())
        };
        match fault {
            None => Ok(()),
            Some(Fault::Fail(message)) => Err(OrderlinkError::transport(message)),
            Some(Fault::Hang) => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OrderlinkError> {
        Ok(())
    }
}

#[async_trait]
impl GroupTransport for MockTransport {
    async fn create_group(&self, title: &str, initial_member: UserId) -> Result<GroupId, OrderlinkError> {
        self.enter(
            TransportCall::CreateGroup {
                title: title.to_string(),
                initial_member,
            },
            None,
        )
        .await?;
        Ok(self.group_id)
    }

    async fn set_description(&self, group: GroupId, description: &str) -> Result<(), OrderlinkError> {
        self.enter(
            TransportCall::SetDescription {
                group,
                description: description.to_string(),
            },
            None,
        )
        .await
    }

    async fn set_photo(&self, group: GroupId, image: Vec<u8>) -> Result<(), OrderlinkError> {
        self.enter(
            TransportCall::SetPhoto {
                group,
                bytes: image.len(),
            },
            None,
        )
        .await
    }

    async fn add_members(&self, group: GroupId, users: &[UserRef]) -> Result<(), OrderlinkError> {
        let target = match users {
            [single] => Some(single.to_string()),
            _ => None,
        };
        self.enter(
            TransportCall::AddMembers {
                group,
                users: users.to_vec(),
            },
            target,
        )
        .await
    }

    async fn promote_member(
        &self,
        group: GroupId,
        user: &UserRef,
        rights: AdminRights,
    ) -> Result<(), OrderlinkError> {
        self.enter(
            TransportCall::PromoteMember {
                group,
                user: user.clone(),
                rights,
            },
            Some(user.to_string()),
        )
        .await
    }

    async fn set_member_label(
        &self,
        group: GroupId,
        user: &UserRef,
        label: &str,
    ) -> Result<(), OrderlinkError> {
        self.enter(
            TransportCall::SetMemberLabel {
                group,
                user: user.clone(),
                label: label.to_string(),
            },
            Some(user.to_string()),
        )
        .await
    }

    async fn ban_member(&self, group: GroupId, user: UserId) -> Result<(), OrderlinkError> {
        self.enter(TransportCall::BanMember { group, user }, Some(user.to_string()))
            .await
    }

    async fn unban_member(&self, group: GroupId, user: UserId) -> Result<(), OrderlinkError> {
        self.enter(TransportCall::UnbanMember { group, user }, Some(user.to_string()))
            .await
    }

    async fn send_private_message(&self, user: UserId, text: &str) -> Result<MessageRef, OrderlinkError> {
        let delay = *lock(&self.send_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter(
            TransportCall::SendPrivateMessage {
                user,
                text: text.to_string(),
            },
            Some(user.to_string()),
        )
        .await?;
        Ok(MessageRef(self.next_message_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn delete_private_messages(
        &self,
        user: UserId,
        messages: &[MessageRef],
    ) -> Result<(), OrderlinkError> {
        self.enter(
            TransportCall::DeletePrivateMessages {
                user,
                messages: messages.to_vec(),
            },
            Some(user.to_string()),
        )
        .await
    }

    async fn delete_group_messages(
        &self,
        group: GroupId,
        messages: &[MessageRef],
    ) -> Result<(), OrderlinkError> {
        self.enter(
            TransportCall::DeleteGroupMessages {
                group,
                messages: messages.to_vec(),
            },
            None,
        )
        .await
    }

    async fn list_recent_messages(
        &self,
        group: GroupId,
        limit: usize,
    ) -> Result<Vec<MessageRef>, OrderlinkError> {
        self.enter(TransportCall::ListRecentMessages { group, limit }, None)
            .await?;
        Ok(lock(&self.recent_messages).iter().take(limit).copied().collect())
    }

    async fn set_history_visible(&self, group: GroupId, visible: bool) -> Result<(), OrderlinkError> {
        self.enter(TransportCall::SetHistoryVisible { group, visible }, None)
            .await
    }

    async fn export_invite_link(&self, group: GroupId) -> Result<String, OrderlinkError> {
        self.enter(TransportCall::ExportInviteLink { group }, None)
            .await?;
        Ok(format!("https://t.me/+mock{}", group.0.unsigned_abs()))
    }

    fn subscribe_membership(&self) -> Result<mpsc::Receiver<MembershipEvent>, OrderlinkError> {
        lock(&self.events_rx)
            .take()
            .ok_or_else(|| OrderlinkError::Internal("membership stream already taken".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_calls_in_order() {
        let t = MockTransport::new(GroupId(-100123));
        let g = t.create_group("Order 1", UserId(111)).await.unwrap();
        t.ban_member(g, UserId(5)).await.unwrap();

        let ops: Vec<_> = t.calls().iter().map(TransportCall::op).collect();
        assert_eq!(ops, vec![TransportOp::CreateGroup, TransportOp::BanMember]);
    }

    #[tokio::test]
    async fn targeted_fault_only_hits_target() {
        let t = MockTransport::new(GroupId(-1));
        let bot_a = UserRef::username("bot_a").unwrap();
        let bot_b = UserRef::username("bot_b").unwrap();
        t.fail_for(TransportOp::PromoteMember, "@bot_b", "USER_NOT_MUTUAL_CONTACT");

        assert!(t.promote_member(GroupId(-1), &bot_a, AdminRights::assistant()).await.is_ok());
        let err = t
            .promote_member(GroupId(-1), &bot_b, AdminRights::assistant())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("USER_NOT_MUTUAL_CONTACT"));
    }

    #[tokio::test]
    async fn membership_stream_has_single_consumer() {
        let t = MockTransport::new(GroupId(-1));
        let mut rx = t.subscribe_membership().unwrap();
        assert!(t.subscribe_membership().is_err());

        t.emit(MembershipEvent::joined(GroupId(-1), UserId(2))).await;
        assert_eq!(rx.recv().await.unwrap().user_id, UserId(2));
    }

    #[tokio::test]
    async fn message_ids_are_unique() {
        let t = MockTransport::new(GroupId(-1));
        let a = t.send_private_message(UserId(1), "a").await.unwrap();
        let b = t.send_private_message(UserId(1), "b").await.unwrap();
        assert_ne!(a, b);
    }
}
