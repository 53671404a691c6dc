// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Group messaging transport used by the provisioning and cleanup paths.
//!
//! The transport speaks as a regular user account, which is what allows it to
//! create groups and to open private chats with contractors who blocked the
//! notify bot.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::OrderlinkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{AdminRights, GroupId, MembershipEvent, MessageRef, UserId, UserRef};

#[async_trait]
pub trait GroupTransport: PluginAdapter {
    /// Creates a group whose only invited member is `initial_member`.
    async fn create_group(
        &self,
        title: &str,
        initial_member: UserId,
    ) -> Result<GroupId, OrderlinkError>;

    async fn set_description(&self, group: GroupId, description: &str)
    -> Result<(), OrderlinkError>;

    /// Uploads `image` (raw JPEG/PNG bytes) as the group photo.
    async fn set_photo(&self, group: GroupId, image: Vec<u8>) -> Result<(), OrderlinkError>;

    /// Adds members in one call. Members already present are not an error.
    async fn add_members(&self, group: GroupId, users: &[UserRef]) -> Result<(), OrderlinkError>;

    async fn promote_member(
        &self,
        group: GroupId,
        user: &UserRef,
        rights: AdminRights,
    ) -> Result<(), OrderlinkError>;

    /// Sets an administrator's custom title.
    async fn set_member_label(
        &self,
        group: GroupId,
        user: &UserRef,
        label: &str,
    ) -> Result<(), OrderlinkError>;

    async fn ban_member(&self, group: GroupId, user: UserId) -> Result<(), OrderlinkError>;

    async fn unban_member(&self, group: GroupId, user: UserId) -> Result<(), OrderlinkError>;

    /// Sends `text` to the user's private chat with the transport account.
    async fn send_private_message(&self, user: UserId, text: &str)
    -> Result<MessageRef, OrderlinkError>;

    /// Deletes messages in a private chat with `user`, revoking them for both sides.
    async fn delete_private_messages(
        &self,
        user: UserId,
        messages: &[MessageRef],
    ) -> Result<(), OrderlinkError>;

    /// Deletes group messages for everyone.
    async fn delete_group_messages(
        &self,
        group: GroupId,
        messages: &[MessageRef],
    ) -> Result<(), OrderlinkError>;

    /// Returns up to `limit` most recent message ids in the group, newest first.
    async fn list_recent_messages(
        &self,
        group: GroupId,
        limit: usize,
    ) -> Result<Vec<MessageRef>, OrderlinkError>;

    /// Toggles whether members who join later can read earlier history.
    async fn set_history_visible(&self, group: GroupId, visible: bool)
    -> Result<(), OrderlinkError>;

    async fn export_invite_link(&self, group: GroupId) -> Result<String, OrderlinkError>;

    /// Takes the receiving end of the membership-change event stream.
    ///
    /// There is a single consumer; a second call returns an error.
    fn subscribe_membership(&self) -> Result<mpsc::Receiver<MembershipEvent>, OrderlinkError>;
}
