// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! MTProto user-account transport built on grammers.
//!
//! Groups are created as supergroups and addressed by their Bot API id
//! (`-100…`). MTProto needs an access hash for every peer, so peers seen in
//! dialogs, RPC results and updates are cached by bare id and persisted next
//! to the session file. A user missing from the cache is looked up among the
//! participants of the group being operated on; a user the account has never
//! met anywhere cannot be addressed by numeric id.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use grammers_client::types::{Chat, Message, User};
use grammers_client::{Client, Config, InitParams, InvocationError, Update};
use grammers_session::{PackedChat, PackedType, Session};
use grammers_tl_types as tl;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use orderlink_config::model::UserbotConfig;
use orderlink_core::types::{
    AdapterType, AdminRights, GroupId, HealthStatus, MembershipChange, MembershipEvent,
    MessageRef, UserId, UserRef,
};
use orderlink_core::{GroupTransport, OrderlinkError, PluginAdapter};

/// Offset between a bare channel id and its Bot API form.
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Part size for `upload.saveFilePart`.
const UPLOAD_PART_SIZE: usize = 512 * 1024;

/// Largest photo accepted through the small-file upload path.
const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

const EVENT_BUFFER: usize = 256;

/// How often the update pump writes a changed peer cache to disk.
const PEER_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

fn rpc_error(e: InvocationError) -> OrderlinkError {
    OrderlinkError::Transport {
        message: e.to_string(),
        source: Some(Box::new(e)),
    }
}

fn is_rpc(e: &InvocationError, name: &str) -> bool {
    matches!(e, InvocationError::Rpc(rpc) if rpc.name == name)
}

/// Bot API id of a packed peer.
fn bot_api_id(packed: &PackedChat) -> i64 {
    match packed.ty {
        PackedType::User | PackedType::Bot => packed.id,
        PackedType::Chat => -packed.id,
        PackedType::Megagroup | PackedType::Broadcast | PackedType::Gigagroup => {
            -CHANNEL_ID_OFFSET - packed.id
        }
    }
}

/// Bare channel id of a Bot API supergroup id.
fn channel_id(group: GroupId) -> Result<i64, OrderlinkError> {
    if group.0 < -CHANNEL_ID_OFFSET {
        Ok(-group.0 - CHANNEL_ID_OFFSET)
    } else {
        Err(OrderlinkError::InvalidInput(format!(
            "{group} is not a supergroup id"
        )))
    }
}

fn message_ids(messages: &[MessageRef]) -> Result<Vec<i32>, OrderlinkError> {
    messages
        .iter()
        .map(|m| {
            i32::try_from(m.0)
                .map_err(|_| OrderlinkError::InvalidInput(format!("message id {m} out of range")))
        })
        .collect()
}

fn admin_rights(rights: AdminRights) -> tl::enums::ChatAdminRights {
    tl::types::ChatAdminRights {
        change_info: rights.change_info,
        post_messages: false,
        edit_messages: false,
        delete_messages: rights.delete_messages,
        ban_users: rights.restrict_members,
        invite_users: rights.invite_users,
        pin_messages: rights.pin_messages,
        add_admins: rights.promote_members,
        anonymous: rights.anonymous,
        manage_call: rights.manage_video_chats,
        other: rights.manage_chat,
        manage_topics: false,
        post_stories: false,
        edit_stories: false,
        delete_stories: false,
    }
    .into()
}

/// Banned rights: `banned = true` removes the member and blocks rejoining,
/// `false` lifts every restriction.
fn banned_rights(banned: bool) -> tl::enums::ChatBannedRights {
    tl::types::ChatBannedRights {
        view_messages: banned,
        send_messages: banned,
        send_media: banned,
        send_stickers: banned,
        send_gifs: banned,
        send_games: banned,
        send_inline: banned,
        embed_links: banned,
        send_polls: banned,
        change_info: banned,
        invite_users: banned,
        pin_messages: banned,
        manage_topics: banned,
        send_photos: banned,
        send_videos: banned,
        send_roundvideos: banned,
        send_audios: banned,
        send_voices: banned,
        send_docs: banned,
        send_plain: banned,
        until_date: 0,
    }
    .into()
}

/// Membership events carried by a service message.
fn service_events(group: GroupId, sender: Option<i64>, action: &tl::enums::MessageAction) -> Vec<MembershipEvent> {
    let event = |user: i64, change| MembershipEvent {
        group_id: group,
        user_id: UserId(user),
        change,
    };
    match action {
        tl::enums::MessageAction::ChatAddUser(add) => add
            .users
            .iter()
            .map(|u| event(*u, MembershipChange::Joined))
            .collect(),
        tl::enums::MessageAction::ChatJoinedByLink(_) => sender
            .map(|u| vec![event(u, MembershipChange::Joined)])
            .unwrap_or_default(),
        tl::enums::MessageAction::ChatDeleteUser(del) => {
            vec![event(del.user_id, MembershipChange::Left)]
        }
        _ => Vec::new(),
    }
}

/// Whether a participant record describes someone currently in the group.
fn is_present(participant: Option<&tl::enums::ChannelParticipant>) -> bool {
    match participant {
        None | Some(tl::enums::ChannelParticipant::Left(_)) => false,
        // Restricted members stay in the group; kicked ones have `left` set.
        Some(tl::enums::ChannelParticipant::Banned(banned)) => !banned.left,
        Some(_) => true,
    }
}

/// Membership event carried by a raw participant update.
fn participant_event(update: &tl::types::UpdateChannelParticipant) -> MembershipEvent {
    let was = is_present(update.prev_participant.as_ref());
    let now = is_present(update.new_participant.as_ref());
    let change = match (was, now) {
        (false, true) => MembershipChange::Joined,
        (true, true) => MembershipChange::Updated,
        (_, false) => MembershipChange::Left,
    };
    MembershipEvent {
        group_id: GroupId(-CHANNEL_ID_OFFSET - update.channel_id),
        user_id: UserId(update.user_id),
        change,
    }
}

fn random_file_id() -> i64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default();
    nanos ^ (i64::from(std::process::id()) << 32)
}

/// Peers the account has seen, keyed by bare id.
#[derive(Default)]
struct PeerCache {
    peers: DashMap<i64, PackedChat>,
    dirty: AtomicBool,
}

impl PeerCache {
    /// Reads a cache written by [`PeerCache::save`]; a missing file is empty.
    async fn load(path: &Path) -> Result<Self, OrderlinkError> {
        let cache = Self::default();
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(cache),
            Err(e) => {
                return Err(OrderlinkError::Internal(format!(
                    "cannot read peer cache {}: {e}",
                    path.display()
                )));
            }
        };
        let mut skipped = 0usize;
        for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match PackedChat::from_hex(line) {
                Ok(packed) => {
                    cache.peers.insert(packed.id, packed);
                }
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(path = %path.display(), skipped, "ignored malformed peer cache entries");
        }
        Ok(cache)
    }

    /// Writes the cache if it changed since the last save.
    async fn save(&self, path: &Path) -> Result<(), OrderlinkError> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let mut content = String::with_capacity(self.peers.len() * 36);
        for entry in self.peers.iter() {
            content.push_str(&entry.value().to_hex());
            content.push('\n');
        }
        let tmp = path.with_extension("peers.tmp");
        let written = async {
            tokio::fs::write(&tmp, content).await?;
            tokio::fs::rename(&tmp, path).await
        }
        .await;
        if let Err(e) = written {
            self.dirty.store(true, Ordering::Release);
            return Err(OrderlinkError::Internal(format!(
                "cannot write peer cache {}: {e}",
                path.display()
            )));
        }
        debug!(path = %path.display(), peers = self.peers.len(), "peer cache saved");
        Ok(())
    }

    fn insert(&self, packed: PackedChat) {
        if self.peers.insert(packed.id, packed) != Some(packed) {
            self.dirty.store(true, Ordering::Release);
        }
    }

    fn remember(&self, chat: &Chat) {
        if let Chat::User(user) = chat {
            self.remember_user(user);
        } else {
            self.insert(chat.pack());
        }
    }

    /// Min users carry an access hash that is only valid in one context.
    fn remember_user(&self, user: &User) {
        if !user.raw.min {
            self.insert(user.pack());
        }
    }

    fn remember_raw_chats(&self, chats: &[tl::enums::Chat]) {
        for chat in chats {
            if let tl::enums::Chat::Channel(channel) = chat {
                if channel.min {
                    continue;
                }
                let ty = if channel.megagroup {
                    PackedType::Megagroup
                } else {
                    PackedType::Broadcast
                };
                self.insert(PackedChat {
                    ty,
                    id: channel.id,
                    access_hash: channel.access_hash,
                });
            }
        }
    }

    fn remember_raw_users(&self, users: &[tl::enums::User]) {
        for user in users {
            if let tl::enums::User::User(user) = user {
                if user.min {
                    continue;
                }
                let ty = if user.bot { PackedType::Bot } else { PackedType::User };
                self.insert(PackedChat {
                    ty,
                    id: user.id,
                    access_hash: user.access_hash,
                });
            }
        }
    }

    fn get(&self, id: i64) -> Option<PackedChat> {
        self.peers.get(&id).map(|p| *p)
    }
}

fn peers_path(session_path: &Path) -> PathBuf {
    let mut name = session_path.as_os_str().to_owned();
    name.push(".peers");
    PathBuf::from(name)
}

/// [`GroupTransport`] over a logged-in Telegram user account.
pub struct MtprotoTransport {
    client: Client,
    session_path: PathBuf,
    peers_path: PathBuf,
    peers: Arc<PeerCache>,
    events_rx: Mutex<Option<mpsc::Receiver<MembershipEvent>>>,
    pump_cancel: CancellationToken,
}

impl MtprotoTransport {
    /// Connects with the stored session and starts the update pump.
    ///
    /// The session must already be authorized.
    pub async fn connect(config: &UserbotConfig) -> Result<Self, OrderlinkError> {
        let api_id = config
            .api_id
            .ok_or_else(|| OrderlinkError::Config("userbot.api_id is required".into()))?;
        let api_hash = config
            .api_hash
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| OrderlinkError::Config("userbot.api_hash is required".into()))?;

        let session_path = PathBuf::from(&config.session_path);
        if let Some(parent) = session_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                OrderlinkError::Config(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let session = Session::load_file_or_create(&session_path).map_err(|e| {
            OrderlinkError::Config(format!("cannot open session {}: {e}", session_path.display()))
        })?;

        let client = Client::connect(Config {
            session,
            api_id,
            api_hash,
            params: InitParams::default(),
        })
        .await
        .map_err(|e| OrderlinkError::Transport {
            message: format!("failed to connect to Telegram: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !client.is_authorized().await.map_err(rpc_error)? {
            return Err(OrderlinkError::Config(format!(
                "userbot session {} is not authorized",
                session_path.display()
            )));
        }

        let peers_path = peers_path(&session_path);
        let peers = Arc::new(PeerCache::load(&peers_path).await?);
        let mut dialogs = client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(rpc_error)? {
            peers.remember(dialog.chat());
        }
        info!(peers = peers.peers.len(), "userbot connected");

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let pump_cancel = CancellationToken::new();
        tokio::spawn(pump_updates(
            client.clone(),
            peers.clone(),
            peers_path.clone(),
            events_tx,
            pump_cancel.clone(),
        ));

        Ok(Self {
            client,
            session_path,
            peers_path,
            peers,
            events_rx: Mutex::new(Some(events_rx)),
            pump_cancel,
        })
    }

    fn group(&self, group: GroupId) -> Result<PackedChat, OrderlinkError> {
        let id = channel_id(group)?;
        self.peers
            .get(id)
            .ok_or_else(|| OrderlinkError::transport(format!("CHANNEL_NOT_CACHED: {group}")))
    }

    fn input_channel(&self, group: GroupId) -> Result<tl::enums::InputChannel, OrderlinkError> {
        self.group(group)?
            .try_to_input_channel()
            .ok_or_else(|| OrderlinkError::transport(format!("{group} is not a channel")))
    }

    fn user_by_id(&self, user: UserId) -> Result<PackedChat, OrderlinkError> {
        self.peers
            .get(user.0)
            .ok_or_else(|| OrderlinkError::transport(format!("PEER_NOT_CACHED: {user}")))
    }

    /// Cached peer for `user`, falling back to a scan of `group`'s participants.
    async fn member(&self, group: GroupId, user: UserId) -> Result<PackedChat, OrderlinkError> {
        if let Some(packed) = self.peers.get(user.0) {
            return Ok(packed);
        }
        let mut participants = self.client.iter_participants(self.group(group)?);
        while let Some(participant) = participants.next().await.map_err(rpc_error)? {
            self.peers.remember_user(&participant.user);
            if participant.user.id() == user.0 {
                debug!(group_id = %group, user_id = %user, "peer found among participants");
                return self.user_by_id(user);
            }
        }
        Err(OrderlinkError::transport(format!("PEER_NOT_CACHED: {user}")))
    }

    async fn user(&self, group: GroupId, user: &UserRef) -> Result<PackedChat, OrderlinkError> {
        match user {
            UserRef::Id(id) => self.member(group, *id).await,
            UserRef::Username(name) => {
                let chat = self
                    .client
                    .resolve_username(name)
                    .await
                    .map_err(rpc_error)?
                    .ok_or_else(|| OrderlinkError::transport(format!("USERNAME_NOT_OCCUPIED: @{name}")))?;
                self.peers.remember(&chat);
                Ok(chat.pack())
            }
        }
    }

    async fn input_user(&self, group: GroupId, user: &UserRef) -> Result<tl::enums::InputUser, OrderlinkError> {
        self.user(group, user)
            .await?
            .try_to_input_user()
            .ok_or_else(|| OrderlinkError::transport(format!("{user} is not a user")))
    }

    fn remember_updates(&self, updates: &tl::enums::Updates) {
        match updates {
            tl::enums::Updates::Updates(u) => {
                self.peers.remember_raw_chats(&u.chats);
                self.peers.remember_raw_users(&u.users);
            }
            tl::enums::Updates::Combined(u) => {
                self.peers.remember_raw_chats(&u.chats);
                self.peers.remember_raw_users(&u.users);
            }
            _ => {}
        }
    }

    async fn edit_banned(&self, group: GroupId, user: UserId, banned: bool) -> Result<(), OrderlinkError> {
        let request = tl::functions::channels::EditBanned {
            channel: self.input_channel(group)?,
            participant: self.member(group, user).await?.to_input_peer(),
            banned_rights: banned_rights(banned),
        };
        let updates = self.client.invoke(&request).await.map_err(rpc_error)?;
        self.remember_updates(&updates);
        Ok(())
    }

    async fn upload_photo(&self, bytes: &[u8]) -> Result<tl::enums::InputFile, OrderlinkError> {
        if bytes.is_empty() || bytes.len() > MAX_PHOTO_BYTES {
            return Err(OrderlinkError::InvalidInput(format!(
                "photo must be 1..={MAX_PHOTO_BYTES} bytes, got {}",
                bytes.len()
            )));
        }
        let file_id = random_file_id();
        let mut parts = 0i32;
        for (index, chunk) in bytes.chunks(UPLOAD_PART_SIZE).enumerate() {
            let request = tl::functions::upload::SaveFilePart {
                file_id,
                file_part: index as i32,
                bytes: chunk.to_vec(),
            };
            self.client.invoke(&request).await.map_err(rpc_error)?;
            parts += 1;
        }
        Ok(tl::types::InputFile {
            id: file_id,
            parts,
            name: "group-photo.jpg".into(),
            md5_checksum: String::new(),
        }
        .into())
    }
}

async fn pump_updates(
    client: Client,
    peers: Arc<PeerCache>,
    peers_path: PathBuf,
    events: mpsc::Sender<MembershipEvent>,
    cancel: CancellationToken,
) {
    let mut flush = tokio::time::interval(PEER_FLUSH_INTERVAL);
    flush.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        let update = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = flush.tick() => {
                if let Err(e) = peers.save(&peers_path).await {
                    warn!(error = %e, "failed to save peer cache");
                }
                continue;
            }
            update = client.next_update() => update,
        };
        let found = match update {
            Ok(Update::NewMessage(message)) => message_events(&peers, &message),
            Ok(Update::Raw(tl::enums::Update::ChannelParticipant(raw))) => {
                vec![participant_event(&raw)]
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to fetch updates, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };
        for event in found {
            debug!(group_id = %event.group_id, user_id = %event.user_id, change = %event.change, "membership update");
            if events.send(event).await.is_err() {
                debug!("membership receiver dropped, stopping update pump");
                return;
            }
        }
    }
    debug!("update pump stopped");
}

fn message_events(peers: &PeerCache, message: &Message) -> Vec<MembershipEvent> {
    let chat = message.chat();
    peers.remember(&chat);
    let sender = message.sender().map(|s| {
        peers.remember(&s);
        s.id()
    });
    match message.action() {
        Some(action) => service_events(GroupId(bot_api_id(&chat.pack())), sender, action),
        None => Vec::new(),
    }
}

#[async_trait]
impl PluginAdapter for MtprotoTransport {
    fn name(&self) -> &str {
        "mtproto"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, OrderlinkError> {
        match self.client.is_authorized().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Unhealthy("session is not authorized".into())),
            Err(e) => Ok(HealthStatus::Degraded(format!("Telegram unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), OrderlinkError> {
        self.pump_cancel.cancel();
        if let Err(e) = self.peers.save(&self.peers_path).await {
            warn!(error = %e, "failed to save peer cache");
        }
        save_session(&self.client, &self.session_path)
    }
}

fn save_session(client: &Client, path: &Path) -> Result<(), OrderlinkError> {
    client.session().save_to_file(path).map_err(|e| OrderlinkError::Internal(format!(
        "failed to save session {}: {e}",
        path.display()
    )))?;
    debug!(path = %path.display(), "session saved");
    Ok(())
}

#[async_trait]
impl GroupTransport for MtprotoTransport {
    async fn create_group(&self, title: &str, initial_member: UserId) -> Result<GroupId, OrderlinkError> {
        let member = self.user_by_id(initial_member)?;
        let request = tl::functions::channels::CreateChannel {
            broadcast: false,
            megagroup: true,
            for_import: false,
            forum: false,
            title: title.to_string(),
            about: String::new(),
            geo_point: None,
            address: None,
            ttl_period: None,
        };
        let updates = self.client.invoke(&request).await.map_err(rpc_error)?;
        self.remember_updates(&updates);

        let chats = match &updates {
            tl::enums::Updates::Updates(u) => u.chats.as_slice(),
            tl::enums::Updates::Combined(u) => u.chats.as_slice(),
            _ => &[],
        };
        let channel = chats
            .iter()
            .find_map(|c| match c {
                tl::enums::Chat::Channel(ch) => Some(ch.id),
                _ => None,
            })
            .ok_or_else(|| OrderlinkError::transport("createChannel returned no channel"))?;
        let group = GroupId(-CHANNEL_ID_OFFSET - channel);

        let invite = tl::functions::channels::InviteToChannel {
            channel: self.input_channel(group)?,
            users: vec![member
                .try_to_input_user()
                .ok_or_else(|| OrderlinkError::transport(format!("{initial_member} is not a user")))?],
        };
        self.client.invoke(&invite).await.map_err(rpc_error)?;
        info!(group_id = %group, "supergroup created");
        Ok(group)
    }

    async fn set_description(&self, group: GroupId, description: &str) -> Result<(), OrderlinkError> {
        let request = tl::functions::messages::EditChatAbout {
            peer: self.group(group)?.to_input_peer(),
            about: description.to_string(),
        };
        self.client.invoke(&request).await.map_err(rpc_error)?;
        Ok(())
    }

    async fn set_photo(&self, group: GroupId, photo: Vec<u8>) -> Result<(), OrderlinkError> {
        let channel = self.input_channel(group)?;
        let file = self.upload_photo(&photo).await?;
        let request = tl::functions::channels::EditPhoto {
            channel,
            photo: tl::types::InputChatUploadedPhoto {
                file: Some(file),
                video: None,
                video_start_ts: None,
                video_emoji_markup: None,
            }
            .into(),
        };
        self.client.invoke(&request).await.map_err(rpc_error)?;
        Ok(())
    }

    async fn add_members(&self, group: GroupId, users: &[UserRef]) -> Result<(), OrderlinkError> {
        let channel = self.input_channel(group)?;
        let mut inputs = Vec::with_capacity(users.len());
        for user in users {
            inputs.push(self.input_user(group, user).await?);
        }
        let request = tl::functions::channels::InviteToChannel {
            channel,
            users: inputs,
        };
        match self.client.invoke(&request).await {
            Ok(_) => Ok(()),
            Err(e) if is_rpc(&e, "USER_ALREADY_PARTICIPANT") => {
                debug!(group_id = %group, "members already present");
                Ok(())
            }
            Err(e) => Err(rpc_error(e)),
        }
    }

    async fn promote_member(&self, group: GroupId, user: &UserRef, rights: AdminRights) -> Result<(), OrderlinkError> {
        let request = tl::functions::channels::EditAdmin {
            channel: self.input_channel(group)?,
            user_id: self.input_user(group, user).await?,
            admin_rights: admin_rights(rights),
            rank: String::new(),
        };
        let updates = self.client.invoke(&request).await.map_err(rpc_error)?;
        self.remember_updates(&updates);
        Ok(())
    }

    async fn set_member_label(&self, group: GroupId, user: &UserRef, label: &str) -> Result<(), OrderlinkError> {
        let channel = self.input_channel(group)?;
        let packed = self.user(group, user).await?;

        // The label is an admin rank; keep the member's current rights.
        let participant = tl::functions::channels::GetParticipant {
            channel: channel.clone(),
            participant: packed.to_input_peer(),
        };
        let tl::enums::channels::ChannelParticipant::Participant(found) =
            self.client.invoke(&participant).await.map_err(rpc_error)?;
        let current = match found.participant {
            tl::enums::ChannelParticipant::Admin(admin) => admin.admin_rights,
            tl::enums::ChannelParticipant::Creator(creator) => creator.admin_rights,
            _ => {
                return Err(OrderlinkError::transport(format!(
                    "{user} is not an administrator of {group}"
                )));
            }
        };

        let request = tl::functions::channels::EditAdmin {
            channel,
            user_id: packed
                .try_to_input_user()
                .ok_or_else(|| OrderlinkError::transport(format!("{user} is not a user")))?,
            admin_rights: current,
            rank: label.to_string(),
        };
        self.client.invoke(&request).await.map_err(rpc_error)?;
        Ok(())
    }

    async fn ban_member(&self, group: GroupId, user: UserId) -> Result<(), OrderlinkError> {
        self.edit_banned(group, user, true).await
    }

    async fn unban_member(&self, group: GroupId, user: UserId) -> Result<(), OrderlinkError> {
        self.edit_banned(group, user, false).await
    }

    async fn send_private_message(&self, user: UserId, text: &str) -> Result<MessageRef, OrderlinkError> {
        let peer = self.user_by_id(user)?;
        let message = self.client.send_message(peer, text).await.map_err(rpc_error)?;
        Ok(MessageRef(i64::from(message.id())))
    }

    async fn delete_private_messages(&self, user: UserId, messages: &[MessageRef]) -> Result<(), OrderlinkError> {
        let peer = self.user_by_id(user)?;
        let ids = message_ids(messages)?;
        self.client.delete_messages(peer, &ids).await.map_err(rpc_error)?;
        Ok(())
    }

    async fn delete_group_messages(&self, group: GroupId, messages: &[MessageRef]) -> Result<(), OrderlinkError> {
        let peer = self.group(group)?;
        let ids = message_ids(messages)?;
        self.client.delete_messages(peer, &ids).await.map_err(rpc_error)?;
        Ok(())
    }

    async fn list_recent_messages(&self, group: GroupId, limit: usize) -> Result<Vec<MessageRef>, OrderlinkError> {
        let peer = self.group(group)?;
        let mut iter = self.client.iter_messages(peer).limit(limit);
        let mut found = Vec::new();
        while let Some(message) = iter.next().await.map_err(rpc_error)? {
            found.push(MessageRef(i64::from(message.id())));
        }
        Ok(found)
    }

    async fn set_history_visible(&self, group: GroupId, visible: bool) -> Result<(), OrderlinkError> {
        let request = tl::functions::channels::TogglePreHistoryHidden {
            channel: self.input_channel(group)?,
            enabled: !visible,
        };
        match self.client.invoke(&request).await {
            Ok(_) => Ok(()),
            Err(e) if is_rpc(&e, "CHAT_NOT_MODIFIED") => Ok(()),
            Err(e) => Err(rpc_error(e)),
        }
    }

    async fn export_invite_link(&self, group: GroupId) -> Result<String, OrderlinkError> {
        // Replaces the primary link, so the one returned is always valid.
        let request = tl::functions::messages::ExportChatInvite {
            legacy_revoke_permanent: true,
            request_needed: false,
            peer: self.group(group)?.to_input_peer(),
            expire_date: None,
            usage_limit: None,
            title: None,
            subscription_pricing: None,
        };
        match self.client.invoke(&request).await.map_err(rpc_error)? {
            tl::enums::ExportedChatInvite::ChatInviteExported(invite) => Ok(invite.link),
            tl::enums::ExportedChatInvite::ChatInvitePublicJoinRequests => Err(
                OrderlinkError::transport(format!("{group} returned no invite link")),
            ),
        }
    }

    fn subscribe_membership(&self) -> Result<mpsc::Receiver<MembershipEvent>, OrderlinkError> {
        self.events_rx
            .try_lock()
            .ok()
            .and_then(|mut rx| rx.take())
            .ok_or_else(|| OrderlinkError::Internal("membership events already subscribed".into()))
    }
}
