// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command handling for the notify bot's private chats.
//!
//! The bot only answers `/start` (cabinet button) and `/help`; every other
//! update is ignored.

use teloxide::dispatching::{HandlerExt, UpdateFilterExt};
use teloxide::error_handlers::LoggingErrorHandler;
use teloxide::prelude::*;
use teloxide::types::{ChatKind, InlineKeyboardMarkup};
use teloxide::update_listeners::Polling;
use teloxide::utils::command::BotCommands;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::keyboard::MiniAppLinks;

/// Reply to `/start`.
pub const START_TEXT: &str = "Привет! Это корпоративный бот. Откройте личный кабинет подрядчика:";

/// Reply to `/help`.
pub const HELP_TEXT: &str = "Команды: /start — открыть кабинет.";

/// Label of the cabinet button attached to the `/start` reply.
pub const CABINET_BUTTON: &str = "Открыть кабинет";

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    /// Open the contractor cabinet.
    Start,
    /// Show available commands.
    Help,
}

/// Checks whether the message is from a private (DM) chat.
pub fn is_dm(msg: &Message) -> bool {
    matches!(msg.chat.kind, ChatKind::Private(_))
}

/// Text and optional keyboard for a command reply.
pub fn reply_for(command: &Command, links: &MiniAppLinks) -> (&'static str, Option<InlineKeyboardMarkup>) {
    match command {
        Command::Start => {
            let markup = match links.open_button(None, CABINET_BUTTON) {
                Ok(markup) => Some(markup),
                Err(e) => {
                    warn!(error = %e, "cabinet button unavailable");
                    None
                }
            };
            (START_TEXT, markup)
        }
        Command::Help => (HELP_TEXT, None),
    }
}

async fn answer(bot: Bot, msg: Message, command: Command, links: MiniAppLinks) -> ResponseResult<()> {
    if !is_dm(&msg) {
        debug!(chat_id = msg.chat.id.0, "ignoring command outside private chat");
        return Ok(());
    }

    let (text, markup) = reply_for(&command, &links);
    let request = bot.send_message(msg.chat.id, text);
    match markup {
        Some(markup) => request.reply_markup(markup).await?,
        None => request.await?,
    };
    Ok(())
}

/// Spawns long polling, dropping updates queued while the bot was offline.
///
/// The dispatcher stops once `cancel` fires.
pub fn spawn_polling(bot: Bot, links: MiniAppLinks, cancel: CancellationToken) -> JoinHandle<()> {
    info!("starting notify bot long polling");

    tokio::spawn(async move {
        let handler = Update::filter_message()
            .filter_command::<Command>()
            .endpoint(move |bot: Bot, msg: Message, command: Command| {
                let links = links.clone();
                async move { answer(bot, msg, command, links).await }
            });

        let listener = Polling::builder(bot.clone())
            .drop_pending_updates()
            .build();

        let mut dispatcher = Dispatcher::builder(bot, handler)
            .default_handler(|_| async {})
            .build();

        let token = dispatcher.shutdown_token();
        tokio::spawn(async move {
            cancel.cancelled().await;
            match token.shutdown() {
                Ok(done) => done.await,
                Err(e) => debug!(error = %e, "dispatcher was not running"),
            }
        });

        dispatcher
            .dispatch_with_listener(
                listener,
                LoggingErrorHandler::with_custom_text("notify bot polling error"),
            )
            .await;
        info!("notify bot polling stopped");
    })
}
