// SPDX-FileCopyrightText: 2026 Orderlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mini-app links and the inline buttons that open them.

use orderlink_core::error::OrderlinkError;
use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};

/// Builds contractor mini-app URLs from the configured public base.
#[derive(Debug, Clone)]
pub struct MiniAppLinks {
    base: String,
}

impl MiniAppLinks {
    pub fn new(public_url: &str) -> Self {
        Self {
            base: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// `{base}/?order_id={id}` for an order, `{base}/` for the cabinet root.
    pub fn url(&self, order_id: Option<&str>) -> Result<Url, OrderlinkError> {
        let raw = match order_id.filter(|id| !id.is_empty()) {
            Some(id) => format!("{}/?order_id={id}", self.base),
            None => format!("{}/", self.base),
        };
        Url::parse(&raw).map_err(|e| {
            OrderlinkError::Config(format!("invalid telegram.miniapp_public_url '{raw}': {e}"))
        })
    }

    /// A single-button keyboard opening the mini-app as a web app.
    pub fn open_button(
        &self,
        order_id: Option<&str>,
        label: &str,
    ) -> Result<InlineKeyboardMarkup, OrderlinkError> {
        let url = self.url(order_id)?;
        Ok(InlineKeyboardMarkup::new(vec![vec![
            InlineKeyboardButton::web_app(label, WebAppInfo { url }),
        ]]))
    }
}
