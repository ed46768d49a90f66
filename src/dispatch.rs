//! Push-notification dispatch: pattern-matches incoming updates and routes
//! user status and profile changes to the store. Everything else is a
//! no-op. A failed write is logged and swallowed so one bad row can never
//! stop the receive loop.

use crate::client::Client;
use chrono::{Local, TimeZone, Utc};
use log::{error, info};
use std::sync::Arc;

use crate::td::{Object, User, UserStatus};

impl Client {
    pub(crate) async fn process_update(self: &Arc<Self>, update: Object) {
        match update {
            Object::UpdateAuthorizationState {
                authorization_state,
            } => {
                *self.authorization_state.lock().await = Some(authorization_state);
                self.on_authorization_state_update().await;
            }
            Object::UpdateUser { user } => self.handle_user_update(user).await,
            Object::UpdateUserStatus { user_id, status } => {
                self.handle_status_update(user_id, status).await
            }
            _ => {}
        }
    }

    /// Contacts only; fake and scam accounts are ignored entirely, not
    /// even cached.
    async fn handle_user_update(self: &Arc<Self>, user: User) {
        if !user.is_contact || user.is_fake || user.is_scam {
            return;
        }
        let full_name = user.full_name();
        let username = user.active_username().unwrap_or_default();
        let photo = user.minithumbnail().unwrap_or_default();
        if let Err(e) = self
            .store
            .update_user_info(user.id, &full_name, username, photo)
        {
            error!(target: "Client/Store", "{e}");
        }
        self.users.lock().await.insert(user.id, user);
    }

    /// Always writes exactly one status row per push. Offline timestamps
    /// are shifted one second past the last-seen instant so consumers
    /// sorting by timestamp see the offline sample strictly after it.
    async fn handle_status_update(self: &Arc<Self>, user_id: i64, status: UserStatus) {
        let name = self.display_name(user_id).await;
        let (is_online, timestamp) = match status {
            UserStatus::Online { expires } => {
                info!("{name} is online until {}", format_timestamp(expires));
                (true, expires)
            }
            UserStatus::Offline { was_online } => {
                info!("{name} is offline since {}", format_timestamp(was_online));
                (false, was_online + 1)
            }
            _ => {
                info!("{name} went offline");
                (false, Utc::now().timestamp() as i32)
            }
        };
        if let Err(e) = self.store.insert_status(user_id, timestamp, is_online) {
            error!(target: "Client/Store", "{e}");
        }
    }

    async fn display_name(&self, user_id: i64) -> String {
        match self.users.lock().await.get(&user_id) {
            Some(user) => user.full_name(),
            None => "unknown user".to_string(),
        }
    }
}

fn format_timestamp(timestamp: i32) -> String {
    Local
        .timestamp_opt(i64::from(timestamp), 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
