//! Authorization-state driver.
//!
//! Entirely reactive: every `updateAuthorizationState` push lands in
//! [`Client::on_authorization_state_update`], which prompts for whatever
//! credential the new state asks for and sends the matching verification
//! request. A generation counter captured by each in-flight verification
//! guards against stale responses arriving after the flow moved on.

use crate::client::Client;
use crate::td::{AuthorizationState, Function, Object};
use crate::td::api::EmailAddressAuthenticationCode;
use log::{debug, error, info, warn};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::oneshot;

/// Where authentication credentials come from. The live binary reads the
/// controlling terminal; tests script the answers.
pub trait CredentialPrompt: Send + Sync {
    fn read_credential(&self, label: &str) -> io::Result<String>;
}

/// Interactive prompt over stdout/stdin.
pub struct StdinPrompt;

impl CredentialPrompt for StdinPrompt {
    fn read_credential(&self, label: &str) -> io::Result<String> {
        let mut out = io::stdout();
        write!(out, "{label}")?;
        out.flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

impl Client {
    /// Runs one transition of the authorization flow against the stored
    /// state. Called by the dispatcher on every authorization-state push
    /// and again when a live verification request comes back as an error.
    pub(crate) async fn on_authorization_state_update(self: &Arc<Self>) {
        let generation = self.auth_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = self.authorization_state.lock().await.clone();
        let Some(state) = state else { return };
        match state {
            AuthorizationState::WaitTdlibParameters => {
                let c = &self.config;
                let rx = self
                    .send_query(Function::SetTdlibParameters {
                        database_directory: c.database_directory.clone(),
                        use_chat_info_database: true,
                        use_message_database: false,
                        use_secret_chats: false,
                        api_id: c.api_id,
                        api_hash: c.api_hash.clone(),
                        system_language_code: c.system_language_code.clone(),
                        device_model: c.device_model.clone(),
                        application_version: c.application_version.clone(),
                    })
                    .await;
                self.watch_auth_response(generation, rx);
            }
            AuthorizationState::WaitPhoneNumber => {
                let Some(phone_number) = self.read_credential("Enter phone number: ").await else {
                    return;
                };
                let rx = self
                    .send_query(Function::SetAuthenticationPhoneNumber { phone_number })
                    .await;
                self.watch_auth_response(generation, rx);
            }
            AuthorizationState::WaitEmailAddress => {
                let Some(email_address) = self.read_credential("Enter email address: ").await
                else {
                    return;
                };
                let rx = self
                    .send_query(Function::SetAuthenticationEmailAddress { email_address })
                    .await;
                self.watch_auth_response(generation, rx);
            }
            AuthorizationState::WaitEmailCode => {
                let Some(code) = self
                    .read_credential("Enter email authentication code: ")
                    .await
                else {
                    return;
                };
                let rx = self
                    .send_query(Function::CheckAuthenticationEmailCode {
                        code: EmailAddressAuthenticationCode { code },
                    })
                    .await;
                self.watch_auth_response(generation, rx);
            }
            AuthorizationState::WaitCode => {
                let Some(code) = self.read_credential("Enter authentication code: ").await else {
                    return;
                };
                let rx = self.send_query(Function::CheckAuthenticationCode { code }).await;
                self.watch_auth_response(generation, rx);
            }
            AuthorizationState::WaitPassword => {
                let Some(password) = self
                    .read_credential("Enter authentication password: ")
                    .await
                else {
                    return;
                };
                let rx = self
                    .send_query(Function::CheckAuthenticationPassword { password })
                    .await;
                self.watch_auth_response(generation, rx);
            }
            AuthorizationState::WaitOtherDeviceConfirmation { link } => {
                info!(target: "Client/Auth", "Confirm this login link on another device: {link}");
            }
            AuthorizationState::WaitRegistration => {
                warn!(target: "Client/Auth", "Registration is not supported");
            }
            AuthorizationState::Ready => {
                self.are_authorized.store(true, Ordering::SeqCst);
                info!(target: "Client/Auth", "Authorization is completed");
            }
            AuthorizationState::LoggingOut => {
                self.are_authorized.store(false, Ordering::SeqCst);
                info!(target: "Client/Auth", "Logging out");
            }
            AuthorizationState::Closing => {
                info!(target: "Client/Auth", "Closing");
            }
            AuthorizationState::Closed => {
                self.are_authorized.store(false, Ordering::SeqCst);
                self.need_restart.store(true, Ordering::SeqCst);
                info!(target: "Client/Auth", "Session terminated");
            }
        }
    }

    async fn read_credential(&self, label: &'static str) -> Option<String> {
        let prompt = self.prompt.clone();
        match tokio::task::spawn_blocking(move || prompt.read_credential(label)).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                error!(target: "Client/Auth", "failed to read credential: {e}");
                None
            }
            Err(e) => {
                error!(target: "Client/Auth", "credential prompt task failed: {e}");
                None
            }
        }
    }

    fn watch_auth_response(self: &Arc<Self>, generation: u64, rx: oneshot::Receiver<Object>) {
        let client = self.clone();
        tokio::spawn(async move {
            if let Ok(object) = rx.await {
                client.check_authentication_response(generation, object).await;
            }
        });
    }

    /// A response whose captured generation no longer matches the live
    /// counter is stale (the flow already moved on or restarted) and is
    /// ignored. A live error re-runs the transition so the user can retry.
    pub(crate) async fn check_authentication_response(
        self: &Arc<Self>,
        generation: u64,
        object: Object,
    ) {
        if generation != self.auth_generation.load(Ordering::SeqCst) {
            debug!(
                target: "Client/Auth",
                "ignoring stale authentication response (generation {generation})"
            );
            return;
        }
        if let Object::Error { code, message } = object {
            error!(target: "Client/Auth", "authentication error {code}: {message}");
            self.on_authorization_state_update().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{scratch_client, scripted_prompt};
    use crate::td::{Object, UserStatus};

    async fn push_auth_state(client: &Arc<Client>, state: AuthorizationState) {
        client
            .process_update(Object::UpdateAuthorizationState {
                authorization_state: state,
            })
            .await;
    }

    #[tokio::test]
    async fn wait_phone_number_prompts_and_sends_verification() {
        let (client, transport, _dir) = scratch_client(scripted_prompt(&["15550001111"])).await;
        push_auth_state(&client, AuthorizationState::WaitPhoneNumber).await;

        let sent = transport.sent_queries();
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].function,
            Function::SetAuthenticationPhoneNumber {
                phone_number: "15550001111".to_string()
            }
        );
    }

    #[tokio::test]
    async fn wait_tdlib_parameters_sends_config() {
        let (client, transport, _dir) = scratch_client(scripted_prompt(&[])).await;
        push_auth_state(&client, AuthorizationState::WaitTdlibParameters).await;

        let sent = transport.sent_queries();
        assert_eq!(sent.len(), 1);
        match &sent[0].function {
            Function::SetTdlibParameters {
                database_directory,
                use_chat_info_database,
                use_message_database,
                ..
            } => {
                assert_eq!(database_directory, "tdlib");
                assert!(use_chat_info_database);
                assert!(!use_message_database);
            }
            other => panic!("unexpected query: {other:?}"),
        }
    }

    #[tokio::test]
    async fn ready_and_closed_flip_session_flags() {
        let (client, _transport, _dir) = scratch_client(scripted_prompt(&[])).await;
        push_auth_state(&client, AuthorizationState::Ready).await;
        assert!(client.is_authorized());

        push_auth_state(&client, AuthorizationState::Closed).await;
        assert!(!client.is_authorized());
        assert!(client.need_restart.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn stale_generation_makes_error_response_a_no_op() {
        let (client, transport, _dir) = scratch_client(scripted_prompt(&["15550001111"])).await;
        push_auth_state(&client, AuthorizationState::WaitPhoneNumber).await;
        let captured = client.auth_generation.load(Ordering::SeqCst);

        // The flow moves on before the response arrives.
        client.auth_generation.fetch_add(1, Ordering::SeqCst);
        client
            .check_authentication_response(
                captured,
                Object::Error {
                    code: 400,
                    message: "PHONE_NUMBER_INVALID".to_string(),
                },
            )
            .await;

        // No retry was issued.
        assert_eq!(transport.sent_queries().len(), 1);
    }

    #[tokio::test]
    async fn live_error_response_reprompts() {
        let (client, transport, _dir) =
            scratch_client(scripted_prompt(&["15550001111", "15550002222"])).await;
        push_auth_state(&client, AuthorizationState::WaitPhoneNumber).await;
        let captured = client.auth_generation.load(Ordering::SeqCst);

        client
            .check_authentication_response(
                captured,
                Object::Error {
                    code: 400,
                    message: "PHONE_NUMBER_INVALID".to_string(),
                },
            )
            .await;

        let sent = transport.sent_queries();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[1].function,
            Function::SetAuthenticationPhoneNumber {
                phone_number: "15550002222".to_string()
            }
        );
    }

    #[tokio::test]
    async fn non_auth_updates_do_not_disturb_the_generation() {
        let (client, _transport, _dir) = scratch_client(scripted_prompt(&[])).await;
        let before = client.auth_generation.load(Ordering::SeqCst);
        client
            .process_update(Object::UpdateUserStatus {
                user_id: 1,
                status: UserStatus::Recently,
            })
            .await;
        assert_eq!(client.auth_generation.load(Ordering::SeqCst), before);
    }
}
