//! Typed subset of the TDLib API.
//!
//! TDLib's JSON interface tags every object with an `@type` discriminator,
//! which maps directly onto internally tagged serde enums. Only the types
//! the client actually sends or pattern-matches on are modelled here;
//! every other incoming object collapses into [`Object::Unsupported`].

use serde::{Deserialize, Serialize};

/// Requests the client can hand to TDLib.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Function {
    #[serde(rename = "getOption")]
    GetOption { name: String },
    #[serde(rename = "setLogVerbosityLevel")]
    SetLogVerbosityLevel { new_verbosity_level: i32 },
    #[serde(rename = "setTdlibParameters")]
    SetTdlibParameters {
        database_directory: String,
        use_chat_info_database: bool,
        use_message_database: bool,
        use_secret_chats: bool,
        api_id: i32,
        api_hash: String,
        system_language_code: String,
        device_model: String,
        application_version: String,
    },
    #[serde(rename = "setAuthenticationPhoneNumber")]
    SetAuthenticationPhoneNumber { phone_number: String },
    #[serde(rename = "setAuthenticationEmailAddress")]
    SetAuthenticationEmailAddress { email_address: String },
    #[serde(rename = "checkAuthenticationEmailCode")]
    CheckAuthenticationEmailCode { code: EmailAddressAuthenticationCode },
    #[serde(rename = "checkAuthenticationCode")]
    CheckAuthenticationCode { code: String },
    #[serde(rename = "checkAuthenticationPassword")]
    CheckAuthenticationPassword { password: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type", rename = "emailAddressAuthenticationCode")]
pub struct EmailAddressAuthenticationCode {
    pub code: String,
}

/// Objects TDLib can deliver back, either as a response to a request or as
/// a push notification (request id 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum Object {
    #[serde(rename = "error")]
    Error { code: i32, message: String },
    #[serde(rename = "ok")]
    Ok,
    #[serde(rename = "updateAuthorizationState")]
    UpdateAuthorizationState {
        authorization_state: AuthorizationState,
    },
    #[serde(rename = "updateUser")]
    UpdateUser { user: User },
    #[serde(rename = "updateUserStatus")]
    UpdateUserStatus { user_id: i64, status: UserStatus },
    /// Any object type the client does not care about.
    #[serde(other, rename = "unsupported")]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum AuthorizationState {
    #[serde(rename = "authorizationStateWaitTdlibParameters")]
    WaitTdlibParameters,
    #[serde(rename = "authorizationStateWaitPhoneNumber")]
    WaitPhoneNumber,
    #[serde(rename = "authorizationStateWaitEmailAddress")]
    WaitEmailAddress,
    #[serde(rename = "authorizationStateWaitEmailCode")]
    WaitEmailCode,
    #[serde(rename = "authorizationStateWaitCode")]
    WaitCode,
    #[serde(rename = "authorizationStateWaitPassword")]
    WaitPassword,
    #[serde(rename = "authorizationStateWaitOtherDeviceConfirmation")]
    WaitOtherDeviceConfirmation {
        #[serde(default)]
        link: String,
    },
    #[serde(rename = "authorizationStateWaitRegistration")]
    WaitRegistration,
    #[serde(rename = "authorizationStateReady")]
    Ready,
    #[serde(rename = "authorizationStateLoggingOut")]
    LoggingOut,
    #[serde(rename = "authorizationStateClosing")]
    Closing,
    #[serde(rename = "authorizationStateClosed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum UserStatus {
    #[serde(rename = "userStatusEmpty")]
    Empty,
    #[serde(rename = "userStatusOnline")]
    Online { expires: i32 },
    #[serde(rename = "userStatusOffline")]
    Offline { was_online: i32 },
    #[serde(rename = "userStatusRecently")]
    Recently,
    #[serde(rename = "userStatusLastWeek")]
    LastWeek,
    #[serde(rename = "userStatusLastMonth")]
    LastMonth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub usernames: Option<Usernames>,
    #[serde(default)]
    pub profile_photo: Option<ProfilePhoto>,
    #[serde(default)]
    pub is_contact: bool,
    #[serde(default)]
    pub is_fake: bool,
    #[serde(default)]
    pub is_scam: bool,
}

impl User {
    /// First name plus the last name when one is set, space joined.
    pub fn full_name(&self) -> String {
        let mut name = self.first_name.clone();
        if !self.last_name.is_empty() {
            name.push(' ');
            name.push_str(&self.last_name);
        }
        name
    }

    /// First active username, if the user has any.
    pub fn active_username(&self) -> Option<&str> {
        self.usernames
            .as_ref()
            .and_then(|u| u.active_usernames.first())
            .map(String::as_str)
    }

    /// Minithumbnail bytes of the profile photo, if present.
    pub fn minithumbnail(&self) -> Option<&[u8]> {
        self.profile_photo
            .as_ref()
            .and_then(|p| p.minithumbnail.as_ref())
            .map(|m| m.data.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Usernames {
    #[serde(default)]
    pub active_usernames: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfilePhoto {
    #[serde(default)]
    pub minithumbnail: Option<Minithumbnail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minithumbnail {
    #[serde(default)]
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_serializes_with_type_tag() {
        let f = Function::GetOption {
            name: "version".to_string(),
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["@type"], "getOption");
        assert_eq!(json["name"], "version");
    }

    #[test]
    fn nested_authentication_code_carries_its_own_tag() {
        let f = Function::CheckAuthenticationEmailCode {
            code: EmailAddressAuthenticationCode {
                code: "1234".to_string(),
            },
        };
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["code"]["@type"], "emailAddressAuthenticationCode");
        assert_eq!(json["code"]["code"], "1234");
    }

    #[test]
    fn unknown_object_type_becomes_unsupported() {
        let json = r#"{"@type":"updateNewChat","chat":{"id":1}}"#;
        let object: Object = serde_json::from_str(json).unwrap();
        assert_eq!(object, Object::Unsupported);
    }

    #[test]
    fn user_status_round_trips_by_type_name() {
        let json = r#"{"@type":"userStatusOffline","was_online":1700000000}"#;
        let status: UserStatus = serde_json::from_str(json).unwrap();
        assert_eq!(
            status,
            UserStatus::Offline {
                was_online: 1700000000
            }
        );
    }

    #[test]
    fn full_name_skips_empty_last_name() {
        let user = User {
            id: 1,
            first_name: "Ada".to_string(),
            last_name: String::new(),
            usernames: None,
            profile_photo: None,
            is_contact: true,
            is_fake: false,
            is_scam: false,
        };
        assert_eq!(user.full_name(), "Ada");
    }
}
