use std::time::Duration;

/// Session parameters handed to the protocol library plus the receive
/// loop's bounded wait. The default api id/hash pair is TDLib's public
/// test pair, matching what the original deployment shipped with.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_id: i32,
    pub api_hash: String,
    pub database_directory: String,
    pub system_language_code: String,
    pub device_model: String,
    pub application_version: String,
    pub receive_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_id: 94575,
            api_hash: "a3406de8d171bb422bb6ddf3bbd800e2".to_string(),
            database_directory: "tdlib".to_string(),
            system_language_code: "en".to_string(),
            device_model: "Desktop".to_string(),
            application_version: "1.0".to_string(),
            receive_timeout: Duration::from_secs(60),
        }
    }
}
