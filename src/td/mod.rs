pub mod api;
#[cfg(feature = "tdjson")]
pub mod tdjson;
pub mod transport;

pub use api::{AuthorizationState, Function, Object, User, UserStatus};
#[cfg(feature = "tdjson")]
pub use tdjson::TdJsonTransport;
pub use transport::{ChannelTransport, Response, SentQuery, Transport};
