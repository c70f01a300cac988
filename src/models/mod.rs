pub mod callback;
pub mod message;
pub mod outbound;

pub use callback::{render_sealed, BodyFormat, CallbackQuery, EncryptedEnvelope};
pub use message::{IncomingMessage, MessageKind, ReplyMessage};
pub use outbound::{
    AccessTokenResponse, ApiStatus, MessageContent, MessageFormat, OutboundMessage,
    Recipients, SendMessageRequest,
};
