/// Callback authentication and encryption
pub mod codec;
pub mod credentials;
pub mod error;
pub mod frame;
pub mod pkcs7;
pub mod signature;

pub use codec::{CallbackCodec, SealedMessage};
pub use credentials::{decode_encoding_key, CallbackCredentials, KEY_LEN};
pub use error::CallbackError;
pub use frame::{CallbackFrame, FrameMode, NONCE_LEN};
pub use signature::{sign, verify, SIGNATURE_LEN};
