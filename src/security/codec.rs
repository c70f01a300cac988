/// Callback body encryption using AES-256-CBC
///
/// Wire format: `base64(iv || AES-256-CBC(pkcs7(frame)))`, where the frame is
/// described in [`super::frame`].
use aes::Aes256;
use base64::{engine::general_purpose, Engine as _};
use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;

use super::credentials::CallbackCredentials;
use super::error::CallbackError;
use super::frame::{self, CallbackFrame, FrameMode, NONCE_LEN};
use super::pkcs7::{self, BLOCK_SIZE};
use super::signature;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Encrypted reply plus the signature over it, ready for the envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SealedMessage {
    #[serde(rename = "Encrypt")]
    pub encrypt: String,
    #[serde(rename = "MsgSignature")]
    pub msg_signature: String,
    #[serde(rename = "TimeStamp")]
    pub timestamp: String,
    #[serde(rename = "Nonce")]
    pub nonce: String,
}

/// Encrypts and decrypts callback bodies for one deployment
///
/// Cheap to clone and safe to share across workers: it only reads the
/// credentials.
#[derive(Debug, Clone)]
pub struct CallbackCodec {
    credentials: Arc<CallbackCredentials>,
    mode: FrameMode,
}

impl CallbackCodec {
    pub fn new(credentials: CallbackCredentials, mode: FrameMode) -> Self {
        Self {
            credentials: Arc::new(credentials),
            mode,
        }
    }

    pub fn credentials(&self) -> &CallbackCredentials {
        &self.credentials
    }

    pub fn frame_mode(&self) -> FrameMode {
        self.mode
    }

    /// Encrypt an outgoing plaintext
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CallbackError> {
        let mut nonce = [0u8; NONCE_LEN];
        let mut iv = [0u8; BLOCK_SIZE];
        let mut rng = rand::rng();
        rng.fill_bytes(&mut nonce);
        rng.fill_bytes(&mut iv);

        let mut buf = CallbackFrame {
            nonce,
            payload: plaintext,
            tenant_id: self.credentials.tenant_id(),
        }
        .pack(self.mode)?;

        pkcs7::pad(&mut buf);
        let padded_len = buf.len();

        let cipher = Aes256CbcEnc::new_from_slices(self.credentials.encoding_key(), &iv)
            .map_err(|e| CallbackError::Cipher(format!("invalid key or iv: {}", e)))?;
        cipher
            .encrypt_padded_mut::<NoPadding>(&mut buf, padded_len)
            .map_err(|_| CallbackError::Cipher("buffer not block aligned".to_string()))?;

        let mut combined = Vec::with_capacity(BLOCK_SIZE + buf.len());
        combined.extend_from_slice(&iv);
        combined.extend_from_slice(&buf);

        Ok(general_purpose::STANDARD.encode(&combined))
    }

    /// Decrypt a received body and verify its tenant id
    pub fn decrypt(&self, ciphertext_b64: &str) -> Result<String, CallbackError> {
        let combined = general_purpose::STANDARD
            .decode(ciphertext_b64.trim())
            .map_err(|e| CallbackError::Decode(format!("invalid base64: {}", e)))?;

        if combined.is_empty() || combined.len() % BLOCK_SIZE != 0 {
            return Err(CallbackError::Decode(format!(
                "ciphertext length {} is not a positive multiple of {}",
                combined.len(),
                BLOCK_SIZE
            )));
        }

        let (iv, body) = combined.split_at(BLOCK_SIZE);
        if body.is_empty() {
            return Err(CallbackError::Cipher("ciphertext has no blocks after the iv".to_string()));
        }

        let cipher = Aes256CbcDec::new_from_slices(self.credentials.encoding_key(), iv)
            .map_err(|e| CallbackError::Cipher(format!("invalid key or iv: {}", e)))?;
        let mut buf = body.to_vec();
        let decrypted = cipher
            .decrypt_padded_mut::<NoPadding>(&mut buf)
            .map_err(|_| CallbackError::Cipher("ciphertext not block aligned".to_string()))?;

        let unpadded = pkcs7::unpad(decrypted)?;
        frame::unpack(unpadded, self.credentials.tenant_id(), self.mode)
    }

    /// Authenticate then decrypt a callback body
    ///
    /// Decryption is never attempted when the signature does not match.
    pub fn open(
        &self,
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
        body: &str,
    ) -> Result<String, CallbackError> {
        if !signature::verify(self.credentials.token(), msg_signature, timestamp, nonce, body) {
            return Err(CallbackError::SignatureMismatch);
        }
        self.decrypt(body)
    }

    /// Encrypt a reply and sign the result
    pub fn seal(&self, plaintext: &str, timestamp: &str, nonce: &str) -> Result<SealedMessage, CallbackError> {
        let encrypt = self.encrypt(plaintext)?;
        let msg_signature = signature::sign(self.credentials.token(), timestamp, nonce, &encrypt);

        Ok(SealedMessage {
            encrypt,
            msg_signature,
            timestamp: timestamp.to_string(),
            nonce: nonce.to_string(),
        })
    }
}
