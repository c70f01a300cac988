/// PKCS#7 padding over 16-byte blocks
use subtle::{Choice, ConstantTimeEq, ConstantTimeGreater, ConstantTimeLess};

use super::error::CallbackError;

pub const BLOCK_SIZE: usize = 16;

/// Append PKCS#7 padding. Always adds between 1 and `BLOCK_SIZE` bytes.
pub fn pad(data: &mut Vec<u8>) {
    let pad_len = BLOCK_SIZE - (data.len() % BLOCK_SIZE);
    data.resize(data.len() + pad_len, pad_len as u8);
}

/// Strip PKCS#7 padding
///
/// The whole final block is inspected regardless of where the padding check
/// fails, so timing does not reveal which byte was wrong.
pub fn unpad(data: &[u8]) -> Result<&[u8], CallbackError> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(CallbackError::Padding);
    }

    let last_block = &data[data.len() - BLOCK_SIZE..];
    let pad_len = last_block[BLOCK_SIZE - 1];

    let mut valid: Choice = pad_len.ct_gt(&0) & !pad_len.ct_gt(&(BLOCK_SIZE as u8));
    for (i, byte) in last_block.iter().rev().enumerate() {
        let covered = (i as u8).ct_lt(&pad_len);
        valid &= !covered | byte.ct_eq(&pad_len);
    }

    if bool::from(valid) {
        Ok(&data[..data.len() - pad_len as usize])
    } else {
        Err(CallbackError::Padding)
    }
}
