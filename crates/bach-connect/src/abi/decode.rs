//! ABI decoding

use bach_primitives::Address;
use primitive_types::U256;

use super::types::{fits_int, ParamType, Token};
use crate::InvokeError;

/// Decode an ABI sequence (e.g. `eth_call` return data)
pub fn decode(types: &[ParamType], data: &[u8]) -> Result<Vec<Token>, InvokeError> {
    decode_sequence(types, data, 0)
}

fn decode_sequence(
    types: &[ParamType],
    data: &[u8],
    base: usize,
) -> Result<Vec<Token>, InvokeError> {
    let mut tokens = Vec::with_capacity(types.len());
    let mut cursor = base;

    for ty in types {
        if ty.is_dynamic() {
            let offset = read_len(data, cursor)?;
            let start = base
                .checked_add(offset)
                .ok_or_else(|| InvokeError::Abi("offset overflow".to_string()))?;
            tokens.push(decode_single(ty, data, start)?);
            cursor += 32;
        } else {
            tokens.push(decode_single(ty, data, cursor)?);
            cursor += head_size(ty)?;
        }
    }

    Ok(tokens)
}

fn decode_single(ty: &ParamType, data: &[u8], at: usize) -> Result<Token, InvokeError> {
    let token = match ty {
        ParamType::Address => {
            let w = read_word(data, at)?;
            Token::Address(Address::from_slice(&w[12..])?)
        }
        ParamType::Uint(_) => Token::Uint(U256::from_big_endian(read_word(data, at)?)),
        ParamType::Int(bits) => {
            let raw = U256::from_big_endian(read_word(data, at)?);
            if !fits_int(raw, *bits) {
                return Err(InvokeError::Abi(format!("value {:x} is not a valid int{}", raw, bits)));
            }
            Token::Int(raw)
        }
        ParamType::Bool => Token::Bool(read_word(data, at)?[31] != 0),
        ParamType::FixedBytes(len) => Token::FixedBytes(read_word(data, at)?[..*len].to_vec()),
        ParamType::Bytes => Token::Bytes(read_bytes(data, at)?.to_vec()),
        ParamType::String => {
            let bytes = read_bytes(data, at)?;
            let s = std::str::from_utf8(bytes)
                .map_err(|e| InvokeError::Abi(format!("invalid UTF-8: {}", e)))?;
            Token::String(s.to_string())
        }
        ParamType::Array(inner) => {
            let len = read_len(data, at)?;
            // every element takes at least one word; reject lengths the data cannot hold
            if len > data.len() / 32 {
                return Err(InvokeError::Abi(format!("array length {} exceeds data", len)));
            }
            let types = vec![(**inner).clone(); len];
            Token::Array(decode_sequence(&types, data, at + 32)?)
        }
        ParamType::FixedArray(inner, len) => {
            let needed = head_size(inner)?.checked_mul(*len);
            if needed.map_or(true, |needed| needed > data.len().saturating_sub(at)) {
                return Err(InvokeError::Abi(format!("{} exceeds data", ty)));
            }
            let types = vec![(**inner).clone(); *len];
            Token::FixedArray(decode_sequence(&types, data, at)?)
        }
        ParamType::Tuple(types) => Token::Tuple(decode_sequence(types, data, at)?),
    };
    Ok(token)
}

fn head_size(ty: &ParamType) -> Result<usize, InvokeError> {
    ty.head_size()
        .ok_or_else(|| InvokeError::Abi(format!("{} is too large to decode", ty)))
}

fn read_word(data: &[u8], at: usize) -> Result<&[u8], InvokeError> {
    at.checked_add(32)
        .and_then(|end| data.get(at..end))
        .ok_or_else(|| {
            InvokeError::Abi(format!(
                "data too short: need {} bytes, have {}",
                at.saturating_add(32),
                data.len()
            ))
        })
}

fn read_len(data: &[u8], at: usize) -> Result<usize, InvokeError> {
    let value = U256::from_big_endian(read_word(data, at)?);
    if value > U256::from(u32::MAX) {
        return Err(InvokeError::Abi(format!("length or offset too large: {}", value)));
    }
    Ok(value.low_u64() as usize)
}

fn read_bytes(data: &[u8], at: usize) -> Result<&[u8], InvokeError> {
    let len = read_len(data, at)?;
    let start = at + 32;
    data.get(start..start + len)
        .ok_or_else(|| InvokeError::Abi(format!("bytes of length {} exceed data", len)))
}
