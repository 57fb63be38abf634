//! ABI encoding

use primitive_types::U256;
use sha3::{Digest, Keccak256};

use super::types::{fits_int, sequence_head_size, ParamType, Token};
use crate::InvokeError;

/// First four bytes of keccak-256 of a canonical function signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let digest = Keccak256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}

/// Encode `tokens` as the ABI sequence described by `types`
pub fn encode(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, InvokeError> {
    encode_sequence(types, tokens)
}

/// Encode a function call: selector followed by the argument sequence
pub fn encode_function_call(
    selector: [u8; 4],
    types: &[ParamType],
    tokens: &[Token],
) -> Result<Vec<u8>, InvokeError> {
    let mut data = selector.to_vec();
    data.extend(encode_sequence(types, tokens)?);
    Ok(data)
}

fn encode_sequence(types: &[ParamType], tokens: &[Token]) -> Result<Vec<u8>, InvokeError> {
    if types.len() != tokens.len() {
        return Err(InvokeError::Abi(format!(
            "expected {} values, got {}",
            types.len(),
            tokens.len()
        )));
    }

    let head_size = sequence_head_size(types)
        .ok_or_else(|| InvokeError::Abi("encoded head size overflows".to_string()))?;
    let mut head = Vec::new();
    let mut tail = Vec::new();

    for (ty, token) in types.iter().zip(tokens) {
        let encoded = encode_single(ty, token)?;
        if ty.is_dynamic() {
            head.extend_from_slice(&word(U256::from(head_size + tail.len())));
            tail.extend(encoded);
        } else {
            head.extend(encoded);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_single(ty: &ParamType, token: &Token) -> Result<Vec<u8>, InvokeError> {
    let encoded = match (ty, token) {
        (ParamType::Address, Token::Address(addr)) => {
            let mut buf = [0u8; 32];
            buf[12..].copy_from_slice(addr.as_bytes());
            buf.to_vec()
        }
        (ParamType::Uint(bits), Token::Uint(value)) => {
            if value.bits() > *bits {
                return Err(InvokeError::Abi(format!("value {} overflows uint{}", value, bits)));
            }
            word(*value).to_vec()
        }
        (ParamType::Int(bits), Token::Int(raw)) => {
            if !fits_int(*raw, *bits) {
                return Err(InvokeError::Abi(format!("value {:x} overflows int{}", raw, bits)));
            }
            word(*raw).to_vec()
        }
        (ParamType::Bool, Token::Bool(b)) => word(U256::from(u8::from(*b))).to_vec(),
        (ParamType::FixedBytes(len), Token::FixedBytes(data)) => {
            if data.len() != *len {
                return Err(InvokeError::Abi(format!(
                    "bytes{} value has {} bytes",
                    len,
                    data.len()
                )));
            }
            let mut buf = [0u8; 32];
            buf[..data.len()].copy_from_slice(data);
            buf.to_vec()
        }
        (ParamType::Bytes, Token::Bytes(data)) => encode_bytes(data),
        (ParamType::String, Token::String(s)) => encode_bytes(s.as_bytes()),
        (ParamType::Array(inner), Token::Array(items)) => {
            let types = vec![(**inner).clone(); items.len()];
            let mut out = word(U256::from(items.len())).to_vec();
            out.extend(encode_sequence(&types, items)?);
            out
        }
        (ParamType::FixedArray(inner, len), Token::FixedArray(items)) => {
            if items.len() != *len {
                return Err(InvokeError::Abi(format!(
                    "{} expects {} elements, got {}",
                    ty,
                    len,
                    items.len()
                )));
            }
            let types = vec![(**inner).clone(); *len];
            encode_sequence(&types, items)?
        }
        (ParamType::Tuple(types), Token::Tuple(items)) => encode_sequence(types, items)?,
        (ty, token) => {
            return Err(InvokeError::Abi(format!("cannot encode {:?} as {}", token, ty)));
        }
    };
    Ok(encoded)
}

fn encode_bytes(data: &[u8]) -> Vec<u8> {
    let padded_len = data.len().div_ceil(32) * 32;
    let mut out = word(U256::from(data.len())).to_vec();
    out.extend_from_slice(data);
    out.resize(32 + padded_len, 0);
    out
}

pub(crate) fn word(value: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use bach_primitives::Address;

    #[test]
    fn test_known_selectors() {
        assert_eq!(function_selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(function_selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
    }

    #[test]
    fn test_encode_static_call() {
        let to = Address::from_bytes([0x11; 20]);
        let data = encode_function_call(
            function_selector("transfer(address,uint256)"),
            &[ParamType::Address, ParamType::Uint(256)],
            &[Token::Address(to), Token::uint(1000u64)],
        )
        .unwrap();

        assert_eq!(data.len(), 4 + 64);
        assert_eq!(&data[16..36], &[0x11; 20]);
        assert_eq!(&data[66..68], &[0x03, 0xe8]);
    }

    #[test]
    fn test_encode_dynamic_string() {
        let data = encode(&[ParamType::String], &[Token::String("hello".into())]).unwrap();
        // offset, length, padded payload
        assert_eq!(data.len(), 96);
        assert_eq!(data[31], 0x20);
        assert_eq!(data[63], 5);
        assert_eq!(&data[64..69], b"hello");
        assert!(data[69..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_dynamic_array_offsets() {
        let data = encode(
            &[ParamType::Uint(256), ParamType::Array(Box::new(ParamType::Uint(256)))],
            &[
                Token::uint(7u64),
                Token::Array(vec![Token::uint(1u64), Token::uint(2u64)]),
            ],
        )
        .unwrap();
        assert_eq!(data.len(), 32 * 5);
        assert_eq!(data[63], 0x40);
        assert_eq!(data[95], 2);
        assert_eq!(data[159], 2);
    }

    #[test]
    fn test_encode_rejects_mismatch() {
        let err = encode(&[ParamType::Bool], &[Token::uint(1u64)]).unwrap_err();
        assert!(matches!(err, InvokeError::Abi(_)));

        let overflow = encode(&[ParamType::Uint(8)], &[Token::uint(256u64)]);
        assert!(overflow.is_err());

        let short = encode(&[ParamType::FixedBytes(32)], &[Token::FixedBytes(vec![1, 2])]);
        assert!(short.is_err());
    }

    #[test]
    fn test_encode_int_range() {
        let data = encode(&[ParamType::Int(8)], &[Token::int(-128)]).unwrap();
        assert!(data[..31].iter().all(|b| *b == 0xff));
        assert_eq!(data[31], 0x80);

        assert!(encode(&[ParamType::Int(8)], &[Token::int(128)]).is_err());
        assert!(encode(&[ParamType::Int(8)], &[Token::int(-129)]).is_err());
        assert!(encode(&[ParamType::Int(256)], &[Token::Int(U256::MAX >> 1)]).is_ok());
    }
}
