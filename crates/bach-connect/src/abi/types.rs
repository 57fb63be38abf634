//! ABI parameter types and values

use std::fmt;

use bach_primitives::Address;
use primitive_types::U256;

/// Solidity parameter type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// `address`
    Address,
    /// `uintN`
    Uint(usize),
    /// `intN`
    Int(usize),
    /// `bool`
    Bool,
    /// `bytes`
    Bytes,
    /// `bytesN` (1..=32)
    FixedBytes(usize),
    /// `string`
    String,
    /// `T[]`
    Array(Box<ParamType>),
    /// `T[k]`
    FixedArray(Box<ParamType>, usize),
    /// `(T1,T2,...)`
    Tuple(Vec<ParamType>),
}

impl ParamType {
    /// Whether the encoding is variable length (lives in the tail)
    pub fn is_dynamic(&self) -> bool {
        match self {
            ParamType::Bytes | ParamType::String | ParamType::Array(_) => true,
            ParamType::FixedArray(inner, _) => inner.is_dynamic(),
            ParamType::Tuple(types) => types.iter().any(ParamType::is_dynamic),
            _ => false,
        }
    }

    /// Bytes occupied in the head of an enclosing sequence, `None` on overflow
    pub(crate) fn head_size(&self) -> Option<usize> {
        if self.is_dynamic() {
            return Some(32);
        }
        match self {
            ParamType::FixedArray(inner, len) => inner.head_size()?.checked_mul(*len),
            ParamType::Tuple(types) => sequence_head_size(types),
            _ => Some(32),
        }
    }

    /// Parse a canonical type string such as `uint256`, `address[]` or `bytes32[4]`
    ///
    /// Tuples need their component list and go through [`ParamType::with_suffix`].
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        let (base, suffix) = match s.find('[') {
            Some(idx) => (&s[..idx], &s[idx..]),
            None => (s, ""),
        };
        let base = parse_elementary(base)?;
        Self::with_suffix(base, suffix)
    }

    /// Apply array suffixes (`[]`, `[3]`, `[2][]`...) left to right
    pub fn with_suffix(base: ParamType, suffix: &str) -> Result<Self, String> {
        let mut ty = base;
        let mut rest = suffix;
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .filter(|_| rest.starts_with('['))
                .ok_or_else(|| format!("malformed array suffix: {}", suffix))?;
            let size = &rest[1..close];
            ty = if size.is_empty() {
                ParamType::Array(Box::new(ty))
            } else {
                let len = size
                    .parse::<usize>()
                    .map_err(|_| format!("invalid array length: {}", size))?;
                ParamType::FixedArray(Box::new(ty), len)
            };
            rest = &rest[close + 1..];
        }
        Ok(ty)
    }
}

/// Total head size of a sequence, `None` on overflow
pub(crate) fn sequence_head_size(types: &[ParamType]) -> Option<usize> {
    types
        .iter()
        .try_fold(0usize, |total, ty| total.checked_add(ty.head_size()?))
}

/// Whether a two's-complement word is the sign extension of an `intN`
pub(crate) fn fits_int(raw: U256, bits: usize) -> bool {
    match bits {
        0 => return raw.is_zero(),
        256.. => return true,
        _ => {}
    }
    let high = raw >> (bits - 1);
    high.is_zero() || high == U256::MAX >> (bits - 1)
}

fn parse_elementary(name: &str) -> Result<ParamType, String> {
    let ty = match name {
        "address" => ParamType::Address,
        "bool" => ParamType::Bool,
        "string" => ParamType::String,
        "bytes" => ParamType::Bytes,
        "uint" => ParamType::Uint(256),
        "int" => ParamType::Int(256),
        _ => {
            if let Some(bits) = name.strip_prefix("uint") {
                ParamType::Uint(parse_bits(name, bits)?)
            } else if let Some(bits) = name.strip_prefix("int") {
                ParamType::Int(parse_bits(name, bits)?)
            } else if let Some(len) = name.strip_prefix("bytes") {
                match len.parse::<usize>() {
                    Ok(n) if (1..=32).contains(&n) => ParamType::FixedBytes(n),
                    _ => return Err(format!("unsupported type: {}", name)),
                }
            } else {
                return Err(format!("unsupported type: {}", name));
            }
        }
    };
    Ok(ty)
}

fn parse_bits(name: &str, bits: &str) -> Result<usize, String> {
    match bits.parse::<usize>() {
        Ok(n) if n > 0 && n <= 256 && n % 8 == 0 => Ok(n),
        _ => Err(format!("unsupported type: {}", name)),
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Address => f.write_str("address"),
            ParamType::Uint(bits) => write!(f, "uint{}", bits),
            ParamType::Int(bits) => write!(f, "int{}", bits),
            ParamType::Bool => f.write_str("bool"),
            ParamType::Bytes => f.write_str("bytes"),
            ParamType::FixedBytes(len) => write!(f, "bytes{}", len),
            ParamType::String => f.write_str("string"),
            ParamType::Array(inner) => write!(f, "{}[]", inner),
            ParamType::FixedArray(inner, len) => write!(f, "{}[{}]", inner, len),
            ParamType::Tuple(types) => {
                f.write_str("(")?;
                for (i, ty) in types.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", ty)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// ABI value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Address
    Address(Address),
    /// Unsigned integer
    Uint(U256),
    /// Signed integer, stored as its 256-bit two's complement
    Int(U256),
    /// Boolean
    Bool(bool),
    /// Dynamic bytes
    Bytes(Vec<u8>),
    /// Fixed-size bytes
    FixedBytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Dynamic array
    Array(Vec<Token>),
    /// Fixed-size array
    FixedArray(Vec<Token>),
    /// Tuple (struct)
    Tuple(Vec<Token>),
}

impl Token {
    /// Unsigned integer token
    pub fn uint(value: impl Into<U256>) -> Self {
        Token::Uint(value.into())
    }

    /// Signed integer token from an `i128`
    pub fn int(value: i128) -> Self {
        if value < 0 {
            // two's complement of v is !(-v - 1); -(v + 1) cannot overflow
            Token::Int(!U256::from((-(value + 1)) as u128))
        } else {
            Token::Int(U256::from(value as u128))
        }
    }

    /// Borrow the address, if this is an address token
    pub fn as_address(&self) -> Option<&Address> {
        match self {
            Token::Address(addr) => Some(addr),
            _ => None,
        }
    }

    /// The unsigned value, if this is a uint token
    pub fn as_uint(&self) -> Option<U256> {
        match self {
            Token::Uint(v) => Some(*v),
            _ => None,
        }
    }

    /// The signed value, if this is an int token that fits in `i128`
    pub fn as_i128(&self) -> Option<i128> {
        let raw = match self {
            Token::Int(raw) => *raw,
            _ => return None,
        };
        let max = U256::from(i128::MAX as u128);
        if raw.bit(255) {
            let magnitude = !raw;
            (magnitude <= max).then(|| -(magnitude.low_u128() as i128) - 1)
        } else {
            (raw <= max).then(|| raw.low_u128() as i128)
        }
    }

    /// The boolean, if this is a bool token
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Token::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the string, if this is a string token
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::String(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_elementary_types() {
        assert_eq!(ParamType::parse("address").unwrap(), ParamType::Address);
        assert_eq!(ParamType::parse("uint").unwrap(), ParamType::Uint(256));
        assert_eq!(ParamType::parse("uint8").unwrap(), ParamType::Uint(8));
        assert_eq!(ParamType::parse("int128").unwrap(), ParamType::Int(128));
        assert_eq!(ParamType::parse("bytes32").unwrap(), ParamType::FixedBytes(32));
        assert!(ParamType::parse("uint7").is_err());
        assert!(ParamType::parse("bytes33").is_err());
        assert!(ParamType::parse("mapping").is_err());
    }

    #[test]
    fn test_parse_array_suffixes() {
        assert_eq!(
            ParamType::parse("address[]").unwrap(),
            ParamType::Array(Box::new(ParamType::Address))
        );
        assert_eq!(
            ParamType::parse("uint256[2][]").unwrap(),
            ParamType::Array(Box::new(ParamType::FixedArray(
                Box::new(ParamType::Uint(256)),
                2
            )))
        );
        assert!(ParamType::parse("uint256[x]").is_err());
        assert!(ParamType::parse("uint256[").is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        let ty = ParamType::Array(Box::new(ParamType::Tuple(vec![
            ParamType::Address,
            ParamType::Uint(256),
        ])));
        assert_eq!(ty.to_string(), "(address,uint256)[]");
    }

    #[test]
    fn test_is_dynamic_and_head_size() {
        assert!(!ParamType::Uint(256).is_dynamic());
        assert!(ParamType::String.is_dynamic());
        let fixed = ParamType::FixedArray(Box::new(ParamType::Uint(256)), 3);
        assert!(!fixed.is_dynamic());
        assert_eq!(fixed.head_size(), Some(96));
        let dyn_fixed = ParamType::FixedArray(Box::new(ParamType::String), 3);
        assert!(dyn_fixed.is_dynamic());
        assert_eq!(dyn_fixed.head_size(), Some(32));

        let nested = ParamType::parse("uint256[4294967296][4294967296]").unwrap();
        assert_eq!(nested.head_size(), None);
    }

    fn raw(value: i128) -> U256 {
        match Token::int(value) {
            Token::Int(raw) => raw,
            other => panic!("not an int token: {:?}", other),
        }
    }

    #[test]
    fn test_fits_int() {
        assert!(fits_int(raw(127), 8));
        assert!(fits_int(raw(-128), 8));
        assert!(!fits_int(raw(128), 8));
        assert!(!fits_int(raw(-129), 8));
        assert!(fits_int(U256::MAX, 256));
        assert!(fits_int(U256::MAX >> 1, 256));
    }

    #[test]
    fn test_int_twos_complement() {
        assert_eq!(Token::int(-1), Token::Int(U256::MAX));
        assert_eq!(Token::int(-1).as_i128(), Some(-1));
        assert_eq!(Token::int(42).as_i128(), Some(42));
        assert_eq!(Token::int(i128::MIN).as_i128(), Some(i128::MIN));
        assert_eq!(Token::Int(U256::MAX >> 1).as_i128(), None);
    }
}
