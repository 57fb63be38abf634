//! ABI support for contract handles
//!
//! - Parsing JSON ABI interface descriptors
//! - Computing function selectors
//! - Encoding call data and decoding return data
//!
//! # Example
//!
//! ```rust
//! use bach_connect::abi::{decode, encode, ParamType, Token};
//!
//! let types = [ParamType::Uint(256), ParamType::String];
//! let tokens = [Token::uint(1000u64), Token::String("Lending".into())];
//! let data = encode(&types, &tokens).unwrap();
//! assert_eq!(decode(&types, &data).unwrap(), tokens.to_vec());
//! ```

mod decode;
mod encode;
mod interface;
mod types;

pub use decode::decode;
pub use encode::{encode, encode_function_call, function_selector};
pub use interface::{ContractInterface, FunctionDef, StateMutability};
pub use types::{ParamType, Token};
