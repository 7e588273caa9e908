pub mod codec;

pub use codec::{
    AbiKind, DecodedValue, checksum_address, decode_arguments, decode_output, encode_call,
    parse_address, parse_amount, parse_bytes32, parse_uint, resolve_kind,
};
