use thiserror::Error;

use crate::constant_pool;

#[derive(Error, Debug)]
pub enum ClassFileError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error("Truncated input: {0} more byte(s) needed")]
    TruncatedInput(usize),
    #[error("Invalid magic identifier: 0x{0:X}")]
    InvalidMagicIdentifier(u32),
    #[error("Invalid cp info tag: {0}")]
    InvalidCpInfoTag(u8),
    #[error("Unsupported class file version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("Buffer underrun at offset {offset}: requested {requested} byte(s), {available} available")]
    BufferUnderrun {
        offset: usize,
        requested: usize,
        available: usize,
    },
    #[error("Attribute {name} declares {declared} byte(s) but its contents take {consumed}")]
    PayloadLengthMismatch {
        name: String,
        declared: usize,
        consumed: usize,
    },
    #[error("Constant pool count {0} leaves no room for the second slot of a long or double")]
    ConstantPoolOverflow(u16),
    #[error("Invalid constant pool index: {0}")]
    InvalidConstantPoolIndex(u16),
    #[error("Expected {0}, found {1:?}")]
    UnexpectedConstantPoolEntry(&'static str, constant_pool::CpInfo),
    #[error("Invalid element value tag: 0x{0:X}")]
    InvalidElementValueTag(u8),
    #[error("Invalid stack map frame type: {0}")]
    InvalidStackMapFrameType(u8),
    #[error("Invalid verification type tag: {0}")]
    InvalidVerificationTypeTag(u8),
    #[error("Invalid type annotation target: 0x{0:X}")]
    InvalidTargetType(u8),
    #[error("Element values nested deeper than {0} levels")]
    NestingTooDeep(usize),
}
