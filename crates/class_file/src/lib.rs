// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html

mod access_flags;
pub mod annotations;
pub mod attributes;
mod class_file;
#[macro_use]
mod constant_pool;
mod error;
mod mutf8;
mod options;
mod parser;
mod scanner;

use std::fmt;

pub use self::class_file::{ClassFile, FieldInfo, MemberInfo, MethodInfo};
pub use access_flags::AccessFlags;
pub use attributes::{AttributeValue, Attributes};
pub use constant_pool::{ConstantPool, CpInfo, Utf8Info};
pub use error::ClassFileError;
pub use options::ParseOptions;
pub use parser::Parser;
pub use scanner::Scanner;

pub type Result<T, E = ClassFileError> = std::result::Result<T, E>;

/// A raw attribute record. The payload is kept exactly as read and only
/// interpreted when [`Attribute::decode`] is called.
#[derive(Clone, PartialEq, Eq)]
pub struct Attribute {
    pub attribute_name_index: u16,
    pub info: Vec<u8>,
}
impl Attribute {
    /// The declared `attribute_length`, which always equals the payload size.
    pub fn attribute_length(&self) -> u32 {
        self.info.len() as u32
    }

    pub fn name<'a>(&self, constant_pool: &'a ConstantPool) -> Result<&'a str> {
        constant_pool.utf8(self.attribute_name_index)
    }

    pub fn decode(&self, constant_pool: &ConstantPool) -> Result<AttributeValue> {
        attributes::decode(self, constant_pool, &ParseOptions::default())
    }

    pub fn decode_with(
        &self,
        constant_pool: &ConstantPool,
        options: &ParseOptions,
    ) -> Result<AttributeValue> {
        attributes::decode(self, constant_pool, options)
    }
}
impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("attribute_name_index", &self.attribute_name_index)
            .field("info", &format!("({} bytes)", self.info.len()))
            .finish()
    }
}
