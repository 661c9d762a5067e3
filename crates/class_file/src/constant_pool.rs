use std::{
    fmt,
    io::{self, Write},
};

use byteorder::{BigEndian, WriteBytesExt};

use crate::{mutf8, ClassFileError, Result};

#[macro_export]
macro_rules! matches_cp_info {
    ($cp:expr, $index:expr, $i:ident) => {
        match $cp.get($index) {
            Ok($crate::constant_pool::CpInfo::$i(ref n)) => Ok(n),
            Ok(c) => Err($crate::ClassFileError::UnexpectedConstantPoolEntry(
                stringify!($i),
                c.clone(),
            )),
            Err(e) => Err(e),
        }
    };
}

pub const CONSTANT_UTF8: u8 = 1;
pub const CONSTANT_INTEGER: u8 = 3;
pub const CONSTANT_FLOAT: u8 = 4;
pub const CONSTANT_LONG: u8 = 5;
pub const CONSTANT_DOUBLE: u8 = 6;
pub const CONSTANT_CLASS: u8 = 7;
pub const CONSTANT_STRING: u8 = 8;
pub const CONSTANT_FIELD_REF: u8 = 9;
pub const CONSTANT_METHOD_REF: u8 = 10;
pub const CONSTANT_INTERFACE_METHOD_REF: u8 = 11;
pub const CONSTANT_NAME_AND_TYPE: u8 = 12;
pub const CONSTANT_METHOD_HANDLE: u8 = 15;
pub const CONSTANT_METHOD_TYPE: u8 = 16;
pub const CONSTANT_DYNAMIC: u8 = 17;
pub const CONSTANT_INVOKE_DYNAMIC: u8 = 18;
pub const CONSTANT_MODULE: u8 = 19;
pub const CONSTANT_PACKAGE: u8 = 20;

/// The constant pool, addressed from 1. Slot 0 is never stored; the slot
/// following a long or double holds [`CpInfo::Unusable`].
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    cp_infos: Vec<CpInfo>,
}
impl ConstantPool {
    pub fn new(cp_infos: Vec<CpInfo>) -> Self {
        Self { cp_infos }
    }

    /// Number of slots, reserved ones included. This is `constant_pool_count - 1`.
    pub fn len(&self) -> usize {
        self.cp_infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cp_infos.is_empty()
    }

    /// Looks up an entry, rejecting index 0, indices past the end and the
    /// reserved slot after a long or double.
    pub fn get(&self, index: u16) -> Result<&CpInfo> {
        match index
            .checked_sub(1)
            .and_then(|i| self.cp_infos.get(i as usize))
        {
            None | Some(CpInfo::Unusable) => Err(ClassFileError::InvalidConstantPoolIndex(index)),
            Some(cp_info) => Ok(cp_info),
        }
    }

    pub fn is_usable(&self, index: u16) -> bool {
        self.get(index).is_ok()
    }

    pub fn utf8(&self, index: u16) -> Result<&str> {
        matches_cp_info!(self, index, Utf8).map(Utf8Info::as_str)
    }

    /// Usable entries with their pool index.
    pub fn entries(&self) -> impl Iterator<Item = (u16, &CpInfo)> {
        self.cp_infos
            .iter()
            .enumerate()
            .filter(|(_, cp_info)| !matches!(cp_info, CpInfo::Unusable))
            .map(|(i, cp_info)| (i as u16 + 1, cp_info))
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum CpInfo {
    MethodRef(RefInfo),
    FieldRef(RefInfo),
    Float(f32),
    InterfaceMethodRef(RefInfo),
    Class(ClassInfo),
    NameAndType(NameAndTypeInfo),
    Utf8(Utf8Info),
    String { string_index: u16 },
    Dynamic(DynamicInfo),
    InvokeDynamic(DynamicInfo),
    Integer(i32),
    MethodHandle(MethodHandleInfo),
    MethodType(MethodTypeInfo),
    Long(i64),
    Double(f64),
    Module { name_index: u16 },
    Package { name_index: u16 },
    Unusable,
}
impl CpInfo {
    pub fn tag(&self) -> Option<u8> {
        Some(match self {
            CpInfo::Utf8(_) => CONSTANT_UTF8,
            CpInfo::Integer(_) => CONSTANT_INTEGER,
            CpInfo::Float(_) => CONSTANT_FLOAT,
            CpInfo::Long(_) => CONSTANT_LONG,
            CpInfo::Double(_) => CONSTANT_DOUBLE,
            CpInfo::Class(_) => CONSTANT_CLASS,
            CpInfo::String { .. } => CONSTANT_STRING,
            CpInfo::FieldRef(_) => CONSTANT_FIELD_REF,
            CpInfo::MethodRef(_) => CONSTANT_METHOD_REF,
            CpInfo::InterfaceMethodRef(_) => CONSTANT_INTERFACE_METHOD_REF,
            CpInfo::NameAndType(_) => CONSTANT_NAME_AND_TYPE,
            CpInfo::MethodHandle(_) => CONSTANT_METHOD_HANDLE,
            CpInfo::MethodType(_) => CONSTANT_METHOD_TYPE,
            CpInfo::Dynamic(_) => CONSTANT_DYNAMIC,
            CpInfo::InvokeDynamic(_) => CONSTANT_INVOKE_DYNAMIC,
            CpInfo::Module { .. } => CONSTANT_MODULE,
            CpInfo::Package { .. } => CONSTANT_PACKAGE,
            CpInfo::Unusable => return None,
        })
    }

    /// Longs and doubles take up two slots.
    pub fn slot_size(&self) -> usize {
        match self {
            CpInfo::Long(_) | CpInfo::Double(_) => 2,
            _ => 1,
        }
    }

    /// Writes the entry back out in class file form, tag included. Reserved
    /// slots have no encoding and write nothing.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let Some(tag) = self.tag() else {
            return Ok(());
        };
        w.write_u8(tag)?;

        match self {
            CpInfo::Utf8(utf8) => {
                w.write_u16::<BigEndian>(utf8.bytes.len() as u16)?;
                w.write_all(&utf8.bytes)
            }
            CpInfo::Integer(int) => w.write_i32::<BigEndian>(*int),
            CpInfo::Float(float) => w.write_u32::<BigEndian>(float.to_bits()),
            CpInfo::Long(long) => w.write_i64::<BigEndian>(*long),
            CpInfo::Double(double) => w.write_u64::<BigEndian>(double.to_bits()),
            CpInfo::Class(ClassInfo { name_index })
            | CpInfo::Module { name_index }
            | CpInfo::Package { name_index } => w.write_u16::<BigEndian>(*name_index),
            CpInfo::String { string_index } => w.write_u16::<BigEndian>(*string_index),
            CpInfo::FieldRef(r) | CpInfo::MethodRef(r) | CpInfo::InterfaceMethodRef(r) => {
                w.write_u16::<BigEndian>(r.class_index)?;
                w.write_u16::<BigEndian>(r.name_and_type_index)
            }
            CpInfo::NameAndType(nat) => {
                w.write_u16::<BigEndian>(nat.name_index)?;
                w.write_u16::<BigEndian>(nat.descriptor_index)
            }
            CpInfo::MethodHandle(handle) => {
                w.write_u8(handle.reference_kind)?;
                w.write_u16::<BigEndian>(handle.reference_index)
            }
            CpInfo::MethodType(MethodTypeInfo { descriptor_index }) => {
                w.write_u16::<BigEndian>(*descriptor_index)
            }
            CpInfo::Dynamic(dynamic) | CpInfo::InvokeDynamic(dynamic) => {
                w.write_u16::<BigEndian>(dynamic.bootstrap_method_attr_index)?;
                w.write_u16::<BigEndian>(dynamic.name_and_type_index)
            }
            CpInfo::Unusable => Ok(()),
        }
    }
}

/// A `CONSTANT_Utf8_info`. The raw modified UTF-8 bytes are kept so the entry
/// can be written back unchanged; [`Utf8Info::as_str`] gives the decoded text.
#[derive(PartialEq, Eq, Clone)]
pub struct Utf8Info {
    bytes: Vec<u8>,
    value: String,
}
impl Utf8Info {
    pub fn new(bytes: Vec<u8>) -> Self {
        let value = mutf8::decode(&bytes).into_owned();
        Self { bytes, value }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
impl From<&str> for Utf8Info {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes().to_vec())
    }
}
impl PartialEq<str> for Utf8Info {
    fn eq(&self, other: &str) -> bool {
        self.value == other
    }
}
impl PartialEq<&str> for Utf8Info {
    fn eq(&self, other: &&str) -> bool {
        self.value == *other
    }
}
impl fmt::Debug for Utf8Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}
impl fmt::Display for Utf8Info {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct RefInfo {
    pub class_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ClassInfo {
    // Must point at a CONSTANT_Utf8_info holding a binary class or interface
    // name in internal form (§4.2.1).
    pub name_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct NameAndTypeInfo {
    pub name_index: u16,
    pub descriptor_index: u16,
}

/// Shared layout of `CONSTANT_Dynamic_info` and `CONSTANT_InvokeDynamic_info`.
#[derive(Debug, PartialEq, Clone)]
pub struct DynamicInfo {
    pub bootstrap_method_attr_index: u16,
    pub name_and_type_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodHandleInfo {
    pub reference_kind: u8,
    pub reference_index: u16,
}

#[derive(Debug, PartialEq, Clone)]
pub struct MethodTypeInfo {
    pub descriptor_index: u16,
}
