use std::io::Read;

use crate::{
    attributes::Attributes, constant_pool::ClassInfo, matches_cp_info, parser::Parser,
    AccessFlags, Attribute, AttributeValue, ClassFileError, ConstantPool, ParseOptions, Result,
};

#[derive(Debug)]
pub struct ClassFile {
    pub magic: u32,
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: AccessFlags,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Attributes,
}
impl ClassFile {
    pub fn parse(bytes: impl Read) -> Result<ClassFile> {
        Parser::new(bytes).parse()
    }

    pub fn parse_with(bytes: impl Read, options: ParseOptions) -> Result<ClassFile> {
        Parser::with_options(bytes, options).parse()
    }

    pub fn super_class(&self) -> Result<Option<&str>> {
        // Zero only for java/lang/Object, the one class without a direct
        // superclass. Otherwise it names a CONSTANT_Class_info.
        if self.super_class == 0 {
            return Ok(None);
        }

        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.super_class, Class)?;

        Ok(Some(self.constant_pool.utf8(*name_index)?))
    }

    pub fn class_name(&self) -> Result<&str> {
        let ClassInfo { name_index } =
            matches_cp_info!(self.constant_pool, self.this_class, Class)?;

        self.constant_pool.utf8(*name_index)
    }

    pub fn interface_names(&self) -> Result<Vec<&str>> {
        self.interfaces
            .iter()
            .map(|&index| {
                let ClassInfo { name_index } = matches_cp_info!(self.constant_pool, index, Class)?;
                self.constant_pool.utf8(*name_index)
            })
            .collect()
    }

    pub fn field_name(&self, field: &FieldInfo) -> Result<&str> {
        self.constant_pool.utf8(field.name_index)
    }

    pub fn field_descriptor(&self, field: &FieldInfo) -> Result<&str> {
        self.constant_pool.utf8(field.descriptor_index)
    }

    pub fn method_name(&self, method: &MethodInfo) -> Result<&str> {
        self.constant_pool.utf8(method.name_index)
    }

    pub fn method_descriptor(&self, method: &MethodInfo) -> Result<&str> {
        self.constant_pool.utf8(method.descriptor_index)
    }

    pub fn attribute_name(&self, attribute: &Attribute) -> Result<&str> {
        attribute.name(&self.constant_pool)
    }

    /// Decodes one attribute of this class, or of one of its fields or
    /// methods. A failure here leaves the class file and every other
    /// attribute untouched.
    pub fn decode_attribute(&self, attribute: &Attribute) -> Result<AttributeValue> {
        attribute.decode(&self.constant_pool)
    }

    /// Every index the class, its members and their attribute records point
    /// at must name a usable constant pool slot.
    pub(crate) fn check_indices(&self) -> Result<()> {
        let check = |index: u16| -> Result<()> {
            if self.constant_pool.is_usable(index) {
                Ok(())
            } else {
                Err(ClassFileError::InvalidConstantPoolIndex(index))
            }
        };

        check(self.this_class)?;
        if self.super_class != 0 {
            check(self.super_class)?;
        }
        self.interfaces.iter().try_for_each(|&i| check(i))?;
        self.attributes
            .iter()
            .try_for_each(|a| check(a.attribute_name_index))?;

        for member in self.fields.iter().chain(&self.methods) {
            check(member.name_index)?;
            check(member.descriptor_index)?;
            member
                .attributes
                .iter()
                .try_for_each(|a| check(a.attribute_name_index))?;
        }

        Ok(())
    }
}

/// A `field_info` or `method_info`; both share one layout.
#[derive(Debug)]
pub struct MemberInfo {
    pub access_flags: AccessFlags,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Attributes,
}

pub type FieldInfo = MemberInfo;
pub type MethodInfo = MemberInfo;
