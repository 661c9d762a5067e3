//! Structured views of attribute payloads.
//!
//! The class file parser never looks inside an attribute. [`decode`] resolves
//! the attribute's name, picks the matching grammar and runs it over the
//! payload with a fresh [`Scanner`]. Names it does not know come back as
//! [`AttributeValue::Unrecognized`] with the payload untouched.

use crate::{
    annotations::{Annotation, AnnotationDecoder, ElementValue, TypeAnnotation},
    AccessFlags, Attribute, ClassFileError, ConstantPool, ParseOptions, Result, Scanner,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(pub Vec<Attribute>);
impl Attributes {
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn find_by_name(&self, name: &str, constant_pool: &ConstantPool) -> Option<&Attribute> {
        self.0
            .iter()
            .find(|a| a.name(constant_pool).map_or(false, |n| n == name))
    }

    pub fn code_attribute(&self, constant_pool: &ConstantPool) -> Option<CodeAttribute> {
        match self.find_by_name("Code", constant_pool)?.decode(constant_pool) {
            Ok(AttributeValue::Code(code)) => Some(code),
            _ => None,
        }
    }
}
impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    /// Index of the constant a static field is initialised with.
    ConstantValue(u16),
    Code(CodeAttribute),
    StackMapTable(Vec<StackMapFrame>),
    /// `CONSTANT_Class_info` indices of the checked exceptions a method throws.
    Exceptions(Vec<u16>),
    InnerClasses(Vec<InnerClass>),
    EnclosingMethod(EnclosingMethod),
    Synthetic,
    Signature(u16),
    SourceFile(u16),
    SourceDebugExtension(Vec<u8>),
    LineNumberTable(Vec<LineNumber>),
    LocalVariableTable(Vec<LocalVariable>),
    LocalVariableTypeTable(Vec<LocalVariable>),
    Deprecated,
    RuntimeVisibleAnnotations(Vec<Annotation>),
    RuntimeInvisibleAnnotations(Vec<Annotation>),
    RuntimeVisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeInvisibleParameterAnnotations(Vec<Vec<Annotation>>),
    RuntimeVisibleTypeAnnotations(Vec<TypeAnnotation>),
    RuntimeInvisibleTypeAnnotations(Vec<TypeAnnotation>),
    AnnotationDefault(ElementValue),
    BootstrapMethods(Vec<BootstrapMethod>),
    MethodParameters(Vec<MethodParameter>),
    NestHost(u16),
    NestMembers(Vec<u16>),
    PermittedSubclasses(Vec<u16>),
    ModulePackages(Vec<u16>),
    ModuleMainClass(u16),
    /// An attribute this crate has no grammar for, payload as read.
    Unrecognized(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    pub catch_type: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    /// Nested attributes (`LineNumberTable`, `StackMapTable`, ...), still
    /// opaque. Decode them like any other attribute.
    pub attributes: Attributes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationType {
    Top,
    Integer,
    Float,
    Double,
    Long,
    Null,
    UninitializedThis,
    Object { cpool_index: u16 },
    Uninitialized { offset: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
    Same {
        frame_type: u8,
    },
    SameLocals1StackItem {
        frame_type: u8,
        stack: VerificationType,
    },
    SameLocals1StackItemExtended {
        offset_delta: u16,
        stack: VerificationType,
    },
    Chop {
        frame_type: u8,
        offset_delta: u16,
    },
    SameExtended {
        offset_delta: u16,
    },
    Append {
        offset_delta: u16,
        locals: Vec<VerificationType>,
    },
    Full {
        offset_delta: u16,
        locals: Vec<VerificationType>,
        stack: Vec<VerificationType>,
    },
}
impl StackMapFrame {
    pub fn offset_delta(&self) -> u16 {
        match self {
            StackMapFrame::Same { frame_type } => *frame_type as u16,
            StackMapFrame::SameLocals1StackItem { frame_type, .. } => *frame_type as u16 - 64,
            StackMapFrame::SameLocals1StackItemExtended { offset_delta, .. }
            | StackMapFrame::Chop { offset_delta, .. }
            | StackMapFrame::SameExtended { offset_delta }
            | StackMapFrame::Append { offset_delta, .. }
            | StackMapFrame::Full { offset_delta, .. } => *offset_delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClass {
    pub inner_class_info_index: u16,
    /// Zero when the class is not a member of another class.
    pub outer_class_info_index: u16,
    /// Zero for anonymous classes.
    pub inner_name_index: u16,
    pub inner_class_access_flags: AccessFlags,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnclosingMethod {
    pub class_index: u16,
    /// Zero when the class is not enclosed by a method or constructor.
    pub method_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineNumber {
    pub start_pc: u16,
    pub line_number: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariable {
    pub start_pc: u16,
    pub length: u16,
    pub name_index: u16,
    /// A field descriptor in `LocalVariableTable`, a signature in
    /// `LocalVariableTypeTable`.
    pub descriptor_index: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
    pub bootstrap_method_ref: u16,
    pub bootstrap_arguments: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    pub name_index: u16,
    pub access_flags: AccessFlags,
}

/// Decodes `attribute` according to its name. The grammar has to consume the
/// payload exactly; reading past it or stopping short is reported as
/// [`ClassFileError::PayloadLengthMismatch`].
pub(crate) fn decode(
    attribute: &Attribute,
    constant_pool: &ConstantPool,
    options: &ParseOptions,
) -> Result<AttributeValue> {
    let name = attribute.name(constant_pool)?;
    let declared = attribute.info.len();
    let mut scanner = Scanner::new(&attribute.info);

    let value = match decode_known(name, &mut scanner, options) {
        Ok(Some(value)) => value,
        Ok(None) => {
            log::debug!("leaving unrecognized attribute {} undecoded", name);
            return Ok(AttributeValue::Unrecognized(attribute.info.clone()));
        }
        Err(ClassFileError::BufferUnderrun {
            offset, requested, ..
        }) => {
            return Err(ClassFileError::PayloadLengthMismatch {
                name: name.to_owned(),
                declared,
                consumed: offset + requested,
            })
        }
        Err(e) => return Err(e),
    };
    log::trace!("decoded {} ({} bytes)", name, declared);

    if !scanner.is_at_end() {
        return Err(ClassFileError::PayloadLengthMismatch {
            name: name.to_owned(),
            declared,
            consumed: scanner.position(),
        });
    }

    Ok(value)
}

fn decode_known(
    name: &str,
    s: &mut Scanner<'_>,
    options: &ParseOptions,
) -> Result<Option<AttributeValue>> {
    let max_depth = options.max_nesting_depth;

    Ok(Some(match name {
        "ConstantValue" => AttributeValue::ConstantValue(s.read_u16()?),
        "Code" => AttributeValue::Code(parse_code(s)?),
        "StackMapTable" => AttributeValue::StackMapTable(parse_stack_map_table(s)?),
        "Exceptions" => AttributeValue::Exceptions(parse_indices(s)?),
        "InnerClasses" => AttributeValue::InnerClasses(parse_inner_classes(s)?),
        "EnclosingMethod" => AttributeValue::EnclosingMethod(EnclosingMethod {
            class_index: s.read_u16()?,
            method_index: s.read_u16()?,
        }),
        "Synthetic" => AttributeValue::Synthetic,
        "Signature" => AttributeValue::Signature(s.read_u16()?),
        "SourceFile" => AttributeValue::SourceFile(s.read_u16()?),
        "SourceDebugExtension" => {
            AttributeValue::SourceDebugExtension(s.read_bytes(s.remaining())?.to_vec())
        }
        "LineNumberTable" => AttributeValue::LineNumberTable(parse_line_number_table(s)?),
        "LocalVariableTable" => AttributeValue::LocalVariableTable(parse_local_variables(s)?),
        "LocalVariableTypeTable" => {
            AttributeValue::LocalVariableTypeTable(parse_local_variables(s)?)
        }
        "Deprecated" => AttributeValue::Deprecated,
        "RuntimeVisibleAnnotations" => AttributeValue::RuntimeVisibleAnnotations(
            AnnotationDecoder::new(s, max_depth).parse_annotations()?,
        ),
        "RuntimeInvisibleAnnotations" => AttributeValue::RuntimeInvisibleAnnotations(
            AnnotationDecoder::new(s, max_depth).parse_annotations()?,
        ),
        "RuntimeVisibleParameterAnnotations" => {
            AttributeValue::RuntimeVisibleParameterAnnotations(
                AnnotationDecoder::new(s, max_depth).parse_parameter_annotations()?,
            )
        }
        "RuntimeInvisibleParameterAnnotations" => {
            AttributeValue::RuntimeInvisibleParameterAnnotations(
                AnnotationDecoder::new(s, max_depth).parse_parameter_annotations()?,
            )
        }
        "RuntimeVisibleTypeAnnotations" => AttributeValue::RuntimeVisibleTypeAnnotations(
            AnnotationDecoder::new(s, max_depth).parse_type_annotations()?,
        ),
        "RuntimeInvisibleTypeAnnotations" => AttributeValue::RuntimeInvisibleTypeAnnotations(
            AnnotationDecoder::new(s, max_depth).parse_type_annotations()?,
        ),
        "AnnotationDefault" => AttributeValue::AnnotationDefault(
            AnnotationDecoder::new(s, max_depth).parse_element_value()?,
        ),
        "BootstrapMethods" => AttributeValue::BootstrapMethods(parse_bootstrap_methods(s)?),
        "MethodParameters" => AttributeValue::MethodParameters(parse_method_parameters(s)?),
        "NestHost" => AttributeValue::NestHost(s.read_u16()?),
        "NestMembers" => AttributeValue::NestMembers(parse_indices(s)?),
        "PermittedSubclasses" => AttributeValue::PermittedSubclasses(parse_indices(s)?),
        "ModulePackages" => AttributeValue::ModulePackages(parse_indices(s)?),
        "ModuleMainClass" => AttributeValue::ModuleMainClass(s.read_u16()?),
        _ => return Ok(None),
    }))
}

fn parse_code(s: &mut Scanner<'_>) -> Result<CodeAttribute> {
    let max_stack = s.read_u16()?;
    let max_locals = s.read_u16()?;
    let code_length = s.read_u32()?;
    let code = s.read_bytes(code_length as usize)?.to_vec();

    let exception_table_length = s.read_u16()?;
    let exception_table = s.seq(exception_table_length as usize, |s| {
        Ok(ExceptionTableEntry {
            start_pc: s.read_u16()?,
            end_pc: s.read_u16()?,
            handler_pc: s.read_u16()?,
            catch_type: s.read_u16()?,
        })
    })?;

    let attributes_count = s.read_u16()?;
    let attributes = s.seq(attributes_count as usize, parse_attribute)?;

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code,
        exception_table,
        attributes: Attributes(attributes),
    })
}

fn parse_attribute(s: &mut Scanner<'_>) -> Result<Attribute> {
    let attribute_name_index = s.read_u16()?;
    let attribute_length = s.read_u32()?;
    let info = s.read_bytes(attribute_length as usize)?.to_vec();

    Ok(Attribute {
        attribute_name_index,
        info,
    })
}

fn parse_indices(s: &mut Scanner<'_>) -> Result<Vec<u16>> {
    let count = s.read_u16()?;
    s.seq(count as usize, |s| s.read_u16())
}

fn parse_inner_classes(s: &mut Scanner<'_>) -> Result<Vec<InnerClass>> {
    let number_of_classes = s.read_u16()?;
    s.seq(number_of_classes as usize, |s| {
        Ok(InnerClass {
            inner_class_info_index: s.read_u16()?,
            outer_class_info_index: s.read_u16()?,
            inner_name_index: s.read_u16()?,
            inner_class_access_flags: AccessFlags::from_bits_truncate(s.read_u16()?),
        })
    })
}

fn parse_line_number_table(s: &mut Scanner<'_>) -> Result<Vec<LineNumber>> {
    let line_number_table_length = s.read_u16()?;
    s.seq(line_number_table_length as usize, |s| {
        Ok(LineNumber {
            start_pc: s.read_u16()?,
            line_number: s.read_u16()?,
        })
    })
}

fn parse_local_variables(s: &mut Scanner<'_>) -> Result<Vec<LocalVariable>> {
    let table_length = s.read_u16()?;
    s.seq(table_length as usize, |s| {
        Ok(LocalVariable {
            start_pc: s.read_u16()?,
            length: s.read_u16()?,
            name_index: s.read_u16()?,
            descriptor_index: s.read_u16()?,
            index: s.read_u16()?,
        })
    })
}

fn parse_bootstrap_methods(s: &mut Scanner<'_>) -> Result<Vec<BootstrapMethod>> {
    let num_bootstrap_methods = s.read_u16()?;
    s.seq(num_bootstrap_methods as usize, |s| {
        Ok(BootstrapMethod {
            bootstrap_method_ref: s.read_u16()?,
            bootstrap_arguments: parse_indices(s)?,
        })
    })
}

fn parse_method_parameters(s: &mut Scanner<'_>) -> Result<Vec<MethodParameter>> {
    let parameters_count = s.read_u8()?;
    s.seq(parameters_count as usize, |s| {
        Ok(MethodParameter {
            name_index: s.read_u16()?,
            access_flags: AccessFlags::from_bits_truncate(s.read_u16()?),
        })
    })
}

fn parse_stack_map_table(s: &mut Scanner<'_>) -> Result<Vec<StackMapFrame>> {
    let number_of_entries = s.read_u16()?;
    s.seq(number_of_entries as usize, parse_stack_map_frame)
}

// https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.4
fn parse_stack_map_frame(s: &mut Scanner<'_>) -> Result<StackMapFrame> {
    let frame_type = s.read_u8()?;

    Ok(match frame_type {
        0..=63 => StackMapFrame::Same { frame_type },
        64..=127 => StackMapFrame::SameLocals1StackItem {
            frame_type,
            stack: parse_verification_type(s)?,
        },
        247 => StackMapFrame::SameLocals1StackItemExtended {
            offset_delta: s.read_u16()?,
            stack: parse_verification_type(s)?,
        },
        248..=250 => StackMapFrame::Chop {
            frame_type,
            offset_delta: s.read_u16()?,
        },
        251 => StackMapFrame::SameExtended {
            offset_delta: s.read_u16()?,
        },
        252..=254 => StackMapFrame::Append {
            offset_delta: s.read_u16()?,
            locals: s.seq(frame_type as usize - 251, parse_verification_type)?,
        },
        255 => {
            let offset_delta = s.read_u16()?;
            let number_of_locals = s.read_u16()?;
            let locals = s.seq(number_of_locals as usize, parse_verification_type)?;
            let number_of_stack_items = s.read_u16()?;
            let stack = s.seq(number_of_stack_items as usize, parse_verification_type)?;

            StackMapFrame::Full {
                offset_delta,
                locals,
                stack,
            }
        }
        _ => return Err(ClassFileError::InvalidStackMapFrameType(frame_type)),
    })
}

fn parse_verification_type(s: &mut Scanner<'_>) -> Result<VerificationType> {
    let tag = s.read_u8()?;

    Ok(match tag {
        0 => VerificationType::Top,
        1 => VerificationType::Integer,
        2 => VerificationType::Float,
        3 => VerificationType::Double,
        4 => VerificationType::Long,
        5 => VerificationType::Null,
        6 => VerificationType::UninitializedThis,
        7 => VerificationType::Object {
            cpool_index: s.read_u16()?,
        },
        8 => VerificationType::Uninitialized {
            offset: s.read_u16()?,
        },
        _ => return Err(ClassFileError::InvalidVerificationTypeTag(tag)),
    })
}
