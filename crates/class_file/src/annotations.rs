//! The annotation grammar shared by the `Runtime*Annotations`,
//! `Runtime*ParameterAnnotations`, `Runtime*TypeAnnotations` and
//! `AnnotationDefault` attributes.
//!
//! ```txt
//! annotation {
//!     u2 type_index;
//!     u2 num_element_value_pairs;
//!     {   u2            element_name_index;
//!         element_value value;
//!     } element_value_pairs[num_element_value_pairs];
//! }
//!
//! element_value {
//!     u1 tag;
//!     union {
//!         u2 const_value_index;                    // B C D F I J S Z s
//!         { u2 type_name_index;
//!           u2 const_name_index; } enum_const_value; // e
//!         u2 class_info_index;                     // c
//!         annotation annotation_value;             // @
//!         { u2            num_values;
//!           element_value values[num_values];
//!         } array_value;                           // [
//!     } value;
//! }
//! ```

use crate::{ClassFileError, Result, Scanner};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub type_index: u16,
    pub element_value_pairs: Vec<ElementValuePair>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementValuePair {
    pub element_name_index: u16,
    pub value: ElementValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    /// A primitive or `String` constant. `tag` is the descriptor character
    /// (`B`, `C`, `D`, `F`, `I`, `J`, `S`, `Z`) or `s` for strings.
    Const { tag: u8, const_value_index: u16 },
    Enum {
        type_name_index: u16,
        const_name_index: u16,
    },
    Class { class_info_index: u16 },
    Annotation(Box<Annotation>),
    Array(Vec<ElementValue>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAnnotation {
    pub target_type: u8,
    pub target_info: TargetInfo,
    pub target_path: Vec<TypePathEntry>,
    pub annotation: Annotation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetInfo {
    TypeParameter {
        type_parameter_index: u8,
    },
    Supertype {
        supertype_index: u16,
    },
    TypeParameterBound {
        type_parameter_index: u8,
        bound_index: u8,
    },
    Empty,
    FormalParameter {
        formal_parameter_index: u8,
    },
    Throws {
        throws_type_index: u16,
    },
    LocalVar(Vec<LocalVarTarget>),
    Catch {
        exception_table_index: u16,
    },
    Offset {
        offset: u16,
    },
    TypeArgument {
        offset: u16,
        type_argument_index: u8,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVarTarget {
    pub start_pc: u16,
    pub length: u16,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePathEntry {
    pub type_path_kind: u8,
    pub type_argument_index: u8,
}

/// Decodes annotations from a [`Scanner`]. Element values may nest through
/// arrays and annotations; anything deeper than `max_depth` is rejected with
/// [`ClassFileError::NestingTooDeep`] before it is recursed into.
pub struct AnnotationDecoder<'s, 'a> {
    scanner: &'s mut Scanner<'a>,
    max_depth: usize,
    depth: usize,
}

impl<'s, 'a> AnnotationDecoder<'s, 'a> {
    pub fn new(scanner: &'s mut Scanner<'a>, max_depth: usize) -> Self {
        Self {
            scanner,
            max_depth,
            depth: 0,
        }
    }

    pub fn parse_element_value(&mut self) -> Result<ElementValue> {
        if self.depth >= self.max_depth {
            return Err(ClassFileError::NestingTooDeep(self.max_depth));
        }

        self.depth += 1;
        let value = self.parse_element_value_body();
        self.depth -= 1;

        value
    }

    fn parse_element_value_body(&mut self) -> Result<ElementValue> {
        let tag = self.scanner.read_u8()?;

        Ok(match tag {
            b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' => ElementValue::Const {
                tag,
                const_value_index: self.scanner.read_u16()?,
            },
            b'e' => ElementValue::Enum {
                type_name_index: self.scanner.read_u16()?,
                const_name_index: self.scanner.read_u16()?,
            },
            b'c' => ElementValue::Class {
                class_info_index: self.scanner.read_u16()?,
            },
            b'@' => ElementValue::Annotation(Box::new(self.parse_annotation()?)),
            b'[' => {
                let num_values = self.scanner.read_u16()?;
                ElementValue::Array(
                    (0..num_values)
                        .map(|_| self.parse_element_value())
                        .collect::<Result<Vec<_>>>()?,
                )
            }
            _ => return Err(ClassFileError::InvalidElementValueTag(tag)),
        })
    }

    pub fn parse_annotation(&mut self) -> Result<Annotation> {
        let type_index = self.scanner.read_u16()?;
        let num_element_value_pairs = self.scanner.read_u16()?;
        let element_value_pairs = (0..num_element_value_pairs)
            .map(|_| -> Result<ElementValuePair> {
                Ok(ElementValuePair {
                    element_name_index: self.scanner.read_u16()?,
                    value: self.parse_element_value()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Annotation {
            type_index,
            element_value_pairs,
        })
    }

    pub fn parse_annotations(&mut self) -> Result<Vec<Annotation>> {
        let num_annotations = self.scanner.read_u16()?;
        (0..num_annotations)
            .map(|_| self.parse_annotation())
            .collect()
    }

    /// `num_parameters` is a single byte here, unlike every other count.
    pub fn parse_parameter_annotations(&mut self) -> Result<Vec<Vec<Annotation>>> {
        let num_parameters = self.scanner.read_u8()?;
        (0..num_parameters)
            .map(|_| self.parse_annotations())
            .collect()
    }

    pub fn parse_type_annotations(&mut self) -> Result<Vec<TypeAnnotation>> {
        let num_annotations = self.scanner.read_u16()?;
        (0..num_annotations)
            .map(|_| self.parse_type_annotation())
            .collect()
    }

    // https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.7.20
    fn parse_type_annotation(&mut self) -> Result<TypeAnnotation> {
        let target_type = self.scanner.read_u8()?;
        let target_info = self.parse_target_info(target_type)?;

        let path_length = self.scanner.read_u8()?;
        let target_path = self.scanner.seq(path_length as usize, |s| {
            Ok(TypePathEntry {
                type_path_kind: s.read_u8()?,
                type_argument_index: s.read_u8()?,
            })
        })?;

        let annotation = self.parse_annotation()?;

        Ok(TypeAnnotation {
            target_type,
            target_info,
            target_path,
            annotation,
        })
    }

    fn parse_target_info(&mut self, target_type: u8) -> Result<TargetInfo> {
        let s = &mut *self.scanner;

        Ok(match target_type {
            0x00 | 0x01 => TargetInfo::TypeParameter {
                type_parameter_index: s.read_u8()?,
            },
            0x10 => TargetInfo::Supertype {
                supertype_index: s.read_u16()?,
            },
            0x11 | 0x12 => TargetInfo::TypeParameterBound {
                type_parameter_index: s.read_u8()?,
                bound_index: s.read_u8()?,
            },
            0x13..=0x15 => TargetInfo::Empty,
            0x16 => TargetInfo::FormalParameter {
                formal_parameter_index: s.read_u8()?,
            },
            0x17 => TargetInfo::Throws {
                throws_type_index: s.read_u16()?,
            },
            0x40 | 0x41 => {
                let table_length = s.read_u16()?;
                TargetInfo::LocalVar(s.seq(table_length as usize, |s| {
                    Ok(LocalVarTarget {
                        start_pc: s.read_u16()?,
                        length: s.read_u16()?,
                        index: s.read_u16()?,
                    })
                })?)
            }
            0x42 => TargetInfo::Catch {
                exception_table_index: s.read_u16()?,
            },
            0x43..=0x46 => TargetInfo::Offset {
                offset: s.read_u16()?,
            },
            0x47..=0x4b => TargetInfo::TypeArgument {
                offset: s.read_u16()?,
                type_argument_index: s.read_u8()?,
            },
            _ => return Err(ClassFileError::InvalidTargetType(target_type)),
        })
    }
}


#[cfg(test)]
mod parse_annotations_tests {
    use super::*;

    #[test]
    fn it_should_consume_exactly_the_counted_annotations() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x02,
            0x00, 0x0a, 0x00, 0x00,
            0x00, 0x0b, 0x00, 0x01, 0x00, 0x0c, b'J', 0x00, 0x0d,
            0xff,
        ];
        let mut scanner = Scanner::new(&bytes);
        let annotations = AnnotationDecoder::new(&mut scanner, 64)
            .parse_annotations()
            .unwrap();

        assert_eq!(2, annotations.len());
        assert_eq!(10, annotations[0].type_index);
        assert_eq!(12, annotations[1].element_value_pairs[0].element_name_index);
        assert_eq!(bytes.len() - 1, scanner.position());
    }

    #[test]
    fn it_should_read_a_one_byte_parameter_count() {
        let bytes = [0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0x0a, 0x00, 0x00];
        let mut scanner = Scanner::new(&bytes);
        let parameters = AnnotationDecoder::new(&mut scanner, 64)
            .parse_parameter_annotations()
            .unwrap();

        assert_eq!(2, parameters.len());
        assert!(parameters[0].is_empty());
        assert_eq!(10, parameters[1][0].type_index);
        assert!(scanner.is_at_end());
    }

    #[test]
    fn it_should_parse_a_type_annotation() {
        #[rustfmt::skip]
        let bytes = [
            0x00, 0x01,
            0x47, 0x00, 0x10, 0x01,
            0x01, 0x03, 0x00,
            0x00, 0x0e, 0x00, 0x00,
        ];
        let mut scanner = Scanner::new(&bytes);
        let annotations = AnnotationDecoder::new(&mut scanner, 64)
            .parse_type_annotations()
            .unwrap();

        assert_eq!(
            annotations,
            vec![TypeAnnotation {
                target_type: 0x47,
                target_info: TargetInfo::TypeArgument {
                    offset: 0x10,
                    type_argument_index: 1
                },
                target_path: vec![TypePathEntry {
                    type_path_kind: 3,
                    type_argument_index: 0
                }],
                annotation: Annotation {
                    type_index: 14,
                    element_value_pairs: vec![],
                },
            }]
        );
        assert!(scanner.is_at_end());
    }

    #[test]
    fn it_should_reject_an_unknown_target_type() {
        let mut scanner = Scanner::new(&[0x00, 0x01, 0x20]);

        assert!(matches!(
            AnnotationDecoder::new(&mut scanner, 64).parse_type_annotations(),
            Err(ClassFileError::InvalidTargetType(0x20))
        ));
    }
}
