use std::io::{self, BufReader, Read};

use byteorder::{BigEndian, ByteOrder};

use crate::{
    attributes::Attributes,
    class_file::MemberInfo,
    constant_pool::{
        self, ClassInfo, DynamicInfo, MethodHandleInfo, MethodTypeInfo, NameAndTypeInfo, RefInfo,
        Utf8Info,
    },
};

use super::{constant_pool::CpInfo, *};

type Endian = BigEndian;

pub const MAGIC_IDENTIFIER: u32 = 0xCAFEBABE;

/// Reads a class file from a byte stream in a single forward pass. Attribute
/// payloads are captured as opaque bytes; see [`Attribute::decode`] for the
/// structured view.
pub struct Parser<R> {
    r: BufReader<R>,
    options: ParseOptions,
}
impl<R: Read> Parser<R> {
    pub fn new(r: R) -> Self {
        Self::with_options(r, ParseOptions::default())
    }

    pub fn with_options(r: R, options: ParseOptions) -> Self {
        Self {
            r: BufReader::new(r),
            options,
        }
    }

    pub fn parse(&mut self) -> Result<ClassFile> {
        let magic = self.parse_magic_identifier()?;
        let (major_version, minor_version) = self.parse_version()?;

        let constant_pool = self.parse_constant_pool()?;
        log::debug!(
            "class file version {}.{}, {} constant pool slots",
            major_version,
            minor_version,
            constant_pool.len()
        );

        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let this_class = self.read_u16()?;
        let super_class = self.read_u16()?;
        let interfaces_count = self.read_u16()?;

        let interfaces = (0..interfaces_count)
            .map(|_| self.read_u16())
            .collect::<Result<Vec<_>>>()?;

        let fields_count = self.read_u16()?;
        let fields = self.parse_members(fields_count)?;

        let methods_count = self.read_u16()?;
        let methods = self.parse_members(methods_count)?;

        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count)?;

        let class_file = ClassFile {
            magic,
            minor_version,
            major_version,
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        };
        class_file.check_indices()?;

        Ok(class_file)
    }

    fn parse_magic_identifier(&mut self) -> Result<u32> {
        match self.read_u32()? {
            MAGIC_IDENTIFIER => Ok(MAGIC_IDENTIFIER),
            magic_identifier => Err(ClassFileError::InvalidMagicIdentifier(magic_identifier)),
        }
    }

    fn parse_version(&mut self) -> Result<(u16, u16)> {
        let minor = self.read_u16()?;
        let major = self.read_u16()?;

        if !self.options.accepts_major_version(major) {
            return Err(ClassFileError::UnsupportedVersion { major, minor });
        }
        Ok((major, minor))
    }

    fn parse_constant_pool(&mut self) -> Result<ConstantPool> {
        let constant_pool_count = self.read_u16()?;

        let slots = (constant_pool_count as usize).saturating_sub(1);
        let mut res = Vec::with_capacity(slots);
        while res.len() < slots {
            let cp_info = self.parse_cp_info()?;
            log::trace!("#{} = {:?}", res.len() + 1, cp_info);

            // A long or double in the last slot would claim one past the end.
            let slot_size = cp_info.slot_size();
            if res.len() + slot_size > slots {
                return Err(ClassFileError::ConstantPoolOverflow(constant_pool_count));
            }
            res.push(cp_info);
            (1..slot_size).for_each(|_| res.push(CpInfo::Unusable));
        }
        Ok(ConstantPool::new(res))
    }

    fn parse_cp_info(&mut self) -> Result<CpInfo> {
        let tag = self.read_u8()?;
        let cp_info = match tag {
            constant_pool::CONSTANT_UTF8 => self.parse_utf8()?,
            constant_pool::CONSTANT_INTEGER => CpInfo::Integer(self.read_i32()?),
            constant_pool::CONSTANT_FLOAT => CpInfo::Float(f32::from_bits(self.read_u32()?)),
            constant_pool::CONSTANT_LONG => CpInfo::Long(self.read_i64()?),
            constant_pool::CONSTANT_DOUBLE => CpInfo::Double(f64::from_bits(self.read_u64()?)),
            constant_pool::CONSTANT_CLASS => CpInfo::Class(ClassInfo {
                name_index: self.read_u16()?,
            }),
            constant_pool::CONSTANT_STRING => CpInfo::String {
                string_index: self.read_u16()?,
            },
            constant_pool::CONSTANT_FIELD_REF => CpInfo::FieldRef(self.parse_ref_info()?),
            constant_pool::CONSTANT_METHOD_REF => CpInfo::MethodRef(self.parse_ref_info()?),
            constant_pool::CONSTANT_INTERFACE_METHOD_REF => {
                CpInfo::InterfaceMethodRef(self.parse_ref_info()?)
            }
            constant_pool::CONSTANT_NAME_AND_TYPE => self.parse_name_and_type_info()?,
            constant_pool::CONSTANT_METHOD_HANDLE => self.parse_method_handle()?,
            constant_pool::CONSTANT_METHOD_TYPE => CpInfo::MethodType(MethodTypeInfo {
                descriptor_index: self.read_u16()?,
            }),
            constant_pool::CONSTANT_DYNAMIC => CpInfo::Dynamic(self.parse_dynamic_info()?),
            constant_pool::CONSTANT_INVOKE_DYNAMIC => {
                CpInfo::InvokeDynamic(self.parse_dynamic_info()?)
            }
            constant_pool::CONSTANT_MODULE => CpInfo::Module {
                name_index: self.read_u16()?,
            },
            constant_pool::CONSTANT_PACKAGE => CpInfo::Package {
                name_index: self.read_u16()?,
            },
            _ => return Err(ClassFileError::InvalidCpInfoTag(tag)),
        };

        Ok(cp_info)
    }

    fn parse_utf8(&mut self) -> Result<CpInfo> {
        let length = self.read_u16()?;
        let bytes = self.read_bytes(length as usize)?;

        Ok(CpInfo::Utf8(Utf8Info::new(bytes)))
    }

    fn parse_name_and_type_info(&mut self) -> Result<CpInfo> {
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;

        Ok(CpInfo::NameAndType(NameAndTypeInfo {
            name_index,
            descriptor_index,
        }))
    }

    fn parse_method_handle(&mut self) -> Result<CpInfo> {
        let reference_kind = self.read_u8()?;
        let reference_index = self.read_u16()?;

        Ok(CpInfo::MethodHandle(MethodHandleInfo {
            reference_kind,
            reference_index,
        }))
    }

    fn parse_dynamic_info(&mut self) -> Result<DynamicInfo> {
        let bootstrap_method_attr_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(DynamicInfo {
            bootstrap_method_attr_index,
            name_and_type_index,
        })
    }

    fn parse_ref_info(&mut self) -> Result<RefInfo> {
        let class_index = self.read_u16()?;
        let name_and_type_index = self.read_u16()?;

        Ok(RefInfo {
            class_index,
            name_and_type_index,
        })
    }

    fn parse_members(&mut self, count: u16) -> Result<Vec<MemberInfo>> {
        (0..count)
            .map(|_| self.parse_member_info())
            .collect::<Result<Vec<_>>>()
    }

    fn parse_member_info(&mut self) -> Result<MemberInfo> {
        let access_flags = AccessFlags::from_bits_truncate(self.read_u16()?);
        let name_index = self.read_u16()?;
        let descriptor_index = self.read_u16()?;
        let attributes_count = self.read_u16()?;
        let attributes = self.parse_attributes(attributes_count)?;

        Ok(MemberInfo {
            access_flags,
            name_index,
            descriptor_index,
            attributes,
        })
    }

    fn parse_attribute(&mut self) -> Result<Attribute> {
        let attribute_name_index = self.read_u16()?;
        let attribute_length = self.read_u32()?;
        let info = self.read_bytes(attribute_length as usize)?;
        log::trace!(
            "attribute #{} ({} bytes)",
            attribute_name_index,
            attribute_length
        );

        Ok(Attribute {
            attribute_name_index,
            info,
        })
    }

    fn parse_attributes(&mut self, attributes_count: u16) -> Result<Attributes> {
        (0..attributes_count)
            .map(|_| self.parse_attribute())
            .collect::<Result<Vec<_>>>()
            .map(Attributes)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        // Grow with what the stream actually holds rather than trusting a
        // declared length up front.
        let mut bytes = Vec::with_capacity(len.min(1 << 16));
        let read = (&mut self.r).take(len as u64).read_to_end(&mut bytes)?;
        if read < len {
            return Err(ClassFileError::TruncatedInput(len - read));
        }
        Ok(bytes)
    }

    /// Fills a fixed-width buffer. On a short stream the error carries how
    /// many bytes were missing.
    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        let mut filled = 0;
        while filled < N {
            match self.r.read(&mut buf[filled..]) {
                Ok(0) => return Err(ClassFileError::TruncatedInput(N - filled)),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(buf)
    }

    fn read_u64(&mut self) -> Result<u64> {
        Ok(Endian::read_u64(&self.read_array::<8>()?))
    }

    fn read_i64(&mut self) -> Result<i64> {
        Ok(Endian::read_i64(&self.read_array::<8>()?))
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(Endian::read_u32(&self.read_array::<4>()?))
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(Endian::read_u16(&self.read_array::<2>()?))
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    fn read_i32(&mut self) -> Result<i32> {
        Ok(Endian::read_i32(&self.read_array::<4>()?))
    }
}
