#![allow(dead_code)]

use byteorder::{BigEndian, WriteBytesExt};

pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Assembles a class file in memory. Indices handed out by the `add_*`
/// methods are real constant pool indices.
pub struct ClassBuilder {
    pub major_version: u16,
    pub access_flags: u16,
    pub this_class: u16,
    pub super_class: u16,
    pub interfaces: Vec<u16>,
    entries: Vec<u8>,
    slots: u16,
    fields: Vec<Vec<u8>>,
    methods: Vec<Vec<u8>>,
    attributes: Vec<Vec<u8>>,
}

impl ClassBuilder {
    pub fn new() -> Self {
        Self {
            major_version: 52,
            access_flags: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            entries: Vec::new(),
            slots: 0,
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Appends an already encoded entry, tag included.
    pub fn add_raw(&mut self, encoded: &[u8], slots: u16) -> u16 {
        self.entries.extend_from_slice(encoded);
        self.slots += slots;
        self.slots - slots + 1
    }

    pub fn add_utf8(&mut self, s: &str) -> u16 {
        let mut encoded = vec![1];
        encoded.write_u16::<BigEndian>(s.len() as u16).unwrap();
        encoded.extend_from_slice(s.as_bytes());
        self.add_raw(&encoded, 1)
    }

    pub fn add_class(&mut self, name: &str) -> u16 {
        let name_index = self.add_utf8(name);
        let mut encoded = vec![7];
        encoded.write_u16::<BigEndian>(name_index).unwrap();
        self.add_raw(&encoded, 1)
    }

    pub fn add_long(&mut self, value: i64) -> u16 {
        let mut encoded = vec![5];
        encoded.write_i64::<BigEndian>(value).unwrap();
        self.add_raw(&encoded, 2)
    }

    pub fn add_field(&mut self, access_flags: u16, name: u16, descriptor: u16, attributes: &[Vec<u8>]) {
        self.fields
            .push(member(access_flags, name, descriptor, attributes));
    }

    pub fn add_method(&mut self, access_flags: u16, name: u16, descriptor: u16, attributes: &[Vec<u8>]) {
        self.methods
            .push(member(access_flags, name, descriptor, attributes));
    }

    pub fn add_attribute(&mut self, attribute: Vec<u8>) {
        self.attributes.push(attribute);
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_u32::<BigEndian>(0xCAFEBABE).unwrap();
        out.write_u16::<BigEndian>(0).unwrap();
        out.write_u16::<BigEndian>(self.major_version).unwrap();
        out.write_u16::<BigEndian>(self.slots + 1).unwrap();
        out.extend_from_slice(&self.entries);
        out.write_u16::<BigEndian>(self.access_flags).unwrap();
        out.write_u16::<BigEndian>(self.this_class).unwrap();
        out.write_u16::<BigEndian>(self.super_class).unwrap();
        out.write_u16::<BigEndian>(self.interfaces.len() as u16).unwrap();
        for interface in &self.interfaces {
            out.write_u16::<BigEndian>(*interface).unwrap();
        }
        for table in [&self.fields, &self.methods, &self.attributes] {
            out.write_u16::<BigEndian>(table.len() as u16).unwrap();
            table.iter().for_each(|item| out.extend_from_slice(item));
        }
        out
    }
}

/// An attribute record whose length field matches the payload.
pub fn attribute(name_index: u16, payload: &[u8]) -> Vec<u8> {
    attribute_with_length(name_index, payload.len() as u32, payload)
}

pub fn attribute_with_length(name_index: u16, length: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<BigEndian>(name_index).unwrap();
    out.write_u32::<BigEndian>(length).unwrap();
    out.extend_from_slice(payload);
    out
}

fn member(access_flags: u16, name: u16, descriptor: u16, attributes: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u16::<BigEndian>(access_flags).unwrap();
    out.write_u16::<BigEndian>(name).unwrap();
    out.write_u16::<BigEndian>(descriptor).unwrap();
    out.write_u16::<BigEndian>(attributes.len() as u16).unwrap();
    attributes.iter().for_each(|a| out.extend_from_slice(a));
    out
}
