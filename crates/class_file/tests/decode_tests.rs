mod common;

use std::{sync::Arc, thread};

use classdec_class_file::{
    annotations::ElementValue, AttributeValue, ClassFile, ClassFileError, CpInfo, ParseOptions,
};
use common::{attribute, attribute_with_length, ClassBuilder};

fn parse(bytes: &[u8]) -> Result<ClassFile, ClassFileError> {
    common::init_logging();
    ClassFile::parse(bytes)
}

fn class_with_attributes(attributes: &[(&str, &[u8])]) -> ClassFile {
    let mut b = ClassBuilder::new();
    b.this_class = b.add_class("Attributed");
    for (name, payload) in attributes {
        let name_index = b.add_utf8(name);
        b.add_attribute(attribute(name_index, payload));
    }
    parse(&b.build()).unwrap()
}

fn nested_arrays(depth: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for _ in 0..depth {
        bytes.extend_from_slice(&[b'[', 0x00, 0x01]);
    }
    bytes.extend_from_slice(&[b's', 0x00, 0x01]);
    bytes
}

#[test]
fn test_minimal_class_with_a_single_utf8_entry() {
    // this_class has to name a usable slot and the only one holds the Utf8
    // entry. The primary pass checks usability, not kind; naming the class
    // is where the kind is checked.
    let mut b = ClassBuilder::new();
    b.this_class = b.add_utf8("A");
    let class_file = parse(&b.build()).unwrap();

    assert_eq!(1, class_file.constant_pool.len());
    assert_eq!("A", class_file.constant_pool.utf8(1).unwrap());
    assert!(class_file.fields.is_empty());
    assert!(class_file.methods.is_empty());
    assert!(class_file.attributes.is_empty());
    assert!(matches!(
        class_file.class_name(),
        Err(ClassFileError::UnexpectedConstantPoolEntry("Class", CpInfo::Utf8(_)))
    ));
}

#[test]
fn test_constant_value_attribute() {
    let class_file = class_with_attributes(&[("ConstantValue", &[0x00, 0x05])]);

    assert_eq!(
        AttributeValue::ConstantValue(5),
        class_file
            .decode_attribute(&class_file.attributes.0[0])
            .unwrap()
    );
}

#[test]
fn test_payload_shorter_than_its_grammar() {
    let class_file = class_with_attributes(&[
        ("RuntimeVisibleAnnotations", &[0x00, 0x01, 0x00, 0x02]),
        ("ConstantValue", &[0x00, 0x05]),
    ]);

    assert!(matches!(
        class_file.decode_attribute(&class_file.attributes.0[0]),
        Err(ClassFileError::PayloadLengthMismatch {
            declared: 4,
            consumed: 6,
            ..
        })
    ));
    // The failed decode leaves the rest of the class usable.
    assert_eq!(
        AttributeValue::ConstantValue(5),
        class_file
            .decode_attribute(&class_file.attributes.0[1])
            .unwrap()
    );
}

#[test]
fn test_unknown_attribute_is_passed_through() {
    let payload = [0x00, 0xff, 0x10, 0x20, 0x30];
    let class_file = class_with_attributes(&[
        ("XUnknownVendorAttr", &payload),
        ("XUnknownVendorAttr", &[]),
    ]);

    assert_eq!(
        AttributeValue::Unrecognized(payload.to_vec()),
        class_file
            .decode_attribute(&class_file.attributes.0[0])
            .unwrap()
    );
    assert_eq!(
        AttributeValue::Unrecognized(vec![]),
        class_file
            .decode_attribute(&class_file.attributes.0[1])
            .unwrap()
    );
}

#[test]
fn test_payload_length_matches_the_declared_length() {
    let payloads: [&[u8]; 3] = [&[], &[0x01], &[0x00, 0x01, 0x00, 0x02, 0x00]];
    let class_file = class_with_attributes(&[
        ("Deprecated", payloads[0]),
        ("Whatever", payloads[1]),
        ("RuntimeInvisibleAnnotations", payloads[2]),
    ]);

    for (attribute, payload) in class_file.attributes.iter().zip(payloads) {
        assert_eq!(payload.len() as u32, attribute.attribute_length());
        assert_eq!(payload, &attribute.info[..]);
    }
}

#[test]
fn test_constant_pool_entries_round_trip() {
    #[rustfmt::skip]
    let encoded: &[(&[u8], u16)] = &[
        (&[1, 0x00, 0x03, b'a', 0xc0, 0x80], 1),
        (&[3, 0xff, 0xff, 0xff, 0xfe], 1),
        (&[4, 0x3f, 0xc0, 0x00, 0x00], 1),
        (&[5, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01], 2),
        (&[6, 0x40, 0x09, 0x21, 0xfb, 0x54, 0x44, 0x2d, 0x18], 2),
        (&[7, 0x00, 0x01], 1),
        (&[8, 0x00, 0x01], 1),
        (&[9, 0x00, 0x06, 0x00, 0x0e], 1),
        (&[10, 0x00, 0x06, 0x00, 0x0e], 1),
        (&[11, 0x00, 0x06, 0x00, 0x0e], 1),
        (&[12, 0x00, 0x01, 0x00, 0x01], 1),
        (&[15, 0x05, 0x00, 0x0a], 1),
        (&[16, 0x00, 0x01], 1),
        (&[17, 0x00, 0x00, 0x00, 0x0e], 1),
        (&[18, 0x00, 0x01, 0x00, 0x0e], 1),
        (&[19, 0x00, 0x01], 1),
        (&[20, 0x00, 0x01], 1),
    ];

    let mut b = ClassBuilder::new();
    for (bytes, slots) in encoded {
        b.add_raw(bytes, *slots);
    }
    b.this_class = 8;
    let class_file = parse(&b.build()).unwrap();

    assert_eq!(19, class_file.constant_pool.len());
    assert_eq!("a\0", class_file.constant_pool.utf8(1).unwrap());

    let reencoded = class_file
        .constant_pool
        .entries()
        .map(|(_, cp_info)| {
            let mut out = Vec::new();
            cp_info.write_to(&mut out).unwrap();
            out
        })
        .collect::<Vec<_>>();
    let original = encoded.iter().map(|(b, _)| b.to_vec()).collect::<Vec<_>>();
    assert_eq!(original, reencoded);
}

#[test]
fn test_slot_after_a_long_is_unusable() {
    let mut b = ClassBuilder::new();
    b.this_class = b.add_class("Longs");
    let long = b.add_long(1);
    let descriptor = b.add_utf8("J");
    b.add_field(0x0008, long + 1, descriptor, &[]);

    assert!(matches!(
        parse(&b.build()),
        Err(ClassFileError::InvalidConstantPoolIndex(i)) if i == long + 1
    ));
}

#[test]
fn test_zero_this_class_is_rejected() {
    let mut b = ClassBuilder::new();
    b.add_utf8("A");

    assert!(matches!(
        parse(&b.build()),
        Err(ClassFileError::InvalidConstantPoolIndex(0))
    ));
}

#[test]
fn test_attribute_name_pointing_past_the_pool_is_rejected() {
    let mut b = ClassBuilder::new();
    b.this_class = b.add_class("A");
    b.add_attribute(attribute(42, &[]));

    assert!(matches!(
        parse(&b.build()),
        Err(ClassFileError::InvalidConstantPoolIndex(42))
    ));
}

#[test]
fn test_bad_magic() {
    let mut bytes = ClassBuilder::new().build();
    bytes[3] = 0xbf;

    assert!(matches!(
        parse(&bytes),
        Err(ClassFileError::InvalidMagicIdentifier(0xCAFEBABF))
    ));
}

#[test]
fn test_unsupported_version() {
    let mut b = ClassBuilder::new();
    b.major_version = 44;

    assert!(matches!(
        parse(&b.build()),
        Err(ClassFileError::UnsupportedVersion { major: 44, .. })
    ));
}

#[test]
fn test_configured_version_range() {
    let mut b = ClassBuilder::new();
    b.this_class = b.add_class("Modern");
    b.major_version = 65;
    let options = ParseOptions {
        major_versions: 45..=52,
        ..ParseOptions::default()
    };

    assert!(ClassFile::parse(&b.build()[..]).is_ok());
    assert!(matches!(
        ClassFile::parse_with(&b.build()[..], options),
        Err(ClassFileError::UnsupportedVersion { major: 65, .. })
    ));
}

#[test]
fn test_wide_entry_in_the_last_slot() {
    let mut b = ClassBuilder::new();
    b.this_class = b.add_class("Wide");
    b.add_long(7);
    let mut bytes = b.build();
    // Declare one slot fewer than the long needs.
    bytes[9] -= 1;

    assert!(matches!(
        parse(&bytes),
        Err(ClassFileError::ConstantPoolOverflow(4))
    ));
}

#[test]
fn test_truncated_fixed_width_read() {
    let bytes = ClassBuilder::new().build();

    assert!(matches!(
        parse(&bytes[..7]),
        Err(ClassFileError::TruncatedInput(1))
    ));
}

#[test]
fn test_unknown_constant_tag() {
    let mut b = ClassBuilder::new();
    b.add_raw(&[13, 0x00, 0x00], 1);

    assert!(matches!(
        parse(&b.build()),
        Err(ClassFileError::InvalidCpInfoTag(13))
    ));
}

#[test]
fn test_truncated_class_file() {
    let mut b = ClassBuilder::new();
    b.this_class = b.add_class("Cut");
    let name = b.add_utf8("Payload");
    b.add_attribute(attribute_with_length(name, 10, &[0x01, 0x02]));

    assert!(matches!(
        parse(&b.build()),
        Err(ClassFileError::TruncatedInput(8))
    ));

    let bytes = b.build();
    for len in [0, 3, 9, 12] {
        assert!(matches!(
            parse(&bytes[..len]),
            Err(ClassFileError::TruncatedInput(_))
        ));
    }
}

#[test]
fn test_nested_element_values() {
    let class_file = class_with_attributes(&[
        ("AnnotationDefault", &nested_arrays(4)[..]),
        ("AnnotationDefault", &nested_arrays(200)[..]),
    ]);

    let mut value = class_file
        .decode_attribute(&class_file.attributes.0[0])
        .map(|v| match v {
            AttributeValue::AnnotationDefault(value) => value,
            other => panic!("unexpected {:?}", other),
        })
        .unwrap();
    for _ in 0..4 {
        let ElementValue::Array(mut values) = value else {
            panic!("expected an array");
        };
        value = values.remove(0);
    }
    assert!(matches!(value, ElementValue::Const { tag: b's', .. }));

    assert!(matches!(
        class_file.decode_attribute(&class_file.attributes.0[1]),
        Err(ClassFileError::NestingTooDeep(64))
    ));
}

#[test]
fn test_concurrent_decoding() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ClassFile>();
    assert_send_sync::<AttributeValue>();

    let class_file = Arc::new(class_with_attributes(&[
        ("ConstantValue", &[0x00, 0x05]),
        ("AnnotationDefault", &nested_arrays(8)[..]),
        ("XUnknownVendorAttr", &[0xab]),
    ]));

    let handles = (0..8)
        .map(|i| {
            let class_file = Arc::clone(&class_file);
            thread::spawn(move || {
                let attribute = &class_file.attributes.0[i % 3];
                class_file.decode_attribute(attribute).unwrap()
            })
        })
        .collect::<Vec<_>>();

    for (i, handle) in handles.into_iter().enumerate() {
        let value = handle.join().unwrap();
        assert_eq!(
            class_file
                .decode_attribute(&class_file.attributes.0[i % 3])
                .unwrap(),
            value
        );
    }
}

#[test]
fn test_constant_pool_lookup_skips_reserved_slots() {
    let mut b = ClassBuilder::new();
    b.this_class = b.add_class("Pool");
    b.add_long(-1);
    b.add_utf8("tail");
    let class_file = parse(&b.build()).unwrap();

    let entries = class_file.constant_pool.entries().collect::<Vec<_>>();
    assert_eq!(4, entries.len());
    assert_eq!((3, &CpInfo::Long(-1)), entries[2]);
    assert_eq!(5, entries[3].0);
}
