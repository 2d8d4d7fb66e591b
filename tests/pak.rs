use bpk::{Decoded, Formatters, JsonFormatter, Pak, PakErrorKind, Utf8Formatter};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io::Write};

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Object {
    foo: u32,
    bar: String,
}

#[test]
fn test_pak() {
    let mut pak = Pak::new("secret");
    pak.write("foobar", "This is a test");
    assert_eq!(pak.list_entries(), vec!["foobar"]);

    pak.write("test", "This is number 42");
    let data = pak.export().unwrap();

    let pak2 = Pak::from_slice("secret", &data).unwrap();
    assert_eq!(pak2.list_entries(), vec!["foobar", "test"]);
    assert_eq!(pak2.read("foobar").unwrap(), b"This is a test");
    assert_eq!(pak2.read("test").unwrap(), b"This is number 42");

    // Re-exporting an imported pak is byte for byte identical
    assert_eq!(pak2.export().unwrap(), data);
}

#[test]
fn test_cross_header_rejected() {
    let mut pak = Pak::new("secret");
    pak.write("foobar", "This is a test");
    let data = pak.export().unwrap();

    let err = Pak::from_slice("other", &data).unwrap_err();
    assert!(err.is_format_error());
    assert!(matches!(err.kind(), PakErrorKind::InvalidMagic));
    assert_eq!(err.to_string(), "invalid file format");
}

#[test]
fn test_data_formatters() {
    let mut pak = Pak::new("my-header");
    pak.add_formatter("json", JsonFormatter::<Object>::new());

    let value = Object {
        foo: 42,
        bar: String::from("hello world"),
    };
    pak.write_as("some/object", &value, "json").unwrap();

    assert_eq!(pak.list_entries(), vec!["some/object"]);
    assert_eq!(
        pak.read_as::<Object>("some/object", "json").unwrap(),
        Decoded::Value(value)
    );
}

#[test]
fn test_formatters_survive_export() {
    let formatters = Formatters::new()
        .with("json", JsonFormatter::<BTreeMap<String, i32>>::new())
        .with("text", Utf8Formatter);

    let mut pak = Pak::with_formatters("app", formatters);
    let mut map = BTreeMap::new();
    map.insert(String::from("a"), 1);
    pak.write_as("map", &map, "json").unwrap();
    pak.write_as("name", &String::from("bpk"), "text").unwrap();
    pak.write("raw", vec![0u8, 159, 146, 150]);

    let data = pak.export().unwrap();

    let mut pak2 = Pak::new("app");
    pak2.add_formatter("json", JsonFormatter::<BTreeMap<String, i32>>::new());
    pak2.import(&data).unwrap();

    assert_eq!(
        pak2.read_as::<BTreeMap<String, i32>>("map", "json")
            .unwrap()
            .value(),
        Some(map)
    );

    // No formatter registered for "text" on this side
    let name = pak2.read_as::<String>("name", "text").unwrap();
    assert!(name.is_raw());
    assert_eq!(name.raw(), Some(&b"bpk"[..]));
    assert_eq!(pak2.read("raw").unwrap(), &[0u8, 159, 146, 150]);
}

#[test]
fn test_unknown_entry() {
    let pak = Pak::new("secret");
    let err = pak.read("missing").unwrap_err();
    assert!(err.is_entry_not_found());
    assert_eq!(err.to_string(), "entry \"missing\" not found");
}

#[test]
fn test_overwrite() {
    let mut pak = Pak::new("secret");
    pak.write("a", "one");
    pak.write("a", "two");
    assert_eq!(pak.list_entries(), vec!["a"]);
    assert_eq!(pak.read("a").unwrap(), b"two");

    let pak2 = Pak::from_slice("secret", &pak.export().unwrap()).unwrap();
    assert_eq!(pak2.list_entries(), vec!["a"]);
    assert_eq!(pak2.read("a").unwrap(), b"two");
}

#[test]
fn test_tamper_rejection() {
    let mut pak = Pak::new("secret");
    pak.write("a", "payload");
    let data = pak.export().unwrap();

    for i in 0.."secret".len() {
        let mut tampered = data.clone();
        tampered[i] ^= 0x20;
        let err = Pak::from_slice("secret", &tampered).unwrap_err();
        assert!(err.is_format_error(), "byte {} accepted", i);
    }
}

#[test]
fn test_truncated_input() {
    let mut pak = Pak::new("secret");
    pak.write("a", "payload");
    let data = pak.export().unwrap();

    let prefix_len = data.iter().position(|&x| x == b':').unwrap() + 1;
    for len in 0..prefix_len + 2 {
        assert!(Pak::from_slice("secret", &data[..len]).is_err());
    }
}

#[test]
fn test_export_to_file() {
    let mut pak = Pak::new("secret");
    pak.write("foobar", "This is a test");
    pak.write("test", "This is number 42");

    let path = std::env::temp_dir().join(format!("bpk-test-{}.bpk", std::process::id()));
    let file = std::fs::File::create(&path).unwrap();
    let mut writer = std::io::BufWriter::new(file);
    pak.export_to(&mut writer).unwrap();
    writer.flush().unwrap();
    drop(writer);

    let data = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let pak2 = Pak::from_slice("secret", &data).unwrap();
    assert_eq!(pak2.read("test").unwrap(), b"This is number 42");
}
