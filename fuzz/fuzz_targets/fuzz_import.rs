#![no_main]
use bpk::Pak;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Import arbitrary bytes, both raw and behind a valid magic header
    let mut pak = Pak::new("fuzz");
    if pak.import(data).is_err() {
        assert!(pak.is_empty());
    }

    let mut prefixed = b"fuzz".to_vec();
    prefixed.extend_from_slice(data);
    let Ok(pak) = Pak::from_slice("fuzz", &prefixed) else {
        return;
    };

    for name in pak.list_entries() {
        let _ = pak.read(name);
    }

    // Whatever was imported must survive another round trip
    let exported = pak.export().unwrap();
    let reimported = Pak::from_slice("fuzz", &exported).unwrap();
    assert_eq!(reimported.len(), pak.len());
});
