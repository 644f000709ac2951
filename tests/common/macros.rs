/// Asserts that the host received a fault of the given kind.
#[macro_export]
macro_rules! assert_fault {
    ($host:expr, $kind:expr) => {
        assert!(
            $host.faults().iter().any(|f| f.kind == $kind),
            "expected fault {:?}, got {:?}",
            $kind,
            $host.faults()
        );
    };
}

/// Asserts that the host received no faults at all.
#[macro_export]
macro_rules! assert_no_faults {
    ($host:expr) => {
        let faults = $host.faults();
        assert!(faults.is_empty(), "unexpected faults: {:?}", faults);
    };
}
