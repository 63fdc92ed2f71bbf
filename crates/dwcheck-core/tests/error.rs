//! Tests for error display and construction.

use std::path::PathBuf;

use dwcheck_core::entry::Position;
use dwcheck_core::error::CheckError;

#[test]
fn test_construction_error_display()
{
    let err = CheckError::MalformedStream {
        position: Position::new(0x10),
    };
    assert_eq!(err.to_string(), "malformed DWARF at offset 0x10: nesting stack underflow");

    let err = CheckError::DuplicatePosition {
        position: Position::new(0x28),
    };
    assert_eq!(err.to_string(), "DIE clash on offset 0x28");

    let err = CheckError::UnterminatedEntry {
        last: Position::new(0x40),
    };
    assert_eq!(err.to_string(), "missing terminator, last DIE at offset 0x40");
}

#[test]
fn test_lookup_error_display()
{
    let err = CheckError::UnknownPosition {
        position: Position::new(0x999),
    };
    assert_eq!(err.to_string(), "no DIE registered at offset 0x999");

    let err = CheckError::IndexOutOfRange(42);
    assert_eq!(err.to_string(), "DIE index 42 out of range");
}

#[test]
fn test_navigation_error_display()
{
    let err = CheckError::InvalidState("skip_children called with no current entry");
    assert_eq!(
        err.to_string(),
        "invalid examiner state: skip_children called with no current entry"
    );

    let err = CheckError::CorruptNavigation {
        from: Position::new(0x10),
        landed: Position::new(0x44),
    };
    assert_eq!(
        err.to_string(),
        "skip_children from DIE at offset 0x10 landed on unknown DIE at offset 0x44"
    );
}

#[test]
fn test_unresolved_reference_display()
{
    let err = CheckError::UnresolvedReference {
        index: 1,
        position: Position::new(0x20),
        target: Position::new(0x30),
    };
    assert_eq!(
        err.to_string(),
        "unresolved abstract origin ref from DIE 1 at offset 0x20 to bad offset 0x30"
    );
}

#[test]
fn test_source_error_display()
{
    let err = CheckError::UnexpectedEnd {
        position: Position::new(0x50),
    };
    assert_eq!(err.to_string(), "entry stream ended unexpectedly at offset 0x50");

    let err = CheckError::read("reading DIE abbreviation", gimli::Error::Io);
    let rendered = err.to_string();
    assert!(rendered.starts_with("DWARF read error while reading DIE abbreviation"));
}

#[test]
fn test_container_error_display()
{
    let err = CheckError::MissingDebugInfo {
        path: PathBuf::from("/tmp/stripped"),
    };
    assert_eq!(err.to_string(), "no DWARF debug info in /tmp/stripped");
}

#[test]
fn test_io_error_conversion()
{
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
    let err: CheckError = io.into();
    assert!(matches!(err, CheckError::Io(_)));
    assert!(err.to_string().starts_with("IO error:"));
}

#[test]
fn test_errors_implement_std_error()
{
    fn assert_error<T: std::error::Error>() {}
    assert_error::<CheckError>();
}
