//! Every operation fails cleanly on paths that do not exist

#![allow(clippy::unwrap_used)]

mod common;

use common::{test_timeout_guard, Fixture};
use portstat::{hash_file_contents, read_metadata, DirectoryCursor, ErrorKind};
use rstest::rstest;
use std::time::Duration;

#[rstest]
#[case("missing")]
#[case("missing/deeper")]
#[case("sub/missing")]
#[cfg(unix)]
fn test_missing_paths_error_without_hanging(#[case] rel: &str) {
    let _guard = test_timeout_guard(Duration::from_secs(10));
    let fixture = Fixture::new();
    let path = fixture.path(rel);

    for err in [
        read_metadata(&path).unwrap_err(),
        DirectoryCursor::open(&path).unwrap_err(),
        hash_file_contents(&path).unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotFound, "{err}");
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }
}

#[test]
#[cfg(unix)]
fn test_path_through_regular_file() {
    let fixture = Fixture::new();
    let path = fixture.path("a").join("child");

    for err in [
        read_metadata(&path).unwrap_err(),
        DirectoryCursor::open(&path).unwrap_err(),
        hash_file_contents(&path).unwrap_err(),
    ] {
        assert_eq!(err.kind(), ErrorKind::NotADirectory, "{err}");
    }
}
