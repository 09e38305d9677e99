use graft_util::errors::GraftError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = GraftError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_manifest_error_display() {
    let err = GraftError::Manifest {
        message: "bad syntax".to_string(),
    };
    assert_eq!(err.to_string(), "Manifest error: bad syntax");
}

#[test]
fn test_repository_error_display() {
    let err = GraftError::Repository {
        message: "duplicate component".to_string(),
    };
    assert_eq!(err.to_string(), "Repository error: duplicate component");
}

#[test]
fn test_metadata_error_display() {
    let err = GraftError::Metadata {
        component: "org.a:a:1.0".to_string(),
        message: "configuration 'x' extends itself".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid metadata for org.a:a:1.0: configuration 'x' extends itself"
    );
}

#[test]
fn test_resolution_error_display() {
    let err = GraftError::Resolution {
        message: "conflict".to_string(),
    };
    assert_eq!(err.to_string(), "Dependency resolution failed: conflict");
}

#[test]
fn test_illegal_state_helper() {
    let err = GraftError::illegal_state("edge 3 has no source");
    assert_eq!(err.to_string(), "Illegal resolution state: edge 3 has no source");
}

#[test]
fn test_generic_error_display() {
    let err = GraftError::Generic {
        message: "something broke".to_string(),
    };
    assert_eq!(err.to_string(), "something broke");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let graft_err: GraftError = io_err.into();
    assert!(matches!(graft_err, GraftError::Io(_)));
}
