use super::*;

#[test]
fn rejected_wraps_supervisor_error_and_displays_through() {
    let inner = SupervisorError::invalid_input("bad label", supervisor_core::ErrorCode::NotPrivileged);
    let err: DaemonError = inner.into();
    assert!(err.to_string().contains("bad label"));
}

#[test]
fn io_helper_attaches_context() {
    let source = std::io::Error::new(std::io::ErrorKind::NotFound, "nope");
    let err = DaemonError::io("reading pidfile", source);
    assert!(err.to_string().contains("reading pidfile"));
}

#[test]
fn unknown_job_names_the_label() {
    let err = DaemonError::UnknownJob { label: "com.example.missing".to_string() };
    assert!(err.to_string().contains("com.example.missing"));
}

#[test]
fn lock_held_names_the_path() {
    let source = std::io::Error::new(std::io::ErrorKind::WouldBlock, "locked");
    let err = DaemonError::LockHeld { path: std::path::PathBuf::from("/tmp/supervisord.lock"), source };
    assert!(err.to_string().contains("supervisord.lock"));
}
