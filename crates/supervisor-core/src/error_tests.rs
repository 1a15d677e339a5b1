use super::*;

#[test]
fn invalid_input_carries_its_code() {
    let err = SupervisorError::invalid_input("label in use", ErrorCode::NameInUse);
    assert_eq!(err.code(), ErrorCode::NameInUse);
}

#[test]
fn non_invalid_variants_report_no_memory_as_catch_all() {
    let err = SupervisorError::PeerFailure("peer gone".into());
    assert_eq!(err.code(), ErrorCode::NoMemory);
}

#[test]
fn display_includes_the_message() {
    let err = SupervisorError::invalid_input("empty label", ErrorCode::NotPrivileged);
    assert!(err.to_string().contains("empty label"));
}
