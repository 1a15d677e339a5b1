use super::*;
use serial_test::serial;

#[test]
#[serial]
fn state_dir_honors_explicit_env_override() {
    std::env::set_var("SUPERVISORD_STATE_DIR", "/tmp/supervisord-test-state");
    let dir = state_dir().expect("state dir");
    std::env::remove_var("SUPERVISORD_STATE_DIR");
    assert_eq!(dir, PathBuf::from("/tmp/supervisord-test-state"));
}

#[test]
#[serial]
fn timer_poll_interval_defaults_when_unset() {
    std::env::remove_var("SUPERVISORD_TIMER_POLL_MS");
    assert_eq!(timer_poll_interval(), Duration::from_millis(500));
}

#[test]
#[serial]
fn timer_poll_interval_honors_override() {
    std::env::set_var("SUPERVISORD_TIMER_POLL_MS", "50");
    assert_eq!(timer_poll_interval(), Duration::from_millis(50));
    std::env::remove_var("SUPERVISORD_TIMER_POLL_MS");
}

#[test]
fn control_socket_lives_under_state_dir() {
    let dir = PathBuf::from("/tmp/supervisord-test-state");
    assert_eq!(control_socket_path(&dir), dir.join("control.sock"));
}

#[test]
fn lock_path_lives_under_state_dir() {
    let dir = PathBuf::from("/tmp/supervisord-test-state");
    assert_eq!(lock_path(&dir), dir.join("supervisord.lock"));
}

#[test]
#[serial]
fn resolve_builds_a_complete_config() {
    std::env::set_var("SUPERVISORD_STATE_DIR", "/tmp/supervisord-test-state");
    let config = DaemonConfig::resolve().expect("resolve");
    std::env::remove_var("SUPERVISORD_STATE_DIR");
    assert_eq!(config.control_socket, config.state_dir.join("control.sock"));
    assert_eq!(config.lock_path, config.state_dir.join("supervisord.lock"));
}
