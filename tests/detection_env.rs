use std::env;

use serial_test::serial;

use iv::encode::detection::FORCE_PROTOCOL_VAR;
use iv::{Protocol, TerminalCapabilities};

fn with_var<R>(key: &str, value: Option<&str>, f: impl FnOnce() -> R) -> R {
    let prev = env::var_os(key);
    // SAFETY: every test touching the process environment is #[serial].
    unsafe {
        match value {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }
    let out = f();
    unsafe {
        match prev {
            Some(v) => env::set_var(key, v),
            None => env::remove_var(key),
        }
    }
    out
}

#[test]
#[serial]
fn forced_kitty_wins_over_environment() {
    let caps = with_var(FORCE_PROTOCOL_VAR, Some("kitty"), TerminalCapabilities::detect);
    assert_eq!(caps.preferred(), Some(Protocol::Kitty));
    assert_eq!(caps.terminal_name, "forced-kitty");
}

#[test]
#[serial]
fn forced_iterm2_is_case_insensitive() {
    let caps = with_var(FORCE_PROTOCOL_VAR, Some("ITerm2"), TerminalCapabilities::detect);
    assert_eq!(caps.preferred(), Some(Protocol::Iterm2));
}

#[test]
#[serial]
fn forced_none_disables_graphics() {
    let caps = with_var(FORCE_PROTOCOL_VAR, Some("none"), TerminalCapabilities::detect);
    assert_eq!(caps.preferred(), None);
}
