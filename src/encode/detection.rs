use std::env;

/// Environment variable that overrides detection: `kitty`, `iterm2` or `none`.
pub const FORCE_PROTOCOL_VAR: &str = "IV_FORCE_PROTOCOL";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Kitty,
    Iterm2,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerminalCapabilities {
    pub kitty: bool,
    pub iterm2: bool,
    pub terminal_name: String,
}

impl TerminalCapabilities {
    /// Inspect the process environment.
    pub fn detect() -> Self {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Detection over an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(forced) = lookup(FORCE_PROTOCOL_VAR)
            && let Some(caps) = Self::forced(&forced)
        {
            return caps;
        }

        let term_program = lookup("TERM_PROGRAM").unwrap_or_default();
        let term = lookup("TERM").unwrap_or_default();
        let kitty = term_program == "kitty"
            || term_program == "WezTerm"
            || term_program == "ghostty"
            || lookup("KITTY_WINDOW_ID").is_some()
            || lookup("WEZTERM_EXECUTABLE").is_some()
            || term.contains("kitty")
            || term.contains("ghostty");
        let iterm2 = matches!(
            term_program.as_str(),
            "iTerm.app" | "WezTerm" | "mintty" | "Hyper" | "Warp" | "Tabby"
        ) || term.contains("iterm");

        let terminal_name = if !term_program.is_empty() {
            term_program
        } else if !term.is_empty() {
            term
        } else {
            "unknown".to_owned()
        };
        Self {
            kitty,
            iterm2,
            terminal_name,
        }
    }

    fn forced(protocol: &str) -> Option<Self> {
        let terminal_name = format!("forced-{protocol}");
        let (kitty, iterm2) = match protocol.to_ascii_lowercase().as_str() {
            "kitty" => (true, false),
            "iterm2" => (false, true),
            "none" | "disable" | "disabled" => (false, false),
            other => {
                tracing::warn!("unknown {FORCE_PROTOCOL_VAR} value {other:?}; detecting instead");
                return None;
            }
        };
        Some(Self {
            kitty,
            iterm2,
            terminal_name,
        })
    }

    /// Kitty is preferred when both are available.
    pub fn preferred(&self) -> Option<Protocol> {
        if self.kitty {
            Some(Protocol::Kitty)
        } else if self.iterm2 {
            Some(Protocol::Iterm2)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn caps(vars: &[(&str, &str)]) -> TerminalCapabilities {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        TerminalCapabilities::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn kitty_via_term_program_or_window_id() {
        assert_eq!(caps(&[("TERM_PROGRAM", "kitty")]).preferred(), Some(Protocol::Kitty));
        assert_eq!(caps(&[("KITTY_WINDOW_ID", "1")]).preferred(), Some(Protocol::Kitty));
        assert_eq!(caps(&[("TERM", "xterm-kitty")]).preferred(), Some(Protocol::Kitty));
    }

    #[test]
    fn wezterm_supports_both_and_prefers_kitty() {
        let c = caps(&[("TERM_PROGRAM", "WezTerm")]);
        assert!(c.kitty && c.iterm2);
        assert_eq!(c.preferred(), Some(Protocol::Kitty));
    }

    #[test]
    fn iterm2_only() {
        let c = caps(&[("TERM_PROGRAM", "iTerm.app"), ("TERM", "xterm-256color")]);
        assert!(!c.kitty);
        assert_eq!(c.preferred(), Some(Protocol::Iterm2));
        assert_eq!(c.terminal_name, "iTerm.app");
    }

    #[test]
    fn dumb_terminal_has_no_protocol() {
        let c = caps(&[("TERM", "dumb")]);
        assert_eq!(c.preferred(), None);
        assert_eq!(c.terminal_name, "dumb");
    }

    #[test]
    fn override_wins_and_unknown_override_is_ignored() {
        let c = caps(&[(FORCE_PROTOCOL_VAR, "iterm2"), ("TERM_PROGRAM", "kitty")]);
        assert_eq!(c.preferred(), Some(Protocol::Iterm2));
        assert_eq!(c.terminal_name, "forced-iterm2");

        let c = caps(&[(FORCE_PROTOCOL_VAR, "NONE"), ("TERM_PROGRAM", "kitty")]);
        assert_eq!(c.preferred(), None);

        let c = caps(&[(FORCE_PROTOCOL_VAR, "sixel"), ("TERM_PROGRAM", "kitty")]);
        assert_eq!(c.preferred(), Some(Protocol::Kitty));
    }
}
