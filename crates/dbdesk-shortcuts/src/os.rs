//! Platform-aware key names

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Mac,
    Windows,
    Linux,
    Unknown,
}

impl Os {
    /// The platform this process was built for
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Os::Mac
        } else if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "linux") {
            Os::Linux
        } else {
            Os::Unknown
        }
    }

    /// Detect the platform of a remote UI from its reported platform and
    /// user-agent strings
    pub fn detect(platform: &str, user_agent: &str) -> Self {
        let platform = platform.to_lowercase();
        let user_agent = user_agent.to_lowercase();
        if platform.contains("mac") || user_agent.contains("mac os") {
            Os::Mac
        } else if platform.contains("win") {
            Os::Windows
        } else if user_agent.contains("linux") {
            Os::Linux
        } else {
            Os::Unknown
        }
    }
}

/// Display name of a single key
pub fn format_key_label(key: &str, os: Os) -> String {
    let label = match key.to_lowercase().as_str() {
        "meta" if os == Os::Mac => "⌘",
        "meta" => "Win",
        "control" => "Ctrl",
        "alt" if os == Os::Mac => "⌥",
        "alt" => "Alt",
        "shift" => "Shift",
        "enter" => "Enter",
        "escape" => "Esc",
        "backspace" => "Backspace",
        "delete" => "Delete",
        "arrowup" => "↑",
        "arrowdown" => "↓",
        "arrowleft" => "←",
        "arrowright" => "→",
        " " => "Space",
        _ => return key.to_uppercase(),
    };
    label.to_string()
}
