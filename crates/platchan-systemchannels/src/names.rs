//! Names of the engine's built-in channels.

pub const ACCESSIBILITY: &str = "flutter/accessibility";
pub const CHANNEL_BUFFERS: &str = platchan_messenger::CHANNEL_BUFFERS;
pub const LIFECYCLE: &str = "flutter/lifecycle";
pub const LOCALIZATION: &str = "flutter/localization";
pub const MOUSE_CURSOR: &str = "flutter/mousecursor";
pub const NAVIGATION: &str = "flutter/navigation";
pub const PLATFORM: &str = "flutter/platform";
pub const RESTORATION: &str = "flutter/restoration";
pub const SETTINGS: &str = "flutter/settings";
pub const SYSTEM: &str = "flutter/system";
pub const TEXT_INPUT: &str = "flutter/textinput";

/// Every built-in name, sorted.
pub const ALL: [&str; 11] = [
    CHANNEL_BUFFERS,
    ACCESSIBILITY,
    LIFECYCLE,
    LOCALIZATION,
    MOUSE_CURSOR,
    NAVIGATION,
    PLATFORM,
    RESTORATION,
    SETTINGS,
    SYSTEM,
    TEXT_INPUT,
];

/// Whether `name` is reserved by the engine.
pub fn is_builtin(name: &str) -> bool {
    ALL.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_names_are_recognised() {
        assert!(is_builtin("flutter/textinput"));
        assert!(is_builtin("dev.flutter/channel-buffers"));
        assert!(!is_builtin("flutter/unknown"));
        assert!(!is_builtin("com.example/app"));
    }

    #[test]
    fn names_are_sorted_and_unique() {
        let mut sorted = ALL.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted, ALL.to_vec());
    }
}
