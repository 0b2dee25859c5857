use std::collections::BTreeMap;

use thiserror::Error;
use winit::keyboard::KeyCode;

use crate::input::{ActionSet, ViewAction};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("unknown key '{key}' bound to {action}")]
    UnknownKey { action: ViewAction, key: String },
}

/// Physical keys bound to each logical action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    keys: BTreeMap<ViewAction, Vec<KeyCode>>,
}

impl KeyBindings {
    /// Builds a binding table from `(action, key names)` pairs, starting from
    /// the defaults. Actions listed replace their default keys entirely.
    pub fn from_names<'a, I, K>(overrides: I) -> Result<Self, BindingError>
    where
        I: IntoIterator<Item = (&'a str, K)>,
        K: IntoIterator<Item = &'a str>,
    {
        let mut bindings = Self::default();
        for (action_name, key_names) in overrides {
            let action = ViewAction::from_config_name(action_name)
                .ok_or_else(|| BindingError::UnknownAction(action_name.to_string()))?;
            let mut keys = Vec::new();
            for name in key_names {
                let code = parse_key_name(name).ok_or_else(|| BindingError::UnknownKey {
                    action,
                    key: name.to_string(),
                })?;
                keys.push(code);
            }
            bindings.keys.insert(action, keys);
        }
        Ok(bindings)
    }

    pub fn keys_for(&self, action: ViewAction) -> &[KeyCode] {
        self.keys.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Actions whose bound keys are currently held.
    pub fn active_actions(&self, is_pressed: impl Fn(KeyCode) -> bool) -> ActionSet {
        self.keys
            .iter()
            .filter(|(_, keys)| keys.iter().any(|&key| is_pressed(key)))
            .map(|(&action, _)| action)
            .collect()
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        let keys = [
            (ViewAction::ZoomIn, KeyCode::KeyJ),
            (ViewAction::ZoomOut, KeyCode::KeyK),
            (ViewAction::Forward, KeyCode::KeyD),
            (ViewAction::Back, KeyCode::KeyA),
            (ViewAction::StrafeLeft, KeyCode::KeyW),
            (ViewAction::StrafeRight, KeyCode::KeyS),
            (ViewAction::RotateLeft, KeyCode::KeyH),
            (ViewAction::RotateRight, KeyCode::KeyL),
            (ViewAction::MoreIterations, KeyCode::KeyE),
            (ViewAction::FewerIterations, KeyCode::KeyQ),
            (ViewAction::Reset, KeyCode::Space),
            (ViewAction::Recall, KeyCode::KeyC),
            (ViewAction::Hold, KeyCode::KeyF),
            (ViewAction::Quit, KeyCode::Escape),
        ]
        .into_iter()
        .map(|(action, key)| (action, vec![key]))
        .collect();
        Self { keys }
    }
}

/// Parses a key name such as `J`, `space`, `up` or `f5`.
pub fn parse_key_name(name: &str) -> Option<KeyCode> {
    let normalized = name.trim().to_ascii_lowercase();
    let mut chars = normalized.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return single_char_key(ch);
    }

    let code = match normalized.as_str() {
        "space" => KeyCode::Space,
        "escape" | "esc" => KeyCode::Escape,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backspace" => KeyCode::Backspace,
        "up" | "arrowup" => KeyCode::ArrowUp,
        "down" | "arrowdown" => KeyCode::ArrowDown,
        "left" | "arrowleft" => KeyCode::ArrowLeft,
        "right" | "arrowright" => KeyCode::ArrowRight,
        "pageup" => KeyCode::PageUp,
        "pagedown" => KeyCode::PageDown,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "minus" => KeyCode::Minus,
        "equal" | "plus" => KeyCode::Equal,
        "lshift" | "shiftleft" => KeyCode::ShiftLeft,
        "rshift" | "shiftright" => KeyCode::ShiftRight,
        "lctrl" | "controlleft" => KeyCode::ControlLeft,
        "rctrl" | "controlright" => KeyCode::ControlRight,
        "f1" => KeyCode::F1,
        "f2" => KeyCode::F2,
        "f3" => KeyCode::F3,
        "f4" => KeyCode::F4,
        "f5" => KeyCode::F5,
        "f6" => KeyCode::F6,
        "f7" => KeyCode::F7,
        "f8" => KeyCode::F8,
        "f9" => KeyCode::F9,
        "f10" => KeyCode::F10,
        "f11" => KeyCode::F11,
        "f12" => KeyCode::F12,
        _ => return None,
    };
    Some(code)
}

fn single_char_key(ch: char) -> Option<KeyCode> {
    let code = match ch {
        'a' => KeyCode::KeyA,
        'b' => KeyCode::KeyB,
        'c' => KeyCode::KeyC,
        'd' => KeyCode::KeyD,
        'e' => KeyCode::KeyE,
        'f' => KeyCode::KeyF,
        'g' => KeyCode::KeyG,
        'h' => KeyCode::KeyH,
        'i' => KeyCode::KeyI,
        'j' => KeyCode::KeyJ,
        'k' => KeyCode::KeyK,
        'l' => KeyCode::KeyL,
        'm' => KeyCode::KeyM,
        'n' => KeyCode::KeyN,
        'o' => KeyCode::KeyO,
        'p' => KeyCode::KeyP,
        'q' => KeyCode::KeyQ,
        'r' => KeyCode::KeyR,
        's' => KeyCode::KeyS,
        't' => KeyCode::KeyT,
        'u' => KeyCode::KeyU,
        'v' => KeyCode::KeyV,
        'w' => KeyCode::KeyW,
        'x' => KeyCode::KeyX,
        'y' => KeyCode::KeyY,
        'z' => KeyCode::KeyZ,
        '0' => KeyCode::Digit0,
        '1' => KeyCode::Digit1,
        '2' => KeyCode::Digit2,
        '3' => KeyCode::Digit3,
        '4' => KeyCode::Digit4,
        '5' => KeyCode::Digit5,
        '6' => KeyCode::Digit6,
        '7' => KeyCode::Digit7,
        '8' => KeyCode::Digit8,
        '9' => KeyCode::Digit9,
        ' ' => KeyCode::Space,
        '-' => KeyCode::Minus,
        '=' => KeyCode::Equal,
        ',' => KeyCode::Comma,
        '.' => KeyCode::Period,
        '/' => KeyCode::Slash,
        '[' => KeyCode::BracketLeft,
        ']' => KeyCode::BracketRight,
        _ => return None,
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_action() {
        let bindings = KeyBindings::default();
        for action in ViewAction::ALL {
            assert!(!bindings.keys_for(action).is_empty(), "{action}");
        }
        assert_eq!(bindings.keys_for(ViewAction::ZoomIn), &[KeyCode::KeyJ]);
    }

    #[test]
    fn key_names_are_case_insensitive() {
        assert_eq!(parse_key_name("J"), Some(KeyCode::KeyJ));
        assert_eq!(parse_key_name(" space "), Some(KeyCode::Space));
        assert_eq!(parse_key_name("Up"), Some(KeyCode::ArrowUp));
        assert_eq!(parse_key_name("F12"), Some(KeyCode::F12));
        assert_eq!(parse_key_name("hyper"), None);
    }

    #[test]
    fn overrides_replace_default_keys() {
        let bindings =
            KeyBindings::from_names([("zoom_in", vec!["equal", "up"])]).expect("bindings");
        assert_eq!(
            bindings.keys_for(ViewAction::ZoomIn),
            &[KeyCode::Equal, KeyCode::ArrowUp]
        );
        assert_eq!(bindings.keys_for(ViewAction::ZoomOut), &[KeyCode::KeyK]);
    }

    #[test]
    fn unknown_names_are_rejected() {
        let err = KeyBindings::from_names([("warp", vec!["x"])]).expect_err("bad action");
        assert_eq!(err, BindingError::UnknownAction("warp".into()));

        let err = KeyBindings::from_names([("reset", vec!["nope"])]).expect_err("bad key");
        assert_eq!(
            err,
            BindingError::UnknownKey {
                action: ViewAction::Reset,
                key: "nope".into()
            }
        );
    }

    #[test]
    fn active_actions_follow_pressed_keys() {
        let bindings = KeyBindings::default();
        let pressed = [KeyCode::KeyJ, KeyCode::KeyD];
        let actions = bindings.active_actions(|key| pressed.contains(&key));
        assert!(actions.contains(ViewAction::ZoomIn));
        assert!(actions.contains(ViewAction::Forward));
        assert!(!actions.contains(ViewAction::Back));
    }
}
