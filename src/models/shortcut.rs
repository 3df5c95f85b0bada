use crate::models::grid_position::GridPosition;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Modifier keys for keyboard shortcuts, in canonical display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModifierKey {
    /// Command key (⌘)
    Command,
    /// Control key (⌃)
    Control,
    /// Option/Alt key (⌥)
    Option,
    /// Shift key (⇧)
    Shift,
    /// Function key (fn)
    Function,
}

/// Arrow key directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArrowDirection {
    Up,
    Down,
    Left,
    Right,
}

/// Regular keys for keyboard shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    /// Letter keys A-Z, stored lower-case
    Letter(char),
    /// Number keys 0-9
    Number(u8),
    /// Function keys F1-F20
    Function(u8),
    Arrow(ArrowDirection),
    Space,
    Return,
    Tab,
    Escape,
    Delete,
    Minus,
    Equal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortcutParseError {
    #[error("Shortcut string is empty")]
    Empty,
    #[error("Unknown shortcut token '{0}'")]
    UnknownToken(String),
    #[error("Shortcut '{0}' has no key, only modifiers")]
    MissingKey(String),
    #[error("Shortcut '{0}' names more than one key")]
    MultipleKeys(String),
}

/// Parsed global shortcut such as `cmd+shift+left`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    /// Sorted, de-duplicated modifiers
    pub modifiers: Vec<ModifierKey>,
    pub key: Key,
}

impl Shortcut {
    pub fn new(mut modifiers: Vec<ModifierKey>, key: Key) -> Self {
        modifiers.sort();
        modifiers.dedup();
        Self { modifiers, key }
    }

    pub fn parse(input: &str) -> Result<Self, ShortcutParseError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ShortcutParseError::Empty);
        }

        let mut modifiers = Vec::new();
        let mut key = None;

        for raw in trimmed.split('+') {
            let token = raw.trim().to_lowercase();
            if token.is_empty() {
                return Err(ShortcutParseError::UnknownToken(raw.to_string()));
            }

            if let Some(modifier) = modifier_for(&token) {
                modifiers.push(modifier);
                continue;
            }

            let parsed = key_for(&token)
                .ok_or_else(|| ShortcutParseError::UnknownToken(raw.trim().to_string()))?;
            if key.replace(parsed).is_some() {
                return Err(ShortcutParseError::MultipleKeys(trimmed.to_string()));
            }
        }

        let key = key.ok_or_else(|| ShortcutParseError::MissingKey(trimmed.to_string()))?;
        Ok(Self::new(modifiers, key))
    }

    pub fn has_modifier(&self, modifier: ModifierKey) -> bool {
        self.modifiers.contains(&modifier)
    }
}

fn modifier_for(token: &str) -> Option<ModifierKey> {
    match token {
        "cmd" | "command" | "⌘" => Some(ModifierKey::Command),
        "ctrl" | "control" | "⌃" => Some(ModifierKey::Control),
        "opt" | "option" | "alt" | "⌥" => Some(ModifierKey::Option),
        "shift" | "⇧" => Some(ModifierKey::Shift),
        "fn" => Some(ModifierKey::Function),
        _ => None,
    }
}

fn key_for(token: &str) -> Option<Key> {
    match token {
        "left" | "←" => return Some(Key::Arrow(ArrowDirection::Left)),
        "right" | "→" => return Some(Key::Arrow(ArrowDirection::Right)),
        "up" | "↑" => return Some(Key::Arrow(ArrowDirection::Up)),
        "down" | "↓" => return Some(Key::Arrow(ArrowDirection::Down)),
        "space" => return Some(Key::Space),
        "return" | "enter" => return Some(Key::Return),
        "tab" => return Some(Key::Tab),
        "escape" | "esc" => return Some(Key::Escape),
        "delete" | "backspace" => return Some(Key::Delete),
        "-" | "minus" => return Some(Key::Minus),
        "=" | "equal" => return Some(Key::Equal),
        _ => {}
    }

    if token.chars().count() == 1 {
        let ch = token.chars().next()?;
        if ch.is_ascii_alphabetic() {
            return Some(Key::Letter(ch.to_ascii_lowercase()));
        }
        if let Some(digit) = ch.to_digit(10) {
            return Some(Key::Number(digit as u8));
        }
    }

    token
        .strip_prefix('f')
        .and_then(|number| number.parse::<u8>().ok())
        .filter(|number| (1..=20).contains(number))
        .map(Key::Function)
}

impl fmt::Display for ModifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            ModifierKey::Command => "cmd",
            ModifierKey::Control => "ctrl",
            ModifierKey::Option => "opt",
            ModifierKey::Shift => "shift",
            ModifierKey::Function => "fn",
        };
        f.write_str(token)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Letter(ch) => write!(f, "{ch}"),
            Key::Number(n) => write!(f, "{n}"),
            Key::Function(n) => write!(f, "f{n}"),
            Key::Arrow(ArrowDirection::Left) => f.write_str("left"),
            Key::Arrow(ArrowDirection::Right) => f.write_str("right"),
            Key::Arrow(ArrowDirection::Up) => f.write_str("up"),
            Key::Arrow(ArrowDirection::Down) => f.write_str("down"),
            Key::Space => f.write_str("space"),
            Key::Return => f.write_str("return"),
            Key::Tab => f.write_str("tab"),
            Key::Escape => f.write_str("escape"),
            Key::Delete => f.write_str("delete"),
            Key::Minus => f.write_str("-"),
            Key::Equal => f.write_str("="),
        }
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{modifier}+")?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for Shortcut {
    type Err = ShortcutParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Shortcut::parse(s)
    }
}

impl Serialize for Shortcut {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Shortcut {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Shortcut::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Operation a shortcut (or menu item) triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "target", rename_all = "camelCase")]
pub enum WindowAction {
    Snap(GridPosition),
    Undo,
    Redo,
    NextScreen,
    CustomPosition(Uuid),
    RestoreLayout(Uuid),
}

impl WindowAction {
    /// Label recorded in the undo history
    pub fn label(&self) -> String {
        match self {
            WindowAction::Snap(position) => position.as_str().to_string(),
            WindowAction::Undo => "undo".to_string(),
            WindowAction::Redo => "redo".to_string(),
            WindowAction::NextScreen => "nextScreen".to_string(),
            WindowAction::CustomPosition(id) => format!("customPosition:{id}"),
            WindowAction::RestoreLayout(id) => format!("restoreLayout:{id}"),
        }
    }
}

impl FromStr for WindowAction {
    type Err = ShortcutParseError;

    /// Accepts the settings-file action names: `undo`, `redo`, `nextScreen`
    /// or any grid position identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "undo" => Ok(WindowAction::Undo),
            "redo" => Ok(WindowAction::Redo),
            "nextScreen" => Ok(WindowAction::NextScreen),
            other => other
                .parse::<GridPosition>()
                .map(WindowAction::Snap)
                .map_err(|_| ShortcutParseError::UnknownToken(other.to_string())),
        }
    }
}
