//! Accelerator grammar.
//!
//! An accelerator is a `+`-separated list of one or more modifiers followed by
//! exactly one key, e.g. `Mod+Alt+E`. Parsing canonicalizes the string so two
//! spellings of the same combination compare equal: modifiers are sorted into
//! `Mod`, `Alt`, `Shift`, `Meta` order and keys use a single spelling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an accelerator string can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcceleratorError {
    #[error("accelerator is empty")]
    Empty,

    #[error("empty token in accelerator")]
    EmptyToken,

    #[error("accelerator needs at least one modifier")]
    MissingModifier,

    #[error("accelerator has no key")]
    MissingKey,

    #[error("unknown token `{0}`")]
    UnknownToken(String),

    #[error("modifier `{0}` appears more than once")]
    DuplicateModifier(Modifier),

    #[error("key `{0}` must be the last token")]
    KeyNotLast(String),
}

/// A modifier token. Declaration order is canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Modifier {
    /// Cmd on macOS, Ctrl everywhere else.
    Primary,
    /// Alt / Option
    Alt,
    Shift,
    /// Super / Windows key, Ctrl on macOS.
    Meta,
}

impl Modifier {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "mod" | "primarymod" | "commandorcontrol" | "cmdorctrl" => Some(Self::Primary),
            "alt" | "option" => Some(Self::Alt),
            "shift" => Some(Self::Shift),
            "meta" | "super" | "secondarymeta" => Some(Self::Meta),
            _ => None,
        }
    }

    /// Canonical spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "Mod",
            Self::Alt => "Alt",
            Self::Shift => "Shift",
            Self::Meta => "Meta",
        }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named, non-character keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Space,
    Tab,
    Backspace,
    Delete,
    Insert,
    Enter,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Escape,
    VolumeUp,
    VolumeDown,
    VolumeMute,
    MediaNext,
    MediaPrev,
    MediaStop,
    MediaPlayPause,
}

impl NamedKey {
    const ALL: [NamedKey; 22] = [
        Self::Space,
        Self::Tab,
        Self::Backspace,
        Self::Delete,
        Self::Insert,
        Self::Enter,
        Self::Up,
        Self::Down,
        Self::Left,
        Self::Right,
        Self::Home,
        Self::End,
        Self::PageUp,
        Self::PageDown,
        Self::Escape,
        Self::VolumeUp,
        Self::VolumeDown,
        Self::VolumeMute,
        Self::MediaNext,
        Self::MediaPrev,
        Self::MediaStop,
        Self::MediaPlayPause,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Space => "Space",
            Self::Tab => "Tab",
            Self::Backspace => "Backspace",
            Self::Delete => "Delete",
            Self::Insert => "Insert",
            Self::Enter => "Enter",
            Self::Up => "Up",
            Self::Down => "Down",
            Self::Left => "Left",
            Self::Right => "Right",
            Self::Home => "Home",
            Self::End => "End",
            Self::PageUp => "PageUp",
            Self::PageDown => "PageDown",
            Self::Escape => "Escape",
            Self::VolumeUp => "VolumeUp",
            Self::VolumeDown => "VolumeDown",
            Self::VolumeMute => "VolumeMute",
            Self::MediaNext => "MediaNext",
            Self::MediaPrev => "MediaPrev",
            Self::MediaStop => "MediaStop",
            Self::MediaPlayPause => "MediaPlayPause",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(token))
    }
}

/// The non-modifier part of an accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// `A`-`Z` (stored uppercase) or `0`-`9`
    Char(char),
    /// `F1`-`F12`
    Function(u8),
    Named(NamedKey),
}

impl Key {
    fn from_token(token: &str) -> Option<Self> {
        let mut chars = token.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return c
                .is_ascii_alphanumeric()
                .then(|| Self::Char(c.to_ascii_uppercase()));
        }

        if let Some(number) = token.strip_prefix(['F', 'f']) {
            if let Ok(n @ 1..=12) = number.parse::<u8>() {
                // Reject spellings like `F01`.
                if number == n.to_string() {
                    return Some(Self::Function(n));
                }
            }
        }

        NamedKey::from_token(token).map(Self::Named)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char(c) => write!(f, "{}", c),
            Self::Function(n) => write!(f, "F{}", n),
            Self::Named(key) => f.write_str(key.as_str()),
        }
    }
}

/// A validated, canonical accelerator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Accelerator {
    modifiers: Vec<Modifier>,
    key: Key,
}

impl Accelerator {
    /// Builds an accelerator from parts. Modifiers are sorted and must be
    /// non-empty and distinct.
    pub fn new(
        modifiers: impl IntoIterator<Item = Modifier>,
        key: Key,
    ) -> Result<Self, AcceleratorError> {
        let mut sorted: Vec<Modifier> = Vec::new();
        for modifier in modifiers {
            if sorted.contains(&modifier) {
                return Err(AcceleratorError::DuplicateModifier(modifier));
            }
            sorted.push(modifier);
        }
        if sorted.is_empty() {
            return Err(AcceleratorError::MissingModifier);
        }
        sorted.sort();
        Ok(Self {
            modifiers: sorted,
            key,
        })
    }

    /// Modifiers in canonical order.
    pub fn modifiers(&self) -> &[Modifier] {
        &self.modifiers
    }

    pub fn key(&self) -> Key {
        self.key
    }
}

/// Returns true if `accelerator` is accepted by the grammar.
pub fn validate(accelerator: &str) -> bool {
    accelerator.parse::<Accelerator>().is_ok()
}

impl FromStr for Accelerator {
    type Err = AcceleratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(AcceleratorError::Empty);
        }

        let mut modifiers = Vec::new();
        let mut key: Option<(Key, &str)> = None;

        for token in s.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(AcceleratorError::EmptyToken);
            }
            if let Some((_, key_token)) = key {
                return Err(AcceleratorError::KeyNotLast(key_token.to_string()));
            }
            if let Some(modifier) = Modifier::from_token(token) {
                modifiers.push(modifier);
            } else if let Some(k) = Key::from_token(token) {
                key = Some((k, token));
            } else {
                return Err(AcceleratorError::UnknownToken(token.to_string()));
            }
        }

        let (key, _) = key.ok_or(AcceleratorError::MissingKey)?;
        Self::new(modifiers, key)
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

impl TryFrom<String> for Accelerator {
    type Error = AcceleratorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Accelerator> for String {
    fn from(value: Accelerator) -> Self {
        value.to_string()
    }
}
