//! Backend on top of the `global-hotkey` crate.
//!
//! `global-hotkey` delivers presses through one process-wide event handler,
//! so only one `GlobalHotkeyBackend` should exist per process. On macOS it has
//! to be created on the main thread and the main thread must run an event
//! loop for presses to arrive.

use std::collections::HashMap;
use std::sync::Arc;

use global_hotkey::hotkey::{Code, HotKey, Modifiers};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use keyward_core::{Accelerator, Key, Modifier, NamedKey};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::{BackendError, HotkeyBackend, Result, TriggerFn};

type Handlers = Arc<RwLock<HashMap<u32, TriggerFn>>>;

pub struct GlobalHotkeyBackend {
    manager: GlobalHotKeyManager,
    claimed: HashMap<Accelerator, HotKey>,
    handlers: Handlers,
}

impl GlobalHotkeyBackend {
    /// Creates the OS hotkey manager and installs the press handler.
    pub fn new() -> Result<Self> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| BackendError::Platform(e.to_string()))?;

        let handlers: Handlers = Arc::default();
        let dispatch = handlers.clone();
        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.state() != HotKeyState::Pressed {
                return;
            }
            let handler = dispatch.read().get(&event.id()).cloned();
            match handler {
                Some(handler) => handler(),
                None => debug!(id = event.id(), "press for unknown hotkey"),
            }
        }));

        Ok(Self {
            manager,
            claimed: HashMap::new(),
            handlers,
        })
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn try_claim(&mut self, accelerator: &Accelerator, on_trigger: TriggerFn) -> Result<bool> {
        if self.claimed.contains_key(accelerator) {
            return Ok(false);
        }

        let hotkey = to_hotkey(accelerator)?;
        match self.manager.register(hotkey) {
            Ok(()) => {
                self.handlers.write().insert(hotkey.id(), on_trigger);
                self.claimed.insert(accelerator.clone(), hotkey);
                Ok(true)
            }
            Err(
                e @ (global_hotkey::Error::AlreadyRegistered(_)
                | global_hotkey::Error::FailedToRegister(_)),
            ) => {
                debug!(%accelerator, error = %e, "OS refused hotkey");
                Ok(false)
            }
            Err(e) => Err(BackendError::Platform(e.to_string())),
        }
    }

    fn release(&mut self, accelerator: &Accelerator) -> Result<()> {
        let Some(hotkey) = self.claimed.remove(accelerator) else {
            return Ok(());
        };
        self.handlers.write().remove(&hotkey.id());
        self.manager
            .unregister(hotkey)
            .map_err(|e| BackendError::Platform(e.to_string()))
    }

    fn release_all(&mut self) -> Result<()> {
        let mut first_error = None;
        let claimed: Vec<_> = self.claimed.keys().cloned().collect();
        for accelerator in claimed {
            if let Err(e) = self.release(&accelerator) {
                warn!(%accelerator, error = %e, "failed to release hotkey");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "global-hotkey"
    }
}

impl Drop for GlobalHotkeyBackend {
    fn drop(&mut self) {
        self.release_all().ok();
    }
}

/// Translate an accelerator into the `global-hotkey` representation.
fn to_hotkey(accelerator: &Accelerator) -> Result<HotKey> {
    let modifiers = accelerator
        .modifiers()
        .iter()
        .fold(Modifiers::empty(), |acc, m| acc | modifier_flag(*m));
    let code = key_code(accelerator.key())
        .ok_or_else(|| BackendError::Unsupported(accelerator.clone()))?;
    Ok(HotKey::new(Some(modifiers), code))
}

fn modifier_flag(modifier: Modifier) -> Modifiers {
    match modifier {
        #[cfg(target_os = "macos")]
        Modifier::Primary => Modifiers::SUPER,
        #[cfg(not(target_os = "macos"))]
        Modifier::Primary => Modifiers::CONTROL,
        Modifier::Alt => Modifiers::ALT,
        Modifier::Shift => Modifiers::SHIFT,
        #[cfg(target_os = "macos")]
        Modifier::Meta => Modifiers::CONTROL,
        #[cfg(not(target_os = "macos"))]
        Modifier::Meta => Modifiers::SUPER,
    }
}

fn key_code(key: Key) -> Option<Code> {
    let code = match key {
        Key::Char(c) => match c {
            'A' => Code::KeyA,
            'B' => Code::KeyB,
            'C' => Code::KeyC,
            'D' => Code::KeyD,
            'E' => Code::KeyE,
            'F' => Code::KeyF,
            'G' => Code::KeyG,
            'H' => Code::KeyH,
            'I' => Code::KeyI,
            'J' => Code::KeyJ,
            'K' => Code::KeyK,
            'L' => Code::KeyL,
            'M' => Code::KeyM,
            'N' => Code::KeyN,
            'O' => Code::KeyO,
            'P' => Code::KeyP,
            'Q' => Code::KeyQ,
            'R' => Code::KeyR,
            'S' => Code::KeyS,
            'T' => Code::KeyT,
            'U' => Code::KeyU,
            'V' => Code::KeyV,
            'W' => Code::KeyW,
            'X' => Code::KeyX,
            'Y' => Code::KeyY,
            'Z' => Code::KeyZ,
            '0' => Code::Digit0,
            '1' => Code::Digit1,
            '2' => Code::Digit2,
            '3' => Code::Digit3,
            '4' => Code::Digit4,
            '5' => Code::Digit5,
            '6' => Code::Digit6,
            '7' => Code::Digit7,
            '8' => Code::Digit8,
            '9' => Code::Digit9,
            _ => return None,
        },
        Key::Function(n) => match n {
            1 => Code::F1,
            2 => Code::F2,
            3 => Code::F3,
            4 => Code::F4,
            5 => Code::F5,
            6 => Code::F6,
            7 => Code::F7,
            8 => Code::F8,
            9 => Code::F9,
            10 => Code::F10,
            11 => Code::F11,
            12 => Code::F12,
            _ => return None,
        },
        Key::Named(named) => match named {
            NamedKey::Space => Code::Space,
            NamedKey::Tab => Code::Tab,
            NamedKey::Backspace => Code::Backspace,
            NamedKey::Delete => Code::Delete,
            NamedKey::Insert => Code::Insert,
            NamedKey::Enter => Code::Enter,
            NamedKey::Up => Code::ArrowUp,
            NamedKey::Down => Code::ArrowDown,
            NamedKey::Left => Code::ArrowLeft,
            NamedKey::Right => Code::ArrowRight,
            NamedKey::Home => Code::Home,
            NamedKey::End => Code::End,
            NamedKey::PageUp => Code::PageUp,
            NamedKey::PageDown => Code::PageDown,
            NamedKey::Escape => Code::Escape,
            NamedKey::VolumeUp => Code::AudioVolumeUp,
            NamedKey::VolumeDown => Code::AudioVolumeDown,
            NamedKey::VolumeMute => Code::AudioVolumeMute,
            NamedKey::MediaNext => Code::MediaTrackNext,
            NamedKey::MediaPrev => Code::MediaTrackPrevious,
            NamedKey::MediaStop => Code::MediaStop,
            NamedKey::MediaPlayPause => Code::MediaPlayPause,
        },
    };
    Some(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotkey(s: &str) -> HotKey {
        to_hotkey(&s.parse().unwrap()).unwrap()
    }

    #[test]
    fn test_char_and_digit_keys() {
        assert_eq!(hotkey("Alt+E").key, Code::KeyE);
        assert_eq!(hotkey("Alt+5").key, Code::Digit5);
        assert_eq!(hotkey("Alt+F11").key, Code::F11);
        assert_eq!(hotkey("Alt+MediaPrev").key, Code::MediaTrackPrevious);
    }

    #[test]
    fn test_modifier_translation() {
        let hk = hotkey("Alt+Shift+Up");
        assert_eq!(hk.mods, Modifiers::ALT | Modifiers::SHIFT);
        assert_eq!(hk.key, Code::ArrowUp);

        #[cfg(not(target_os = "macos"))]
        assert_eq!(hotkey("Mod+Meta+A").mods, Modifiers::CONTROL | Modifiers::SUPER);
    }

    #[test]
    fn test_same_combination_same_id() {
        assert_eq!(hotkey("Alt+Mod+E").id(), hotkey("Mod+Alt+E").id());
        assert_ne!(hotkey("Mod+Alt+E").id(), hotkey("Mod+Alt+Q").id());
    }
}
