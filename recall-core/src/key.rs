use std::str::FromStr;

use thiserror::Error;

/// Discrete key press delivered by a display adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Return,
    Backspace,
    Up,
    Down,
    Escape,
}

impl Key {
    pub fn digit(self) -> Option<u32> {
        match self {
            Key::Char(c) => c.to_digit(10),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key name `{0}`")]
pub struct UnknownKey(pub String);

/// Parses the key names used in scripted sessions (`"return"`, `"4"`, ...).
impl FromStr for Key {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "space" => Key::Space,
            "return" | "enter" => Key::Return,
            "backspace" => Key::Backspace,
            "up" => Key::Up,
            "down" => Key::Down,
            "escape" => Key::Escape,
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return Err(UnknownKey(s.to_string())),
                }
            }
        };
        Ok(key)
    }
}
