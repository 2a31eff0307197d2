use serde::{Deserialize, Serialize};
use std::path::Path;

/// Game a stimulus belongs to, derived from the image file name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Game {
    Valorant,
    LeagueOfLegends,
    Fortnite,
}

impl Game {
    pub const ALL: [Game; 3] = [Game::Valorant, Game::LeagueOfLegends, Game::Fortnite];

    pub fn tag(self) -> &'static str {
        match self {
            Game::Valorant => "VALO",
            Game::LeagueOfLegends => "LOL",
            Game::Fortnite => "FN",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Game::Valorant => "VALORANT",
            Game::LeagueOfLegends => "League of Legends",
            Game::Fortnite => "Fortnite",
        }
    }

    /// `images/VALO_skill_low.png` -> `Some(Valorant)`; unknown prefixes -> `None`.
    pub fn from_image_path(path: &Path) -> Option<Game> {
        let name = path.file_name()?.to_str()?;
        Self::ALL.into_iter().find(|game| {
            name.strip_prefix(game.tag())
                .is_some_and(|rest| rest.starts_with('_'))
        })
    }
}

/// Tracks the last labelled game across a task sequence.
#[derive(Debug, Default, Clone)]
pub struct GameTracker {
    current: Option<Game>,
}

impl GameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the new game when the label changes. Unlabelled images leave
    /// the current game untouched.
    pub fn observe(&mut self, image: &Path) -> Option<Game> {
        let next = Game::from_image_path(image)?;
        if self.current == Some(next) {
            return None;
        }
        self.current = Some(next);
        Some(next)
    }

    pub fn current(&self) -> Option<Game> {
        self.current
    }
}
