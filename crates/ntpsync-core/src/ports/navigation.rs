//! Navigation port (driven/secondary port)
//!
//! Auxiliary informational screens. Navigation is fire-and-forget: there is
//! no return value and no error path visible to the controller.

use serde::{Deserialize, Serialize};

/// Auxiliary destinations reachable from the main screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Destination {
    /// Usage help
    Help,
    /// Version, license and credits
    About,
    /// Donation page
    Donations,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Destination::Help => "help",
            Destination::About => "about",
            Destination::Donations => "donations",
        };
        write!(f, "{}", s)
    }
}

/// Port trait for opening auxiliary screens
pub trait INavigator: Send + Sync {
    /// Opens `destination`
    fn open(&self, destination: Destination);
}
