//! Selection of the client action governing a run.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Policy selected for the whole run: keep consuming and publishing, or stop
/// before touching the request queue.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ActionMode {
    /// Consume requests and publish every response.
    #[default]
    Publish,
    /// Consume nothing and publish nothing.
    Stop,
}

/// Errors encountered while parsing an [`ActionMode`] from text.
pub type ActionModeParseError = strum::ParseError;

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("publish", ActionMode::Publish)]
    #[case("PUBLISH", ActionMode::Publish)]
    #[case("stop", ActionMode::Stop)]
    #[case("Stop", ActionMode::Stop)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: ActionMode) {
        assert_eq!(input.parse::<ActionMode>().expect("parse"), expected);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!("deploy".parse::<ActionMode>().is_err());
    }

    #[test]
    fn displays_snake_case() {
        assert_eq!(ActionMode::Stop.to_string(), "stop");
    }
}
