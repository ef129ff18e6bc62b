use serde::Deserialize;

/// Document names and the random seed for one session. Names are relative
/// to the session's store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SessionConfig {
    pub encounters_path: String,
    pub encounters_sidecar: String,
    pub dice_path: String,
    pub dice_sidecar: String,
    pub filters_path: String,
    /// `None` seeds from the clock.
    pub seed: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            encounters_path: "encounters.yaml".into(),
            encounters_sidecar: ".encounters_last_path".into(),
            dice_path: "dice.yaml".into(),
            dice_sidecar: ".dice_last_path".into(),
            filters_path: ".filters_state.yaml".into(),
            seed: None,
        }
    }
}

impl SessionConfig {
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn with_encounters_path(mut self, path: impl Into<String>) -> Self {
        self.encounters_path = path.into();
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = SessionConfig::from_yaml("dice_path: rolls.yaml\nseed: 7\n").unwrap();
        assert_eq!(cfg.dice_path, "rolls.yaml");
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.encounters_path, "encounters.yaml");
        assert_eq!(cfg.dice_sidecar, ".dice_last_path");
    }

    #[test]
    fn blank_yaml_is_default() {
        assert_eq!(SessionConfig::from_yaml("  \n").unwrap(), SessionConfig::default());
    }

    #[test]
    fn builders_override() {
        let cfg = SessionConfig::default().with_encounters_path("fight.yaml").with_seed(3);
        assert_eq!(cfg.encounters_path, "fight.yaml");
        assert_eq!(cfg.seed, Some(3));
    }
}
