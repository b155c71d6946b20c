// Game rules configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// Named bundles of speed constants. The larger grid runs slower at the start
// and speeds up in bigger steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleProfile {
    #[default]
    Classic,
    Large,
}

impl RuleProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleProfile::Classic => "classic",
            RuleProfile::Large => "large",
        }
    }

    /// Default (width, height) for games started under this profile
    pub fn dimensions(&self) -> (i32, i32) {
        match self {
            RuleProfile::Classic => (20, 20),
            RuleProfile::Large => (30, 30),
        }
    }

    pub fn rules(&self) -> GameRules {
        match self {
            RuleProfile::Classic => GameRules::default(),
            RuleProfile::Large => GameRules {
                base_speed: 700,
                speed_decrement: 20,
                speed_floor: 100,
                ..GameRules::default()
            },
        }
    }
}

impl FromStr for RuleProfile {
    type Err = color_eyre::eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(RuleProfile::Classic),
            "large" => Ok(RuleProfile::Large),
            _ => Err(color_eyre::eyre::eyre!("Invalid rule profile: {}", s)),
        }
    }
}

// Scoring and pacing constants plus the variant switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    pub food_reward: u32,
    pub level_threshold: u32,
    pub base_speed: u32,
    pub speed_decrement: u32,
    pub speed_floor: u32,
    pub obstacles_enabled: bool,
    pub pause_enabled: bool,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            food_reward: 10,
            level_threshold: 50,
            base_speed: 600,
            speed_decrement: 10,
            speed_floor: 50,
            obstacles_enabled: true,
            pause_enabled: true,
        }
    }
}

impl GameRules {
    pub fn validate(&self) -> Result<(), crate::errors::EngineError> {
        use crate::errors::EngineError;

        if self.level_threshold == 0 {
            return Err(EngineError::config("level threshold must be positive"));
        }
        if self.speed_floor == 0 {
            return Err(EngineError::config("speed floor must be positive"));
        }
        if self.base_speed < self.speed_floor {
            return Err(EngineError::config(format!(
                "base speed {} is below the speed floor {}",
                self.base_speed, self.speed_floor
            )));
        }
        Ok(())
    }

    /// Number of level thresholds crossed going from `before` to `after`.
    pub fn levels_gained(&self, before: u32, after: u32) -> u32 {
        (after / self.level_threshold).saturating_sub(before / self.level_threshold)
    }

    /// A level-up only applies while the speed is above the floor.
    pub fn can_level_up(&self, speed: u32) -> bool {
        speed > self.speed_floor
    }

    /// Speed after one level-up, never below the floor.
    pub fn next_speed(&self, speed: u32) -> u32 {
        speed
            .saturating_sub(self.speed_decrement)
            .max(self.speed_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_carry_their_constants() {
        let classic = RuleProfile::Classic.rules();
        assert_eq!(classic.base_speed, 600);
        assert_eq!(classic.speed_decrement, 10);
        assert_eq!(classic.speed_floor, 50);

        let large = RuleProfile::Large.rules();
        assert_eq!(large.base_speed, 700);
        assert_eq!(large.speed_decrement, 20);
        assert_eq!(large.speed_floor, 100);
        assert_eq!(large.food_reward, 10);
    }

    #[test]
    fn test_levels_gained_counts_crossings() {
        let rules = GameRules::default();
        assert_eq!(rules.levels_gained(40, 50), 1);
        assert_eq!(rules.levels_gained(50, 60), 0);
        assert_eq!(rules.levels_gained(90, 160), 2);
    }

    #[test]
    fn test_no_level_up_at_floor() {
        let rules = GameRules::default();
        assert!(rules.can_level_up(600));
        assert!(rules.can_level_up(60));
        assert!(!rules.can_level_up(50));
    }

    #[test]
    fn test_next_speed_is_floored() {
        let rules = GameRules {
            speed_decrement: 30,
            ..GameRules::default()
        };
        assert_eq!(rules.next_speed(600), 570);
        assert_eq!(rules.next_speed(60), 50);
        assert_eq!(rules.next_speed(50), 50);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("Large".parse::<RuleProfile>().unwrap(), RuleProfile::Large);
        assert!("huge".parse::<RuleProfile>().is_err());
    }

    #[test]
    fn test_validate_rejects_base_below_floor() {
        let rules = GameRules {
            base_speed: 40,
            ..GameRules::default()
        };
        assert!(rules.validate().is_err());
        assert!(GameRules::default().validate().is_ok());
    }
}
