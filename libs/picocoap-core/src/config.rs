use crate::error::ConfigError;

/// Default freshness budget of the light, in ticks
pub const DEFAULT_MAX_AGE: u32 = 15;

/// Ticks before expiry at which a scheduled notification goes out
pub const DEFAULT_NOTIFY_MARGIN: u32 = 2;

/// Every n-th scheduled notification is confirmable
pub const DEFAULT_RELIABLE_EVERY: u32 = 4;

/// Runtime settings of an [`crate::ObserveServer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServerConfig {
    /// Container segment holding the light, `lights`
    pub group_name: &'static str,
    /// Light resource segment, `led3`. Also the JSON key of its representation.
    pub light_name: &'static str,
    pub max_age: u32,
    pub notify_margin: u32,
    pub reliable_every: u32,
    /// Light state applied to the actuator at construction
    pub initial_light: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            group_name: "lights",
            light_name: "led3",
            max_age: DEFAULT_MAX_AGE,
            notify_margin: DEFAULT_NOTIFY_MARGIN,
            reliable_every: DEFAULT_RELIABLE_EVERY,
            initial_light: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notify_margin >= self.max_age {
            return Err(ConfigError::InvalidFreshness {
                max_age: self.max_age,
                notify_margin: self.notify_margin,
            });
        }
        if self.reliable_every == 0 {
            return Err(ConfigError::InvalidReliableCadence);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_age, 15);
        assert_eq!(config.notify_margin, 2);
        assert_eq!(config.reliable_every, 4);
        assert!(!config.initial_light);
    }

    #[test]
    fn test_margin_must_be_below_max_age() {
        let config = ServerConfig {
            max_age: 2,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidFreshness {
                max_age: 2,
                notify_margin: 2
            })
        );
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let config = ServerConfig {
            reliable_every: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidReliableCadence));
    }
}
