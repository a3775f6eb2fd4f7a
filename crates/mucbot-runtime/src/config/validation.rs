//! Configuration validation utilities.
//!
//! Checks run before the bot connects, so a bad account or room address
//! stops startup with a message naming the problem.

use super::error::{ConfigError, ConfigResult};
use super::schema::BotConfig;

/// Validates the configuration required to join a room.
pub fn validate_config(config: &BotConfig) -> ConfigResult<()> {
    validate_login(config.login.as_deref())?;
    validate_room(config)?;
    validate_nick(&config.nick)?;
    Ok(())
}

/// The login must be a bare `user@host` address.
fn validate_login(login: Option<&str>) -> ConfigResult<()> {
    let login = login
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ConfigError::missing_field("login"))?;

    match login.split_once('@') {
        Some((node, domain)) if !node.is_empty() && !domain.is_empty() => {}
        _ => {
            return Err(ConfigError::validation(format!(
                "Login '{login}' must contain a user name, e.g. bot@example.org"
            )));
        }
    }

    if login.contains('/') {
        return Err(ConfigError::validation(format!(
            "Login '{login}' must not contain a resource; set the `resource` option instead"
        )));
    }

    Ok(())
}

/// `channel` and `server` together form a room address without resource.
fn validate_room(config: &BotConfig) -> ConfigResult<()> {
    let channel = config.channel.as_deref().unwrap_or_default();
    if channel.is_empty() {
        return Err(ConfigError::missing_field("channel"));
    }
    if channel.contains('@') {
        return Err(ConfigError::validation(format!(
            "Channel '{channel}' must be a room name only; put the host in `server`"
        )));
    }

    let server = config.server.as_deref().unwrap_or_default();
    if server.is_empty() {
        return Err(ConfigError::missing_field("server"));
    }

    if channel.contains('/') || server.contains('/') {
        return Err(ConfigError::validation(format!(
            "Room '{channel}@{server}' must not contain a resource"
        )));
    }

    Ok(())
}

fn validate_nick(nick: &str) -> ConfigResult<()> {
    if nick.trim().is_empty() {
        return Err(ConfigError::missing_field("nick"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BotConfig {
        BotConfig {
            login: Some("bot@example.org".into()),
            channel: Some("lounge".into()),
            server: Some("conference.example.org".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_default_config_is_incomplete() {
        let result = validate_config(&BotConfig::default());
        assert!(matches!(result, Err(ConfigError::MissingField { field }) if field == "login"));
    }

    #[test]
    fn test_login_needs_user() {
        for login in ["example.org", "@example.org", "bot@"] {
            let config = BotConfig {
                login: Some(login.into()),
                ..valid()
            };
            assert!(
                matches!(validate_config(&config), Err(ConfigError::ValidationError { .. })),
                "{login} should be rejected"
            );
        }
    }

    #[test]
    fn test_login_without_resource() {
        let config = BotConfig {
            login: Some("bot@example.org/home".into()),
            ..valid()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_room_required() {
        let config = BotConfig {
            channel: None,
            ..valid()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "channel"
        ));

        let config = BotConfig {
            server: Some(String::new()),
            ..valid()
        };
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::MissingField { field }) if field == "server"
        ));
    }

    #[test]
    fn test_room_without_resource() {
        let config = BotConfig {
            server: Some("conference.example.org/bot".into()),
            ..valid()
        };
        assert!(validate_config(&config).is_err());
    }
}
