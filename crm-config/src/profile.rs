use std::fmt;
use std::io::Error;

/// Name of the environment variable selecting the profile.
const APP_PROFILE_ENV_NAME: &str = "APP_PROFILE";

const SANDBOX_PROFILE_NAME: &str = "sandbox";

const PRODUCTION_PROFILE_NAME: &str = "production";

/// The org the client talks to.
///
/// Each profile has its own configuration file and login endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    Sandbox,
    Production,
}

impl Profile {
    /// Loads the profile from `APP_PROFILE`, defaulting to [`Profile::Sandbox`].
    pub fn load() -> Result<Profile, Error> {
        std::env::var(APP_PROFILE_ENV_NAME)
            .unwrap_or_else(|_| SANDBOX_PROFILE_NAME.into())
            .try_into()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Sandbox => SANDBOX_PROFILE_NAME,
            Profile::Production => PRODUCTION_PROFILE_NAME,
        }
    }

    /// OAuth token endpoint used when the configuration does not name one.
    pub fn default_token_url(&self) -> &'static str {
        match self {
            Profile::Sandbox => "https://test.salesforce.com/services/oauth2/token",
            Profile::Production => "https://login.salesforce.com/services/oauth2/token",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Profile {
    type Error = Error;

    /// Parses a profile name case-insensitively.
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            SANDBOX_PROFILE_NAME => Ok(Self::Sandbox),
            PRODUCTION_PROFILE_NAME => Ok(Self::Production),
            other => Err(Error::other(format!(
                "{other} is not a supported profile. Use either `{SANDBOX_PROFILE_NAME}` or `{PRODUCTION_PROFILE_NAME}`.",
            ))),
        }
    }
}
