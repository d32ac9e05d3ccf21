//! Client details derived from the user agent string.
//!
//! The browser name feeds the `browser` dictionary; the device category is a
//! fallback for events whose metadata carries no `deviceType`.

use woothee::parser::Parser;

/// Browser and device class parsed from a user agent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub browser: Option<String>,
    pub device_type: Option<String>,
}

/// User agent parser (woothee, ~6.8us/parse).
pub struct UserAgentEnricher {
    parser: Parser,
}

impl UserAgentEnricher {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    pub fn parse(&self, user_agent: Option<&str>) -> ClientInfo {
        let Some(ua) = user_agent.filter(|ua| !ua.trim().is_empty()) else {
            return ClientInfo::default();
        };

        let Some(result) = self.parser.parse(ua) else {
            return ClientInfo::default();
        };

        let browser = (!result.name.is_empty() && result.name != "UNKNOWN")
            .then(|| result.name.to_string());

        // woothee categories: pc, smartphone, mobilephone, crawler, appliance, misc
        let device_type = match result.category {
            "pc" => Some("desktop"),
            "smartphone" | "mobilephone" => Some("mobile"),
            "crawler" => Some("bot"),
            "appliance" => Some("other"),
            _ => None,
        }
        .map(str::to_string);

        ClientInfo {
            browser,
            device_type,
        }
    }
}

impl Default for UserAgentEnricher {
    fn default() -> Self {
        Self::new()
    }
}
