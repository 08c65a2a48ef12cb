use serde::Deserialize;
use std::fmt;

/// Forecast/observation areas published by the portal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Vladivostok,
    Posiet,
    Slavyanka,
    Zarubino,
    Vrangel,
    Nakhodka,
    Olga,
    Plastun,
    Vera,
}

impl Zone {
    pub const ALL: [Zone; 9] = [
        Zone::Vladivostok,
        Zone::Posiet,
        Zone::Slavyanka,
        Zone::Zarubino,
        Zone::Vrangel,
        Zone::Nakhodka,
        Zone::Olga,
        Zone::Plastun,
        Zone::Vera,
    ];

    /// Path appended to the zone base url.
    pub fn page_suffix(&self) -> &'static str {
        match self {
            Zone::Vladivostok => "Vladivostok.aspx",
            Zone::Posiet => "Posiet.aspx",
            Zone::Slavyanka => "Slavyanka.aspx",
            Zone::Zarubino => "Zarubino.aspx",
            Zone::Vrangel => "Vrangel.aspx",
            Zone::Nakhodka => "Nakhodka.aspx",
            Zone::Olga => "Olga.aspx",
            Zone::Plastun => "Plastun.aspx",
            Zone::Vera => "Vera.aspx",
        }
    }

    pub fn page_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.page_suffix())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = self.page_suffix();
        write!(f, "{}", suffix.trim_end_matches(".aspx").to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_appends_suffix() {
        assert_eq!(
            Zone::Nakhodka.page_url("http://example.test/Templates/"),
            "http://example.test/Templates/Nakhodka.aspx"
        );
    }

    #[test]
    fn display_matches_cli_spelling() {
        for zone in Zone::ALL {
            let parsed = <Zone as clap::ValueEnum>::from_str(&zone.to_string(), false).unwrap();
            assert_eq!(parsed, zone);
        }
    }
}
