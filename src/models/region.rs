use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Newsletter edition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    #[default]
    Us,
    Europe,
    Australia,
}

/// Static per-edition settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionConfig {
    /// Display name of the edition
    pub name: &'static str,
    /// Banner image shown at the top of the document
    pub header_url: &'static str,
    /// Alt text of the banner image
    pub header_alt: &'static str,
}

const US_CONFIG: RegionConfig = RegionConfig {
    name: "US",
    header_url: "https://25093280.fs1.hubspotusercontent-eu1.net/hubfs/25093280/Screenshot%202026-01-23%20at%2021.48.06.png",
    header_alt: "MODOENERGY Weekly Dispatch US Edition",
};

const EUROPE_CONFIG: RegionConfig = RegionConfig {
    name: "Europe & GB",
    header_url: "https://25093280.fs1.hubspotusercontent-eu1.net/hubfs/25093280/European%20Weekly%20Dispatch/Weekly%20Dispatch%20Header_EU.png",
    header_alt: "MODOENERGY Weekly Dispatch Europe & GB Edition",
};

const AUSTRALIA_CONFIG: RegionConfig = RegionConfig {
    name: "Australia",
    header_url: "https://25093280.fs1.hubspotusercontent-eu1.net/hubfs/25093280/Screenshot%202026-01-23%20at%2021.50.29.png",
    header_alt: "MODOENERGY Weekly Dispatch Australia Edition",
};

impl Region {
    pub const ALL: [Region; 3] = [Region::Us, Region::Europe, Region::Australia];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Us => "us",
            Region::Europe => "europe",
            Region::Australia => "australia",
        }
    }

    pub fn config(&self) -> &'static RegionConfig {
        match self {
            Region::Us => &US_CONFIG,
            Region::Europe => &EUROPE_CONFIG,
            Region::Australia => &AUSTRALIA_CONFIG,
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us" | "usa" => Ok(Region::Us),
            "europe" | "eu" | "gb" => Ok(Region::Europe),
            "australia" | "au" => Ok(Region::Australia),
            other => Err(format!(
                "invalid region `{}` (expected one of: us, europe, australia)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_parse() {
        assert_eq!("US".parse::<Region>().unwrap(), Region::Us);
        assert_eq!(" europe ".parse::<Region>().unwrap(), Region::Europe);
        assert_eq!("au".parse::<Region>().unwrap(), Region::Australia);
        assert!("mars".parse::<Region>().is_err());
    }

    #[test]
    fn test_region_config_names() {
        assert_eq!(Region::Europe.config().name, "Europe & GB");
        assert!(Region::Us.config().header_alt.contains("US Edition"));
    }
}
