use anyhow::{Context, Result, bail};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

static VERSION_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{2})\.([0-9])$").unwrap());

/// A Houdini `major.minor` release line, such as `16.0` or `20.5`.
///
/// Daily builds are published per release line, so this is the only
/// granularity the download API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseVersion {
    pub major: u32,
    pub minor: u32,
}

impl ReleaseVersion {
    pub fn new(version_str: &str) -> Result<Self> {
        let Some(caps) = VERSION_REGEX.captures(version_str) else {
            bail!(
                "Invalid Houdini version \"{}\", expecting the form \"major.minor\" such as \"16.0\"",
                version_str
            );
        };

        let major = caps
            .get(1)
            .context("Invalid major version")?
            .as_str()
            .parse()
            .context("Invalid major version")?;
        let minor = caps
            .get(2)
            .context("Invalid minor version")?
            .as_str()
            .parse()
            .context("Invalid minor version")?;

        Ok(ReleaseVersion { major, minor })
    }
}

impl FromStr for ReleaseVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        ReleaseVersion::new(s)
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_major_minor() {
        let v = ReleaseVersion::new("16.0").unwrap();
        assert_eq!(v, ReleaseVersion { major: 16, minor: 0 });
        assert_eq!(v.to_string(), "16.0");

        let v = ReleaseVersion::new("20.5").unwrap();
        assert_eq!(v.major, 20);
        assert_eq!(v.minor, 5);
    }

    #[test]
    fn test_rejects_other_shapes() {
        for bad in [
            "", "16", "6.0", "16.", "16.05", "16.0.1", "v16.0", "16.0 ", " 16.0", "ab.c", "16-0",
            "16.0\n",
        ] {
            assert!(ReleaseVersion::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_error_names_the_input() {
        let err = ReleaseVersion::new("latest").unwrap_err();
        assert!(err.to_string().contains("\"latest\""));
    }

    #[test]
    fn test_ordering() {
        let mut versions: Vec<ReleaseVersion> = ["19.5", "16.0", "18.0", "16.5"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        versions.sort();
        let sorted: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(sorted, vec!["16.0", "16.5", "18.0", "19.5"]);
    }
}
