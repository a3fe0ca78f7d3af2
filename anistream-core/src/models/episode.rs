use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const EP_MARKER: &str = "?ep=";

/// Episode reference, textual form `"<animeId>?ep=<episodeNumber>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeRef {
    anime_id: String,
    episode_number: u32,
}

impl EpisodeRef {
    /// Build a reference, rejecting empty or non-slug anime ids and episode 0.
    pub fn new(anime_id: impl Into<String>, episode_number: u32) -> Result<Self> {
        let anime_id = anime_id.into();
        if !is_slug(&anime_id) {
            return Err(Error::InvalidInput(format!("Invalid anime id: {anime_id:?}")));
        }
        if episode_number == 0 {
            return Err(Error::InvalidInput("Episode number must be at least 1".to_string()));
        }
        Ok(Self {
            anime_id,
            episode_number,
        })
    }

    /// Parse `"<animeId>?ep=<n>"`. Anything after the episode digits
    /// (`&server=...`, `#t=30`) is dropped.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let (anime_id, rest) = raw
            .split_once(EP_MARKER)
            .ok_or_else(|| Error::InvalidInput(format!("Episode id must look like <animeId>?ep=<n>, got {raw:?}")))?;
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        let episode_number = digits
            .parse()
            .map_err(|_| Error::InvalidInput(format!("Missing episode number in {raw:?}")))?;
        Self::new(anime_id, episode_number)
    }

    #[must_use]
    pub fn anime_id(&self) -> &str {
        &self.anime_id
    }

    #[must_use]
    pub const fn episode_number(&self) -> u32 {
        self.episode_number
    }
}

fn is_slug(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

impl fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{EP_MARKER}{}", self.anime_id, self.episode_number)
    }
}

impl FromStr for EpisodeRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for EpisodeRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EpisodeRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Audio variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Sub,
    Dub,
    Raw,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sub => "sub",
            Self::Dub => "dub",
            Self::Raw => "raw",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sub" => Ok(Self::Sub),
            "dub" => Ok(Self::Dub),
            "raw" => Ok(Self::Raw),
            other => Err(Error::InvalidInput(format!("Unknown category: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_form() {
        let ep = EpisodeRef::parse("naruto-100?ep=1").unwrap();
        assert_eq!(ep.anime_id(), "naruto-100");
        assert_eq!(ep.episode_number(), 1);
        assert_eq!(ep.to_string(), "naruto-100?ep=1");
    }

    #[test]
    fn test_parse_strips_trailing_fragments() {
        let ep = EpisodeRef::parse("one-piece-100?ep=1071&server=hd-1#t=20").unwrap();
        assert_eq!(ep.episode_number(), 1071);
        assert_eq!(ep.to_string(), "one-piece-100?ep=1071");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(EpisodeRef::parse("naruto-100").is_err());
        assert!(EpisodeRef::parse("?ep=3").is_err());
        assert!(EpisodeRef::parse("naruto?ep=").is_err());
        assert!(EpisodeRef::parse("naruto?ep=0").is_err());
        assert!(EpisodeRef::parse("naru to?ep=1").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let ep = EpisodeRef::new("bleach-806", 3).unwrap();
        let json = serde_json::to_string(&ep).unwrap();
        assert_eq!(json, "\"bleach-806?ep=3\"");
        let back: EpisodeRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ep);
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!("DUB".parse::<Category>().unwrap(), Category::Dub);
        assert!("dubbed".parse::<Category>().is_err());
        assert_eq!(Category::default(), Category::Sub);
    }
}
