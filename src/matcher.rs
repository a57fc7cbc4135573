use regex::Regex;
use std::fmt;
use tracing::debug;

use crate::config::MatchingConfig;
use crate::error::{Result, MuxError};
use crate::media::MediaFile;

const EPISODE_PLACEHOLDER: &str = "{episode}";

/// Episode number captured from a video file name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EpisodeId(String);

impl EpisodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Joins videos and audio tracks through the episode number in their names
#[derive(Debug, Clone)]
pub struct EpisodeMatcher {
    episode_regex: Regex,
    audio_template: String,
}

impl EpisodeMatcher {
    pub fn new(episode_pattern: &str, audio_template: &str) -> Result<Self> {
        let episode_regex = Regex::new(episode_pattern)?;
        if episode_regex.captures_len() < 2 {
            return Err(MuxError::Config(format!(
                "episode pattern '{}' needs a capture group for the episode number",
                episode_pattern
            )));
        }
        if !audio_template.contains(EPISODE_PLACEHOLDER) {
            return Err(MuxError::Config(format!(
                "audio pattern '{}' must contain {}",
                audio_template, EPISODE_PLACEHOLDER
            )));
        }

        // Compile once with a sample id so template errors surface at startup
        Regex::new(&audio_template.replace(EPISODE_PLACEHOLDER, "00"))?;

        Ok(Self {
            episode_regex,
            audio_template: audio_template.to_string(),
        })
    }

    pub fn from_config(config: &MatchingConfig) -> Result<Self> {
        Self::new(&config.episode_pattern, &config.audio_pattern)
    }

    /// First episode number found in `name`, if any
    pub fn extract_episode_id(&self, name: &str) -> Option<EpisodeId> {
        self.episode_regex
            .captures(name)
            .and_then(|caps| caps.get(1))
            .map(|m| EpisodeId(m.as_str().to_string()))
    }

    /// Audio files whose base name carries `episode`, in input order
    pub fn match_audios(&self, episode: &EpisodeId, audio_files: &[MediaFile]) -> Result<Vec<MediaFile>> {
        let pattern = self
            .audio_template
            .replace(EPISODE_PLACEHOLDER, &regex::escape(episode.as_str()));
        let regex = Regex::new(&pattern)?;
        debug!("Matching audio files for episode {} with /{}/", episode, pattern);

        Ok(audio_files
            .iter()
            .filter(|audio| regex.is_match(&audio.stem()))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn matcher() -> EpisodeMatcher {
        EpisodeMatcher::from_config(&crate::config::Config::default().matching).unwrap()
    }

    fn audio(name: &str) -> MediaFile {
        MediaFile::new(PathBuf::from("Audio").join(name))
    }

    fn id(value: &str) -> EpisodeId {
        matcher().extract_episode_id(&format!("E{}", value)).unwrap()
    }

    #[test]
    fn test_extract_episode_id() {
        let m = matcher();
        assert_eq!(m.extract_episode_id("Show E01").unwrap().as_str(), "01");
        assert_eq!(m.extract_episode_id("S02E13 Title").unwrap().as_str(), "13");
        assert_eq!(m.extract_episode_id("E00").unwrap().as_str(), "00");
        assert_eq!(m.extract_episode_id("E99").unwrap().as_str(), "99");
    }

    #[test]
    fn test_extract_episode_id_not_found() {
        let m = matcher();
        assert!(m.extract_episode_id("Bonus").is_none());
        assert!(m.extract_episode_id("Show E1").is_none());
        assert!(m.extract_episode_id("Show e01").is_none());
    }

    #[test]
    fn test_extract_uses_first_occurrence() {
        let m = matcher();
        assert_eq!(m.extract_episode_id("E05 recap of E04").unwrap().as_str(), "05");
    }

    #[test]
    fn test_three_digit_episode_keeps_first_two_digits() {
        // Known limitation of the default pattern
        let m = matcher();
        assert_eq!(m.extract_episode_id("Show E123").unwrap().as_str(), "12");
    }

    #[test]
    fn test_match_audios_with_and_without_whitespace() {
        let m = matcher();
        let audios = vec![
            audio("Show - 01 Group.mka"),
            audio("Show -01.mka"),
            audio("Show - 02 Group.mka"),
            audio("Show 01.mka"),
        ];

        let matched = m.match_audios(&id("01"), &audios).unwrap();
        let names: Vec<_> = matched.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Show - 01 Group.mka", "Show -01.mka"]);
    }

    #[test]
    fn test_match_audios_respects_word_boundary() {
        let m = matcher();
        let audios = vec![audio("Show - 123.mka"), audio("Show - 12.mka"), audio("Show - 12_v2.mka")];

        let matched = m.match_audios(&id("12"), &audios).unwrap();
        let names: Vec<_> = matched.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Show - 12.mka"]);
    }

    #[test]
    fn test_match_audios_preserves_input_order() {
        let m = matcher();
        let audios = vec![audio("Z - 03.mka"), audio("A - 03.mka"), audio("M - 03.mka")];

        let matched = m.match_audios(&id("03"), &audios).unwrap();
        let names: Vec<_> = matched.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Z - 03.mka", "A - 03.mka", "M - 03.mka"]);
    }

    #[test]
    fn test_match_audios_ignores_extension_text() {
        let m = matcher();
        // Only the base name is inspected
        let audios = vec![audio("Show.-07")];
        assert!(m.match_audios(&id("07"), &audios).unwrap().is_empty());
    }

    #[test]
    fn test_episode_pattern_without_group_is_rejected() {
        let result = EpisodeMatcher::new(r"E\d{2}", r"-\s*{episode}\b");
        assert!(matches!(result, Err(MuxError::Config(_))));
    }

    #[test]
    fn test_audio_template_without_placeholder_is_rejected() {
        let result = EpisodeMatcher::new(r"E(\d{2})", r"-\s*\d+");
        assert!(matches!(result, Err(MuxError::Config(_))));
    }

    #[test]
    fn test_custom_three_digit_pattern() {
        let m = EpisodeMatcher::new(r"E(\d{3})", r"-\s*{episode}\b").unwrap();
        let episode = m.extract_episode_id("Show E123").unwrap();
        let matched = m.match_audios(&episode, &[audio("Show - 123.mka")]).unwrap();
        assert_eq!(matched.len(), 1);
    }
}
