use std::path::Path;

use lazy_static::lazy_static;
use pulse_core::{Category, ChannelConfig, Error, Language, Quality, Result, UpdateFrequency};

fn channel(
    username: &str,
    name: &str,
    category: Category,
    language: Language,
    description: &str,
    tags: &[&str],
    update_frequency: UpdateFrequency,
) -> ChannelConfig {
    ChannelConfig {
        username: username.to_string(),
        name: name.to_string(),
        category,
        language,
        posts_per_scrape: 10,
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        update_frequency,
        quality: Quality::High,
    }
}

lazy_static! {
    /// Channels scraped when no channel file is given.
    pub static ref ACTIVE_CHANNELS: Vec<ChannelConfig> = vec![
        channel(
            "durov",
            "Pavel Durov",
            Category::Technology,
            Language::En,
            "Official channel of Telegram founder Pavel Durov with insights on tech, product development, and industry trends",
            &["telegram", "tech", "startup", "product"],
            UpdateFrequency::Weekly,
        ),
        channel(
            "telegram",
            "Telegram News",
            Category::Product,
            Language::En,
            "Official Telegram channel for product updates, feature announcements, and platform news",
            &["telegram", "updates", "features", "tech"],
            UpdateFrequency::Weekly,
        ),
        channel(
            "startupoftheday",
            "Startup of the Day",
            Category::Startup,
            Language::Ru,
            "Daily coverage of innovative startups, funding news, and entrepreneurship insights",
            &["startups", "funding", "innovation", "business"],
            UpdateFrequency::Daily,
        ),
        channel(
            "huggingface",
            "Hugging Face",
            Category::Ai,
            Language::En,
            "AI technology updates, machine learning developments, and industry news from Hugging Face",
            &["ai", "ml", "technology", "research"],
            UpdateFrequency::Weekly,
        ),
    ];
}

pub fn active_channels() -> Vec<ChannelConfig> {
    ACTIVE_CHANNELS.clone()
}

pub fn get_channel_config<'a>(channels: &'a [ChannelConfig], username: &str) -> Option<&'a ChannelConfig> {
    let username = username.trim_start_matches('@');
    channels
        .iter()
        .find(|c| c.username.trim_start_matches('@').eq_ignore_ascii_case(username))
}

pub fn channels_by_category(channels: &[ChannelConfig], category: Category) -> Vec<ChannelConfig> {
    channels.iter().filter(|c| c.category == category).cloned().collect()
}

pub fn channels_by_language(channels: &[ChannelConfig], language: Language) -> Vec<ChannelConfig> {
    channels.iter().filter(|c| c.language == language).cloned().collect()
}

/// Reads a JSON array of channel configs, rejecting the file if any entry is invalid.
pub fn load_channels(path: &Path) -> Result<Vec<ChannelConfig>> {
    let raw = std::fs::read_to_string(path)?;
    let mut channels: Vec<ChannelConfig> = serde_json::from_str(&raw)?;
    if channels.is_empty() {
        return Err(Error::Config(format!("{} lists no channels", path.display())));
    }
    for channel in &mut channels {
        channel.normalize();
        channel.validate()?;
    }
    Ok(channels)
}
