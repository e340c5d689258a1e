use std::time::Duration;

use crate::allocator::{format_wait, DrawPolicy};

/// Blurple, the embed colour of the link generator post
pub const COLOR_LINK_EMBED: u32 = 0x5865F2;

pub const LINK_BUTTON_ID: &str = "link_button";
pub const LINK_BUTTON_LABEL: &str = "Get a Link";

/// "2 hours", "1 hour", "90 minutes"
pub fn window_label(cooldown: Duration) -> String {
    let minutes = cooldown.as_secs() / 60;
    if minutes > 0 && minutes % 60 == 0 {
        let hours = minutes / 60;
        format!("{} hour{}", hours, plural(hours))
    } else {
        format!("{} minute{}", minutes, plural(minutes))
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

pub fn format_link_embed(policy: &DrawPolicy) -> (String, String) {
    let title = "Link Generator".to_string();
    let body = format!(
        "Click the button below to receive a link in your DMs.\n\n*Limited to {} links per {}.*",
        policy.max_links,
        window_label(policy.cooldown)
    );
    (title, body)
}

pub fn issued_reply(remaining: u32, policy: &DrawPolicy) -> String {
    format!(
        "✅ Check your DMs! You have {} link{} remaining for the next {}.",
        remaining,
        plural(remaining as u64),
        window_label(policy.cooldown)
    )
}

pub fn cooldown_reply(remaining: Duration, policy: &DrawPolicy) -> String {
    format!(
        "❌ You have already received {} links in the last {}. Please try again in {}.",
        policy.max_links,
        window_label(policy.cooldown),
        format_wait(remaining)
    )
}

pub fn exhausted_reply() -> String {
    "❌ You have already received all available links. Please check back later.".to_string()
}

pub fn delivery_failed_reply() -> String {
    "⚠️ I couldn't send you a DM. Allow direct messages from server members in your privacy settings, then try again. This link still counts toward your limit.".to_string()
}

pub fn link_dm(link: &str, emoji: Option<&str>) -> String {
    match emoji {
        Some(e) => format!("{} Here's your new [link]({}) Do not share it {}", e, link, e),
        None => format!("Here's your new [link]({}) Do not share it", link),
    }
}
