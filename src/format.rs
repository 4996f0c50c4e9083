// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::NaiveDate;

/// `Fri, Mar 1, 2024`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}

/// `m:ss`, or `h:mm:ss` from one hour on
pub fn format_duration(duration_ms: u64) -> String {
    if duration_ms == 0 {
        return "Unknown duration".to_string();
    }

    let total_seconds = duration_ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes >= 60 {
        format!("{}:{:02}:{seconds:02}", minutes / 60, minutes % 60)
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

pub fn format_episode_count(count: u32) -> String {
    if count == 1 {
        "1 episode".to_string()
    } else {
        format!("{count} episodes")
    }
}

/// Cut `text` to `max_chars` characters, adding `...` when shortened
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
