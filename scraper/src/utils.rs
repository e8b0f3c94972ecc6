use crate::services::youtube::ChannelLocator;
use regex::Regex;
use std::sync::OnceLock;

fn channel_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:youtube\.com)/(channel/|user/|c/|@)([A-Za-z0-9_.\-]+)")
            .expect("channel url regex is valid")
    })
}

/// Turn user input into a channel locator.
///
/// Accepts bare channel ids (`UC…`), `@handles` and the usual channel URL
/// shapes:
/// - `https://www.youtube.com/channel/UCTeLqJq1mXUX5WWoNXLmOIA`
/// - `https://youtube.com/@RobertsSpaceInd`
/// - `https://www.youtube.com/c/RobertsSpaceInd`
/// - `https://www.youtube.com/user/RobertsSpaceInd`
pub fn parse_channel_input(input: &str) -> Option<ChannelLocator> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    if let Some(captures) = channel_url_regex().captures(input) {
        let value = captures.get(2)?.as_str().to_string();
        return match captures.get(1)?.as_str() {
            "channel/" => Some(ChannelLocator::Id(value)),
            "user/" => Some(ChannelLocator::Username(value)),
            "@" => Some(ChannelLocator::Handle(format!("@{value}"))),
            _ => Some(ChannelLocator::Handle(value)),
        };
    }

    if input.contains('/') {
        return None;
    }
    if input.starts_with('@') {
        return Some(ChannelLocator::Handle(input.to_string()));
    }
    if input.starts_with("UC") && input.len() == 24 {
        return Some(ChannelLocator::Id(input.to_string()));
    }
    Some(ChannelLocator::Handle(input.to_string()))
}

/// Total seconds of an ISO-8601 duration such as `PT4M13S` or `P1DT2H`.
///
/// Anything that does not start with `P` counts as 0, as do unknown units.
pub fn parse_iso8601_duration_to_seconds(duration: &str) -> i64 {
    let Some(rest) = duration.trim().strip_prefix('P') else {
        return 0;
    };

    let mut total = 0.0;
    let mut number = String::new();
    let mut in_time = false;

    for ch in rest.chars() {
        match ch {
            '0'..='9' | '.' => number.push(ch),
            'T' => {
                in_time = true;
                number.clear();
            }
            unit => {
                let value: f64 = number.parse().unwrap_or(0.0);
                let scale = match (unit, in_time) {
                    ('W', false) => 604_800.0,
                    ('D', false) => 86_400.0,
                    ('H', true) => 3_600.0,
                    ('M', true) => 60.0,
                    ('S', true) => 1.0,
                    _ => 0.0,
                };
                total += value * scale;
                number.clear();
            }
        }
    }

    total as i64
}
