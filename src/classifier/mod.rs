//! Bot classification for incoming click requests.
//!
//! A cheap, stateless filter: it blocks obvious non-human traffic (preview
//! crawlers, search bots, HTTP libraries) and lets everything else through.
//! It is heuristic, not authoritative, and tolerates false negatives.

use regex::Regex;
use std::sync::LazyLock;

/// Known crawler / preview-service / automation tokens, matched
/// case-insensitively as substrings of the user agent.
const BOT_USER_AGENTS: &[&str] = &[
    "facebookexternalhit",
    "Twitterbot",
    "LinkedInBot",
    "WhatsApp",
    "TelegramBot",
    "Slackbot",
    "Discordbot",
    "Googlebot",
    "Bingbot",
    "YandexBot",
    "DuckDuckBot",
    "Applebot",
    "Slurp",
    "ia_archiver",
    "Mediapartners-Google",
    "Bytespider",
    "Pinterest",
    "Iframely",
    "MetaInspector",
    "bot",
    "crawler",
    "spider",
    "scraper",
    "checker",
    "monitor",
    "headless",
    "selenium",
    "phantomjs",
    "puppeteer",
];

const BROWSER_INDICATORS: &[&str] = &[
    "mozilla", "chrome", "safari", "firefox", "edge", "opera", "webkit", "gecko", "msie",
    "trident",
];

const MOBILE_INDICATORS: &[&str] = &["mobile", "android", "iphone", "ipad", "ipod"];

/// HTTP-client and scripting-library signatures, only consulted when the
/// user agent carries no browser or mobile token at all.
static HTTP_CLIENT_SIGNATURES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"python|requests|urllib|curl|wget|http-client|go-http|java|okhttp")
        .expect("http client signature regex is valid")
});

/// Classify a user agent as bot traffic. Pure, no I/O.
pub fn is_bot(user_agent: &str) -> bool {
    if user_agent.is_empty() {
        return true;
    }

    let ua = user_agent.to_lowercase();

    if BOT_USER_AGENTS
        .iter()
        .any(|token| ua.contains(&token.to_lowercase()))
    {
        return true;
    }

    let has_browser = BROWSER_INDICATORS.iter().any(|t| ua.contains(t));
    let has_mobile = MOBILE_INDICATORS.iter().any(|t| ua.contains(t));

    if !has_browser && !has_mobile && HTTP_CLIENT_SIGNATURES.is_match(&ua) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_user_agent_is_bot() {
        assert!(is_bot(""));
    }

    #[test]
    fn deny_list_tokens_are_bots_case_insensitive() {
        for token in BOT_USER_AGENTS {
            assert!(is_bot(token), "{token} should classify as bot");
            assert!(
                is_bot(&token.to_uppercase()),
                "{token} uppercased should classify as bot"
            );
            assert!(
                is_bot(&format!("SomePrefix/1.0 ({token}) Suffix")),
                "{token} as substring should classify as bot"
            );
        }
    }

    #[test]
    fn preview_crawlers_are_bots() {
        assert!(is_bot(
            "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)"
        ));
        assert!(is_bot("Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(is_bot("TelegramBot (like TwitterBot)"));
    }

    #[test]
    fn desktop_browsers_are_human() {
        assert!(!is_bot(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        ));
        assert!(!is_bot(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0"
        ));
    }

    #[test]
    fn mobile_platforms_are_human() {
        assert!(!is_bot(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15"
        ));
        assert!(!is_bot("Mozilla/5.0 (Linux; Android 14; Pixel 8)"));
    }

    #[test]
    fn http_libraries_without_browser_tokens_are_bots() {
        assert!(is_bot("python-requests/2.31.0"));
        assert!(is_bot("curl/8.4.0"));
        assert!(is_bot("Wget/1.21"));
        assert!(is_bot("okhttp/4.12.0"));
        assert!(is_bot("Go-http-client/2.0"));
    }

    #[test]
    fn unrecognized_but_plausible_agent_is_human() {
        // No browser token, no library signature: the filter lets it pass.
        assert!(!is_bot("SomeNicheViewer/3.2"));
    }
}
