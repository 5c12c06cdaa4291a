//! User agent handling for HTTP requests.

use rand::seq::{IndexedRandom, SliceRandom};

/// Default user agent: a current desktop Chrome.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Real browser user agents for impersonate mode and fallback rotation.
pub const IMPERSONATE_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Mobile/15E148 Safari/604.1",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
    // Chrome on Android
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
];

/// Get a random user agent for impersonate mode.
pub fn random_user_agent() -> &'static str {
    IMPERSONATE_USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENT)
}

/// Resolve user agent from config value.
/// - None => default browser user agent
/// - "impersonate" => random real browser user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None => USER_AGENT.to_string(),
        Some("impersonate") => random_user_agent().to_string(),
        Some(custom) => custom.to_string(),
    }
}

/// The built-in pool as owned strings.
pub fn default_pool() -> Vec<String> {
    IMPERSONATE_USER_AGENTS.iter().map(|s| s.to_string()).collect()
}

/// A shuffled copy of `pool`; the pool itself is left untouched.
pub fn shuffled(pool: &[String]) -> Vec<String> {
    let mut agents = pool.to_vec();
    agents.shuffle(&mut rand::rng());
    agents
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_user_agent_default() {
        assert_eq!(resolve_user_agent(None), USER_AGENT);
    }

    #[test]
    fn test_resolve_user_agent_impersonate() {
        let ua = resolve_user_agent(Some("impersonate"));
        assert!(IMPERSONATE_USER_AGENTS.contains(&ua.as_str()));
    }

    #[test]
    fn test_resolve_user_agent_custom() {
        let ua = resolve_user_agent(Some("MyBot/1.0"));
        assert_eq!(ua, "MyBot/1.0");
    }

    #[test]
    fn shuffle_keeps_every_agent() {
        let pool = default_pool();
        let mut shuffled = shuffled(&pool);
        assert_eq!(shuffled.len(), pool.len());
        shuffled.sort();
        let mut sorted = pool.clone();
        sorted.sort();
        assert_eq!(shuffled, sorted);
    }
}
