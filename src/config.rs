use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";

/// Premier League, La Liga, Bundesliga, Serie A, Ligue 1 (API-Football ids).
pub const DEFAULT_LEAGUE_IDS: [u32; 5] = [39, 140, 78, 135, 61];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model_dir: Option<PathBuf>,
    pub fetch_parallelism: usize,
    pub request_timeout: Duration,
    pub league_ids: Vec<u32>,
    pub default_limit: usize,
    pub cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            model_dir: None,
            fetch_parallelism: 6,
            request_timeout: Duration::from_secs(20),
            league_ids: DEFAULT_LEAGUE_IDS.to_vec(),
            default_limit: 10,
            cache_ttl: Duration::from_secs(600),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = opt_env("API_FOOTBALL_KEY");
        let base_url = opt_env("API_FOOTBALL_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let model_dir = opt_env("SCORER_MODEL_DIR").map(|s| PathBuf::from(s.trim()));
        let fetch_parallelism = env_parse::<usize>("FETCH_PARALLELISM")
            .unwrap_or(defaults.fetch_parallelism)
            .clamp(2, 32);
        let request_timeout = Duration::from_secs(
            env_parse::<u64>("REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout.as_secs())
                .clamp(2, 300),
        );
        let league_ids = opt_env("SCORER_LEAGUE_IDS")
            .map(|raw| parse_ids(&raw))
            .filter(|ids| !ids.is_empty())
            .unwrap_or(defaults.league_ids);
        let default_limit = env_parse::<usize>("SCORER_DEFAULT_LIMIT")
            .unwrap_or(defaults.default_limit)
            .clamp(1, 200);
        let cache_ttl = Duration::from_secs(
            env_parse::<u64>("HTTP_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl.as_secs()),
        );

        Self {
            api_key,
            base_url,
            model_dir,
            fetch_parallelism,
            request_timeout,
            league_ids,
            default_limit,
            cache_ttl,
        }
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|val| {
        let trimmed = val.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    opt_env(key).and_then(|val| val.parse::<T>().ok())
}

pub fn parse_ids(raw: &str) -> Vec<u32> {
    let mut out = Vec::new();
    for part in raw.split([',', ';', ' ']) {
        if let Ok(id) = part.trim().parse::<u32>()
            && !out.contains(&id)
        {
            out.push(id);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ids_accepts_mixed_separators() {
        assert_eq!(parse_ids("39, 140;78 x 39"), vec![39, 140, 78]);
        assert!(parse_ids("").is_empty());
    }

    #[test]
    fn defaults_cover_five_leagues() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.league_ids.len(), 5);
        assert!(cfg.api_key.is_none());
    }
}
