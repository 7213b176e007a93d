use anyhow::{anyhow, Context, Result};
use fx_core::PairId;
use notification_service::NotificationConfig;
use std::str::FromStr;
use std::time::Duration;

/// What `/api/subscribe` does when the welcome message cannot be delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WelcomePolicy {
    /// Store the subscriber, then try the welcome; a failed send is only logged.
    #[default]
    BestEffort,
    /// Send the welcome first and store nothing if it fails.
    Required,
}

impl FromStr for WelcomePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "best-effort" | "besteffort" | "lenient" => Ok(Self::BestEffort),
            "required" | "strict" => Ok(Self::Required),
            other => Err(anyhow!(
                "unknown WELCOME_POLICY {:?} (expected best-effort or required)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub poll_interval: Duration,
    pub tracked_pairs: Vec<PairId>,
    pub alert_pairs: Vec<PairId>,
    pub welcome_policy: WelcomePolicy,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
    pub enable_hsts: bool,
    pub notification: NotificationConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => v.trim().parse().with_context(|| format!("PORT is not a valid port: {}", v))?,
            None => 3000,
        };

        let poll_secs: u64 = match get("POLL_INTERVAL_SECS") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("POLL_INTERVAL_SECS is not a number: {}", v))?,
            None => 60,
        };
        if poll_secs == 0 {
            return Err(anyhow!("POLL_INTERVAL_SECS must be at least 1"));
        }

        let tracked_pairs = PairId::parse_list(
            &get("TRACKED_PAIRS").unwrap_or_else(|| "GBP-USD,GBP-EUR,GBP-JPY,GBP-CHF".to_string()),
        )
        .context("TRACKED_PAIRS")?;
        let alert_pairs = PairId::parse_list(
            &get("ALERT_PAIRS").unwrap_or_else(|| "GBP-USD".to_string()),
        )
        .context("ALERT_PAIRS")?;

        if let Some(missing) = alert_pairs.iter().find(|p| !tracked_pairs.contains(p)) {
            return Err(anyhow!("ALERT_PAIRS contains {} which is not in TRACKED_PAIRS", missing));
        }

        let welcome_policy = match get("WELCOME_POLICY") {
            Some(v) => v.parse()?,
            None => WelcomePolicy::default(),
        };

        let cors_origins = get("CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let enable_hsts = get("ENABLE_HSTS")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let notification = NotificationConfig::from_lookup(&lookup);

        Ok(Self {
            port,
            database_url: get("DATABASE_URL").unwrap_or_else(|| "sqlite:subscribers.db".to_string()),
            poll_interval: Duration::from_secs(poll_secs),
            tracked_pairs,
            alert_pairs,
            welcome_policy,
            cors_origins,
            enable_hsts,
            notification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.database_url, "sqlite:subscribers.db");
        assert_eq!(cfg.poll_interval, Duration::from_secs(60));
        assert_eq!(cfg.tracked_pairs.len(), 4);
        assert_eq!(cfg.alert_pairs, vec!["GBP-USD".parse::<PairId>().unwrap()]);
        assert_eq!(cfg.welcome_policy, WelcomePolicy::BestEffort);
        assert!(cfg.cors_origins.is_empty());
        assert!(!cfg.notification.twilio_configured());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PORT", "8080"),
            ("POLL_INTERVAL_SECS", "5"),
            ("ALERT_PAIRS", "gbp/eur, GBP-USD"),
            ("WELCOME_POLICY", "required"),
            ("CORS_ORIGINS", "http://a.test, http://b.test"),
            ("TWILIO_ACCOUNT_SID", "AC1"),
            ("TWILIO_AUTH_TOKEN", "tok"),
            ("TWILIO_WHATSAPP_NUMBER", "+14155238886"),
        ])
        .unwrap();

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.poll_interval, Duration::from_secs(5));
        assert_eq!(cfg.alert_pairs.len(), 2);
        assert_eq!(cfg.welcome_policy, WelcomePolicy::Required);
        assert_eq!(cfg.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(cfg.notification.twilio_configured());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let cfg = config(&[("PORT", "  "), ("TWILIO_ACCOUNT_SID", "")]).unwrap();
        assert_eq!(cfg.port, 3000);
        assert!(cfg.notification.twilio_account_sid.is_none());
    }

    #[test]
    fn test_invalid_values() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("POLL_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("WELCOME_POLICY", "sometimes")]).is_err());
        assert!(config(&[("TRACKED_PAIRS", "GBPUSD")]).is_err());
        assert!(config(&[("TRACKED_PAIRS", "GBP-EUR"), ("ALERT_PAIRS", "GBP-USD")]).is_err());
    }

    #[test]
    fn test_welcome_policy_parse() {
        assert_eq!("best_effort".parse::<WelcomePolicy>().unwrap(), WelcomePolicy::BestEffort);
        assert_eq!("STRICT".parse::<WelcomePolicy>().unwrap(), WelcomePolicy::Required);
    }
}
