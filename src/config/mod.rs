use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// When unset the shared store is disabled and every consumer applies
    /// its fail-open default.
    pub host: Option<String>,
    pub port: u16,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub token_expiry_minutes: i64,
    pub enable_cors: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Authenticated tier: keyed by user id.
    pub auth_rate: f64,
    pub auth_capacity: u32,
    /// Anonymous tier: keyed by client address.
    pub anon_rate: f64,
    pub anon_capacity: u32,
    /// Idle buckets expire after this many seconds.
    pub bucket_ttl_secs: u64,
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub namespace: String,
    pub ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Environment tier sets the defaults, specific env vars override
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT") {
            self.database.connect_timeout_secs = v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        // Redis overrides
        if let Ok(v) = env::var("REDIS_HOST") {
            if !v.is_empty() {
                self.redis.host = Some(v);
            }
        }
        if let Ok(v) = env::var("REDIS_PORT") {
            self.redis.port = v.parse().unwrap_or(self.redis.port);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_MINUTES") {
            self.security.token_expiry_minutes = v.parse().unwrap_or(self.security.token_expiry_minutes);
        }

        // Rate limit overrides
        if let Ok(v) = env::var("DISABLE_RATE_LIMIT") {
            if v.eq_ignore_ascii_case("true") {
                self.rate_limit.enabled = false;
            }
        }
        if let Ok(v) = env::var("RATE_LIMIT_AUTH_RATE") {
            self.rate_limit.auth_rate = v.parse().unwrap_or(self.rate_limit.auth_rate);
        }
        if let Ok(v) = env::var("RATE_LIMIT_AUTH_CAPACITY") {
            self.rate_limit.auth_capacity = v.parse().unwrap_or(self.rate_limit.auth_capacity);
        }
        if let Ok(v) = env::var("RATE_LIMIT_ANON_RATE") {
            self.rate_limit.anon_rate = v.parse().unwrap_or(self.rate_limit.anon_rate);
        }
        if let Ok(v) = env::var("RATE_LIMIT_ANON_CAPACITY") {
            self.rate_limit.anon_capacity = v.parse().unwrap_or(self.rate_limit.anon_capacity);
        }

        // Cache overrides
        if let Ok(v) = env::var("CACHE_NAMESPACE") {
            self.cache.namespace = v;
        }
        if let Ok(v) = env::var("CACHE_TTL_SECS") {
            self.cache.ttl_secs = v.parse().unwrap_or(self.cache.ttl_secs);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 10,
                connect_timeout_secs: 30,
            },
            redis: RedisConfig {
                host: None,
                port: 6379,
                connect_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: "your-secret-key-change-in-production".to_string(),
                token_expiry_minutes: 30,
                enable_cors: true,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                auth_rate: 2.0,
                auth_capacity: 30,
                anon_rate: 0.5,
                anon_capacity: 10,
                bucket_ttl_secs: 120,
                retry_after_secs: 60,
            },
            cache: CacheConfig {
                namespace: "health".to_string(),
                ttl_secs: 300,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 20,
                connect_timeout_secs: 10,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 50,
                connect_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                token_expiry_minutes: 30,
                enable_cors: false,
            },
            ..Self::development()
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_rate_limit_tiers_match_documented_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.rate_limit.auth_rate, 2.0);
        assert_eq!(config.rate_limit.auth_capacity, 30);
        assert_eq!(config.rate_limit.anon_rate, 0.5);
        assert_eq!(config.rate_limit.anon_capacity, 10);
        assert_eq!(config.rate_limit.bucket_ttl_secs, 120);
    }

    #[test]
    fn cache_defaults() {
        let config = AppConfig::development();
        assert_eq!(config.cache.namespace, "health");
        assert_eq!(config.cache.ttl_secs, 300);
    }

    #[test]
    fn production_requires_explicit_jwt_secret() {
        let config = AppConfig::production();
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.rate_limit.enabled);
    }
}
