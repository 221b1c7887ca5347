use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64, parse_usize,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, AttemptSettings, ConfigError, CorsSettings, DatabaseSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

const MIN_ATTEMPT_TOKEN_BYTES: usize = 16;

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("QUIZHALL_HOST", "0.0.0.0");
        let port = env_or_default("QUIZHALL_PORT", "8000");

        let environment = parse_environment(
            env_optional("QUIZHALL_ENV").or_else(|| env_optional("ENVIRONMENT")),
        );
        let strict_config =
            env_optional("QUIZHALL_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Quizhall API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };

        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "1440"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");
        let login_rate_limit =
            parse_u64("LOGIN_RATE_LIMIT", env_or_default("LOGIN_RATE_LIMIT", "10"))?;
        let login_rate_window_seconds = parse_u64(
            "LOGIN_RATE_WINDOW_SECONDS",
            env_or_default("LOGIN_RATE_WINDOW_SECONDS", "60"),
        )?;

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "quizhall");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "quizhall");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DB_MAX_CONNECTIONS", env_or_default("DB_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let token_bytes =
            parse_usize("ATTEMPT_TOKEN_BYTES", env_or_default("ATTEMPT_TOKEN_BYTES", "32"))?;
        let sweep_interval_seconds = parse_u64(
            "ATTEMPT_SWEEP_INTERVAL_SECONDS",
            env_or_default("ATTEMPT_SWEEP_INTERVAL_SECONDS", "300"),
        )?;

        let first_admin_username = env_or_default("FIRST_ADMIN_USERNAME", "admin");
        let first_admin_password = env_or_default("FIRST_ADMIN_PASSWORD", "");

        let log_level = env_or_default("QUIZHALL_LOG_LEVEL", "info");
        let json =
            env_optional("QUIZHALL_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                algorithm,
                login_rate_limit,
                login_rate_window_seconds,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            attempts: AttemptSettings { token_bytes, sweep_interval_seconds },
            admin: AdminSettings { first_admin_username, first_admin_password },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn attempts(&self) -> &AttemptSettings {
        &self.attempts
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.attempts.token_bytes < MIN_ATTEMPT_TOKEN_BYTES {
            return Err(ConfigError::InvalidValue {
                field: "ATTEMPT_TOKEN_BYTES",
                value: self.attempts.token_bytes.to_string(),
            });
        }

        if self.security.algorithm != "HS256" {
            return Err(ConfigError::InvalidValue {
                field: "ALGORITHM",
                value: self.security.algorithm.clone(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "DB_MAX_CONNECTIONS",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if self.admin.first_admin_password.is_empty() {
            return Err(ConfigError::MissingSecret("FIRST_ADMIN_PASSWORD"));
        }

        Ok(())
    }
}
