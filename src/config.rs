// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, sync::Arc, time::Duration};

use crate::{
    db::{AdminRepository, LeadEventRepository, LeadRepository},
    middleware::rate_limit::RateLimiter,
    models::admin::{permissions_for_role, AdminRole},
    services::{
        auth::AuthService,
        events::{EventLogger, PgEventSink},
        leads::{LeadService, WorkflowPolicy},
        notifications::{Notifier, SmtpConfig},
        payments::{PaymentConfig, PaymentService},
        roles::RoleResolver,
    },
};

/// Everything read from the environment, collected in one place.
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,

    pub rate_limit_max: u32,
    pub rate_limit_window_secs: u64,

    pub workflow: WorkflowPolicy,

    pub payment: Option<PaymentConfig>,
    pub smtp: Option<SmtpConfig>,

    pub bootstrap_admin: Option<(String, String)>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET must be set"))?;

        let port = env_parse("PORT", 3000_u16)?;

        let workflow = WorkflowPolicy {
            strict_transitions: env_bool("STRICT_STATUS_TRANSITIONS", false),
            traiteur_can_update_status: env_bool("TRAITEUR_STATUS_UPDATES", true),
        };

        // Payments are optional: all three values or nothing.
        let payment = match (
            env::var("PAYMENT_API_URL").ok(),
            env::var("PAYMENT_API_KEY").ok(),
            env::var("PAYMENT_WEBHOOK_SECRET").ok(),
        ) {
            (Some(base_url), Some(api_key), Some(webhook_secret)) => Some(PaymentConfig {
                base_url,
                api_key,
                webhook_secret,
            }),
            (None, None, None) => None,
            _ => {
                anyhow::bail!(
                    "PAYMENT_API_URL, PAYMENT_API_KEY and PAYMENT_WEBHOOK_SECRET must be set together"
                )
            }
        };

        let smtp = match (env::var("SMTP_HOST").ok(), env::var("SMTP_FROM").ok()) {
            (Some(host), Some(from)) => Some(SmtpConfig {
                host,
                port: env_parse("SMTP_PORT", 587_u16)?,
                user: env::var("SMTP_USER").ok(),
                password: env::var("SMTP_PASSWORD").ok(),
                from,
                internal_recipient: env::var("LEADS_NOTIFY_EMAIL").ok(),
            }),
            _ => None,
        };

        let bootstrap_admin = match (
            env::var("ADMIN_BOOTSTRAP_EMAIL").ok(),
            env::var("ADMIN_BOOTSTRAP_PASSWORD").ok(),
        ) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            rate_limit_max: env_parse("LEAD_RATE_LIMIT", 5_u32)?,
            rate_limit_window_secs: env_parse("LEAD_RATE_LIMIT_WINDOW_SECS", 60_u64)?,
            workflow,
            payment,
            smtp,
            bootstrap_admin,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,

    pub auth_service: AuthService,
    pub role_resolver: RoleResolver,
    pub lead_service: LeadService,
    pub admin_repo: AdminRepository,

    pub payments: Option<PaymentService>,
    pub notifier: Option<Notifier>,
    pub rate_limiter: RateLimiter,

    pub port: u16,
    bootstrap: Option<(String, String)>,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("database connection established");

        // Dependency graph
        let admin_repo = AdminRepository::new(db_pool.clone());
        let lead_repo = LeadRepository::new(db_pool.clone());
        let event_repo = LeadEventRepository::new(db_pool.clone());

        let event_logger = EventLogger::new(Arc::new(PgEventSink::new(event_repo.clone())));

        let auth_service = AuthService::new(admin_repo.clone(), config.jwt_secret.clone());
        let role_resolver = RoleResolver::new(admin_repo.clone());
        let lead_service = LeadService::new(
            lead_repo.clone(),
            admin_repo.clone(),
            event_repo,
            event_logger.clone(),
            config.workflow,
        );

        let payments = match &config.payment {
            Some(payment_config) => Some(PaymentService::new(
                payment_config.clone(),
                lead_repo,
                event_logger,
            )?),
            None => {
                tracing::warn!("payment provider not configured; checkout routes disabled");
                None
            }
        };

        let notifier = config.smtp.as_ref().and_then(Notifier::from_config);
        if notifier.is_none() {
            tracing::warn!("SMTP not configured; lead notifications disabled");
        }

        let rate_limiter = RateLimiter::new(
            config.rate_limit_max,
            Duration::from_secs(config.rate_limit_window_secs),
        );

        Ok(Self {
            db_pool,
            auth_service,
            role_resolver,
            lead_service,
            admin_repo,
            payments,
            notifier,
            rate_limiter,
            port: config.port,
            bootstrap: config.bootstrap_admin,
        })
    }

    /// Seed one superadmin from the environment when the operator table is
    /// empty. Regular provisioning happens out of band; without this a fresh
    /// deployment has no way to log in.
    pub async fn bootstrap_admin(&self) -> anyhow::Result<()> {
        let Some((email, password)) = &self.bootstrap else {
            return Ok(());
        };

        if self.admin_repo.count().await? > 0 {
            return Ok(());
        }

        let password_hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
        let role = AdminRole::Superadmin;
        self.admin_repo
            .create(email, &password_hash, role, permissions_for_role(role))
            .await?;

        tracing::info!(email = %email, "bootstrap superadmin created");
        Ok(())
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} is not a valid value")),
        Err(_) => Ok(default),
    }
}
