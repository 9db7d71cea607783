//! billing-api: user and service HTTP endpoints.

use std::error::Error;
use std::sync::Arc;

use subscription_billing::adapters::auth::{
    DebugSessionValidator, PublicKeyConfig, PublicKeyValidator,
};
use subscription_billing::adapters::entitlement::HttpEntitlementService;
use subscription_billing::adapters::http::{api_router, AuthState, BillingAppState};
use subscription_billing::adapters::postgres::{self, PostgresBillingRepository};
use subscription_billing::adapters::reliability::BackoffPolicy;
use subscription_billing::adapters::stripe::StripeGateway;
use subscription_billing::application::GatewayRegistry;
use subscription_billing::config::{AppConfig, AuthSettings, ValidationError};
use subscription_billing::domain::foundation::{AuthenticatedUser, UserId};
use subscription_billing::telemetry::{self, LogFormat};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    telemetry::init(
        &config.server.log_level,
        LogFormat::for_environment(&config.server.environment),
    );
    config.validate()?;

    let addr = config.server.socket_addr()?;
    let backoff = config.backoff.policy();

    let pool = postgres::connect(&config.database).await?;
    if config.database.run_migrations {
        postgres::run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let stripe = StripeGateway::new(config.stripe.gateway_config(backoff.clone()))?;
    let gateways = GatewayRegistry::new().with_gateway(Arc::new(stripe));

    let entitlements = HttpEntitlementService::new(
        config.entitlement.base_url.as_str(),
        config.entitlement.request_timeout(),
        backoff.clone(),
    )?;

    let state = BillingAppState {
        repository: Arc::new(PostgresBillingRepository::new(pool)),
        gateways,
        entitlements: Arc::new(entitlements),
    };
    let auth = auth_state(&config.auth, backoff)?;
    let app = api_router(state, auth, config.server.request_timeout());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        addr = %addr,
        environment = ?config.server.environment,
        debug_auth = config.auth.debug,
        "Billing API listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Billing API stopped");
    Ok(())
}

fn auth_state(settings: &AuthSettings, backoff: BackoffPolicy) -> Result<AuthState, Box<dyn Error>> {
    if settings.debug {
        let user = AuthenticatedUser::without_roles(UserId::new(settings.debug_user_id.as_str())?);
        tracing::warn!(user_id = %user.id, "Debug authentication enabled");
        let validator = Arc::new(DebugSessionValidator::new(user.clone()));
        return Ok(AuthState::debug(validator, user));
    }

    let pubkey_url = settings
        .pubkey_url
        .as_deref()
        .ok_or(ValidationError::MissingRequired("AUTH__PUBKEY_URL"))?;
    let validator = PublicKeyValidator::new(
        PublicKeyConfig::new(pubkey_url)
            .with_cache_duration(settings.pubkey_cache_duration())
            .with_backoff(backoff),
    )?;
    Ok(AuthState::new(Arc::new(validator)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Shutdown signal received");
}
