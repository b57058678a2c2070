//! Shared application state for the axum router.

use std::sync::Arc;

use anyhow::Context;
use edge_cache::CachePolicyRouter;
use edge_core::{AppConfig, Region, StoreBackend, HEALTH_KEY};
use edge_data::{DependencyTag, FetchClient, RemoteWeather, WeatherProxy, WeatherSource};
use edge_store::{
    FailoverCoordinator, HealthProbe, HealthRegistry, InMemoryStore, SharedStore, TimedStore,
};

use crate::counter::CounterService;
use crate::dashboard::DashboardAggregator;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub cache_router: CachePolicyRouter,
    /// Owns the active-region state; the only writer of it.
    pub coordinator: Arc<FailoverCoordinator>,
    pub registry: Arc<HealthRegistry>,
    /// Not running until [`HealthProbe::spawn`] is called on it.
    pub probe: Arc<HealthProbe>,
    pub counter: CounterService,
    pub dashboard: DashboardAggregator,
    pub weather: Arc<WeatherProxy>,
}

impl AppState {
    /// Wire the components over the given regional stores.
    ///
    /// Request-path calls go through a [`TimedStore`] with the configured
    /// store timeout; the probe applies its own deadline.
    pub fn new(
        config: AppConfig,
        primary: SharedStore,
        dr: SharedStore,
        weather: Arc<dyn WeatherSource>,
    ) -> Self {
        let registry = Arc::new(HealthRegistry::new(Region::ALL));

        let probe = Arc::new(
            HealthProbe::new(
                vec![Arc::clone(&primary), Arc::clone(&dr)],
                Arc::clone(&registry),
                HEALTH_KEY,
            )
            .with_interval(config.health_check_interval())
            .with_timeout(config.health_check_timeout()),
        );

        let timed_primary: SharedStore = Arc::new(TimedStore::new(primary, config.store_timeout()));
        let timed_dr: SharedStore = Arc::new(TimedStore::new(dr, config.store_timeout()));
        let coordinator = Arc::new(
            FailoverCoordinator::new(timed_primary, timed_dr, Arc::clone(&registry))
                .with_failback_threshold(config.failback_threshold)
                .with_health_checker(Arc::clone(&probe)),
        );

        let counter = CounterService::new(Arc::clone(&coordinator));
        let dashboard = DashboardAggregator::new(
            counter.clone(),
            Arc::clone(&registry),
            config.region_name(Region::Primary),
            config.region_name(Region::Dr),
        );
        let weather = Arc::new(WeatherProxy::new(
            weather,
            config.weather_default_city.clone(),
            config.weather_cache_ttl(),
        ));

        Self {
            config: Arc::new(config),
            cache_router: CachePolicyRouter::default(),
            coordinator,
            registry,
            probe,
            counter,
            dashboard,
            weather,
        }
    }

    /// Build the state for the configured store backend.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let (primary, dr) = connect_stores(&config).await?;

        let client = FetchClient::new(DependencyTag::Weather)
            .context("Failed to build weather client")?;
        let weather: Arc<dyn WeatherSource> =
            Arc::new(RemoteWeather::new(client, config.weather_api_url.clone()));

        tracing::info!(
            backend = ?config.store_backend,
            table = %config.counter_table,
            primary = %config.primary_region,
            dr = %config.dr_region,
            "Regional stores ready"
        );

        Ok(Self::new(config, primary, dr, weather))
    }

    /// Configured identifier of `region`.
    pub fn region_name(&self, region: Region) -> &str {
        self.config.region_name(region)
    }
}

async fn connect_stores(config: &AppConfig) -> anyhow::Result<(SharedStore, SharedStore)> {
    match config.store_backend {
        StoreBackend::Memory => {
            let primary = InMemoryStore::new(Region::Primary, config.counter_table.clone());
            let dr: SharedStore = Arc::new(primary.replica(Region::Dr));
            let primary: SharedStore = Arc::new(primary);
            Ok((primary, dr))
        }
        #[cfg(feature = "redis")]
        StoreBackend::Redis => {
            let mut stores = Vec::with_capacity(2);
            for region in Region::ALL {
                let url = config
                    .store_url(region)
                    .with_context(|| format!("No store URL configured for {region}"))?;
                let store = edge_store::RedisStore::new(url, &config.counter_table, region)
                    .with_context(|| format!("Invalid {region} store URL"))?;
                stores.push(Arc::new(store) as SharedStore);
            }
            let dr = stores.pop().context("DR store missing")?;
            let primary = stores.pop().context("Primary store missing")?;
            Ok((primary, dr))
        }
        #[cfg(not(feature = "redis"))]
        StoreBackend::Redis => {
            anyhow::bail!("Redis backend requested but server-clock was built without the `redis` feature")
        }
    }
}
