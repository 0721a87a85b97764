use super::{configure_router, deploy::DeployRouter, jobs::JobsRouter, Router};
use crate::{
    analytics::Analytics,
    artifacts::IpfsClient,
    chains::ChainRegistry,
    compiler::SolcCompiler,
    deployer::Deployer,
    http_server::handlers::status,
    imports::ImportResolver,
    settings::Settings,
    storage::InMemoryStorage,
    sweeper::Sweeper,
    verification::{EtherscanClient, VerificationManager},
};
use actix_web::web;
use anyhow::Context;
use ethers::signers::LocalWallet;
use std::{sync::Arc, time::Duration};

pub struct AppRouter {
    deploy: DeployRouter,
    jobs: JobsRouter,
    sweeper: Arc<Sweeper>,
    sweep_schedule: Option<String>,
}

impl AppRouter {
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let chains = ChainRegistry::from_settings(&settings.chains)?;
        if chains.is_empty() {
            tracing::warn!("no chains configured, deployments will fail pre-flight");
        }

        let import_client = http_client(settings.imports.request_timeout)?;
        let rpc_client = http_client(settings.deployer.request_timeout)?;
        let explorer_client = http_client(settings.sweeper.request_timeout)?;
        let ipfs_http_client = http_client(settings.ipfs.request_timeout)?;

        let wallet = settings
            .deployer
            .private_key
            .as_deref()
            .map(|key| key.trim_start_matches("0x").parse::<LocalWallet>())
            .transpose()
            .context("invalid deployer private key")?;

        let storage = Arc::new(InMemoryStorage::new());
        let analytics = match (settings.analytics.enabled, &settings.analytics.endpoint) {
            (true, Some(endpoint)) => Analytics::start(
                http_client(settings.analytics.request_timeout)?,
                endpoint.clone(),
                settings.analytics.queue_size,
            ),
            _ => Analytics::disabled(),
        };

        let deployer = Deployer::new(
            chains.clone(),
            ImportResolver::new(import_client, settings.imports.npm_cdn_url.clone()),
            SolcCompiler::new(settings.compiler.version.clone()),
            IpfsClient::new(ipfs_http_client, &settings.ipfs),
            storage.clone(),
            storage.clone(),
            analytics,
            wallet,
            rpc_client,
        );

        let manager = Arc::new(VerificationManager::new(Arc::new(EtherscanClient::new(
            explorer_client,
        ))));
        let sweeper = Arc::new(Sweeper::new(
            chains,
            manager,
            storage,
            settings.sweeper.backlog_warn_threshold,
        ));

        Ok(Self {
            deploy: DeployRouter::new(deployer),
            jobs: JobsRouter::new(sweeper.clone(), settings.sweeper.api_token.clone()),
            sweeper,
            sweep_schedule: settings
                .sweeper
                .enabled
                .then(|| settings.sweeper.schedule.clone()),
        })
    }

    pub fn sweeper(&self) -> &Arc<Sweeper> {
        &self.sweeper
    }

    pub fn sweep_schedule(&self) -> Option<&str> {
        self.sweep_schedule.as_deref()
    }
}

impl Router for AppRouter {
    fn register_routes(&self, service_config: &mut web::ServiceConfig) {
        service_config
            .route("/health", web::get().to(status::health))
            .service(
                web::scope("/api/v1")
                    .service(web::scope("/contracts").configure(configure_router(&self.deploy)))
                    .service(
                        web::scope("/verifications").configure(configure_router(&self.jobs)),
                    ),
            );
    }
}

fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("failed to build http client")
}
