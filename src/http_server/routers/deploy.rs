use super::Router;
use crate::{deployer::Deployer, http_server::handlers::deploy};
use actix_web::web;

pub struct DeployRouter {
    deployer: web::Data<Deployer>,
}

impl DeployRouter {
    pub fn new(deployer: Deployer) -> Self {
        Self {
            deployer: web::Data::new(deployer),
        }
    }
}

impl Router for DeployRouter {
    fn register_routes(&self, service_config: &mut web::ServiceConfig) {
        service_config
            .app_data(self.deployer.clone())
            .route("/deploy", web::post().to(deploy::deploy));
    }
}
