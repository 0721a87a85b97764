use super::Router;
use crate::{
    http_server::handlers::jobs::{self, JobsAuth},
    sweeper::Sweeper,
};
use actix_web::web;
use std::sync::Arc;

pub struct JobsRouter {
    sweeper: web::Data<Sweeper>,
    auth: web::Data<JobsAuth>,
}

impl JobsRouter {
    pub fn new(sweeper: Arc<Sweeper>, api_token: Option<String>) -> Self {
        Self {
            sweeper: web::Data::from(sweeper),
            auth: web::Data::new(JobsAuth { token: api_token }),
        }
    }
}

impl Router for JobsRouter {
    fn register_routes(&self, service_config: &mut web::ServiceConfig) {
        service_config
            .app_data(self.sweeper.clone())
            .app_data(self.auth.clone())
            .route("/sweep", web::post().to(jobs::sweep));
    }
}
