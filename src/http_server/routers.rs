mod app;
mod deploy;
mod jobs;

pub use self::app::AppRouter;

use actix_web::web::ServiceConfig;

pub trait Router {
    fn register_routes(&self, service_config: &mut ServiceConfig);
}

pub fn configure_router<T: Router>(router: &T) -> impl FnOnce(&mut ServiceConfig) + '_ {
    |service_config| router.register_routes(service_config)
}
