use std::sync::Arc;

use marquee::auth::GoTrueClient;
use marquee::data::RestClient;
use marquee::middleware::{LocaleResolver, Matcher, Pipeline, SessionRefresher};
use marquee::pages::{self, App};
use marquee::{Config, Gateway, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), marquee::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    info!(
        addr = %config.addr,
        max_body_bytes = config.max_body_bytes,
        backend = %config.backend.url,
        default_locale = %config.locale.default,
        "configuration loaded"
    );

    let backend = &config.backend;
    let auth = Arc::new(GoTrueClient::new(&backend.url, &backend.anon_key, backend.timeout)?);
    let data = Arc::new(RestClient::new(&backend.url, &backend.anon_key, backend.timeout)?);

    let pipeline = Pipeline::standard(
        LocaleResolver::new(config.locale.clone()),
        SessionRefresher::new(auth.clone(), config.session.clone()),
    );
    let server = Server::bind(config.addr).max_body_bytes(config.max_body_bytes);
    let router = pages::routes(Arc::new(App::new(auth, data, config)));
    let gateway = Gateway::new(router).pipeline(pipeline).matcher(Matcher::default());

    server.serve(gateway).await
}
