use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server};
use prometheus::{Encoder, TextEncoder};
use std::convert::Infallible;
use tracing::info;

/// Serves the process's registered Prometheus metrics as plain text over
/// HTTP. One GET handler regardless of path; this is a metrics scrape
/// endpoint, not a general-purpose API.
pub struct PrometheusServer {
    listen_addr: String,
}

impl PrometheusServer {
    pub fn new(listen_addr: String) -> PrometheusServer {
        PrometheusServer { listen_addr }
    }

    pub async fn run(&self) -> crate::Result<()> {
        let addr = self.listen_addr.parse()?;
        info!(%addr, "prometheus server listening");

        let make_svc = make_service_fn(|_conn| async {
            Ok::<_, Infallible>(service_fn(serve_metrics))
        });

        Server::bind(&addr).serve(make_svc).await?;
        Ok(())
    }
}

async fn serve_metrics(_req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    encoder.encode(&metric_families, &mut buffer).unwrap();
    Ok(Response::new(Body::from(buffer)))
}
