use hyper::body::Incoming;
use hyper::service::Service;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::context::ApiContext;
use crate::routes;

type Body = http_body_util::Full<hyper::body::Bytes>;
type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub struct ApiServer {
    context: Arc<ApiContext>,
}

impl ApiServer {
    pub fn new(context: ApiContext) -> Self {
        Self {
            context: Arc::new(context),
        }
    }

    /// Bind and start serving. Returns the bound address (useful with
    /// port 0) and the accept loop's task handle.
    pub async fn start(self, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>), BoxError> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("API server listening on {}", local_addr);

        let handle = tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                        continue;
                    }
                };
                let io = TokioIo::new(stream);
                let service = ApiService {
                    context: self.context.clone(),
                };

                tokio::spawn(async move {
                    if let Err(err) = hyper::server::conn::http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        debug!("error serving connection: {:?}", err);
                    }
                });
            }
        });

        Ok((local_addr, handle))
    }
}

#[derive(Clone)]
struct ApiService {
    context: Arc<ApiContext>,
}

impl Service<Request<Incoming>> for ApiService {
    type Response = Response<Body>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let context = self.context.clone();
        Box::pin(routes::route(context, req))
    }
}
