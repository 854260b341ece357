//! HTTP Ingress - the transport entry point.
//!
//! An accept-loop server on hyper 1.0, one task per connection. Routing is
//! resolved against the matchit table; everything behind it speaks the
//! tagged service result. `into_raw_service()` exposes the same pipeline as
//! a Tower `Service` for embedding in an existing stack.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tower::Service;
use tracing::Instrument;

use formway_service::{NavigationService, QuestionnaireService, ServiceError};
use formway_store::QuestionnaireStore;

use crate::dto::ErrorBody;
use crate::error::IngressError;
use crate::routes::{dispatch, router, RouteTable};

/// Shared per-process state: the services over one store.
pub struct AppState<S> {
    pub questionnaires: QuestionnaireService<S>,
    pub navigation: NavigationService<S>,
    store: Arc<S>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            questionnaires: self.questionnaires.clone(),
            navigation: self.navigation.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S: QuestionnaireStore> AppState<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            questionnaires: QuestionnaireService::new(store.clone()),
            navigation: NavigationService::new(store.clone()),
            store,
        }
    }

    /// Store health, surfaced by `GET /health`.
    pub async fn ping(&self) -> Result<(), ServiceError> {
        self.store.ping().await.map_err(Into::into)
    }
}

/// HTTP ingress builder.
pub struct HttpIngress<S> {
    addr: Option<String>,
    state: Arc<AppState<S>>,
}

impl<S: QuestionnaireStore> HttpIngress<S> {
    pub fn new(state: AppState<S>) -> Self {
        Self {
            addr: None,
            state: Arc::new(state),
        }
    }

    /// Set the bind address for the server.
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.addr = Some(addr.into());
        self
    }

    /// Run the accept loop until the listener fails.
    pub async fn run(self) -> Result<(), IngressError> {
        let addr_str = self.addr.as_deref().unwrap_or("127.0.0.1:3000");
        let addr: SocketAddr = addr_str.parse().map_err(|e| IngressError::InvalidAddr {
            addr: addr_str.to_string(),
            reason: format!("{e}"),
        })?;

        let table = Arc::new(router()?);
        let state = self.state;

        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Formway HTTP ingress listening on http://{}", addr);

        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);

            let table = table.clone();
            let state = state.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<Incoming>| {
                    let table = table.clone();
                    let state = state.clone();
                    async move {
                        Ok::<_, Infallible>(serve_request(&state, &table, req).await)
                    }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::error!("Error serving connection: {:?}", err);
                }
            });
        }
    }

    /// Convert to a raw Tower Service for integration with existing Tower
    /// stacks.
    pub fn into_raw_service(self) -> Result<RawIngressService<S>, IngressError> {
        Ok(RawIngressService {
            table: Arc::new(router()?),
            state: self.state,
        })
    }
}

/// Route, dispatch, and answer one request.
pub async fn serve_request<S: QuestionnaireStore>(
    state: &AppState<S>,
    table: &RouteTable,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = uuid::Uuid::new_v4().to_string();
    let span = tracing::info_span!(
        "HTTPRequest",
        formway.http.method = %method,
        formway.http.path = %path,
        formway.http.request_id = %request_id
    );

    async move {
        match table.at(&path) {
            Ok(matched) => {
                let param = matched.params.get("id").map(str::to_string);
                match matched.value.iter().find(|(m, _)| *m == method) {
                    Some((_, endpoint)) => dispatch(state, *endpoint, param, req).await,
                    None => plain_error(
                        StatusCode::METHOD_NOT_ALLOWED,
                        "method_not_allowed",
                        format!("{method} is not allowed on {path}"),
                    ),
                }
            }
            Err(_) => plain_error(
                StatusCode::NOT_FOUND,
                "not_found",
                format!("no route for {path}"),
            ),
        }
    }
    .instrument(span)
    .await
}

fn plain_error(status: StatusCode, kind: &str, message: String) -> Response<Full<Bytes>> {
    let body = ErrorBody {
        error: kind.to_string(),
        message,
    };
    let bytes = serde_json::to_vec(&body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(bytes)))
        .unwrap()
}

/// Internal service type for `into_raw_service()`.
pub struct RawIngressService<S> {
    table: Arc<RouteTable>,
    state: Arc<AppState<S>>,
}

impl<S> Clone for RawIngressService<S> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            state: self.state.clone(),
        }
    }
}

impl<S: QuestionnaireStore> Service<Request<Incoming>> for RawIngressService<S> {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Incoming>) -> Self::Future {
        let table = self.table.clone();
        let state = self.state.clone();

        Box::pin(async move { Ok(serve_request(&state, &table, req).await) })
    }
}
