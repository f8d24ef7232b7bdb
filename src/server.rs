use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use actix_web::{dev::Server, web, App, HttpRequest, HttpResponse, HttpServer};

use crate::config;
use crate::core::db::init_demo_data;
use crate::core::store::MemoryStore;

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request, Response};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            _ => Method::Get,
        };

        let mut builder = Request::builder();
        builder.method(method).uri(req.uri().to_string());

        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: &Response) -> actix_web::HttpResponse {
        let status = actix_web::http::StatusCode::from_u16(*spin_resp.status())
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = actix_web::HttpResponse::build(status);
        for (name, value) in spin_resp.headers() {
            if let Some(v) = value.as_str() {
                response.append_header((name.to_string(), v.to_string()));
            }
        }

        response.body(spin_resp.body().to_vec())
    }
}

async fn handle_all(req: HttpRequest, body: web::Bytes, store: web::Data<MemoryStore>) -> HttpResponse {
    let started = Instant::now();
    let spin_req = adapter::actix_to_spin_request(&req, body);
    let spin_resp = crate::handle_request(store.get_ref(), &spin_req);

    tracing::info!(
        method = %req.method(),
        path = %req.path(),
        status = *spin_resp.status(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request"
    );
    adapter::spin_to_actix_response(&spin_resp)
}

/// Starts serving on an already-bound listener; the returned server must be
/// awaited or spawned.
pub fn spawn(listener: TcpListener, store: Arc<MemoryStore>) -> std::io::Result<Server> {
    let data = web::Data::from(store);
    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::route().to(handle_all))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub async fn run() -> std::io::Result<()> {
    let store = Arc::new(MemoryStore::new());
    if config::seed_demo_data() {
        init_demo_data(store.as_ref()).map_err(std::io::Error::other)?;
    }

    let addr = config::bind_addr();
    let listener = TcpListener::bind(&addr)?;
    tracing::info!("Server listening on http://{}", addr);

    spawn(listener, store)?.await
}
