use http::{HeaderValue, Request, Response};
use micro_filter::{
    ExecutorConfig, Filter, FilterOrder, FilterRegistration, HttpRequest, HttpResponse, RequestBody, ResponseBody, Server,
    ServerConfig, handler_fn, init_logging, request_filter_fn, response_filter_fn,
};
use tracing::{Level, info};

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging(Level::INFO) {
        eprintln!("failed to init logging: {}", e);
    }

    // runs off the transport threads, like a blocking trace lookup would
    let trace_request = request_filter_fn(|req: &mut HttpRequest| {
        info!(path = req.uri().path(), thread = ?std::thread::current().name(), "trace request");
        Ok(None)
    });
    let trace_response = response_filter_fn(|_req: &HttpRequest, resp: &mut HttpResponse| {
        resp.headers_mut().insert("x-trace-enabled", HeaderValue::from_static("true"));
        Ok(())
    });

    let config = ServerConfig::default().with_executor("blocking", ExecutorConfig { worker_threads: 2 });
    let server = Server::builder()
        .filter(
            FilterRegistration::new(Filter::before(trace_request, FilterOrder::Fixed(0)))
                .pattern("/hello/{*rest}")
                .on_executor("blocking"),
        )
        .filter(FilterRegistration::new(Filter::after(trace_response, FilterOrder::Fixed(0))).pattern("/hello/{*rest}"))
        .handler(handler_fn(|req: &HttpRequest| {
            let path = req.uri().path().to_owned();
            async move { Ok(Response::new(ResponseBody::from(format!("hello from {path}\r\n")))) }
        }))
        .config(config)
        .build();

    let server = match server {
        Ok(server) => server,
        Err(e) => {
            eprintln!("failed to build server: {}", e);
            return;
        }
    };

    for uri in ["/hello/world", "/other"] {
        let request = match Request::builder().uri(uri).body(RequestBody::empty()) {
            Ok(request) => request,
            Err(e) => {
                eprintln!("invalid request: {}", e);
                continue;
            }
        };

        let response = server.handle(request).await;
        println!("{} -> {} (x-trace-enabled: {:?})", uri, response.status(), response.headers().get("x-trace-enabled"));
    }
}
