use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use http::{Request, Response};
use micro_bencher::BodyCase;
use micro_filter::{
    Filter, HttpRequest, HttpResponse, RequestBody, ResponseBody, Server, handler_fn, request_filter_fn,
    response_filter_fn,
};
use micro_multipart::{MultipartConfig, StreamingBodyProcessor, chunk_channel};
use std::hint::black_box;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().expect("runtime should start")
}

fn chain_server(depth: usize) -> Server {
    let mut builder = Server::builder();
    for order in 0..depth {
        let order = i32::try_from(order).expect("depth fits in i32");
        builder = builder
            .filter(Filter::before(request_filter_fn(|_req: &mut HttpRequest| Ok(None)), order))
            .filter(Filter::after(response_filter_fn(|_req: &HttpRequest, _resp: &mut HttpResponse| Ok(())), order));
    }
    builder
        .handler(handler_fn(|_req: &HttpRequest| async { Ok(Response::new(ResponseBody::from("ok"))) }))
        .build()
        .expect("chain should build")
}

fn benchmark_filter_chain(criterion: &mut Criterion) {
    let rt = runtime();
    let mut group = criterion.benchmark_group("filter_chain");

    for depth in [0, 4, 16] {
        let server = chain_server(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &server, |b, server| {
            b.iter(|| {
                let request = Request::builder().uri("/bench").body(RequestBody::empty()).expect("valid request");
                black_box(rt.block_on(server.handle(request)));
            });
        });
    }

    group.finish();
}

fn create_body_cases() -> Vec<BodyCase> {
    vec![BodyCase::small("few_small_parts", 4, 4 * 1024), BodyCase::large("one_large_part", 1, 4 * 1024 * 1024)]
}

fn benchmark_multipart(criterion: &mut Criterion) {
    let rt = runtime();
    let config = MultipartConfig::default().with_max_file_size(8 * 1024 * 1024).with_max_request_size(16 * 1024 * 1024);
    let mut group = criterion.benchmark_group("multipart_processor");

    for case in create_body_cases() {
        group.throughput(Throughput::Bytes(case.total_size()));
        group.bench_with_input(BenchmarkId::from_parameter(case.name()), &case, |b, case| {
            b.iter(|| {
                rt.block_on(async {
                    let (publisher, source) = chunk_channel(16);
                    let events = case.events().into_iter().map(Ok::<_, micro_multipart::BodyError>);
                    let pump = tokio::spawn(publisher.pump(futures::stream::iter(events)));

                    let body = RequestBody::multipart(StreamingBodyProcessor::new(
                        Box::new(source) as Box<dyn micro_multipart::ChunkSource>,
                        config.clone(),
                    ));
                    let parts = body.collect_parts().await.expect("body should be valid");
                    pump.await.expect("pump should not panic").expect("pump should finish");
                    black_box(parts);
                });
            });
        });
    }

    group.finish();
}

criterion_group!(pipeline, benchmark_filter_chain, benchmark_multipart);
criterion_main!(pipeline);
