//! Benchmarks for dbscope

use criterion::{criterion_group, criterion_main, Criterion};
use dbscope::backends::DefaultFactory;
use dbscope::{ConnectOptions, ConnectionHandler, DatabaseUrl};
use std::hint::black_box;

fn bench_url_parse(c: &mut Criterion) {
    c.bench_function("url_parse", |b| {
        b.iter(|| DatabaseUrl::parse(black_box("postgresql+psycopg://app:pw@db:5432/orders")));
    });
}

fn bench_sqlite_memory_lifecycle(c: &mut Criterion) {
    let url = DatabaseUrl::parse("sqlite://").unwrap();
    c.bench_function("sqlite_memory_connect_close", |b| {
        b.iter(|| {
            let mut handler = ConnectionHandler::new(url.clone(), DefaultFactory)
                .with_connect_options(ConnectOptions::new().with("foreign_keys", true));
            handler.connect().unwrap();
            handler.close().unwrap();
        });
    });
}

criterion_group!(benches, bench_url_parse, bench_sqlite_memory_lifecycle);
criterion_main!(benches);
