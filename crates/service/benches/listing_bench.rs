use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

use service::backend::repository::mock::MemoryBackend;
use service::backend::Collection;
use service::pager::{page_numbers_to_show, PAGE_DELTA};
use service::Storefront;

fn bench_listing(c: &mut Criterion) {
    let mem = MemoryBackend::new();
    mem.data.seed(
        Collection::Products,
        (1..=500).map(|i| json!({"id": i, "title": format!("Produto {i:03}"), "price": 10.0})),
    );
    let sf = Storefront::new(mem.backend(), &configs::AppConfig::default());
    let rt = tokio::runtime::Runtime::new().unwrap();
    // warm the cache outside the measured loop
    rt.block_on(sf.products.list_page(3, 12)).unwrap();

    c.bench_function("cached_product_page", |b| {
        b.iter(|| rt.block_on(sf.products.list_page(black_box(3), 12)).unwrap());
    });
}

fn bench_pager(c: &mut Criterion) {
    c.bench_function("pager_entries", |b| {
        b.iter(|| page_numbers_to_show(black_box(250), black_box(500), PAGE_DELTA));
    });
}

criterion_group!(benches, bench_listing, bench_pager);
criterion_main!(benches);
