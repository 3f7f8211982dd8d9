use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use chrono::Utc;
use setu_auth::{Caller, Role};
use setu_catalog::{Category, Condition, ListingDetails};
use setu_core::{ProductId, UserId};
use setu_infra::services::{OrderLineRequest, PlaceOrderRequest};
use setu_infra::{EngineConfig, InMemoryMarketplace, in_memory_marketplace};
use setu_orders::{OrderNumberGenerator, PaymentMethod, ShippingAddress};

fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Bench Buyer".to_string(),
        phone: "9000000000".to_string(),
        address_line1: "1 Bench Street".to_string(),
        address_line2: None,
        city: "Chennai".to_string(),
        state: "TN".to_string(),
        pincode: "600001".to_string(),
    }
}

fn stocked(market: &InMemoryMarketplace, agency: &Caller, admin: &Caller, count: usize, quantity: u32) -> Vec<ProductId> {
    (0..count)
        .map(|i| {
            let product = market
                .catalog
                .list_product(
                    agency,
                    ListingDetails {
                        title: format!("Lot {i}"),
                        description: "Bulk seized goods".to_string(),
                        category: Category::Others,
                        original_price: 200,
                        selling_price: 120,
                        quantity,
                        condition: Condition::Good,
                        images: vec![],
                    },
                )
                .unwrap();
            market.catalog.approve_product(admin, product.id_typed()).unwrap();
            product.id_typed()
        })
        .collect()
}

fn setup(lines: usize) -> (InMemoryMarketplace, Caller, Vec<ProductId>) {
    let (market, _, _) = in_memory_marketplace(EngineConfig::default());
    let agency = Caller::new(UserId::new(), Role::Agency, "Bench Agency", "agency@bench.test");
    let admin = Caller::new(UserId::new(), Role::Admin, "Bench Admin", "admin@bench.test");
    let products = stocked(&market, &agency, &admin, lines, u32::MAX);
    let buyer = Caller::new(UserId::new(), Role::Customer, "Bench Buyer", "buyer@bench.test");
    (market, buyer, products)
}

fn request(products: &[ProductId]) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: products
            .iter()
            .map(|&product_id| OrderLineRequest { product_id, quantity: 1 })
            .collect(),
        shipping_address: address(),
        payment_method: PaymentMethod::Cod,
    }
}

fn bench_place_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_order");

    for lines in [1usize, 5, 20] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::new("lines", lines), &lines, |b, &lines| {
            let (market, buyer, products) = setup(lines);
            b.iter(|| {
                market
                    .orders
                    .create_order(&buyer, black_box(request(&products)))
                    .unwrap()
            });
        });
    }

    group.finish();
}

fn bench_place_and_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("place_and_cancel");

    group.bench_function("single_line", |b| {
        let (market, buyer, products) = setup(1);
        b.iter(|| {
            let order = market.orders.create_order(&buyer, request(&products)).unwrap();
            market
                .orders
                .cancel_order(&buyer, order.id_typed(), None)
                .unwrap()
        });
    });

    group.finish();
}

fn bench_order_numbers(c: &mut Criterion) {
    let generator = OrderNumberGenerator::new();
    let now = Utc::now();

    c.bench_function("order_number_same_millisecond", |b| {
        b.iter(|| generator.next(black_box(now)))
    });
}

criterion_group!(
    benches,
    bench_place_order,
    bench_place_and_cancel,
    bench_order_numbers
);
criterion_main!(benches);
