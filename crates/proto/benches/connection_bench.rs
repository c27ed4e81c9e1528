//! Connection Layer Benchmarks
//!
//! Benchmarks for the inbound packet path (header parsing and NAT-T
//! demultiplexing) and NAT detection hashing.
//!
//! Run with: `cargo bench --features ipsec --bench connection_bench`

#![cfg(feature = "ipsec")]

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ikelink_proto::ipsec::{
    connection::{demultiplex, ResolvedAddresses, SocketKind},
    ikev2::{ExchangeType, IkeFlags, IkeHeader, IKE_HEADER_SIZE},
    nat::{NatDetectionHash, NON_ESP_MARKER},
};
use rand::RngCore;
use std::net::IpAddr;

/// Create an IKE message with `payload_len` random payload bytes
fn create_test_message(payload_len: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    let header = IkeHeader {
        initiator_spi: rng.next_u64(),
        responder_spi: rng.next_u64(),
        next_payload: 33,
        exchange_type: ExchangeType::IkeSaInit,
        flags: IkeFlags::new(IkeFlags::RESPONSE),
        message_id: 0,
        length: (IKE_HEADER_SIZE + payload_len) as u32,
    };

    let mut payload = vec![0u8; payload_len];
    rng.fill_bytes(&mut payload);

    let mut message = header.to_bytes().to_vec();
    message.extend_from_slice(&payload);
    message
}

/// Benchmark IKE header parsing
fn bench_header_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("ike_header");
    let message = create_test_message(0);

    group.bench_function("from_bytes", |b| {
        b.iter(|| black_box(IkeHeader::from_bytes(black_box(&message)).unwrap()))
    });

    group.finish();
}

/// Benchmark inbound demultiplexing per socket kind
fn bench_demultiplex(c: &mut Criterion) {
    let mut group = c.benchmark_group("demultiplex");

    for size in [64usize, 512, 1500] {
        let plain = create_test_message(size - IKE_HEADER_SIZE);
        let mut framed = NON_ESP_MARKER.to_vec();
        framed.extend_from_slice(&plain);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(format!("plain_{}bytes", size), |b| {
            b.iter(|| black_box(demultiplex(SocketKind::PlainV4, black_box(&plain)).unwrap()))
        });
        group.bench_function(format!("encap_{}bytes", size), |b| {
            b.iter(|| black_box(demultiplex(SocketKind::EncapV4, black_box(&framed)).unwrap()))
        });
    }

    let esp = [0x00, 0x00, 0x10, 0x01, 0xAA, 0xBB, 0xCC, 0xDD];
    group.bench_function("encap_esp_skip", |b| {
        b.iter(|| black_box(demultiplex(SocketKind::EncapV4, black_box(&esp)).unwrap()))
    });

    group.finish();
}

/// Benchmark NAT detection hash computation
fn bench_nat_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("nat_detection");
    let v4: IpAddr = "192.168.1.2".parse().unwrap();
    let v6: IpAddr = "2001:db8::1".parse().unwrap();

    group.bench_function("hash_ipv4", |b| {
        b.iter(|| black_box(NatDetectionHash::compute(1, 2, black_box(v4), 4500)))
    });
    group.bench_function("hash_ipv6", |b| {
        b.iter(|| black_box(NatDetectionHash::compute(1, 2, black_box(v6), 4500)))
    });

    group.finish();
}

/// Benchmark splitting a DNS answer by family
fn bench_resolved_addresses(c: &mut Criterion) {
    let answer: Vec<IpAddr> = (0..16u8)
        .map(|i| {
            if i % 2 == 0 {
                IpAddr::from([10, 0, 0, i])
            } else {
                IpAddr::from([0x2001, 0xdb8, 0, 0, 0, 0, 0, u16::from(i)])
            }
        })
        .collect();

    c.bench_function("resolved_addresses_from_16", |b| {
        b.iter(|| black_box(ResolvedAddresses::from_addrs(black_box(answer.iter().copied()))))
    });
}

criterion_group!(
    benches,
    bench_header_parse,
    bench_demultiplex,
    bench_nat_detection,
    bench_resolved_addresses,
);

criterion_main!(benches);
