use bytes::BytesMut;
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use ice_agent::crypto::DefaultCrypto;
use ice_agent::stun::attributes::{Priority, UserName};
use ice_agent::stun::message::{Message, MessageEncoder};
use ice_agent::stun::methods::BINDING_REQUEST;
use ice_agent::stun::Attributes;

/// Builds a representative connectivity-check request (USERNAME + PRIORITY,
/// MESSAGE-INTEGRITY, FINGERPRINT) — the shape every connectivity check on
/// the wire takes.
fn sample(seed: u8) -> BytesMut {
    let token = [seed; 12];
    let mut bytes = BytesMut::with_capacity(128);
    let mut message = MessageEncoder::new(BINDING_REQUEST, &token, &mut bytes);
    message.append::<UserName>("remote:local");
    message.append::<Priority>(2_130_706_431);
    message.flush(&DefaultCrypto, Some(b"password")).unwrap();
    bytes
}

fn criterion_benchmark(c: &mut Criterion) {
    let samples: Vec<BytesMut> = (0..16u8).map(sample).collect();
    let mut cycle = samples.iter().cycle();

    let mut stun_criterion = c.benchmark_group("stun");
    stun_criterion.throughput(Throughput::Elements(1));

    stun_criterion.bench_function("decode_and_verify", |bencher| {
        bencher.iter(|| {
            let bytes = cycle.next().unwrap();
            let mut attrs = Attributes::default();
            let decoded = Message::decode(bytes, &mut attrs).unwrap();
            decoded.checksum(&DefaultCrypto, b"password").unwrap();
            decoded.verify_fingerprint(&DefaultCrypto).unwrap();
        })
    });

    stun_criterion.bench_function("encode", |bencher| {
        bencher.iter(|| sample(7))
    });

    stun_criterion.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
