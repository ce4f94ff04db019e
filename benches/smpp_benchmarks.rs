// ABOUTME: Benchmark suite for the SMPP engine's hot paths
// ABOUTME: Measures framing, PDU encode and decode, character encoding and segmentation

use bytes::BytesMut;
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use smpp_engine::datatypes::*;
use smpp_engine::encoding;
use smpp_engine::frame::Frame;
use smpp_engine::pdu::{Pdu, PduBody};
use smpp_engine::segmentation::{SegmentationMethod, split_message};
use std::io::Cursor;
use std::time::Duration;

fn create_sample_submit_sm() -> Pdu {
    let mut submit = SubmitSm::new(
        Address::international("447700900123"),
        Address::international("447700900456"),
        "Hello World",
    );
    submit.registered_delivery = REGISTERED_DELIVERY_RECEIPT;
    submit.optional.set_user_message_reference(42);
    Pdu::new(1, PduBody::SubmitSm(Box::new(submit)))
}

fn create_sample_deliver_sm() -> Pdu {
    let mut deliver = DeliverSm::new(
        Address::international("447700900456"),
        Address::international("447700900123"),
        "id:253092914522667372 sub:001 dlvrd:001 submit date:2410181200 done date:2410181201 stat:DELIVRD err:000 text:Hello World",
    );
    deliver.esm_class = deliver
        .esm_class
        .with_message_type(MessageType::DeliveryReceipt);
    deliver.optional.set_receipted_message_id("253092914522667372");
    deliver.optional.set_message_state(MessageState::Delivered);
    Pdu::new(1, PduBody::DeliverSm(Box::new(deliver)))
}

fn create_sample_bind_transmitter() -> Pdu {
    Pdu::new(1, PduBody::BindTransmitter(Bind::new("test_system", "password")))
}

fn create_frame_bytes(pdu: &Pdu) -> Vec<u8> {
    pdu.encode().unwrap().to_vec()
}

fn bench_frame_check(c: &mut Criterion) {
    let frame_bytes = create_frame_bytes(&create_sample_submit_sm());

    let mut group = c.benchmark_group("frame_check");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("submit_sm", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(frame_bytes.as_slice()));
            Frame::check(&mut cursor)
        })
    });

    let enquire_frame_bytes = create_frame_bytes(&Pdu::new(1, PduBody::EnquireLink));

    group.bench_function("enquire_link", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(enquire_frame_bytes.as_slice()));
            Frame::check(&mut cursor)
        })
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    group.measurement_time(Duration::from_secs(10));
    let registry = TagRegistry::standard();

    let samples = [
        ("submit_sm", create_sample_submit_sm()),
        ("deliver_sm", create_sample_deliver_sm()),
        ("bind_transmitter", create_sample_bind_transmitter()),
        ("enquire_link", Pdu::new(1, PduBody::EnquireLink)),
    ];

    for (name, pdu) in &samples {
        let frame_bytes = create_frame_bytes(pdu);
        group.bench_function(*name, |b| {
            b.iter(|| Pdu::decode(black_box(frame_bytes.as_slice()), registry).unwrap())
        });
    }

    // Framing and decoding together, as the session reader does it
    let frame_bytes = create_frame_bytes(&create_sample_deliver_sm());
    group.bench_function("deliver_sm_from_stream", |b| {
        b.iter(|| {
            let mut buffer = BytesMut::from(black_box(frame_bytes.as_slice()));
            let frame = Frame::parse(&mut buffer).unwrap().unwrap();
            frame.decode(registry).unwrap()
        })
    });

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    group.measurement_time(Duration::from_secs(10));

    let submit_sm = create_sample_submit_sm();
    group.bench_function("submit_sm", |b| b.iter(|| black_box(&submit_sm).encode()));

    let deliver_sm = create_sample_deliver_sm();
    group.bench_function("deliver_sm", |b| b.iter(|| black_box(&deliver_sm).encode()));

    let bind_tx = create_sample_bind_transmitter();
    group.bench_function("bind_transmitter", |b| {
        b.iter(|| black_box(&bind_tx).encode())
    });

    // Fixed buffer, no allocation
    let mut buffer = [0u8; 512];
    group.bench_function("submit_sm_to_slice", |b| {
        b.iter(|| black_box(&submit_sm).encode_to_slice(&mut buffer))
    });

    group.finish();
}

fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_sizes");
    group.measurement_time(Duration::from_secs(10));
    let registry = TagRegistry::standard();

    let message_sizes = [10, 50, 100, 160, 254]; // Common SMS message sizes

    for &size in &message_sizes {
        let submit = SubmitSm::new(
            Address::international("447700900123"),
            Address::international("447700900456"),
            "A".repeat(size),
        );
        let frame_bytes = create_frame_bytes(&Pdu::new(1, PduBody::SubmitSm(Box::new(submit))));

        group.bench_with_input(
            BenchmarkId::new("submit_sm_decode", size),
            &frame_bytes,
            |b, frame_bytes| b.iter(|| Pdu::decode(black_box(frame_bytes.as_slice()), registry)),
        );
    }

    group.finish();
}

fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");
    group.measurement_time(Duration::from_secs(10));

    for &length in &[160, 480, 1530] {
        let gsm = "Hello [world] ".repeat(length / 14 + 1);
        group.bench_with_input(BenchmarkId::new("gsm_udh", length), &gsm, |b, text| {
            b.iter(|| {
                split_message(
                    black_box(text),
                    DataCoding::SmscDefault,
                    SegmentationMethod::Udh,
                    7,
                )
            })
        });

        let ucs2 = "Привет мир ".repeat(length / 11 + 1);
        group.bench_with_input(BenchmarkId::new("ucs2_sar", length), &ucs2, |b, text| {
            b.iter(|| split_message(black_box(text), DataCoding::Ucs2, SegmentationMethod::Sar, 7))
        });
    }

    group.finish();
}

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    group.measurement_time(Duration::from_secs(10));

    let text = "Price: 10€ {approx} ~ see https://example.com/offer?id=42";
    group.bench_function("gsm_encode", |b| {
        b.iter(|| encoding::encode(black_box(text), DataCoding::SmscDefault))
    });
    group.bench_function("preferred_coding", |b| {
        b.iter(|| encoding::preferred_coding(black_box(text)))
    });

    let septets = encoding::encode(text, DataCoding::SmscDefault).unwrap();
    group.bench_function("gsm_decode", |b| {
        b.iter(|| encoding::decode(black_box(&septets), DataCoding::SmscDefault))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_frame_check,
    bench_decode,
    bench_encode,
    bench_message_sizes,
    bench_segmentation,
    bench_encoding
);
criterion_main!(benches);
