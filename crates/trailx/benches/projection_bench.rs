//! 🏎️ How fast does one object turn into rows? Plain JSON vs gzip, small vs chunky.

use std::hint::black_box;
use std::io::Write;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};
use trailx::extract::{decode_records, project_record};

fn a_record(i: usize) -> Value {
    json!({
        "eventVersion": "1.05",
        "eventTime": "2020-03-01T00:00:00Z",
        "userIdentity": {
            "type": "IAMUser",
            "principalId": format!("AIDA{i:012}"),
            "arn": format!("arn:aws:iam::123456789012:user/user-{i}"),
            "accountId": "123456789012"
        },
        "eventSource": "s3.amazonaws.com",
        "eventName": "GetObject",
        "awsRegion": "us-east-1",
        "sourceIPAddress": "203.0.113.7",
        "userAgent": "aws-cli/2.0.0 Python/3.7.4 Linux/4.14.158",
        "requestParameters": { "bucketName": "logs", "key": format!("obj/{i}") },
        "responseElements": null,
        "requestID": format!("{i:016X}"),
        "eventID": format!("{i:08x}-0000-0000-0000-000000000000"),
        "readOnly": true,
        "eventType": "AwsApiCall"
    })
}

fn a_document(records: usize) -> Vec<u8> {
    let records: Vec<Value> = (0..records).map(a_record).collect();
    json!({ "Records": records }).to_string().into_bytes()
}

fn gzipped(raw: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(raw).expect("💀 gzip into a Vec cannot fail");
    encoder.finish().expect("💀 gzip into a Vec cannot fail")
}

fn benchmark_project_record(c: &mut Criterion) {
    let the_record = a_record(42);
    c.bench_function("project_record", |b| {
        b.iter(|| project_record(black_box(&the_record)))
    });
}

fn benchmark_decode_records(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_records");

    for records in [10usize, 100, 1000] {
        let plain = a_document(records);
        let zipped = gzipped(&plain);
        group.throughput(Throughput::Elements(records as u64));

        group.bench_with_input(BenchmarkId::new("plain", records), &plain, |b, body| {
            b.iter(|| decode_records("bench.json", black_box(body)))
        });
        group.bench_with_input(BenchmarkId::new("gzip", records), &zipped, |b, body| {
            b.iter(|| decode_records("bench.json.gz", black_box(body)))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_project_record, benchmark_decode_records);
criterion_main!(benches);
