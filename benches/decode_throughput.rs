use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use dashboard_ingest::DatasetKind;
use dashboard_ingest::decoder::{FieldRules, decode_record, split_fields};
use dashboard_ingest::parser::ParseJob;
use std::hint::black_box;
use std::sync::atomic::AtomicBool;

const BAR_HEADER: &str =
    "transactionId,transactionDate,productName,productCategory,eventName,count,unitValue,discountValue,isRefunded";

/// Bar export with `rows` data lines, every tenth one carrying malformed numbers
fn bar_payload(rows: usize) -> String {
    let mut payload = String::with_capacity(rows * 96);
    payload.push_str(BAR_HEADER);
    payload.push('\n');
    for i in 0..rows {
        if i % 10 == 0 {
            payload.push_str(&format!(
                "tx-{i},2025-03-0{},\"Combo, grande\",Bebidas,Festival,,n/a,,TRUE\n",
                i % 9 + 1
            ));
        } else {
            payload.push_str(&format!(
                "tx-{i},2025-03-0{},Cerveja,Bebidas,Festival,{},{}.50,0,false\n",
                i % 9 + 1,
                i % 4 + 1,
                i % 30
            ));
        }
    }
    payload
}

fn bench_single_row(c: &mut Criterion) {
    let headers = split_fields(BAR_HEADER);
    let rules = FieldRules::for_kind(DatasetKind::Bar);
    let line = "tx-42,2025-03-01,\"Combo, grande\",Bebidas,Festival,3,12.50,1.5,false";

    c.bench_function("split_and_decode_row", |b| {
        b.iter(|| {
            let fields = split_fields(black_box(line));
            black_box(decode_record(&headers, &fields, &rules))
        })
    });
}

fn bench_parse_job(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_job");
    for rows in [1_000usize, 10_000, 100_000] {
        let payload = bar_payload(rows);
        let job = ParseJob::new(DatasetKind::Bar, FieldRules::for_kind(DatasetKind::Bar), 1000);
        let cancel = AtomicBool::new(false);

        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &payload, |b, payload| {
            b.iter(|| black_box(job.run(payload, &cancel, |_| {})))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_row, bench_parse_job);
criterion_main!(benches);
