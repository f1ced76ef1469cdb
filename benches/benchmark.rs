//! パフォーマンスベンチマーク
//!
//! 行フィルタ、区切り文字テキストの書き出し、ワークブック変換の処理速度を測定します。
//! ワークブックはベンチマーク開始時にrust_xlsxwriterで生成するため、フィクスチャは不要です。

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_xlsxwriter::Workbook;
use xlsxfilter::{filter_rows, DelimitedWriter, RawTable, SecurityConfig, WorkbookConverter};

const STATES: [&str; 4] = ["OK", "KO", "OK", "PENDING"];

/// `rows`行のデータを持つテーブル（ヘッダー付き）
fn synthetic_table(rows: usize) -> RawTable {
    let mut records = Vec::with_capacity(rows + 1);
    records.push(vec![
        "Id".to_string(),
        "Name".to_string(),
        "CSV_State".to_string(),
        "Comment".to_string(),
    ]);
    for i in 0..rows {
        records.push(vec![
            i.to_string(),
            format!("Customer {}", i),
            STATES[i % STATES.len()].to_string(),
            if i % 7 == 0 {
                "needs; quoting".to_string()
            } else {
                String::new()
            },
        ]);
    }
    RawTable::new(records)
}

/// メタデータ行付きのワークブックをメモリ上に生成
fn synthetic_workbook(rows: u32) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Export").unwrap();
    for (c, name) in ["Id", "Name", "CSV_State", "Amount"].iter().enumerate() {
        worksheet.write_string(1, c as u16, *name).unwrap();
    }
    for r in 0..rows {
        let row = r + 2;
        worksheet.write_number(row, 0, r as f64).unwrap();
        worksheet
            .write_string(row, 1, format!("Customer {}", r))
            .unwrap();
        worksheet
            .write_string(row, 2, STATES[r as usize % STATES.len()])
            .unwrap();
        worksheet.write_number(row, 3, r as f64 * 1.25).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

fn benchmark_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_rows");
    for rows in [1_000usize, 100_000] {
        let table = synthetic_table(rows);
        group.throughput(Throughput::Elements(rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &table, |b, table| {
            b.iter(|| filter_rows(black_box(table), 3, "OK").unwrap());
        });
    }
    group.finish();
}

fn benchmark_render(c: &mut Criterion) {
    let (filtered, _) = filter_rows(&synthetic_table(100_000), 3, "OK").unwrap();
    let writer = DelimitedWriter::new(b';');
    let size = writer.render(&filtered).unwrap().len();

    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Bytes(size as u64));
    group.bench_function("100k_rows", |b| {
        b.iter(|| writer.render(black_box(&filtered)).unwrap());
    });
    group.finish();
}

fn benchmark_workbook(c: &mut Criterion) {
    let data = synthetic_workbook(20_000);
    let converter = WorkbookConverter::new(0, 1, SecurityConfig::default());

    let mut group = c.benchmark_group("workbook");
    group.sample_size(10);
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("convert_20k_rows", |b| {
        b.iter(|| converter.convert_bytes(black_box(&data)).unwrap());
    });
    group.finish();
}

criterion_group!(benches, benchmark_filter, benchmark_render, benchmark_workbook);
criterion_main!(benches);
