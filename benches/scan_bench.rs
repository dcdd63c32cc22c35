// Standalone throughput benchmark for the field iterator and emitter.
//
// Run: cargo bench --bench scan_bench
// Build with --features simd (nightly) to compare the vectorized scanner
// against the table-driven scalar path.
//
// Datasets:
//   - Clean: unquoted short fields (scanner-bound)
//   - Quoted: every third field quoted, some with escapes (state-machine
//     bound)

use std::hint::black_box;
use std::time::{Duration, Instant};

use zerocsv::{Emitter, Error, FieldIter, Rfc4180};

const WARMUP: usize = 3;
const ITERS: usize = 20;

fn make_clean(rows: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..rows {
        out.extend_from_slice(format!("alpha{i},beta,gamma delta,{i}\n").as_bytes());
    }
    out
}

fn make_quoted(rows: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..rows {
        out.extend_from_slice(
            format!("plain{i},\"with,comma\",\"say \"\"hi\"\" {i}\",tail\n").as_bytes(),
        );
    }
    out
}

/// Time `f` over ITERS runs after WARMUP, reporting the best run.
fn bench(label: &str, bytes: usize, mut f: impl FnMut() -> usize) {
    for _ in 0..WARMUP {
        black_box(f());
    }
    let mut best = Duration::MAX;
    let mut fields = 0;
    for _ in 0..ITERS {
        let start = Instant::now();
        fields = black_box(f());
        best = best.min(start.elapsed());
    }
    let mbps = bytes as f64 / 1_000_000.0 / best.as_secs_f64();
    println!("{label:<28} {mbps:>9.1} MB/s  ({fields} fields, best of {ITERS})");
}

fn parse_all(input: &[u8]) -> usize {
    let mut buf = input.to_vec();
    let mut it: FieldIter<_, Rfc4180> = FieldIter::from_slice(&mut buf[..]);
    let mut count = 0;
    loop {
        match it.next() {
            Ok(mut field) => {
                black_box(field.unescaped());
                count += 1;
            }
            Err(Error::EndOfInput) => return count,
            Err(e) => panic!("bench input must parse: {e}"),
        }
    }
}

fn emit_all(rows: usize) -> usize {
    let mut emitter: Emitter<Vec<u8>, Rfc4180> = Emitter::new(Vec::new());
    let mut count = 0;
    for i in 0..rows {
        if i > 0 {
            emitter.next_row();
        }
        emitter.emit(b"alpha").unwrap();
        emitter.emit(b"with,comma").unwrap();
        emitter.emit(b"say \"hi\"").unwrap();
        emitter.emit(b"tail").unwrap();
        count += 4;
    }
    black_box(emitter.into_inner().len());
    count
}

fn main() {
    println!("mode: {}", if cfg!(feature = "simd") { "simd" } else { "scalar" });
    println!();

    for &rows in &[1_000usize, 100_000] {
        let clean = make_clean(rows);
        let quoted = make_quoted(rows);

        bench(
            &format!("parse clean {rows} rows"),
            clean.len(),
            || parse_all(&clean),
        );
        bench(
            &format!("parse quoted {rows} rows"),
            quoted.len(),
            || parse_all(&quoted),
        );
        bench(&format!("emit {rows} rows"), quoted.len(), || emit_all(rows));
        println!();
    }
}
