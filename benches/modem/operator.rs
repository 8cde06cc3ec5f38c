use criterion::{BatchSize, Criterion, Throughput};
use libmodem::modem::operator::{ByteSource, MAX_OPERATORS, OperatorList, parse_scan};
use std::hint::black_box;

struct Script<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl ByteSource for Script<'_> {
    fn next_byte(&mut self, _timeout_ms: u32) -> Option<u8> {
        let byte = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }
}

fn full_scan() -> Vec<u8> {
    let mut response = b"\r\n+COPS: ".to_vec();
    for i in 0..MAX_OPERATORS {
        let stat = if i % 5 == 0 { 3 } else { 1 };
        response.extend_from_slice(
            format!("({},\"Operator {}\",\"Op{}\",\"208{:02}\",7),", stat, i, i, i).as_bytes(),
        );
    }
    response.extend_from_slice(b",(0-4),(0-2)\r\n\r\nOK\r\n");
    response
}

pub fn bench_parse_scan(c: &mut Criterion) {
    let response = full_scan();

    let mut group = c.benchmark_group("operator");
    group.throughput(Throughput::Bytes(response.len() as u64));
    group.bench_function("parse_scan", |b| {
        b.iter_batched_ref(
            OperatorList::new,
            |operators| {
                let mut source = Script {
                    bytes: black_box(&response),
                    pos: 0,
                };
                parse_scan(&mut source, operators).expect("Failed to parse scan");
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
