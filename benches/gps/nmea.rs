use criterion::{Criterion, Throughput};
use std::hint::black_box;
use libmodem::gps::nmea::{NmeaDecoder, NmeaParser};

const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47\r\n";
const RMC: &str = "$GPRMC,123520,A,4807.038,N,01131.000,E,022.4,084.4,230324,003.1,W*6B\r\n";
const GSV: &str = "$GPGSV,3,1,11,03,03,111,00,04,15,270,00,06,01,010,00,13,06,292,00*74\r\n";

pub fn bench_parse_gga(c: &mut Criterion) {
    let mut group = c.benchmark_group("nmea");
    group.throughput(Throughput::Bytes(GGA.len() as u64));
    group.bench_function("parse_gga", |b| {
        b.iter(|| NmeaParser::parse(black_box(GGA), true).expect("Failed to parse"))
    });
    group.finish();
}

pub fn bench_decode_stream(c: &mut Criterion) {
    // One second of receiver output at 9600 baud, roughly
    let stream = [GSV, GSV, GGA, RMC].concat().repeat(2);

    let mut group = c.benchmark_group("nmea");
    group.throughput(Throughput::Bytes(stream.len() as u64));
    group.bench_function("decode_stream", |b| {
        b.iter_batched_ref(
            NmeaDecoder::new,
            |decoder| {
                let mut sentences = 0;
                for &byte in black_box(stream.as_bytes()) {
                    if let Some(Ok(_)) = decoder.push(byte) {
                        sentences += 1;
                    }
                }
                assert_eq!(sentences, 4);
            },
            criterion::BatchSize::SmallInput,
        )
    });
    group.finish();
}
