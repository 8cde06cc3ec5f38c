use criterion::{criterion_group, criterion_main};

mod gps;
mod modem;

criterion_group!(
    benches,
    gps::nmea::bench_parse_gga,
    gps::nmea::bench_decode_stream,
    modem::operator::bench_parse_scan
);
criterion_main!(benches);
