#![no_main]

use bcn_encode::CompressionFormat;
use libfuzzer_sys::fuzz_target;

type Input = (u8, u8, CompressionFormat, Vec<u8>);

fuzz_target!(|input: Input| {
    let (width, height, format, data) = input;
    let _result = bcn_encode::decode::rgba8_from_bcn(width as u32, height as u32, &data, format);
});
