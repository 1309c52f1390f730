use super::{CompressionContext, Compressor};
use crate::tags::CompressionMethod;
use crate::TiffResult;

/// Compressor that uses the Packbits[^note] algorithm to compress bytes.
///
/// [^note]: PackBits is often ineffective on continuous tone images,
///          including many grayscale images. In such cases, it is better
///          to leave the image uncompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Packbits;

impl Compressor for Packbits {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::PackBits
    }

    fn compress(&self, ctx: &CompressionContext<'_>, input: &[u8]) -> TiffResult<Vec<u8>> {
        let mut out = ctx.pool.acquire(max_packed_len(input.len()));
        let len = pack(input, &mut out);
        Ok(out[..len].to_vec())
    }
}

/// Longest run or literal block one header byte can describe.
const MAX_BLOCK: usize = 128;
/// Shorter runs are cheaper to keep inside a literal block.
const MIN_RUN: usize = 3;

/// Upper bound of the packed size: one header byte per literal block.
fn max_packed_len(len: usize) -> usize {
    len + len / MAX_BLOCK + 1
}

fn run_length(bytes: &[u8]) -> usize {
    let first = bytes[0];
    bytes
        .iter()
        .take(MAX_BLOCK)
        .take_while(|&&b| b == first)
        .count()
}

/// Pack `bytes` into `out` and return the packed length.
fn pack(bytes: &[u8], out: &mut [u8]) -> usize {
    let mut pos = 0;
    let mut len = 0;

    while pos < bytes.len() {
        let run = run_length(&bytes[pos..]);
        if run >= MIN_RUN {
            // Header -(n - 1) repeats the next byte n times.
            out[len] = (1 - run as i16) as u8;
            out[len + 1] = bytes[pos];
            len += 2;
            pos += run;
            continue;
        }

        let start = pos;
        while pos < bytes.len() && pos - start < MAX_BLOCK {
            if run_length(&bytes[pos..]) >= MIN_RUN {
                break;
            }
            pos += 1;
        }
        // Header n - 1 copies the next n bytes.
        out[len] = (pos - start - 1) as u8;
        out[len + 1..len + 1 + pos - start].copy_from_slice(&bytes[start..pos]);
        len += 1 + pos - start;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::compression::tests::{context, TEST_DATA};
    use crate::pool::ScratchPool;

    fn packed(input: &[u8]) -> Vec<u8> {
        Packbits.compress(&context(), input).unwrap()
    }

    #[test]
    fn short_inputs() {
        assert_eq!(packed(&[]), Vec::<u8>::new());
        assert_eq!(packed(&[0x3f]), [0x00, 0x3f]);
        assert_eq!(packed(&[7, 7]), [0x01, 7, 7]);
        assert_eq!(packed(&[7, 7, 7]), [0xfe, 7]);
    }

    #[test]
    fn literal_text() {
        let mut expected = vec![0x3c];
        expected.extend_from_slice(TEST_DATA);
        assert_eq!(packed(TEST_DATA), expected);
    }

    #[test]
    fn run_inside_text() {
        let input = b"This strrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrring hangs.";
        assert_eq!(packed(input), b"\x06This st\xD1r\x09ing hangs.");
    }

    #[test]
    fn scratch_goes_back_to_the_pool() {
        let pool = ScratchPool::new();
        let ctx = CompressionContext {
            pool: &pool,
            ..context()
        };
        let input = [1u8, 2, 3, 3, 3, 3, 4];
        assert_eq!(
            Packbits.compress(&ctx, &input).unwrap(),
            [0x01, 1, 2, 0xfd, 3, 0x00, 4]
        );
        assert_eq!(pool.retained(), 1);
    }

    #[test]
    fn incompressible_input_fits_the_bound() {
        let input: Vec<u8> = (0..=255u8).cycle().take(1000).collect();
        let packed = packed(&input);
        assert_eq!(packed.len(), 1000 + 8);
        assert!(packed.len() <= max_packed_len(input.len()));
    }

    #[test]
    fn long_blocks_are_split() {
        let mut input = b"This st".to_vec();
        input.extend(std::iter::repeat(b'r').take(158));
        input.extend_from_slice(b"ing hangs.");
        input.extend(0..158u8);

        let mut expected = b"\x06This st\x81r\xE3r\x7Fing hangs.".to_vec();
        expected.extend(0..118u8);
        expected.push(0x27);
        expected.extend(118..158u8);
        assert_eq!(packed(&input), expected);
    }
}
