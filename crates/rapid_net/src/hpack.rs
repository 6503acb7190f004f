use bytes::Bytes;
use rapid_traits::HeaderEncoder;

/// HPACK header block encoder.
///
/// Every call starts from a fresh compression context. Blocks are encoded
/// by many workers at once and may hit the wire in any order, so no block
/// may refer to dynamic-table entries another block created.
#[derive(Debug, Default, Clone, Copy)]
pub struct HpackEncoder;

impl HeaderEncoder for HpackEncoder {
    fn encode(&self, headers: &[(&str, &str)]) -> Bytes {
        let mut encoder = fluke_hpack::Encoder::new();
        let block = encoder.encode(
            headers
                .iter()
                .map(|&(name, value)| (name.as_bytes(), value.as_bytes())),
        );
        Bytes::from(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_block_decodes_to_same_headers() {
        let headers = [
            (":method", "GET"),
            (":path", "/"),
            (":scheme", "https"),
            (":authority", "localhost:443"),
        ];
        let block = HpackEncoder.encode(&headers);
        assert!(!block.is_empty());

        let mut decoder = fluke_hpack::Decoder::new();
        let decoded = decoder.decode(&block).unwrap();
        let decoded: Vec<(String, String)> = decoded
            .into_iter()
            .map(|(n, v)| (String::from_utf8(n).unwrap(), String::from_utf8(v).unwrap()))
            .collect();
        let expected: Vec<(String, String)> = headers
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn blocks_decode_independently_of_order() {
        let first = HpackEncoder.encode(&[(":authority", "a.example")]);
        let second = HpackEncoder.encode(&[(":authority", "a.example")]);

        // one shared decoder sees the second block first
        let mut decoder = fluke_hpack::Decoder::new();
        for block in [&second, &first] {
            let decoded = decoder.decode(block).unwrap();
            assert_eq!(decoded, vec![(b":authority".to_vec(), b"a.example".to_vec())]);
        }
    }
}
