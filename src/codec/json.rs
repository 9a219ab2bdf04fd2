//! JSON codec using `serde_json`.
//!
//! Decoding reads the first JSON value of the body and ignores anything after
//! it. A body holding only whitespace counts as missing input. Encoded values
//! end with a newline.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Codec;
use crate::error::{Error, Result};

/// Content type served by [`JsonCodec`].
pub const JSON_MIME: &str = "application/json";

/// JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn mime_type(&self) -> &str {
        JSON_MIME
    }

    fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T> {
        match serde_json::Deserializer::from_slice(body)
            .into_iter::<T>()
            .next()
        {
            Some(Ok(value)) => Ok(value),
            Some(Err(e)) => Err(Error::Decode(Box::new(e))),
            None => Err(Error::DecodeFailure),
        }
    }

    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(value).map_err(|e| Error::Encode(Box::new(e)))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Input {
        input: String,
    }

    #[test]
    fn test_encode_appends_newline() {
        let encoded = JsonCodec.encode(&HashMap::from([("output", "hi")])).unwrap();
        assert_eq!(encoded, b"{\"output\":\"hi\"}\n");
    }

    #[test]
    fn test_decode_struct() {
        let decoded: Input = JsonCodec.decode(b"{\"input\":\"yo\"}").unwrap();
        assert_eq!(decoded.input, "yo");
    }

    #[test]
    fn test_struct_roundtrip() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Reply {
            id: u32,
            name: String,
            tags: Vec<String>,
            parent: Option<Box<Input>>,
        }

        let reply = Reply {
            id: 7,
            name: "x".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            parent: Some(Box::new(Input {
                input: "yo".to_string(),
            })),
        };

        let encoded = JsonCodec.encode(&reply).unwrap();
        assert_eq!(
            encoded,
            b"{\"id\":7,\"name\":\"x\",\"tags\":[\"a\",\"b\"],\"parent\":{\"input\":\"yo\"}}\n"
        );

        let decoded: Reply = JsonCodec.decode(&encoded).unwrap();
        assert_eq!(decoded, reply);

        let boxed: Box<Reply> = JsonCodec.decode(&encoded).unwrap();
        assert_eq!(*boxed, reply);
    }

    #[test]
    fn test_decode_boxed_and_map() {
        let boxed: Box<Input> = JsonCodec.decode(b"{\"input\":\"boxed\"}\n").unwrap();
        assert_eq!(boxed.input, "boxed");

        let map: HashMap<String, u32> = JsonCodec.decode(b"{\"a\":1,\"b\":2}").unwrap();
        assert_eq!(map["b"], 2);
    }

    #[test]
    fn test_decode_reads_first_value_only() {
        let decoded: Input = JsonCodec.decode(b"{\"input\":\"one\"} {\"input\":\"two\"}").unwrap();
        assert_eq!(decoded.input, "one");
    }

    #[test]
    fn test_decode_whitespace_is_missing_input() {
        let err = JsonCodec.decode::<Input>(b" \n\t ").unwrap_err();
        assert!(matches!(err, Error::DecodeFailure));
    }

    #[test]
    fn test_decode_error_carries_serde_message() {
        let err = JsonCodec.decode::<Input>(b"{\"input\":").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.is_decode());

        let err = JsonCodec.decode::<Input>(b"{\"input\":5}").unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn test_encode_failure_is_encode_error() {
        // Non-string map keys cannot be represented in JSON.
        let map = HashMap::from([((1, 2), "tuple key")]);
        let err = JsonCodec.encode(&map).unwrap_err();
        assert!(matches!(err, Error::Encode(_)));
    }
}
