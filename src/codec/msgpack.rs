//! MsgPack codec using `rmp-serde`.
//!
//! Structs are always written with `to_vec_named`, never `to_vec`:
//!
//! - `to_vec` serializes structs as arrays (positional)
//! - `to_vec_named` serializes structs as maps (with field names)
//!
//! Clients in other languages decode maps into objects; positional arrays lose
//! the field names and break them.
//!
//! # Example
//!
//! ```
//! use autobind::codec::{Codec, MsgPackCodec};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize, PartialEq, Debug)]
//! struct Message {
//!     id: u32,
//!     content: String,
//! }
//!
//! let msg = Message { id: 42, content: "hello".to_string() };
//! let encoded = MsgPackCodec.encode(&msg).unwrap();
//! let decoded: Message = MsgPackCodec.decode(&encoded).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Codec;
use crate::error::{Error, Result};

/// Content type served by [`MsgPackCodec`].
pub const MSGPACK_MIME: &str = "application/msgpack";

/// MessagePack codec for structured data.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn mime_type(&self) -> &str {
        MSGPACK_MIME
    }

    #[inline]
    fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T> {
        if body.is_empty() {
            return Err(Error::DecodeFailure);
        }
        rmp_serde::from_slice(body).map_err(|e| Error::Decode(Box::new(e)))
    }

    #[inline]
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        // to_vec_named, NOT to_vec.
        rmp_serde::to_vec_named(value).map_err(|e| Error::Encode(Box::new(e)))
    }
}
