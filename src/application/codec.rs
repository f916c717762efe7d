//! Shared JSON encoding: pretty-printed with a one-space indent.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

const INDENT: &[u8] = b" ";

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buffer = Vec::with_capacity(128);
    let formatter = PrettyFormatter::with_indent(INDENT);
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    Ok(buffer)
}
