//! Opaque physical table identifiers.

use ulid::Ulid;

/// Length of a generated physical table identifier.
pub const TABLE_ID_LEN: usize = 16;

/// Generate a fresh physical table identifier.
///
/// The identifier is the leading 16 characters of a ULID: the full 48-bit
/// timestamp followed by 30 bits of randomness, in Crockford base32. It sorts
/// by creation time, needs no quoting and never collides with a reserved word
/// because it always starts with a digit for the foreseeable future.
pub fn generate_table_id() -> String {
    let mut id = Ulid::new().to_string();
    id.truncate(TABLE_ID_LEN);
    id
}
