//! Ledger identifier normalization
//!
//! Scanned identifiers are opaque text. Labels printed for the ledger carry a
//! transaction reference, optionally prefixed (`tx:0xabc…`, `item: abc…`).
//! Before a reference is handed to the lookup bridge the prefix is stripped
//! and a `0x` hex prefix is ensured.

/// Normalize a scanned identifier into a ledger transaction reference
///
/// - Everything up to and including the last `:` is discarded
/// - Surrounding whitespace is trimmed
/// - `0x` is prepended when missing
///
/// # Examples
///
/// ```
/// use sctrk_common::identifier::normalize_tx_ref;
///
/// assert_eq!(normalize_tx_ref("tx:0xabc"), "0xabc");
/// assert_eq!(normalize_tx_ref("item: abc"), "0xabc");
/// assert_eq!(normalize_tx_ref("0xabc"), "0xabc");
/// ```
pub fn normalize_tx_ref(identifier: &str) -> String {
    let tail = match identifier.rsplit_once(':') {
        Some((_, tail)) => tail,
        None => identifier,
    };
    let tail = tail.trim();

    if tail.starts_with("0x") {
        tail.to_string()
    } else {
        format!("0x{}", tail)
    }
}
