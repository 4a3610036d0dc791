//! Token and search word helpers. Pure functions, no I/O.

use crate::error::VaultError;
use fxhash::FxHashSet;
use pvault_domain::constants::{MIN_SEARCH_WORD_LEN, TOKEN_LEN};

/// 128 random bits from the OS, lowercase hex.
///
/// # Errors
/// Returns [`VaultError::Internal`] if the OS random source is unavailable.
pub fn generate_token() -> Result<String, VaultError> {
    let mut bytes = [0u8; TOKEN_LEN / 2];
    getrandom::fill(&mut bytes).map_err(|e| VaultError::Internal {
        message: e.to_string().into(),
        context: Some("Generating token".into()),
    })?;
    Ok(hex::encode(bytes))
}

/// Exactly 32 hex digits, either case.
#[must_use]
pub fn validate_token(s: &str) -> bool {
    s.len() == TOKEN_LEN && is_hex(s)
}

/// At least two hex digits. Search words arrive pre-encoded.
#[must_use]
pub fn validate_search_word(s: &str) -> bool {
    s.len() >= MIN_SEARCH_WORD_LEN && is_hex(s)
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Drops repeated strings, keeping the first occurrence.
#[must_use]
pub fn dedupe<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = FxHashSet::default();
    items.into_iter().map(Into::into).filter(|item| seen.insert(item.clone())).collect()
}

/// Splits a token list on single spaces. No trimming: `"a  b"` yields an empty element.
#[must_use]
pub fn split_list(list: &str) -> Vec<String> {
    list.split(' ').map(str::to_owned).collect()
}
