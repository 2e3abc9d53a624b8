//! Spin signature shape checks
//!
//! Signatures are kept on the spin record for audit only. They are never used
//! for authorization.
//!
//! NOTE: no cryptographic verification happens here. Recovering the signer
//! from an EIP-191 personal message and comparing it to the claimed wallet is
//! still missing; until then a well-formed signature proves nothing.

/// `0x` plus 65 bytes of hex (r, s, v)
pub const MIN_SIGNATURE_LEN: usize = 132;

/// Format-only check: `0x` prefix, hex body, minimum length
pub fn is_well_formed(signature: &str) -> bool {
    let Some(body) = signature.strip_prefix("0x") else {
        return false;
    };
    signature.len() >= MIN_SIGNATURE_LEN && !body.is_empty() && body.chars().all(|c| c.is_ascii_hexdigit())
}

/// Keep a caller signature only if it has the expected shape
pub fn audit_signature(signature: Option<String>) -> Option<String> {
    let signature = signature?;
    if is_well_formed(&signature) {
        Some(signature)
    } else {
        tracing::warn!(len = signature.len(), "dropping malformed spin signature");
        None
    }
}
