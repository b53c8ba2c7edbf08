//! Display helpers for account identifiers.

use super::types::Address;

/// `0x71C7656E...976F` → first `head` and last `tail` characters joined by `...`.
/// Strings too short to shorten come back unchanged.
pub fn short_address(address: &str, head: usize, tail: usize) -> String {
    if address.len() <= head + tail + 3 || !address.is_ascii() {
        return address.to_string();
    }
    format!("{}...{}", &address[..head], &address[address.len() - tail..])
}

impl Address {
    /// Compact form used on the wallet button, e.g. `0x71...976f`.
    pub fn short(&self) -> String { short_address(&self.to_string(), 4, 4) }

    /// Wider form used in the connect dialog, e.g. `0x71c7...976f`.
    pub fn short_wide(&self) -> String { short_address(&self.to_string(), 6, 4) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortens() {
        let addr = Address::parse("0x71C7656EC7ab88b098defB751B7401B5f6d8976F").unwrap();
        assert_eq!(addr.short(), "0x71...976f");
        assert_eq!(addr.short_wide(), "0x71c7...976f");
        assert_eq!(short_address("0x1234", 4, 4), "0x1234");
        assert_eq!(short_address("", 4, 4), "");
    }
}
