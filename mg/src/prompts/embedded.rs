//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Recipe generator prompt
pub const GENERATE: &str = include_str!("../../prompts/generate.pmt");

/// Recipe validator prompt
pub const VALIDATE: &str = include_str!("../../prompts/validate.pmt");

/// Recipe editor prompt
pub const EDIT: &str = include_str!("../../prompts/edit.pmt");

/// Shopping list prompt
pub const SHOP: &str = include_str!("../../prompts/shop.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "generate" => Some(GENERATE),
        "validate" => Some(VALIDATE),
        "edit" => Some(EDIT),
        "shop" => Some(SHOP),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_all_stages() {
        for name in ["generate", "validate", "edit", "shop"] {
            assert!(get_embedded(name).is_some(), "missing {}", name);
        }
    }

    #[test]
    fn test_generate_mentions_seasonality() {
        let generate = get_embedded("generate").unwrap();
        assert!(generate.contains("{{month}}"));
        assert!(generate.contains("{{location}}"));
        assert!(generate.contains("cookTime"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("plan").is_none());
    }
}
