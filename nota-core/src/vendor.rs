//! Vendor label normalization

/// Label used when a receipt header carries no vendor name
pub const UNKNOWN_VENDOR: &str = "Estabelecimento Não Encontrado";

/// Strip the tax-ID suffix from a receipt header vendor label.
///
/// Splits on the first `CNPJ` marker or comma and keeps the trimmed first segment.
pub fn simplify_vendor_name(raw: &str) -> String {
    let cut = [raw.find("CNPJ"), raw.find(',')]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(raw.len());
    raw[..cut].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_cnpj_suffix() {
        assert_eq!(
            simplify_vendor_name("COMPANHIA ZAFFARI COMERCIO E INDUSTRIA CNPJ: 93.015.006/0001-13"),
            "COMPANHIA ZAFFARI COMERCIO E INDUSTRIA"
        );
    }

    #[test]
    fn test_strips_after_comma() {
        assert_eq!(simplify_vendor_name("Mercado Bom Preço, Filial 2"), "Mercado Bom Preço");
        // Comma inside the CNPJ suffix: whichever marker comes first wins
        assert_eq!(simplify_vendor_name("NACIONAL CNPJ 1,2"), "NACIONAL");
    }

    #[test]
    fn test_plain_name_is_trimmed() {
        assert_eq!(simplify_vendor_name("  Padaria Central  "), "Padaria Central");
        assert_eq!(simplify_vendor_name(""), "");
        assert_eq!(simplify_vendor_name(UNKNOWN_VENDOR), UNKNOWN_VENDOR);
    }
}
