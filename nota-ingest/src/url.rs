//! Receipt portal URL handling

const LEGACY_PORTAL: &str = "www.sefaz.rs.gov.br/NFCE/NFCE-COM.aspx";
const CURRENT_PORTAL: &str = "dfe-portal.svrs.rs.gov.br/Dfe/QrCodeNFce";

/// Rewrite QR codes that still point at the retired SEFAZ-RS page to the
/// SVRS portal that serves the receipt markup. Other URLs pass through trimmed.
pub fn normalize_portal_url(raw: &str) -> String {
    raw.trim().replace(LEGACY_PORTAL, CURRENT_PORTAL)
}
