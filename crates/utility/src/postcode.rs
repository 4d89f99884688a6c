use once_cell::sync::Lazy;
use phf::phf_map;
use regex::Regex;

/// Full uk postcode, outward and inward code, optional single space.
static POSTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([A-Z]{1,2}[0-9][A-Z0-9]? ?[0-9][A-Z]{2})\b")
        .expect("postcode pattern is valid")
});

/// Outward codes the locator page recognises on their own.
const EXPLICIT_AREAS: &[&str] = &["SW1", "SW2", "SE1"];

/// Districts named in addresses that carry no postcode at all.
pub static DISTRICT_AREAS: phf::Map<&'static str, &'static str> = phf_map! {
    "Westminster" => "SW1",
    "Southwark" => "SE1",
};

/// The area every unmatched london address falls back to.
pub const DEFAULT_LONDON_AREA: &str = "SW1";

/// Extracts a postcode (or at least a postcode area) from a free-text
/// address.
///
/// Explicit area codes win first, then a full postcode, then the district
/// table for london addresses.
pub fn extract_postcode(address: &str) -> Option<String> {
    if address.trim().is_empty() {
        return None;
    }

    if let Some(area) = EXPLICIT_AREAS
        .iter()
        .find(|area| contains_area(address, area))
    {
        // a full postcode in the same area is more precise than the area
        return POSTCODE
            .captures(address)
            .map(|captures| captures[1].to_uppercase())
            .filter(|postcode| postcode.starts_with(*area))
            .or_else(|| Some((*area).to_owned()));
    }

    if let Some(captures) = POSTCODE.captures(address) {
        return Some(captures[1].to_uppercase());
    }

    if address.contains("London") {
        let area = DISTRICT_AREAS
            .entries()
            .find(|(district, _)| address.contains(*district))
            .map(|(_, area)| *area)
            .unwrap_or(DEFAULT_LONDON_AREA);
        return Some(area.to_owned());
    }

    None
}

/// The outward code of a postcode, e.g. `SW1A` for `SW1A 1AA`.
pub fn outward_code(postcode: &str) -> &str {
    let trimmed = postcode.trim();
    if let Some(index) = trimmed.find(' ') {
        return &trimmed[..index];
    }
    // the inward code is always the last three characters
    match trimmed.char_indices().rev().nth(2) {
        Some((index, _)) if trimmed.chars().count() > 4 => &trimmed[..index],
        _ => trimmed,
    }
}

fn contains_area(address: &str, area: &str) -> bool {
    // "SW1" must not match inside "SW10"
    address.match_indices(area).any(|(index, _)| {
        let next = address[index + area.len()..].chars().next();
        !matches!(next, Some(c) if c.is_ascii_digit())
    })
}
