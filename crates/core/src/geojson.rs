use std::fmt;

/// GeoJSON text that has passed through [`sanitize`].
///
/// Only this module can construct one, so every value that reaches a bind
/// list has been cleaned exactly once, at assignment time.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SanitizedGeoJson(String);

impl SanitizedGeoJson {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SanitizedGeoJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SanitizedGeoJson({} bytes)", self.0.len())
    }
}

impl fmt::Display for SanitizedGeoJson {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedGeoJson {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a raw GeoJSON payload.
///
/// Blank or missing input means "no geometry" and yields `None`. Otherwise
/// surrounding whitespace is trimmed and NUL / control characters are
/// removed (tab, CR and LF are kept). The text is not parsed: malformed
/// geometry is left for the spatial engine to reject at flush.
pub fn sanitize(raw: Option<&str>) -> Option<SanitizedGeoJson> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    Some(SanitizedGeoJson(cleaned.to_string()))
}
