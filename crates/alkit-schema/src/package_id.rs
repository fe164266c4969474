//! Symbol package naming.
//!
//! Symbol packages on the public feeds follow fixed naming templates that
//! depend on who published the application and whether a localized (country)
//! build is wanted:
//!
//! ```text
//! System                      microsoft.platform.symbols
//! Application                 microsoft.application[.{COUNTRY}].symbols
//! Microsoft app with an id    microsoft.{name}[.{COUNTRY}].symbols.{appId}
//! Anything else               {publisher}.{name}.symbols.{appId}
//! ```

use crate::types::SymbolRequest;

const MICROSOFT: &str = "microsoft";

/// A localization country code. `w1` (worldwide) means "no country".
///
/// Stored lowercase; only rendered uppercase inside package ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Country(Option<String>);

impl Country {
    /// Normalize a country code. Empty strings and `w1` mean no country.
    pub fn new(code: &str) -> Self {
        let code = code.trim().to_lowercase();
        if code.is_empty() || code == "w1" {
            Self(None)
        } else {
            Self(Some(code))
        }
    }

    /// The worldwide (unqualified) country.
    pub fn worldwide() -> Self {
        Self(None)
    }

    /// Lowercase code, or `None` for worldwide.
    pub fn code(&self) -> Option<&str> {
        self.0.as_deref()
    }

    fn id_segment(&self) -> Option<String> {
        self.0.as_ref().map(|c| c.to_uppercase())
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_deref().unwrap_or("w1"))
    }
}

/// Lowercase and strip spaces, the way feed ids spell publishers and names.
fn id_component(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Candidate package ids for a request, most specific first.
///
/// When a country applies, the country-qualified id comes first and the
/// country-less id follows as a fallback. An explicit `package_id` on the
/// request short-circuits the templates.
pub fn package_ids(request: &SymbolRequest, country: &Country) -> Vec<String> {
    if let Some(explicit) = &request.package_id {
        return vec![explicit.clone()];
    }

    let publisher = id_component(&request.publisher);
    let name = id_component(&request.name);

    if publisher == MICROSOFT && name == "system" {
        return vec![format!("{MICROSOFT}.platform.symbols")];
    }

    let with_country = |qualified: String, plain: String| match country.id_segment() {
        Some(_) => vec![qualified, plain],
        None => vec![plain],
    };
    let upper = country.id_segment().unwrap_or_default();

    if publisher == MICROSOFT && name == "application" {
        return with_country(
            format!("{MICROSOFT}.application.{upper}.symbols"),
            format!("{MICROSOFT}.application.symbols"),
        );
    }

    let suffix = request
        .app_id
        .as_deref()
        .map(|id| format!(".{}", id.to_lowercase()))
        .unwrap_or_default();

    if publisher == MICROSOFT {
        return with_country(
            format!("{MICROSOFT}.{name}.{upper}.symbols{suffix}"),
            format!("{MICROSOFT}.{name}.symbols{suffix}"),
        );
    }

    vec![format!("{publisher}.{name}.symbols{suffix}")]
}
