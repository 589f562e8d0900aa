//! Classification of import specifiers.
//!
//! Everything here is pure: no filesystem access, no configuration lookup.

/// What kind of module a specifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// Starts with `.` (`./x`, `../x`, `..`).
    Relative,
    /// Already uses the project alias prefix (`@/lib/a`).
    Aliased,
    /// A package name or anything else (`react`, `@scope/pkg`, `/abs`).
    Bare,
}

/// Classify a specifier. An empty `alias_prefix` never matches.
pub fn classify(specifier: &str, alias_prefix: &str) -> SpecifierKind {
    if specifier.starts_with('.') {
        SpecifierKind::Relative
    } else if !alias_prefix.is_empty() && specifier.starts_with(alias_prefix) {
        SpecifierKind::Aliased
    } else {
        SpecifierKind::Bare
    }
}

/// Number of leading `..` segments in a relative specifier.
///
/// `.` segments are skipped; the first segment that is neither `.` nor `..`
/// ends the count. Specifiers that do not start with `.` have depth 0.
pub fn climb_depth(specifier: &str) -> usize {
    if !specifier.starts_with('.') {
        return 0;
    }

    let mut depth = 0;
    for segment in specifier.split('/') {
        match segment {
            ".." => depth += 1,
            "." => {}
            _ => break,
        }
    }
    depth
}

/// Whether a specifier climbs further than `threshold` levels.
///
/// A depth equal to the threshold is still considered local.
pub fn should_rewrite(specifier: &str, threshold: usize) -> bool {
    climb_depth(specifier) > threshold
}
