use std::cmp::Ordering;

use semver::Version;

/// Installed version assigned to modules checked out from source.
/// Always considered up to date.
pub const DEV_VERSION: &str = "dev";

/// Returns true for the development sentinel version
pub fn is_dev_version(version: &str) -> bool {
    version.trim().eq_ignore_ascii_case(DEV_VERSION)
}

/// Parse a version string into a semver::Version, normalizing partial versions.
///
/// Handles partial versions like "1" or "1.2" by padding with zeros,
/// and strips a leading 'v'.
///
/// Examples:
/// - "1" -> Version(1, 0, 0)
/// - "v1.2" -> Version(1, 2, 0)
/// - "1.2.3" -> Version(1, 2, 3)
pub fn parse_version(version: &str) -> Option<Version> {
    let version = version.trim();
    let version = version.strip_prefix('v').unwrap_or(version);
    let parts: Vec<&str> = version.split('.').collect();
    let normalized = match parts.len() {
        1 => format!("{}.0.0", parts[0]),
        2 => format!("{}.{}.0", parts[0], parts[1]),
        _ => version.to_string(),
    };
    Version::parse(&normalized).ok()
}

/// Compare two version strings.
///
/// Semver-shaped versions are compared semantically. Anything else
/// ("1.0.0.1", "2.4-p1", "dev-master", "1.0.x-dev") falls back to a natural
/// ordering where numeric runs compare numerically and stability words rank
/// `dev < alpha < beta < RC < release < patch`.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (parse_version(a), parse_version(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => natural_compare(a, b),
    }
}

/// Pick the item with the highest version.
/// On equal versions the item appearing later wins.
pub fn latest_by_version<T, F>(items: impl IntoIterator<Item = T>, version_of: F) -> Option<T>
where
    F: Fn(&T) -> &str,
{
    items.into_iter().fold(None, |best, item| match best {
        Some(current) if compare_versions(version_of(&item), version_of(&current)).is_lt() => {
            Some(current)
        }
        _ => Some(item),
    })
}

#[derive(Debug, Clone, Copy)]
enum Part<'a> {
    Number(&'a str),
    Word(&'a str),
}

/// Rank of a release-stage word; plain numbers rank as 4
const RELEASE_RANK: i32 = 4;

fn word_rank(word: &str) -> i32 {
    const FORMS: &[(&str, i32)] = &[
        ("dev", 0),
        ("alpha", 1),
        ("a", 1),
        ("beta", 2),
        ("b", 2),
        ("RC", 3),
        ("rc", 3),
        ("#", RELEASE_RANK),
        ("pl", 5),
        ("p", 5),
    ];

    FORMS
        .iter()
        .find(|(form, _)| word.starts_with(form))
        .map(|(_, rank)| *rank)
        .unwrap_or(-6)
}

fn part_rank(part: Part<'_>) -> i32 {
    match part {
        Part::Number(_) => RELEASE_RANK,
        Part::Word(w) => word_rank(w),
    }
}

fn split_parts(version: &str) -> Vec<Part<'_>> {
    let mut parts = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_digits = false;

    for (i, c) in version.char_indices() {
        let is_sep = matches!(c, '.' | '-' | '_' | '+');
        if is_sep {
            if let Some(s) = start.take() {
                parts.push(make_part(&version[s..i], in_digits));
            }
            continue;
        }

        let is_digit = c.is_ascii_digit();
        match start {
            Some(s) if is_digit != in_digits => {
                parts.push(make_part(&version[s..i], in_digits));
                start = Some(i);
            }
            None => start = Some(i),
            _ => {}
        }
        in_digits = is_digit;
    }

    if let Some(s) = start {
        parts.push(make_part(&version[s..], in_digits));
    }

    parts
}

fn make_part(text: &str, digits: bool) -> Part<'_> {
    if digits {
        Part::Number(text)
    } else {
        Part::Word(text)
    }
}

fn compare_numbers(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_parts(a: Part<'_>, b: Part<'_>) -> Ordering {
    match (a, b) {
        (Part::Number(a), Part::Number(b)) => compare_numbers(a, b),
        _ => part_rank(a).cmp(&part_rank(b)),
    }
}

fn natural_compare(a: &str, b: &str) -> Ordering {
    let a = split_parts(a.trim());
    let b = split_parts(b.trim());

    for (pa, pb) in a.iter().zip(b.iter()) {
        let ord = compare_parts(*pa, *pb);
        if ord.is_ne() {
            return ord;
        }
    }

    // "1.0.1" > "1.0" but "1.0-beta" < "1.0"
    match a.len().cmp(&b.len()) {
        Ordering::Greater => part_rank(a[b.len()]).cmp(&RELEASE_RANK).then(Ordering::Greater),
        Ordering::Less => RELEASE_RANK.cmp(&part_rank(b[a.len()])).then(Ordering::Less),
        Ordering::Equal => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1.2.0", "1.10.0", Ordering::Less)]
    #[case("2.0.0", "1.99.99", Ordering::Greater)]
    #[case("1.0", "1.0.0", Ordering::Equal)]
    #[case("v1.2.3", "1.2.3", Ordering::Equal)]
    #[case("1.0.0-beta", "1.0.0", Ordering::Less)]
    #[case("1.0.0.1", "1.0.0", Ordering::Greater)]
    #[case("1.0.0.2", "1.0.0.10", Ordering::Less)]
    #[case("2.4-p1", "2.4", Ordering::Greater)]
    #[case("2.4-beta1", "2.4", Ordering::Less)]
    #[case("1.0.0-alpha1", "1.0.0-rc1", Ordering::Less)]
    #[case("1.0.0.0-beta", "1.0.0.0-RC1", Ordering::Less)]
    #[case("dev-master", "0.0.1", Ordering::Less)]
    #[case("1.0.x-dev", "1.0.0", Ordering::Less)]
    fn compare_versions_orders_naturally(
        #[case] a: &str,
        #[case] b: &str,
        #[case] expected: Ordering,
    ) {
        assert_eq!(compare_versions(a, b), expected);
        assert_eq!(compare_versions(b, a), expected.reverse());
    }

    #[rstest]
    #[case("dev", true)]
    #[case("DEV", true)]
    #[case("dev-master", false)]
    #[case("1.0.0", false)]
    fn is_dev_version_only_matches_sentinel(#[case] version: &str, #[case] expected: bool) {
        assert_eq!(is_dev_version(version), expected);
    }

    #[test]
    fn latest_by_version_returns_highest() {
        let versions = vec!["1.0.0", "1.10.0", "1.2.0", "dev-master"];

        assert_eq!(latest_by_version(versions, |v| *v), Some("1.10.0"));
    }

    #[test]
    fn latest_by_version_prefers_later_item_on_tie() {
        let items = vec![("1.0.0", "first"), ("1.0", "second"), ("0.9.0", "third")];

        assert_eq!(
            latest_by_version(items, |(v, _)| *v),
            Some(("1.0", "second"))
        );
    }

    #[test]
    fn latest_by_version_returns_none_for_empty_input() {
        let versions: Vec<&str> = vec![];
        assert_eq!(latest_by_version(versions, |v| *v), None);
    }
}
