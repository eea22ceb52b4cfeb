//! Canonical capability tag normalization.

const STRIPPED_SUFFIXES: &[&str] = &["-plugin", "-manager"];

/// Maps a plugin service type or slug to its canonical capability tag.
///
/// The value is lowercased, runs of non-alphanumeric characters collapse to a
/// single `-`, and a trailing `-plugin` or `-manager` is removed. Returns
/// `None` when nothing usable remains.
///
/// # Examples
///
/// ```
/// use fleetwright::infrastructure::domain::canonical_tag;
///
/// assert_eq!(canonical_tag("MinIO"), Some(String::from("minio")));
/// assert_eq!(canonical_tag("kong-manager"), Some(String::from("kong")));
/// assert_eq!(canonical_tag("  --  "), None);
/// ```
#[must_use]
pub fn canonical_tag(raw: &str) -> Option<String> {
    let mut tag = String::with_capacity(raw.len());
    for character in raw.trim().chars() {
        if character.is_ascii_alphanumeric() {
            tag.push(character.to_ascii_lowercase());
        } else if !tag.is_empty() && !tag.ends_with('-') {
            tag.push('-');
        }
    }
    while tag.ends_with('-') {
        tag.pop();
    }

    for suffix in STRIPPED_SUFFIXES {
        if let Some(stem) = tag.strip_suffix(suffix) {
            if !stem.is_empty() {
                tag = stem.to_owned();
            }
            break;
        }
    }

    (!tag.is_empty()).then_some(tag)
}

#[cfg(test)]
mod tests {
    use super::canonical_tag;
    use rstest::rstest;

    #[rstest]
    #[case("minio", Some("minio"))]
    #[case("Grafana Plugin", Some("grafana"))]
    #[case("prometheus_manager", Some("prometheus"))]
    #[case("Kong/API Gateway", Some("kong-api-gateway"))]
    #[case("plugin", Some("plugin"))]
    #[case("", None)]
    #[case("***", None)]
    fn normalizes_tags(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(canonical_tag(raw).as_deref(), expected);
    }
}
