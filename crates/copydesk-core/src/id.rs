/// Split a composite article id into `(guid, version)`.
///
/// Version ids are `guid:timestamp`. A bare guid, or an id whose suffix
/// does not parse as an integer, addresses a draft and yields version 0
/// with the whole string as guid.
pub fn split_article_id(id: &str) -> (&str, i64) {
    match id.rsplit_once(':') {
        Some((guid, suffix)) if !guid.is_empty() => match suffix.parse::<i64>() {
            Ok(version) => (guid, version),
            Err(_) => (id, 0),
        },
        _ => (id, 0),
    }
}

/// Format the id of a version: `guid:version`.
pub fn version_id(guid: &str, version: i64) -> String {
    format!("{}:{}", guid, version)
}
