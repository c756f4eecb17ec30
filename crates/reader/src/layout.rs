//! Repository layout: coordinates to resource paths.
//!
//! The standard layout mirrors the group id as a directory tree:
//! `org.example:tool:jar:1.2` lives under
//! `org/example/tool/1.2/tool-1.2.json`, with the classifier appended as
//! `-classifier` when present. Version listings sit next to the version
//! directories as `versions.json`.

use quarry_core::Coordinate;

/// Resource path of a coordinate's descriptor document.
#[must_use]
pub fn descriptor_path(coordinate: &Coordinate) -> String {
    let mut path = group_path(&coordinate.group_id);
    path.push('/');
    path.push_str(&coordinate.artifact_id);
    path.push('/');
    path.push_str(&coordinate.version);
    path.push('/');
    path.push_str(&coordinate.artifact_id);
    path.push('-');
    path.push_str(&coordinate.version);
    if !coordinate.classifier.is_empty() {
        path.push('-');
        path.push_str(&coordinate.classifier);
    }
    path.push_str(".json");
    path
}

/// Resource path of an artifact's version listing.
#[must_use]
pub fn versions_path(coordinate: &Coordinate) -> String {
    format!(
        "{}/{}/versions.json",
        group_path(&coordinate.group_id),
        coordinate.artifact_id
    )
}

fn group_path(group_id: &str) -> String {
    group_id.replace('.', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_path_expands_group_dots() {
        let c: Coordinate = "org.example:tool:jar:1.2".parse().unwrap();
        assert_eq!(descriptor_path(&c), "org/example/tool/1.2/tool-1.2.json");
    }

    #[test]
    fn descriptor_path_appends_classifier() {
        let c: Coordinate = "g:a:jar:sources:1".parse().unwrap();
        assert_eq!(descriptor_path(&c), "g/a/1/a-1-sources.json");
    }

    #[test]
    fn versions_path_sits_beside_version_directories() {
        let c: Coordinate = "org.example:tool:jar:[1,2)".parse().unwrap();
        assert_eq!(versions_path(&c), "org/example/tool/versions.json");
    }
}
