//! Collection against a filesystem repository, through the full stack:
//! collector, JSON descriptor reader, metadata range resolver and file
//! transporter.

use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use quarry_collect::{CollectRequest, Collector};
use quarry_core::{Dependency, RemoteRepository, Session};
use quarry_reader::{JsonDescriptorReader, MetadataVersionRangeResolver};
use quarry_transport::FileTransporterFactory;

fn write(dir: &TempDir, resource: &str, contents: &str) {
    let path = dir.path().join(resource);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn repository(dir: &TempDir, id: &str) -> RemoteRepository {
    RemoteRepository::new(id, format!("file://{}", dir.path().display()))
}

fn collector() -> Collector {
    let transporters = Arc::new(FileTransporterFactory);
    Collector::new(
        Arc::new(JsonDescriptorReader::new(transporters.clone())),
        Arc::new(MetadataVersionRangeResolver::new(transporters)),
    )
}

#[test]
fn collects_a_transitive_graph_from_disk() {
    let repo = TempDir::new().unwrap();
    write(
        &repo,
        "org/example/app/1.0/app-1.0.json",
        r#"{
            "dependencies": [
                {"coordinate": {"groupId": "org.example", "artifactId": "lib", "version": "[1,2)"}, "scope": "compile"}
            ]
        }"#,
    );
    write(
        &repo,
        "org/example/lib/versions.json",
        r#"{"versions": ["1.0", "1.1", "2.0"]}"#,
    );
    write(
        &repo,
        "org/example/lib/1.1/lib-1.1.json",
        r#"{
            "dependencies": [
                {"coordinate": {"groupId": "org.example", "artifactId": "util", "version": "0.3"}, "scope": "compile"}
            ]
        }"#,
    );
    write(&repo, "org/example/util/0.3/util-0.3.json", "{}");

    let root = Dependency::new("org.example:app:jar:1.0".parse().unwrap());
    let request = CollectRequest::root(root, vec![repository(&repo, "local")]);
    let result = collector()
        .collect(&Session::default(), request)
        .unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(
        result.graph.to_text(),
        "org.example:app:jar:1.0\n  org.example:lib:jar:1.1:compile\n    org.example:util:jar:0.3:compile\n"
    );

    // the range landed on the highest matching version and remembers its
    // hosting repository
    let lib = result.graph.node(result.graph.node_at(&[0]).unwrap());
    assert_eq!(lib.versions(), &["1.0", "1.1"]);
    assert_eq!(lib.repositories().len(), 1);
    assert_eq!(lib.repositories()[0].id, "local");
}

#[test]
fn missing_descriptors_surface_as_recorded_failures() {
    let repo = TempDir::new().unwrap();
    write(
        &repo,
        "g/app/1/app-1.json",
        r#"{
            "dependencies": [
                {"coordinate": {"groupId": "g", "artifactId": "ghost", "version": "1"}, "scope": "compile"}
            ]
        }"#,
    );

    let root = Dependency::new("g:app:jar:1".parse().unwrap());
    let request = CollectRequest::root(root, vec![repository(&repo, "local")]);
    let error = collector()
        .collect(&Session::default(), request)
        .unwrap_err();

    let quarry_collect::Error::Collection { result } = error else {
        panic!("expected a collection error");
    };
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].is_descriptor());
    // the healthy part of the graph survives
    assert_eq!(result.graph.node_count(), 1);
}

#[test]
fn second_repository_serves_what_the_first_lacks() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    write(
        &first,
        "g/app/1/app-1.json",
        r#"{
            "dependencies": [
                {"coordinate": {"groupId": "g", "artifactId": "lib", "version": "1"}, "scope": "compile"}
            ]
        }"#,
    );
    write(&second, "g/lib/1/lib-1.json", "{}");

    let root = Dependency::new("g:app:jar:1".parse().unwrap());
    let request = CollectRequest::root(
        root,
        vec![repository(&first, "first"), repository(&second, "second")],
    );
    let result = collector()
        .collect(&Session::default(), request)
        .unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.graph.node_count(), 2);
}
