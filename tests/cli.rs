// Copyright © 2024 Twinpress. All rights reserved.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end tests of the `twinpress` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>{{pageTitle}}</title>
  <link rel="stylesheet" href="{{asset_url "css/site.css"}}">
  <!-- Live reload client -->
  <script type="module" src="/__twinpress/live-reload.js"></script>
</head>
<body>
  <nav>{{#each navigation}}<a href="{{url}}">{{title}}</a>{{/each}}</nav>
</body>
</html>
"#;

fn theme(root: &Path) {
    fs::create_dir_all(root.join("views/@pages")).unwrap();
    fs::create_dir_all(root.join("assets/css")).unwrap();
    fs::write(root.join("views/index.html"), INDEX).unwrap();
    fs::write(
        root.join("views/@pages/about.html"),
        "<h1>{{pageTitle}}</h1>\n<a href=\"{{page_url \"contact\"}}\">Contact</a>\n",
    )
    .unwrap();
    fs::write(root.join("views/@pages/contact.html"), "<h1>{{pageTitle}}</h1>\n").unwrap();
    fs::write(root.join("assets/css/site.css"), "body { margin: 0; }").unwrap();
}

fn twinpress(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("twinpress").unwrap();
    _ = cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = TempDir::new().unwrap();
    _ = twinpress(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("build"));
}

#[test]
fn test_build_produces_static_site() {
    let temp_dir = TempDir::new().unwrap();
    theme(temp_dir.path());

    _ = twinpress(temp_dir.path()).arg("build").assert().success();

    let dist = temp_dir.path().join("dist");
    let index = fs::read_to_string(dist.join("index.html")).unwrap();
    assert!(index.contains("href=\"./assets/css/site.css\""));
    assert!(index.contains("<a href=\"./about.html\">About</a>"));
    assert!(index.contains("<a href=\"./contact.html\">Contact</a>"));
    assert!(!index.contains("live-reload"));
    assert!(!index.contains("<!-- Live reload client -->"));

    let about = fs::read_to_string(dist.join("about.html")).unwrap();
    assert!(about.contains("<h1>About - Theme Default</h1>"));
    assert!(about.contains("href=\"./contact.html\""));
    assert_eq!(
        fs::read_to_string(dist.join("assets/css/site.css")).unwrap(),
        "body { margin: 0; }"
    );
}

#[test]
fn test_build_reads_config_file_and_flags() {
    let temp_dir = TempDir::new().unwrap();
    theme(temp_dir.path());
    fs::write(
        temp_dir.path().join("site.toml"),
        "[site]\ntitle = \"Studio\"\n\n[custom]\nauthor = \"Ada\"\n",
    )
    .unwrap();

    _ = twinpress(temp_dir.path())
        .args(["build", "--config", "site.toml", "--output", "public"])
        .assert()
        .success();

    let about = fs::read_to_string(temp_dir.path().join("public/about.html")).unwrap();
    assert!(about.contains("<h1>About - Studio</h1>"));
    assert!(!temp_dir.path().join("dist").exists());
}

#[test]
fn test_build_failure_exits_non_zero_after_other_pages() {
    let temp_dir = TempDir::new().unwrap();
    theme(temp_dir.path());
    fs::write(
        temp_dir.path().join("views/@pages/broken.html"),
        "{{#each navigation}}",
    )
    .unwrap();

    _ = twinpress(temp_dir.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to build"));

    let dist = temp_dir.path().join("dist");
    assert!(dist.join("about.html").is_file());
    assert!(dist.join("contact.html").is_file());
    assert!(!dist.join("broken.html").exists());
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    theme(temp_dir.path());

    _ = twinpress(temp_dir.path())
        .args(["serve", "--no-watch"])
        .env("TWINPRESS_SERVER_PORT", "0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("port must be non-zero"));
}

#[test]
fn test_build_reads_custom_values_and_ignores_stray_environment() {
    let temp_dir = TempDir::new().unwrap();
    theme(temp_dir.path());
    fs::write(
        temp_dir.path().join("views/@pages/credits.html"),
        "<p>{{author}}</p>\n",
    )
    .unwrap();

    _ = twinpress(temp_dir.path())
        .arg("build")
        .env("TWINPRESS_CUSTOM_AUTHOR", "Ada")
        .env("TWINPRESS_LOG", "debug")
        .assert()
        .success();

    let credits = fs::read_to_string(temp_dir.path().join("dist/credits.html")).unwrap();
    assert!(credits.contains("<p>Ada</p>"));
}
