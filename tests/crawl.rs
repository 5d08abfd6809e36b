use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

fn papercrawl() -> Command {
    let mut cmd = Command::cargo_bin("papercrawl").expect("binary built");
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd
}

fn detail_page(title: &str) -> String {
    format!(
        r#"<html><head><meta name="citation_title" content="{title}"></head>
        <body><div class="card-body acl-abstract"><h5>Abstract</h5>
        <span>{title} is studied in depth across many settings here.</span></div></body></html>"#
    )
}

#[test]
fn crawl_acl_listing_override() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let listing = r#"<html><body>
        <a href="/2024.acl-long.2/">Two</a>
        <a href="/2024.acl-long.1/">One</a>
        <a href="/2024.acl-long.3/#abstract">Three</a>
        <a href="/volumes/2024.acl-long.pdf">Volume PDF</a>
        <a href="/people/a-person/">Author</a>
    </body></html>"#;
    let _listing = server.mock("GET", "/volumes/2024.acl-long/").with_body(listing).create();
    let _one = server.mock("GET", "/2024.acl-long.1/").with_body(detail_page("Paper One")).create();
    let _two = server.mock("GET", "/2024.acl-long.2/").with_body(detail_page("Paper Two")).create();
    let _three = server.mock("GET", "/2024.acl-long.3/").with_body(detail_page("Paper Three")).create();
    let _bib = server
        .mock("GET", "/2024.acl-long.1.bib")
        .with_body("@inproceedings{one-2024,\n  title = {Paper One}\n}\n")
        .create();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("acl.json");
    let output = papercrawl()
        .args(["crawl", "acl", "--year", "2024", "--track", "long"])
        .args(["--delay", "0", "--retries", "1", "--no-progress"])
        .arg("--listing-url")
        .arg(format!("{}/volumes/2024.acl-long/", server.url()))
        .arg("--out")
        .arg(&out)
        .output()?;

    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(output.status.success(), "stderr=\n{stderr}");
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.trim(), out.display().to_string());
    assert!(stderr.contains("✓ 3") && stderr.contains("✗ 0"), "stderr=\n{stderr}");

    let records: Value = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    let records = records.as_array().expect("array");
    assert_eq!(records.len(), 3);
    let links: Vec<&str> = records.iter().map(|r| r["link"].as_str().unwrap()).collect();
    assert_eq!(
        links,
        [
            format!("{}/2024.acl-long.1/", server.url()),
            format!("{}/2024.acl-long.2/", server.url()),
            format!("{}/2024.acl-long.3/", server.url()),
        ]
    );
    assert_eq!(records[0]["title"], "Paper One");
    assert_eq!(
        records[0]["abstract"],
        "Paper One is studied in depth across many settings here."
    );
    assert_eq!(
        records[0]["citation_text"],
        "@inproceedings{one-2024,\n  title = {Paper One}\n}"
    );
    assert!(records[1]["citation_text"].is_null());
    assert_eq!(records[2]["keywords"], serde_json::json!([]));
    Ok(())
}

#[test]
fn failing_detail_page_is_skipped() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _listing = server
        .mock("GET", "/list")
        .with_body(r#"<a href="/2023.acl-long.1/">a</a><a href="/2023.acl-long.2/">b</a>"#)
        .create();
    let _ok = server.mock("GET", "/2023.acl-long.1/").with_body(detail_page("Fine")).create();
    let broken = server.mock("GET", "/2023.acl-long.2/").with_status(500).expect(2).create();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out.json");
    let output = papercrawl()
        .args(["crawl", "acl", "--year", "2023", "--delay", "0", "--retries", "2", "--no-progress"])
        .arg("--listing-url")
        .arg(format!("{}/list", server.url()))
        .arg("--out")
        .arg(&out)
        .output()?;

    assert!(output.status.success());
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stderr.contains("✓ 1") && stderr.contains("✗ 1"), "stderr=\n{stderr}");
    assert!(stderr.contains("skipping paper"), "stderr=\n{stderr}");
    broken.assert();

    let records: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(records.len(), 1);
    Ok(())
}

#[test]
fn listing_without_detail_links_writes_empty_array() -> Result<(), Box<dyn std::error::Error>> {
    let mut server = mockito::Server::new();
    let _listing = server.mock("GET", "/empty").with_body("<a href='/about/'>about</a>").create();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("empty.json");
    let output = papercrawl()
        .args(["crawl", "emnlp", "--year", "2024", "--delay", "0", "--retries", "1"])
        .arg("--listing-url")
        .arg(format!("{}/empty", server.url()))
        .arg("--out")
        .arg(&out)
        .output()?;

    assert!(output.status.success());
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(stderr.contains("no detail links"), "stderr=\n{stderr}");
    assert_eq!(std::fs::read_to_string(&out)?.trim(), "[]");
    Ok(())
}

#[test]
fn unknown_venue_fails_before_any_request() {
    papercrawl()
        .args(["crawl", "neurips", "--year", "2024"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unknown venue `neurips`"));
}

#[test]
fn unknown_track_lists_the_available_ones() {
    papercrawl()
        .args(["crawl", "emnlp", "--year", "2024", "--track", "long"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("main, findings"));
}

#[test]
fn venues_lists_builtin_profiles() {
    papercrawl()
        .arg("venues")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("aaai")
                .and(predicate::str::contains("acl"))
                .and(predicate::str::contains("eccv"))
                .and(predicate::str::contains("wacv")),
        );
}

#[test]
fn venues_json_can_be_fed_back_as_a_profile() -> Result<(), Box<dyn std::error::Error>> {
    let output = papercrawl().args(["venues", "--json"]).output()?;
    assert!(output.status.success());
    let profiles: Vec<Value> = serde_json::from_slice(&output.stdout)?;
    assert_eq!(profiles.len(), 7);

    let mut server = mockito::Server::new();
    let _listing = server
        .mock("GET", "/custom/2022")
        .with_body(r#"<a href="/2022.acl-long.9/">x</a>"#)
        .create();
    let _paper = server.mock("GET", "/2022.acl-long.9/").with_body(detail_page("Nine")).create();

    let mut acl = profiles
        .into_iter()
        .find(|p| p["id"] == "acl")
        .expect("acl profile");
    acl["id"] = "mine".into();
    acl["citation"] = serde_json::json!({"rule": "none"});
    acl["tracks"] = serde_json::json!([{"name": "all", "listings": [format!("{}/custom/{{year}}", server.url())]}]);

    let dir = tempfile::tempdir()?;
    let profile = dir.path().join("mine.json");
    std::fs::write(&profile, serde_json::to_string(&acl)?)?;
    let out = dir.path().join("mine.json.out");
    let output = papercrawl()
        .args(["crawl", "mine", "--year", "2022", "--delay", "0", "--retries", "1"])
        .arg("--profile")
        .arg(&profile)
        .arg("--out")
        .arg(&out)
        .output()?;
    let stderr = String::from_utf8(strip_ansi_escapes::strip(output.stderr))?;
    assert!(output.status.success(), "stderr=\n{stderr}");
    let records: Vec<Value> = serde_json::from_str(&std::fs::read_to_string(&out)?)?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["title"], "Nine");
    Ok(())
}

#[test]
fn bibtex_export_dedups_by_key() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("notes.json");
    let bib = dir.path().join("refs.bib");
    let entry = "@inproceedings{k1,\n  title = {One}\n}";
    let records = serde_json::json!([
        {"title": "One", "abstract": null, "keywords": [], "link": "https://x.org/1", "citation_text": entry},
        {"title": "One again", "abstract": null, "keywords": [], "link": "https://x.org/2", "_bibtex": entry},
        {"title": "None", "abstract": null, "keywords": [], "link": "https://x.org/3", "citation_text": null}
    ]);
    std::fs::write(&input, serde_json::to_string_pretty(&records)?)?;

    papercrawl()
        .arg("bibtex")
        .arg(&input)
        .arg("--out")
        .arg(&bib)
        .assert()
        .success()
        .stderr(predicate::str::contains("✓ 1").and(predicate::str::contains("✗ 1")));
    assert_eq!(std::fs::read_to_string(&bib)?, format!("{entry}\n"));
    Ok(())
}

#[test]
fn bibtex_export_without_entries_fails() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("notes.json");
    std::fs::write(&input, "[]")?;
    papercrawl()
        .arg("bibtex")
        .arg(&input)
        .arg("--out")
        .arg(dir.path().join("refs.bib"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("no BibTeX entries"));
    Ok(())
}
