//! ---
//! cs_section: "05-cli"
//! cs_subsection: "tests"
//! cs_type: "source"
//! cs_scope: "test"
//! cs_description: "End-to-end checks of the primitive CLI."
//! cs_version: "v0.1.0"
//! cs_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

const MANIFEST: &str = r#"
[primitives.web1]
agent = "ocf:heartbeat:IPaddr2"
parameters = { ip = "10.0.0.5" }
operations.monitor = { interval = "10s" }

[primitives.db]
agent = "ocf:linbit:drbd"
promotable = true
promotion_metadata = { target-role = "Started" }

[primitives.old]
ensure = "absent"
"#;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("cs-primitivectl").unwrap();
    cmd.env_remove("CS_PRIMITIVE_CONFIG").env("CS_PRIMITIVE_LOG", "off");
    cmd
}

fn write_manifest(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("primitives.toml");
    fs::write(&path, MANIFEST).unwrap();
    path
}

#[test]
fn render_prints_statements_in_manifest_order() {
    let dir = TempDir::new().unwrap();
    let manifest = write_manifest(&dir);
    let output = cli().arg("render").arg(&manifest).output().unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "primitive web1 ocf:heartbeat:IPaddr2 op monitor interval=10s params ip=10.0.0.5\n\
         primitive db ocf:linbit:drbd\n\
         ms ms_db db meta target-role=Started\n\
         # old: absent\n"
    );
}

#[test]
fn render_rejects_invalid_manifest() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[primitives.web1]\nagent = \"IPaddr2\"\n").unwrap();
    cli().arg("render").arg(&path).assert().failure();
}

#[test]
fn version_flag_prints_package_version() {
    let output = cli().arg("-V").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("cs-primitivectl "));
    assert!(stdout.trim_end().ends_with(env!("CARGO_PKG_VERSION")));
}

#[cfg(unix)]
mod with_fake_crm {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    const CIB: &str = r#"<cib><configuration><resources>
<primitive id="web1" class="ocf" provider="heartbeat" type="IPaddr2">
  <instance_attributes id="web1-ia"><nvpair id="web1-ip" name="ip" value="10.0.0.5"/></instance_attributes>
  <operations><op id="web1-mon" name="monitor" interval="10s"/></operations>
</primitive>
<primitive id="old" class="ocf" provider="heartbeat" type="Dummy"/>
</resources></configuration></cib>"#;

    /// Installs a `crm` stand-in that answers `configure show xml` and logs every call.
    fn install_fake_crm(dir: &Path) -> (PathBuf, PathBuf) {
        let log = dir.join("calls.log");
        fs::write(dir.join("cib.xml"), CIB).unwrap();
        let script = format!(
            "#!/bin/sh\n\
             echo \"$*\" >> {log}\n\
             if [ \"$1 $2 $3\" = \"configure show xml\" ]; then cat {cib}; fi\n\
             if [ \"$1 $2 $3\" = \"configure load update\" ]; then cat \"$4\" >> {log}; fi\n\
             exit 0\n",
            log = log.display(),
            cib = dir.join("cib.xml").display(),
        );
        let crm = dir.join("crm");
        fs::write(&crm, script).unwrap();
        fs::set_permissions(&crm, fs::Permissions::from_mode(0o755)).unwrap();

        let config = dir.join("config.toml");
        fs::write(
            &config,
            format!(
                "[crm]\nbinary = \"{}\"\nstaging_dir = \"{}\"\n\n[readiness]\nenabled = false\n",
                crm.display(),
                dir.display()
            ),
        )
        .unwrap();
        (config, log)
    }

    #[test]
    fn show_lists_discovered_primitives_as_json() {
        let dir = TempDir::new().unwrap();
        let (config, _) = install_fake_crm(dir.path());
        let output = cli()
            .args(["show", "--format", "json", "--config"])
            .arg(&config)
            .output()
            .unwrap();
        assert!(output.status.success());
        let primitives: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(primitives[0]["name"], "web1");
        assert_eq!(primitives[0]["agent"], "ocf:heartbeat:IPaddr2");
        assert_eq!(primitives[0]["operations"]["monitor"]["interval"], "10s");
    }

    #[test]
    fn dry_run_plans_without_touching_the_cluster() {
        let dir = TempDir::new().unwrap();
        let (config, log) = install_fake_crm(dir.path());
        let manifest = write_manifest(&dir);
        let output = cli()
            .arg("--config")
            .arg(&config)
            .args(["apply", "--dry-run"])
            .arg(&manifest)
            .output()
            .unwrap();
        assert!(output.status.success());
        assert_eq!(
            String::from_utf8(output.stdout).unwrap(),
            "create db (ocf:linbit:drbd)\ndestroy old\nunchanged web1\n"
        );
        let calls = fs::read_to_string(log).unwrap();
        assert_eq!(calls, "configure show xml\n");
    }

    #[test]
    fn apply_loads_new_primitives_and_destroys_absent_ones() {
        let dir = TempDir::new().unwrap();
        let (config, log) = install_fake_crm(dir.path());
        let manifest = write_manifest(&dir);
        cli()
            .arg("--config")
            .arg(&config)
            .arg("apply")
            .arg(&manifest)
            .assert()
            .success();

        let calls = fs::read_to_string(log).unwrap();
        let lines: Vec<&str> = calls.lines().collect();
        assert_eq!(lines[0], "configure show xml");
        assert!(lines[1].starts_with("configure load update "));
        assert_eq!(lines[2], "primitive db ocf:linbit:drbd");
        assert_eq!(lines[3], "ms ms_db db meta target-role=Started");
        assert_eq!(lines[4], "resource stop old");
        assert_eq!(lines[5], "configure delete old");
        assert_eq!(lines.len(), 6);
    }
}
