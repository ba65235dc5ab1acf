//! Project Tests
//!
//! Drive a whole project through `Resolver::for_project` with a stand-in
//! compiler: a shell script that prints a fixed `#define` dump.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use fwdeps::config::FeatureOverride;
use fwdeps::merge::DeferredScripts;
use fwdeps::toolchain::CompilerSource;
use fwdeps::{ProjectConfig, ResolveError, Resolver};
use tempfile::TempDir;

const FAKE_COMPILER: &str = r##"#!/bin/sh
for arg in "$@"; do
  if [ "$arg" = "-DMOTHERBOARD=BOARD_TEST" ]; then
    echo "#define HAS_BOARD 1"
  fi
  if [ "$arg" = "-D__MARLIN_DEPS__" ]; then
    echo "#define PROBING 1"
  fi
done
echo "#define HAS_LCD 1"
echo "#define TMC_UART HAS_LCD"
echo "#define HAS_WIFI 0"
"##;

fn write_executable(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    let mut perms = fs::metadata(path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).unwrap();
}

fn project(content: &str) -> ProjectConfig {
    ProjectConfig::parse(content).unwrap()
}

fn compiler_in(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("bin/fake-g++");
    write_executable(&path, FAKE_COMPILER);
    path
}

#[test]
fn test_resolve_with_custom_compiler() {
    let dir = TempDir::new().unwrap();
    let compiler = compiler_in(&dir);

    let config = project(&format!(
        r#"
[features]
HAS_LCD = "lib_deps=olikraus/U8glib-HAL@0.4.1\nsrc_filter=+<src/lcd>"
TMC_UART = "teemuatlut/TMCStepper@~0.7.1"
HAS_WIFI = "lib_deps=esp/WiFi\nsrc_filter=-<src/lcd>"
HAS_BOARD = "build_flags=-DBOARD_SEEN"

[env]
build_flags = ["-DMOTHERBOARD=BOARD_TEST"]
src_filter = ["+<src/*>", "-<src/lcd>"]
custom_gcc = "{}"
"#,
        compiler.display()
    ));

    let resolver = Resolver::for_project(&config, &[], dir.path()).unwrap();
    let resolution = resolver
        .resolve(config.build_configuration(), &mut DeferredScripts::new())
        .unwrap();

    assert_eq!(resolution.enabled, vec!["HAS_LCD", "TMC_UART", "HAS_BOARD"]);
    assert_eq!(resolution.disabled, vec!["HAS_WIFI"]);
    assert_eq!(
        resolution.config.lib_deps,
        vec!["olikraus/U8glib-HAL@0.4.1", "teemuatlut/TMCStepper@~0.7.1"]
    );
    assert_eq!(resolution.config.src_filter, "+<src/lcd> +<src/*>");
    assert_eq!(
        resolution.config.build_flags,
        vec!["-DMOTHERBOARD=BOARD_TEST", "-DBOARD_SEEN"]
    );
    assert_eq!(resolution.ignored_unused, vec!["WiFi"]);

    assert!(resolver.is_enabled("PROBING").unwrap());
    assert_eq!(resolver.macro_value("TMC_UART").unwrap(), Some("HAS_LCD"));
    assert_eq!(resolver.evaluator().source().compiler().source, CompilerSource::Override);
}

#[test]
fn test_cli_override_wins() {
    let dir = TempDir::new().unwrap();
    let compiler = compiler_in(&dir);

    let config = project(&format!(
        r#"
[features]
TMC_UART = "teemuatlut/TMCStepper@~0.7.1"

[env]
custom_gcc = "{}"
"custom_feature.TMC_UART" = "teemuatlut/TMCStepper@0.7.5"
"#,
        compiler.display()
    ));

    let cli = [FeatureOverride::new("TMC_UART", "teemuatlut/TMCStepper@0.8.0")];
    let resolver = Resolver::for_project(&config, &cli, dir.path()).unwrap();
    let resolution = resolver
        .resolve(config.build_configuration(), &mut DeferredScripts::new())
        .unwrap();

    assert_eq!(resolution.config.lib_deps, vec!["teemuatlut/TMCStepper@0.8.0"]);
}

#[test]
fn test_discovered_compiler_is_cached() {
    let dir = TempDir::new().unwrap();
    let packages = dir.path().join("packages");
    let bin = packages.join("toolchain-gccarmnoneeabi/bin");
    write_executable(&bin.join("arm-none-eabi-g++"), FAKE_COMPILER);

    let scratch = dir.path().join(".pio/build/test_env");
    fs::create_dir_all(&scratch).unwrap();

    let config = project(&format!(
        r#"
[features]
HAS_LCD = "lcd_lib"

[env]
name = "test_env"
platform = "linux"
packages_dir = "{}"
path = "/nonexistent:{}"
"#,
        packages.display(),
        bin.display()
    ));

    let resolver = Resolver::for_project(&config, &[], dir.path()).unwrap();
    assert!(resolver.is_enabled("HAS_LCD").unwrap());

    let compiler = resolver.evaluator().source().compiler();
    assert_eq!(compiler.source, CompilerSource::SearchPath);
    assert_eq!(compiler.path, bin.join("arm-none-eabi-g++"));

    let cached = fs::read_to_string(scratch.join(".gcc_path")).unwrap();
    assert_eq!(cached, bin.join("arm-none-eabi-g++").to_string_lossy());

    // A second pass reads the cache instead of searching
    let again = Resolver::for_project(&config, &[], dir.path()).unwrap();
    assert_eq!(again.evaluator().source().compiler().source, CompilerSource::Cache);
}

#[test]
fn test_failing_compiler_aborts() {
    let dir = TempDir::new().unwrap();
    let compiler = dir.path().join("bin/broken-g++");
    write_executable(&compiler, "#!/bin/sh\necho 'fatal: no header' >&2\nexit 1\n");

    let config = project(&format!(
        "[features]\nHAS_LCD = \"lcd_lib\"\n\n[env]\ncustom_gcc = \"{}\"\n",
        compiler.display()
    ));

    let resolver = Resolver::for_project(&config, &[], dir.path()).unwrap();
    let err = resolver
        .resolve(config.build_configuration(), &mut DeferredScripts::new())
        .unwrap_err();
    assert!(matches!(err, ResolveError::Eval(_)));
}

#[test]
fn test_old_build_tool_rejected() {
    let config = project("[env]\nbuild_tool_version = \"4.3.1\"\n");
    let dir = TempDir::new().unwrap();
    let err = Resolver::for_project(&config, &[], dir.path()).err().unwrap();
    assert!(matches!(err, ResolveError::Version(_)));
}
