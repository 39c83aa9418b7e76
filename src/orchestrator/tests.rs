use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::*;
use crate::bundler::{BuildStats, BundleEvent, Bundler, BundlerError, Generation};
use crate::config::{Mode, SiteConfig, test_site_config};
use crate::css::{self, Concatenator, CssError};
use crate::mirror::MirrorIntent;
use crate::utils::hash;

fn success(tag: &str) -> Event {
    Event::Bundle(BundleEvent::new(Ok(BuildStats {
        generation: Generation::of_diagnostics(tag),
        chunks: 1,
        duration: Duration::ZERO,
    })))
}

fn failure(diagnostics: &str) -> Event {
    Event::Bundle(BundleEvent::new(Err(BundlerError::Compile {
        diagnostics: diagnostics.into(),
    })))
}

fn steady(has_stylesheets: bool) -> Orchestrator {
    let mut machine = Orchestrator::new(has_stylesheets, false);
    machine.start();
    machine.handle(success("first"));
    assert_eq!(machine.phase(), Phase::Steady);
    machine
}

fn names(effects: &[Effect]) -> Vec<String> {
    effects.iter().map(|e| format!("{e:?}")).collect()
}

#[test]
fn test_start() {
    let mut machine = Orchestrator::new(true, true);
    assert_eq!(machine.phase(), Phase::Initializing);
    assert_eq!(
        names(&machine.start()),
        ["CleanOutput", "MirrorAll", "WatchPublic", "WatchBundler"]
    );
    assert_eq!(machine.phase(), Phase::WaitingFirstBundle);
}

#[test]
fn test_first_bundle_with_stylesheets() {
    let mut machine = Orchestrator::new(true, true);
    machine.start();
    assert_eq!(
        names(&machine.handle(success("a"))),
        [
            "Log(\"Compiled JS.\")",
            "CompileStylesheets",
            "StartServer",
            "WatchStylesheets",
            "WatchTemplate",
        ]
    );
    assert_eq!(machine.phase(), Phase::Steady);
}

#[test]
fn test_first_bundle_without_stylesheets() {
    let mut machine = Orchestrator::new(false, false);
    machine.start();
    assert_eq!(
        names(&machine.handle(success("a"))),
        ["Log(\"Compiled JS.\")", "WriteHtml(None)", "StartServer"]
    );
}

#[test]
fn test_failed_first_bundle_keeps_waiting() {
    let mut machine = Orchestrator::new(true, false);
    machine.start();
    let effects = machine.handle(failure("main.js:1 unexpected token"));
    assert!(matches!(effects.as_slice(), [Effect::Report(_)]));
    assert_eq!(machine.phase(), Phase::WaitingFirstBundle);

    // An infrastructure error is reported too
    let effects = machine.handle(Event::Bundle(BundleEvent::new(Err(BundlerError::Io(
        std::io::Error::other("spawn failed"),
    )))));
    assert!(matches!(effects.as_slice(), [Effect::Report(_)]));
    assert_eq!(machine.phase(), Phase::WaitingFirstBundle);

    // Fixing the error recovers
    assert_eq!(machine.handle(success("fixed")).len(), 4);
    assert_eq!(machine.phase(), Phase::Steady);
}

#[test]
fn test_duplicate_generation_discarded() {
    let mut machine = Orchestrator::new(false, false);
    machine.start();
    assert!(!machine.handle(success("a")).is_empty());
    assert!(machine.handle(success("a")).is_empty());

    // Duplicate failures are reported once
    assert_eq!(machine.handle(failure("boom")).len(), 1);
    assert!(machine.handle(failure("boom")).is_empty());

    // Back to the earlier output: not a duplicate of the last event
    assert_eq!(
        names(&machine.handle(success("a"))),
        ["Log(\"Compiled JS.\")", "WriteHtml(None)"]
    );
}

#[test]
fn test_later_bundles_never_compile_stylesheets() {
    let mut machine = steady(true);
    machine.handle(Event::StylesheetsCompiled(PathBuf::from("/out/a-1.css")));

    let effects = names(&machine.handle(success("second")));
    assert_eq!(
        effects,
        ["Log(\"Compiled JS.\")", "WriteHtml(Some(\"/out/a-1.css\"))"]
    );
}

#[test]
fn test_stylesheet_change_only_compiles_stylesheets() {
    let mut machine = steady(true);
    assert_eq!(
        names(&machine.handle(Event::StylesheetsChanged)),
        ["CompileStylesheets"]
    );

    // Ignored before the first bundle
    let mut waiting = Orchestrator::new(true, false);
    waiting.start();
    assert!(waiting.handle(Event::StylesheetsChanged).is_empty());
}

#[test]
fn test_stale_stylesheet_removed_after_html() {
    let mut machine = steady(true);
    let first = machine.handle(Event::StylesheetsCompiled(PathBuf::from("/out/a-111.css")));
    assert_eq!(
        names(&first),
        ["Log(\"Compiled CSS.\")", "WriteHtml(Some(\"/out/a-111.css\"))"]
    );

    let second = machine.handle(Event::StylesheetsCompiled(PathBuf::from("/out/a-222.css")));
    assert_eq!(
        names(&second),
        [
            "Log(\"Compiled CSS.\")",
            "WriteHtml(Some(\"/out/a-222.css\"))",
            "RemoveStylesheet(\"/out/a-111.css\")",
        ]
    );
    assert_eq!(machine.stylesheet(), Some(&PathBuf::from("/out/a-222.css")));

    // Unhashed output keeps its name: nothing to remove
    let same = machine.handle(Event::StylesheetsCompiled(PathBuf::from("/out/a-222.css")));
    assert_eq!(same.len(), 2);
}

#[test]
fn test_stylesheet_failure_reported() {
    let mut machine = steady(true);
    let effects = machine.handle(Event::StylesheetsFailed(CssError::Empty));
    assert!(matches!(
        effects.as_slice(),
        [Effect::Report(e), Effect::WriteHtml { stylesheet: None }]
            if e.to_string().contains("No stylesheets provided")
    ));

    // A later failure keeps linking the last good stylesheet
    machine.handle(Event::StylesheetsCompiled(PathBuf::from("/out/a-1.css")));
    let effects = names(&machine.handle(Event::StylesheetsFailed(CssError::Empty)));
    assert_eq!(effects[1], "WriteHtml(Some(\"/out/a-1.css\"))");
}

#[test]
fn test_mirror_events() {
    let mut waiting = Orchestrator::new(false, false);
    waiting.start();
    assert_eq!(
        names(&waiting.handle(Event::Mirror(MirrorIntent::copy("robots.txt")))),
        [
            "Log(\"Copying robots.txt\")",
            "CommitMirror(MirrorIntent { relative_path: \"robots.txt\", kind: Copy })",
        ]
    );

    let mut machine = steady(false);
    assert_eq!(
        names(&machine.handle(Event::Mirror(MirrorIntent::delete("old.png")))),
        [
            "Log(\"Deleting old.png\")",
            "CommitMirror(MirrorIntent { relative_path: \"old.png\", kind: Delete })",
            "WriteHtml(None)",
        ]
    );
}

#[test]
fn test_template_change() {
    let mut machine = steady(false);
    assert_eq!(
        names(&machine.handle(Event::TemplateChanged)),
        ["WriteHtml(None)"]
    );
}

// ============================================================================
// Coordinator
// ============================================================================

/// Writes a manifest and a main chunk, counting runs.
struct FakeBundler {
    assets_dir: PathBuf,
    ready: bool,
    runs: AtomicUsize,
}

impl FakeBundler {
    fn new(config: &SiteConfig, ready: bool) -> Arc<Self> {
        Arc::new(Self {
            assets_dir: config.assets_dir(),
            ready,
            runs: AtomicUsize::new(0),
        })
    }
}

impl Bundler for FakeBundler {
    fn prepare(&self) -> Result<(), BundlerError> {
        if self.ready {
            Ok(())
        } else {
            Err(BundlerError::Setup("entry module not found: src/main.js".into()))
        }
    }

    fn run(&self) -> Result<BuildStats, BundlerError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(&self.assets_dir)?;
        std::fs::write(self.assets_dir.join("main.js"), "main()")?;
        std::fs::write(
            self.assets_dir.join("manifest.json"),
            r#"{ "main": { "js": "/assets/main.js" } }"#,
        )?;
        Ok(BuildStats {
            generation: Generation::of_diagnostics("fake"),
            chunks: 1,
            duration: Duration::ZERO,
        })
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }
}

async fn wait_until(condition: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

async fn wait_for(path: &Path) -> bool {
    wait_until(|| path.exists()).await
}

/// A site with one stylesheet, `app.css`.
fn stylesheet_site(dir: &TempDir, mode: Mode, css: &str) -> Arc<SiteConfig> {
    let mut config = test_site_config(dir.path(), mode);
    config.css.stylesheets = vec!["app.css".into()];
    std::fs::write(dir.path().join("app.css"), css).unwrap();
    Arc::new(config)
}

/// Hashed `app-*.css` outputs currently in the assets directory.
fn hashed_stylesheets(config: &SiteConfig) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(config.assets_dir()) else {
        return Vec::new();
    };
    entries
        .map(|e| e.unwrap().path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy();
            name.starts_with("app-") && name.ends_with(".css")
        })
        .collect()
}

fn spawn(
    config: &Arc<SiteConfig>,
    bundler: Arc<FakeBundler>,
) -> (mpsc::Sender<Event>, JoinHandle<anyhow::Result<()>>) {
    let concatenator = Arc::new(Concatenator::new());
    let coordinator = Coordinator::new(Arc::clone(config), bundler, concatenator).without_server();
    let sender = coordinator.sender();
    (sender, tokio::spawn(coordinator.run()))
}

#[tokio::test]
async fn test_coordinator_builds_site() {
    let dir = TempDir::new().unwrap();
    let config = stylesheet_site(&dir, Mode::Development, "body { color: red }");
    std::fs::create_dir_all(&config.build.public).unwrap();
    std::fs::write(config.build.public.join("robots.txt"), "User-agent: *").unwrap();

    let (_sender, handle) = spawn(&config, FakeBundler::new(&config, true));

    let index = config.output_dir().join("index.html");
    assert!(wait_for(&index).await);
    let html = std::fs::read_to_string(&index).unwrap();
    assert!(html.contains(r#"<link rel="stylesheet" href="/assets/app.css">"#));
    assert!(html.contains(r#"<script src="/assets/main.js"></script>"#));
    assert!(config.output_dir().join("robots.txt").exists());
    assert!(config.assets_dir().join("app.css.map").exists());
    handle.abort();
}

#[tokio::test]
async fn test_coordinator_writes_html_when_first_stylesheet_fails() {
    let dir = TempDir::new().unwrap();
    let config = stylesheet_site(&dir, Mode::Development, "..b { color: red }");
    let (_sender, handle) = spawn(&config, FakeBundler::new(&config, true));

    let index = config.output_dir().join("index.html");
    assert!(wait_for(&index).await);
    let html = std::fs::read_to_string(&index).unwrap();
    assert!(html.contains(r#"<script src="/assets/main.js"></script>"#));
    assert!(!html.contains("stylesheet"));
    handle.abort();
}

#[tokio::test]
async fn test_coordinator_stylesheet_change_replaces_hashed_output() {
    let dir = TempDir::new().unwrap();
    let config = stylesheet_site(&dir, Mode::Production, "body { color: red }");
    let bundler = FakeBundler::new(&config, true);
    let (sender, handle) = spawn(&config, Arc::clone(&bundler));

    assert!(wait_until(|| hashed_stylesheets(&config).len() == 1).await);
    let first = hashed_stylesheets(&config).remove(0);
    assert!(wait_for(&config.output_dir().join("index.html")).await);

    std::fs::write(dir.path().join("app.css"), "body { color: blue }").unwrap();
    sender.send(Event::StylesheetsChanged).await.unwrap();

    let index = config.output_dir().join("index.html");
    assert!(
        wait_until(|| {
            let current = hashed_stylesheets(&config);
            current.len() == 1 && current[0] != first
        })
        .await
    );
    let second = hashed_stylesheets(&config).remove(0);
    let name = second.file_name().unwrap().to_string_lossy().into_owned();
    assert!(wait_until(|| std::fs::read_to_string(&index).unwrap().contains(&name)).await);

    assert!(!first.exists());
    assert!(!css::map_path_for(&first).exists());
    assert!(css::map_path_for(&second).exists());
    // Stylesheet edits never re-run the bundler
    assert_eq!(bundler.runs.load(Ordering::SeqCst), 1);
    handle.abort();
}

#[tokio::test]
async fn test_coordinator_prunes_replaced_relocated_assets() {
    let dir = TempDir::new().unwrap();
    let config = stylesheet_site(&dir, Mode::Development, "body { background: url(bg.png) }");
    std::fs::write(dir.path().join("bg.png"), b"one").unwrap();
    let relocated = |bytes: &[u8]| {
        config
            .assets_dir()
            .join(hash::hashed_file_name(Path::new("bg.png"), &hash::fingerprint(bytes)))
    };
    let (sender, handle) = spawn(&config, FakeBundler::new(&config, true));

    assert!(wait_for(&config.output_dir().join("index.html")).await);
    assert!(relocated(b"one").is_file());

    std::fs::write(dir.path().join("bg.png"), b"two").unwrap();
    sender.send(Event::StylesheetsChanged).await.unwrap();

    assert!(wait_for(&relocated(b"two")).await);
    assert!(wait_until(|| !relocated(b"one").exists()).await);
    handle.abort();
}

#[tokio::test]
async fn test_coordinator_setup_error_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = Arc::new(test_site_config(dir.path(), Mode::Development));
    let bundler = FakeBundler::new(&config, false);
    let result = Coordinator::new(config, bundler, Arc::new(Concatenator::new()))
        .without_server()
        .run()
        .await;
    let err = result.unwrap_err();
    assert!(err.to_string().contains("entry module not found"));
}
