use std::collections::{BTreeSet, VecDeque};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use super::{Effect, Event, Orchestrator};
use crate::asset::AssetPaths;
use crate::bundler::{Bundler, BundlerWatch};
use crate::config::SiteConfig;
use crate::css::{self, Concatenator};
use crate::html::HtmlCompiler;
use crate::mirror::{Mirror, MirrorWatch};
use crate::serve::DevServer;
use crate::watcher::ChangeStream;
use crate::{debug, log, logger};

const CHANNEL_BUFFER: usize = 64;

/// Applies [`Effect`]s and feeds producer events back into the state machine.
pub struct Coordinator {
    config: Arc<SiteConfig>,
    machine: Orchestrator,
    bundler: Arc<dyn Bundler>,
    concatenator: Arc<Concatenator>,
    html: HtmlCompiler,
    mirror: Mirror,
    serve: bool,
    tx: mpsc::Sender<Event>,
    rx: mpsc::Receiver<Event>,
    server: Option<JoinHandle<()>>,
    /// Relocated assets of the current stylesheet.
    assets: BTreeSet<PathBuf>,
    /// Assets only the previous stylesheet used; pruned after the next HTML write.
    stale_assets: Vec<PathBuf>,
}

impl Coordinator {
    pub fn new(
        config: Arc<SiteConfig>,
        bundler: Arc<dyn Bundler>,
        concatenator: Arc<Concatenator>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER);
        Self {
            machine: Orchestrator::new(config.css.is_enabled(), config.build.template.is_some()),
            html: HtmlCompiler::from_config(&config),
            mirror: Mirror::new(&config.build.public, config.output_dir()),
            serve: true,
            bundler,
            concatenator,
            tx,
            rx,
            server: None,
            assets: BTreeSet::new(),
            stale_assets: Vec::new(),
            config,
        }
    }

    /// Skip the dev server (`StartServer` becomes a no-op).
    pub fn without_server(mut self) -> Self {
        self.serve = false;
        self
    }

    /// Sender producers use to reach the state machine.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    /// Run until every producer has stopped.
    ///
    /// Only setup failures end the session with an error; everything else is
    /// reported and watching continues.
    pub async fn run(mut self) -> Result<()> {
        let effects = self.machine.start();
        self.run_effects(effects).await?;

        while let Some(event) = self.rx.recv().await {
            let effects = self.machine.handle(event);
            self.run_effects(effects).await?;
        }
        Ok(())
    }

    /// Apply effects in order. Events produced by an effect are handled
    /// before the next effect runs.
    async fn run_effects(&mut self, effects: Vec<Effect>) -> Result<()> {
        let mut pending: VecDeque<Effect> = effects.into();
        while let Some(effect) = pending.pop_front() {
            debug!("orchestrator"; "{:?}", effect);
            if let Some(event) = self.apply(effect).await? {
                for follow_up in self.machine.handle(event).into_iter().rev() {
                    pending.push_front(follow_up);
                }
            }
        }
        Ok(())
    }

    async fn apply(&mut self, effect: Effect) -> Result<Option<Event>> {
        match effect {
            Effect::CleanOutput => {
                let dir = self.config.output_dir();
                crate::utils::build::clean_output(dir)
                    .with_context(|| format!("failed to clean {}", dir.display()))?;
            }
            Effect::MirrorAll => {
                let mirror = self.mirror.clone();
                let copied = tokio::task::spawn_blocking(move || mirror.copy_all())
                    .await?
                    .context("failed to copy the public directory")?;
                debug!("mirror"; "copied {} files", copied);
            }
            Effect::WatchPublic => self.watch_public()?,
            Effect::WatchBundler => self.watch_bundler()?,
            Effect::Log(msg) => log!("build"; "{}", msg),
            Effect::Report(err) => logger::report(&err),
            Effect::CompileStylesheets => return self.compile_stylesheets().await.map(Some),
            Effect::WriteHtml { stylesheet } => self.write_html(stylesheet),
            Effect::StartServer => self.start_server()?,
            Effect::WatchStylesheets => {
                let stream = ChangeStream::watch(&css::local_sources(&self.config))
                    .context("failed to watch stylesheets")?;
                forward_changes(stream, self.tx.clone(), || Event::StylesheetsChanged);
            }
            Effect::WatchTemplate => {
                let Some(template) = self.config.build.template.clone() else {
                    return Ok(None);
                };
                let stream =
                    ChangeStream::watch(&[template]).context("failed to watch the template")?;
                forward_changes(stream, self.tx.clone(), || Event::TemplateChanged);
            }
            Effect::RemoveStylesheet(path) => {
                if let Err(e) = css::remove_output(&path) {
                    let err = anyhow::Error::new(e)
                        .context(format!("failed to remove {}", path.display()));
                    logger::report(&err);
                }
            }
            Effect::CommitMirror(intent) => {
                if let Err(e) = self.mirror.commit(&intent) {
                    let err = anyhow::Error::new(e).context(intent.describe());
                    logger::report(&err);
                }
            }
        }
        Ok(None)
    }

    fn watch_public(&self) -> Result<()> {
        let mut watch = MirrorWatch::watch(self.mirror.clone())
            .context("failed to watch the public directory")?;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(intents) = watch.next().await {
                for intent in intents {
                    if tx.send(Event::Mirror(intent)).await.is_err() {
                        return;
                    }
                }
            }
        });
        Ok(())
    }

    /// Setup errors (missing command or entry, watcher failure) end the session.
    fn watch_bundler(&self) -> Result<()> {
        let watch = BundlerWatch::start(Arc::clone(&self.bundler))?;
        let (bundle_tx, mut bundle_rx) = mpsc::channel(CHANNEL_BUFFER);
        tokio::spawn(watch.run(bundle_tx));

        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(bundle) = bundle_rx.recv().await {
                if tx.send(Event::Bundle(bundle)).await.is_err() {
                    return;
                }
            }
        });
        Ok(())
    }

    async fn compile_stylesheets(&mut self) -> Result<Event> {
        let concatenator = Arc::clone(&self.concatenator);
        let config = Arc::clone(&self.config);
        let result =
            tokio::task::spawn_blocking(move || css::compile_site(&concatenator, &config)).await?;
        Ok(match result {
            Ok(output) => {
                let current: BTreeSet<PathBuf> = output.assets.into_iter().collect();
                self.stale_assets.extend(self.assets.difference(&current).cloned());
                self.assets = current;
                Event::StylesheetsCompiled(output.output_path)
            }
            Err(err) => Event::StylesheetsFailed(err),
        })
    }

    fn write_html(&mut self, stylesheet: Option<PathBuf>) {
        let assets = AssetPaths::from_config(&self.config, stylesheet);
        match self.html.compile(&assets) {
            Ok(true) => debug!("html"; "wrote {}", self.html.index_path().display()),
            Ok(false) => {}
            Err(e) => logger::report(&e.into()),
        }
        self.prune_assets();
    }

    /// Delete relocated assets no stylesheet references anymore.
    fn prune_assets(&mut self) {
        for path in self.stale_assets.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("css"; "removed {}", path.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    let err = anyhow::Error::new(e)
                        .context(format!("failed to remove {}", path.display()));
                    logger::report(&err);
                }
            }
        }
    }

    fn start_server(&mut self) -> Result<()> {
        if !self.serve || self.server.is_some() {
            return Ok(());
        }
        let server = DevServer::bind(&self.config)?;
        server.log_ready(self.config.get_root());
        self.server = Some(server.spawn());
        Ok(())
    }
}

/// Send `make()` once per change batch until the receiver goes away.
fn forward_changes(mut stream: ChangeStream, tx: mpsc::Sender<Event>, make: fn() -> Event) {
    tokio::spawn(async move {
        while let Some(changes) = stream.next().await {
            for change in &changes {
                debug!("watch"; "{}: {}", change.kind.label(), change.path.display());
            }
            if tx.send(make()).await.is_err() {
                return;
            }
        }
    });
}
