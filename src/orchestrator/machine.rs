use std::fmt;
use std::path::PathBuf;

use crate::bundler::{BundleEvent, Generation};
use crate::css::CssError;
use crate::mirror::MirrorIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    WaitingFirstBundle,
    Steady,
}

/// Something that happened.
#[derive(Debug)]
pub enum Event {
    /// A bundler compile finished (successfully or not).
    Bundle(BundleEvent),
    /// A local stylesheet source changed.
    StylesheetsChanged,
    /// The stylesheet engine wrote a new output file.
    StylesheetsCompiled(PathBuf),
    StylesheetsFailed(CssError),
    /// A file in the public directory changed.
    Mirror(MirrorIntent),
    /// The HTML template file changed.
    TemplateChanged,
}

/// Something the coordinator must do.
pub enum Effect {
    CleanOutput,
    MirrorAll,
    WatchPublic,
    WatchBundler,
    Log(String),
    Report(anyhow::Error),
    CompileStylesheets,
    WriteHtml { stylesheet: Option<PathBuf> },
    StartServer,
    WatchStylesheets,
    WatchTemplate,
    RemoveStylesheet(PathBuf),
    CommitMirror(MirrorIntent),
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CleanOutput => f.write_str("CleanOutput"),
            Self::MirrorAll => f.write_str("MirrorAll"),
            Self::WatchPublic => f.write_str("WatchPublic"),
            Self::WatchBundler => f.write_str("WatchBundler"),
            Self::Log(msg) => write!(f, "Log({msg:?})"),
            Self::Report(err) => write!(f, "Report({err})"),
            Self::CompileStylesheets => f.write_str("CompileStylesheets"),
            Self::WriteHtml { stylesheet } => write!(f, "WriteHtml({stylesheet:?})"),
            Self::StartServer => f.write_str("StartServer"),
            Self::WatchStylesheets => f.write_str("WatchStylesheets"),
            Self::WatchTemplate => f.write_str("WatchTemplate"),
            Self::RemoveStylesheet(path) => write!(f, "RemoveStylesheet({path:?})"),
            Self::CommitMirror(intent) => write!(f, "CommitMirror({intent:?})"),
        }
    }
}

/// Watch-mode state.
#[derive(Debug)]
pub struct Orchestrator {
    phase: Phase,
    /// Generation of the last bundle event seen, failed or not.
    last_generation: Option<Generation>,
    /// Current stylesheet output.
    stylesheet: Option<PathBuf>,
    has_stylesheets: bool,
    has_template: bool,
}

impl Orchestrator {
    pub fn new(has_stylesheets: bool, has_template: bool) -> Self {
        Self {
            phase: Phase::Initializing,
            last_generation: None,
            stylesheet: None,
            has_stylesheets,
            has_template,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn stylesheet(&self) -> Option<&PathBuf> {
        self.stylesheet.as_ref()
    }

    /// Session start: clean, mirror, then watch.
    pub fn start(&mut self) -> Vec<Effect> {
        self.phase = Phase::WaitingFirstBundle;
        vec![
            Effect::CleanOutput,
            Effect::MirrorAll,
            Effect::WatchPublic,
            Effect::WatchBundler,
        ]
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Bundle(bundle) => self.on_bundle(bundle),
            Event::StylesheetsChanged if self.is_steady() => vec![Effect::CompileStylesheets],
            Event::StylesheetsChanged => Vec::new(),
            Event::StylesheetsCompiled(path) => self.on_stylesheets_compiled(path),
            // The page still has to exist, with the last good stylesheet if any
            Event::StylesheetsFailed(err) => vec![Effect::Report(err.into()), self.write_html()],
            Event::Mirror(intent) => {
                let mut effects = vec![
                    Effect::Log(intent.describe()),
                    Effect::CommitMirror(intent),
                ];
                if self.is_steady() {
                    effects.push(self.write_html());
                }
                effects
            }
            Event::TemplateChanged if self.is_steady() => vec![self.write_html()],
            Event::TemplateChanged => Vec::new(),
        }
    }

    fn on_bundle(&mut self, bundle: BundleEvent) -> Vec<Effect> {
        if let Some(generation) = &bundle.generation {
            // The bundler often reports the same output several times in a row
            if self.last_generation.as_ref() == Some(generation) {
                crate::debug!("bundler"; "skip duplicate generation {}", generation.short());
                return Vec::new();
            }
            self.last_generation = Some(generation.clone());
        }

        if let Err(err) = bundle.result {
            return vec![Effect::Report(err.into())];
        }

        let compiled = Effect::Log("Compiled JS.".into());
        if self.is_steady() {
            return vec![compiled, self.write_html()];
        }

        self.phase = Phase::Steady;
        let mut effects = vec![compiled];
        effects.push(if self.has_stylesheets {
            Effect::CompileStylesheets
        } else {
            self.write_html()
        });
        effects.push(Effect::StartServer);
        if self.has_stylesheets {
            effects.push(Effect::WatchStylesheets);
        }
        if self.has_template {
            effects.push(Effect::WatchTemplate);
        }
        effects
    }

    fn on_stylesheets_compiled(&mut self, path: PathBuf) -> Vec<Effect> {
        let previous = self.stylesheet.replace(path.clone());
        let mut effects = vec![
            Effect::Log("Compiled CSS.".into()),
            Effect::WriteHtml {
                stylesheet: Some(path.clone()),
            },
        ];
        // Removed only after the HTML referencing the new file is written
        if let Some(previous) = previous
            && previous != path
        {
            effects.push(Effect::RemoveStylesheet(previous));
        }
        effects
    }

    fn write_html(&self) -> Effect {
        Effect::WriteHtml {
            stylesheet: self.stylesheet.clone(),
        }
    }

    fn is_steady(&self) -> bool {
        self.phase == Phase::Steady
    }
}
