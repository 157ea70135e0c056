use std::fmt::Debug;
use std::sync::{Arc, Weak};

use corotrace_instrument::{transform_class, ClassReport, ConventionAbi, HookInjector, InstrumentationSession};
use corotrace_ir::class::ClassInfo;
use corotrace_runtime::export;
use corotrace_runtime::{render_all, ContextKey, Frame, LogicalStack, StackChangedEvent, StacksManager};
use log::{debug, error, info, warn, LevelFilter};
use serde::Serialize;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

use crate::config::{AgentConfig, DumpFormat};

/// Everything one attached agent needs: the classifier used when rewriting classes, the session
/// collecting their metadata and the engine the injected hooks report to.
pub struct Agent<C: ContextKey> {
    config: AgentConfig,
    abi: ConventionAbi,
    session: InstrumentationSession,
    engine: Arc<StacksManager<C>>,
}

#[derive(Serialize)]
struct StackSnapshot<'a> {
    context: String,
    frames: &'a [Frame],
}

impl Agent<u64> {
    /// Parses the agent arguments, sets up terminal logging and wires up a fresh engine. The
    /// engine is installed as the target of the exported hooks unless one is already there.
    pub fn setup(args: Option<&str>) -> Self {
        let (config, errors) = AgentConfig::parse_checked(args);
        init_logging(config.log_level);
        for e in errors {
            error!("{}", e);
        }
        info!("corotrace agent attached with {:?}", config);

        let agent = Self::with_config(config);
        if export::install(agent.engine.clone()).is_err() {
            warn!("an engine is already installed, exported hooks won't reach this agent");
        }
        agent
    }
}

impl<C: ContextKey> Agent<C> {
    pub fn with_config(config: AgentConfig) -> Self {
        let session = InstrumentationSession::new();
        let engine = Arc::new(StacksManager::new(session.registries().clone(), config.engine));

        if config.dump != DumpFormat::None {
            let weak: Weak<StacksManager<C>> = Arc::downgrade(&engine);
            let format = config.dump;
            engine.subscribe(move |change, context| {
                if change.kind == StackChangedEvent::Created {
                    return
                }
                debug!("stack of {:?} changed: {:?}", context, change);
                if let Some(engine) = weak.upgrade() {
                    if let Some(dump) = dump_stacks(format, &engine.current_stacks()) {
                        info!("{}", dump);
                    }
                }
            });
        }

        Self {
            config,
            abi: ConventionAbi::default(),
            session,
            engine,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn abi(&self) -> &ConventionAbi {
        &self.abi
    }

    pub fn session(&self) -> &InstrumentationSession {
        &self.session
    }

    pub fn engine(&self) -> &Arc<StacksManager<C>> {
        &self.engine
    }

    pub fn transform_class<I: HookInjector>(&self, class: &mut ClassInfo, injector: &mut I) -> ClassReport {
        let report = transform_class(&self.session, &self.abi, class, injector);
        if !report.transformed.is_empty() {
            debug!("instrumented {} method(s) of {}", report.transformed.len(), class.name);
        }
        report
    }

    /// The current stacks in the configured dump format.
    pub fn dump(&self) -> Option<String> {
        dump_stacks(self.config.dump, &self.engine.current_stacks())
    }
}

fn init_logging(level: LevelFilter) {
    let config = ConfigBuilder::new().set_time_level(LevelFilter::Off).build();
    // a host that brought its own logger keeps it
    if let Err(e) = TermLogger::init(level, config, TerminalMode::Mixed, ColorChoice::Auto) {
        debug!("logger already set up: {}", e);
    }
}

pub fn dump_stacks<C: Debug>(format: DumpFormat, stacks: &[(C, LogicalStack)]) -> Option<String> {
    match format {
        DumpFormat::None => None,
        DumpFormat::Text => Some(render_all(stacks)),
        DumpFormat::Json => {
            let snapshot: Vec<_> = stacks
                .iter()
                .map(|(context, stack)| StackSnapshot {
                    context: format!("{:?}", context),
                    frames: stack.frames(),
                })
                .collect();
            match serde_json::to_string(&snapshot) {
                Ok(json) => Some(json),
                Err(e) => {
                    error!("failed to serialize stack snapshot: {}", e);
                    None
                },
            }
        },
    }
}
