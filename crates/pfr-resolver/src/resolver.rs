//! Backtracking resolution of a Puppetfile into a module graph.
//!
//! The search is chronological and depth-first. Each decision pushes a
//! [`Frame`] holding a snapshot of the search state taken before the
//! decision, plus a cursor into the module's candidate list. Backtracking
//! pops a frame, restores its snapshot and activates the next viable
//! candidate after the cursor.
//!
//! When a module has no viable candidate:
//! - with `allow_missing_modules`, a missing placeholder is activated in
//!   its place and the search goes on;
//! - otherwise the resolver backtracks. If every alternative is exhausted,
//!   the state at the first failure is restored and the search continues
//!   without the module. Dropped modules that the final state still
//!   requires become validation errors.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

use semver::Version;

use pfr_core::classifier::{classify_module, ForgeVersion, ModuleKind};
use pfr_core::dependency::{ModuleDependency, ModuleKey};
use pfr_core::document::{Document, ResolverFlag};
use pfr_core::specification::ModuleSpecification;
use pfr_source::cache::Cache;
use pfr_source::CandidateSource;
use pfr_util::errors::PfrError;

use crate::conflict::{ValidationError, ValidationReport};
use crate::graph::{ResolvedEdge, ResolvedGraph};
use crate::ui::ResolverUi;
use crate::version::requirement_matches;

/// Backtracking steps allowed per failing module before giving up on it.
const MAX_BACKTRACKS: usize = 10_000;

/// Requester label for modules declared in the Puppetfile itself.
const PUPPETFILE: &str = "Puppetfile";

/// Knobs for one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Version of the `puppet` platform. When unset, module requirements on
    /// `puppet` are ignored and no `puppet` vertex is created.
    pub puppet_version: Option<Version>,
    /// Activate a missing placeholder instead of failing when a module has no
    /// acceptable candidate.
    pub allow_missing_modules: bool,
}

/// The output of a resolution run.
#[derive(Debug)]
pub struct ResolutionResult {
    pub graph: ResolvedGraph,
    pub validation_errors: ValidationReport,
}

impl ResolutionResult {
    pub fn to_dot(&self) -> String {
        self.graph.to_dot()
    }
}

/// Resolve every module declared in `document`.
///
/// Unsatisfiable modules are reported in
/// [`ResolutionResult::validation_errors`]. Only a corrupt cache entry
/// fails the whole run.
pub fn resolve(
    document: &Document,
    source: &dyn CandidateSource,
    cache: &mut Cache,
    options: &ResolveOptions,
    ui: &dyn ResolverUi,
) -> Result<ResolutionResult, PfrError> {
    ui.before_resolution();

    let mut resolver = Resolver {
        source,
        cache,
        options,
        ui,
        declarations: Vec::new(),
        fetched: HashMap::new(),
        failed: BTreeSet::new(),
        report: ValidationReport::new(),
    };

    let mut state = SearchState::default();
    if let Some(ref version) = options.puppet_version {
        state
            .activated
            .insert(ModuleKey::puppet(), ModuleSpecification::puppet(version.clone()));
    }
    resolver.declare(document, &mut state);

    let state = resolver.search(state)?;
    resolver.report_failures(&state);
    let graph = state.into_graph();
    tracing::info!(
        "resolved {} modules with {} validation errors",
        graph.len(),
        resolver.report.len()
    );

    ui.after_resolution();
    Ok(ResolutionResult {
        graph,
        validation_errors: resolver.report,
    })
}

/// One requirement placed on a module.
#[derive(Debug, Clone)]
struct Requirement {
    /// `None` for a Puppetfile declaration.
    requester: Option<ModuleKey>,
    requirement: Option<String>,
}

#[derive(Debug, Clone)]
struct Edge {
    from: ModuleKey,
    to: ModuleKey,
    requirement: Option<String>,
}

/// Everything a decision can change. Cloned into each [`Frame`].
#[derive(Debug, Clone, Default)]
struct SearchState {
    /// Module keys in discovery order.
    order: Vec<ModuleKey>,
    requirements: BTreeMap<ModuleKey, Vec<Requirement>>,
    activated: BTreeMap<ModuleKey, ModuleSpecification>,
    edges: Vec<Edge>,
}

impl SearchState {
    /// The known key `key` refers to, or `key` itself if it is new.
    fn key_for(&self, key: &ModuleKey) -> ModuleKey {
        if self.requirements.contains_key(key) || self.activated.contains_key(key) {
            return key.clone();
        }
        self.order
            .iter()
            .chain(self.activated.keys())
            .find(|known| known.unifies_with(key))
            .cloned()
            .unwrap_or_else(|| key.clone())
    }

    fn require(&mut self, key: ModuleKey, requirement: Requirement) {
        if !self.requirements.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.requirements.entry(key).or_default().push(requirement);
    }

    /// First discovered module that is neither activated nor given up on.
    fn next_unresolved(&self, failed: &BTreeSet<ModuleKey>) -> Option<ModuleKey> {
        self.order
            .iter()
            .find(|key| !self.activated.contains_key(*key) && !failed.contains(*key))
            .cloned()
    }

    /// Whether `key` is required but not yet activated.
    fn is_waiting_on(&self, key: &ModuleKey) -> bool {
        self.requirements.contains_key(key) && !self.activated.contains_key(key)
    }

    fn into_graph(self) -> ResolvedGraph {
        let mut graph = ResolvedGraph::new();
        let mut index = BTreeMap::new();
        for (key, spec) in self.activated {
            index.insert(key, graph.add_vertex(spec));
        }
        for edge in self.edges {
            if let (Some(&from), Some(&to)) = (index.get(&edge.from), index.get(&edge.to)) {
                graph.add_edge(
                    from,
                    to,
                    ResolvedEdge {
                        requirement: edge.requirement,
                    },
                );
            }
        }
        graph
    }
}

/// A decision point.
#[derive(Debug, Clone)]
struct Frame {
    key: ModuleKey,
    /// State before `key` was activated.
    snapshot: SearchState,
    /// Index of the activated candidate.
    cursor: usize,
}

/// The first conflict of a backtracking episode.
#[derive(Debug, Clone)]
struct Failure {
    key: ModuleKey,
    state: SearchState,
    stack: Vec<Frame>,
}

/// A module declared in the Puppetfile.
#[derive(Debug)]
struct Declaration {
    key: ModuleKey,
    kind: ModuleKind,
    disable_puppet: bool,
}

/// Memoized candidate lookup for one module.
#[derive(Debug)]
struct Fetched {
    specs: Vec<ModuleSpecification>,
    /// Why the lookup produced nothing.
    error: Option<String>,
}

struct Resolver<'a> {
    source: &'a dyn CandidateSource,
    cache: &'a mut Cache,
    options: &'a ResolveOptions,
    ui: &'a dyn ResolverUi,
    declarations: Vec<Declaration>,
    fetched: HashMap<ModuleKey, Rc<Fetched>>,
    failed: BTreeSet<ModuleKey>,
    report: ValidationReport,
}

impl Resolver<'_> {
    /// Seed the search with one requirement per `mod` declaration.
    fn declare(&mut self, document: &Document, state: &mut SearchState) {
        for module in &document.modules {
            let kind = classify_module(module);
            let dependency =
                match ModuleDependency::from_title(&module.title, None, kind.version_requirement())
                {
                    Ok(dependency) => dependency,
                    Err(e) => {
                        tracing::debug!("skipping declaration '{}': {e}", module.title);
                        self.report.add(ValidationError {
                            module: module.title.clone(),
                            requirement: None,
                            requesters: vec![PUPPETFILE.to_string()],
                            reason: e.to_string(),
                        });
                        continue;
                    }
                };

            let key = state.key_for(&dependency.key());
            if let ModuleKind::Invalid { ref reason } = kind {
                tracing::warn!("{}: {reason}", module.title);
            }
            self.declarations.push(Declaration {
                key: key.clone(),
                kind,
                disable_puppet: module.has_flag(ResolverFlag::DisablePuppetDependency),
            });
            state.require(
                key,
                Requirement {
                    requester: None,
                    requirement: dependency.version_requirement,
                },
            );
        }
    }

    fn declaration(&self, key: &ModuleKey) -> Option<&Declaration> {
        self.declarations
            .iter()
            .find(|d| d.key == *key)
            .or_else(|| self.declarations.iter().find(|d| d.key.unifies_with(key)))
    }

    /// How to look a module up. Undeclared modules come from the Forge.
    fn kind_for(&self, key: &ModuleKey) -> ModuleKind {
        self.declaration(key)
            .map(|d| d.kind.clone())
            .unwrap_or(ModuleKind::Forge {
                version: ForgeVersion::Any,
            })
    }

    /// The puppet version to check `key` against, if any.
    fn puppet_version_for(&self, key: &ModuleKey) -> Option<&Version> {
        let disabled = self.declaration(key).is_some_and(|d| d.disable_puppet);
        if disabled {
            None
        } else {
            self.options.puppet_version.as_ref()
        }
    }

    fn trace(&self, depth: usize, message: String) {
        self.ui.debug(depth, &message);
    }

    fn search(&mut self, mut state: SearchState) -> Result<SearchState, PfrError> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut pending: Option<Failure> = None;
        let mut backtracks = 0usize;

        while let Some(key) = state.next_unresolved(&self.failed) {
            self.ui.indicate_progress();
            let fetched = self.fetch(&key)?;

            if let Some(index) = self.first_viable(&state, &key, &fetched.specs, 0) {
                let spec = fetched.specs[index].clone();
                self.trace(stack.len(), format!("activating {spec}"));
                stack.push(Frame {
                    key: key.clone(),
                    snapshot: state.clone(),
                    cursor: index,
                });
                self.activate(&mut state, &key, spec);
                settle(&mut pending, &mut backtracks, &state);
                continue;
            }

            let reason = self.unsatisfied_reason(&state, &key, &fetched);

            if self.options.allow_missing_modules {
                self.trace(stack.len(), format!("{key} is missing: {reason}"));
                self.activate(&mut state, &key, ModuleSpecification::missing(&key, Some(reason)));
                settle(&mut pending, &mut backtracks, &state);
                continue;
            }

            self.trace(stack.len(), format!("conflict on {key}: {reason}"));
            if pending.is_none() {
                pending = Some(Failure {
                    key: key.clone(),
                    state: state.clone(),
                    stack: stack.clone(),
                });
            }

            if backtracks < MAX_BACKTRACKS {
                backtracks += 1;
                if let Some(restored) = self.backtrack(&mut stack) {
                    state = restored;
                    settle(&mut pending, &mut backtracks, &state);
                    continue;
                }
            } else {
                tracing::warn!("giving up on {key} after {MAX_BACKTRACKS} backtracking steps");
            }

            if let Some(failure) = pending.take() {
                self.trace(
                    failure.stack.len(),
                    format!("no alternatives left, dropping {}", failure.key),
                );
                state = failure.state;
                stack = failure.stack;
                self.failed.insert(failure.key);
                backtracks = 0;
            }
        }

        Ok(state)
    }

    /// Pop frames until one has another viable candidate, and activate it.
    fn backtrack(&mut self, stack: &mut Vec<Frame>) -> Option<SearchState> {
        while let Some(frame) = stack.pop() {
            let fetched = self.fetched.get(&frame.key).cloned()?;
            let Some(index) =
                self.first_viable(&frame.snapshot, &frame.key, &fetched.specs, frame.cursor + 1)
            else {
                continue;
            };

            let spec = fetched.specs[index].clone();
            self.trace(stack.len(), format!("backtracking: trying {spec}"));
            let mut state = frame.snapshot.clone();
            self.activate(&mut state, &frame.key, spec);
            stack.push(Frame {
                cursor: index,
                ..frame
            });
            return Some(state);
        }
        None
    }

    /// Candidates for `key`, fetched once per run.
    fn fetch(&mut self, key: &ModuleKey) -> Result<Rc<Fetched>, PfrError> {
        if let Some(fetched) = self.fetched.get(key) {
            return Ok(Rc::clone(fetched));
        }

        let kind = self.kind_for(key);
        let dependency = ModuleDependency {
            owner: key.owner.clone(),
            name: key.name.clone(),
            version_requirement: None,
        };
        let fetched = match self.source.candidates(&dependency, &kind, self.cache) {
            Ok(specs) => Fetched {
                specs: specs
                    .into_iter()
                    .filter(|s| s.version.is_some() && !s.is_missing())
                    .collect(),
                error: None,
            },
            Err(e @ PfrError::CacheCorruption { .. }) => return Err(e),
            Err(e) => {
                tracing::info!("no candidates for {key}: {e}");
                Fetched {
                    specs: Vec::new(),
                    error: Some(failure_reason(&e)),
                }
            }
        };
        tracing::debug!("{key}: {} candidates", fetched.specs.len());

        let fetched = Rc::new(fetched);
        self.fetched.insert(key.clone(), Rc::clone(&fetched));
        Ok(fetched)
    }

    fn first_viable(
        &self,
        state: &SearchState,
        key: &ModuleKey,
        specs: &[ModuleSpecification],
        from: usize,
    ) -> Option<usize> {
        (from..specs.len()).find(|&i| self.is_viable(state, key, &specs[i]))
    }

    /// Whether `spec` can be activated for `key` in `state`.
    ///
    /// It must satisfy every requirement on `key`, and each of its own
    /// dependencies must accept whatever is already activated.
    fn is_viable(&self, state: &SearchState, key: &ModuleKey, spec: &ModuleSpecification) -> bool {
        let Some(ref version) = spec.version else {
            return false;
        };

        let requirements = state.requirements.get(key).map(Vec::as_slice).unwrap_or(&[]);
        if let Some(req) = requirements
            .iter()
            .find(|r| !requirement_matches(r.requirement.as_deref(), version))
        {
            self.trace(
                0,
                format!(
                    "{spec} rejected: needs {}",
                    req.requirement.as_deref().unwrap_or("*")
                ),
            );
            return false;
        }

        for dependency in &spec.dependencies {
            let target = state.key_for(&dependency.key());
            if target == *key {
                continue;
            }
            let Some(active) = state.activated.get(&target) else {
                continue;
            };
            // missing vertices accept anything
            let Some(ref active_version) = active.version else {
                continue;
            };
            if !requirement_matches(dependency.version_requirement.as_deref(), active_version) {
                self.trace(0, format!("{spec} rejected: conflicts with {active}"));
                return false;
            }
        }

        if let (Some(puppet), Some(req)) = (self.puppet_version_for(key), spec.puppet_requirement())
        {
            if !requirement_matches(Some(req), puppet) {
                self.trace(0, format!("{spec} rejected: needs puppet {req}"));
                return false;
            }
        }

        true
    }

    fn activate(&self, state: &mut SearchState, key: &ModuleKey, spec: ModuleSpecification) {
        for dependency in &spec.dependencies {
            let target = state.key_for(&dependency.key());
            if target == *key {
                continue;
            }
            state.edges.push(Edge {
                from: key.clone(),
                to: target.clone(),
                requirement: dependency.version_requirement.clone(),
            });
            state.require(
                target,
                Requirement {
                    requester: Some(key.clone()),
                    requirement: dependency.version_requirement.clone(),
                },
            );
        }

        if self.puppet_version_for(key).is_some() {
            if let Some(req) = spec.puppet_requirement() {
                state.edges.push(Edge {
                    from: key.clone(),
                    to: ModuleKey::puppet(),
                    requirement: Some(req.to_string()),
                });
            }
        }

        state.activated.insert(key.clone(), spec);
    }

    /// Report every dropped module the final state still requires.
    ///
    /// Requesters and requirements come from `state`, so modules dropped
    /// under a decision that was later undone are not reported.
    fn report_failures(&mut self, state: &SearchState) {
        for key in &self.failed {
            if !state.is_waiting_on(key) {
                tracing::debug!("{key} is no longer required");
                continue;
            }
            let reason = match self.fetched.get(key) {
                Some(fetched) => self.unsatisfied_reason(state, key, fetched),
                None => "no releases found".to_string(),
            };
            let error = validation_error(state, key, reason);
            self.report.add(error);
        }
    }

    fn unsatisfied_reason(&self, state: &SearchState, key: &ModuleKey, fetched: &Fetched) -> String {
        if let Some(ref error) = fetched.error {
            return error.clone();
        }
        if fetched.specs.is_empty() {
            return "no releases found".to_string();
        }
        let puppet = self
            .puppet_version_for(key)
            .map(|v| format!(" and puppet {v}"))
            .unwrap_or_default();
        let requirements = joined_requirements(state, key)
            .map(|r| format!("'{r}'"))
            .unwrap_or_else(|| "the activated modules".to_string());
        format!(
            "none of the {} available versions satisfy {requirements}{puppet}",
            fetched.specs.len()
        )
    }
}

/// End a backtracking episode once its module is no longer waited on.
fn settle(pending: &mut Option<Failure>, backtracks: &mut usize, state: &SearchState) {
    if pending
        .as_ref()
        .is_some_and(|failure| !state.is_waiting_on(&failure.key))
    {
        *pending = None;
        *backtracks = 0;
    }
}

fn joined_requirements(state: &SearchState, key: &ModuleKey) -> Option<String> {
    let mut seen = BTreeSet::new();
    let parts: Vec<&str> = state
        .requirements
        .get(key)?
        .iter()
        .filter_map(|r| r.requirement.as_deref())
        .filter(|r| seen.insert(*r))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

fn validation_error(state: &SearchState, key: &ModuleKey, reason: String) -> ValidationError {
    let mut requesters: Vec<String> = Vec::new();
    for requirement in state.requirements.get(key).into_iter().flatten() {
        let label = match &requirement.requester {
            None => PUPPETFILE.to_string(),
            Some(requester) => state
                .activated
                .get(requester)
                .map(ModuleSpecification::label)
                .unwrap_or_else(|| requester.slug()),
        };
        if !requesters.contains(&label) {
            requesters.push(label);
        }
    }
    ValidationError {
        module: key.to_string(),
        requirement: joined_requirements(state, key),
        requesters,
        reason,
    }
}

/// Error text without the category prefix.
fn failure_reason(e: &PfrError) -> String {
    match e {
        PfrError::MetadataFetch { message } | PfrError::Network { message } => message.clone(),
        other => other.to_string(),
    }
}
