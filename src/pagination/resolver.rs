use crate::concurrency::ConcurrencyController;
use crate::config::{PaginationConfig, SiteConfig};
use crate::pagination::{
    select_control, Activation, ControlHints, CountStage, ExhaustReason, ListingSession,
    PaginationError, PaginationState, ResolverPhase, RunSignals, Terminal,
};
use crate::retry::RetryPolicy;
use crate::url::{LinkClass, SiteRules};
use crate::FetchError;
use std::collections::BTreeSet;
use std::sync::Arc;
use url::Url;

/// Result of resolving one listing
#[derive(Debug)]
pub struct PaginationOutcome {
    /// Distinct canonical product URLs seen on the listing
    pub product_links: BTreeSet<String>,
    pub state: PaginationState,
    pub terminal: Terminal,
    /// Product count after the initial count and after every Loading step
    pub count_history: Vec<usize>,
    /// Activation path used for every successful reveal
    pub activations: Vec<Activation>,
}

enum LoadStep {
    Activated(Activation),
    NoControl,
}

/// Expands a listing page until it stops growing
///
/// ```text
/// Idle -> Counting(initial) -> Loading -> Counting(post) -> Expanded  -> Loading ...
///                                 |                      \-> Exhausted
///                                 \-> Exhausted | Error
/// ```
///
/// Product counts are accumulated over the union of every link seen, so the
/// count history never decreases. Each Loading step is retried up to
/// `load-retries` times on transient failure before it counts as no-growth.
pub struct PaginationResolver {
    rules: Arc<SiteRules>,
    hints: ControlHints,
    max_attempts: u32,
    no_growth_limit: u32,
    load_retries: u32,
    retry: RetryPolicy,
    controller: Option<Arc<ConcurrencyController>>,
    signals: Arc<RunSignals>,
}

impl PaginationResolver {
    pub fn new(
        rules: Arc<SiteRules>,
        site: &SiteConfig,
        limits: &PaginationConfig,
        retry: RetryPolicy,
        signals: Arc<RunSignals>,
    ) -> Self {
        Self {
            rules,
            hints: ControlHints::from_site(site),
            max_attempts: limits.max_attempts.max(1),
            no_growth_limit: limits.no_growth_limit.max(1),
            load_retries: limits.load_retries,
            retry,
            controller: None,
            signals,
        }
    }

    /// Admits every reveal through the controller
    pub fn with_controller(mut self, controller: Arc<ConcurrencyController>) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Runs the state machine over an open listing
    pub async fn resolve(&self, session: &mut dyn ListingSession) -> PaginationOutcome {
        let url = session.url().to_string();
        let mut phase = ResolverPhase::Idle;
        let mut state = PaginationState::new(url.as_str());
        let mut seen = BTreeSet::new();
        let mut history = Vec::new();
        let mut activations = Vec::new();

        transition(&url, &mut phase, ResolverPhase::Counting(CountStage::Initial));
        if let Err(e) = self.count(session, &mut seen).await {
            let terminal = Terminal::from(e);
            let end = if terminal.is_cancelled() {
                ResolverPhase::Cancelled
            } else {
                ResolverPhase::Error
            };
            transition(&url, &mut phase, end);
            return PaginationOutcome {
                product_links: seen,
                state,
                terminal,
                count_history: history,
                activations,
            };
        }
        state.last_known_product_count = seen.len();
        history.push(seen.len());
        tracing::debug!("{}: {} products before expansion", url, seen.len());

        let mut no_growth = 0;
        let terminal = loop {
            if state.attempts_made >= self.max_attempts {
                tracing::debug!("{}: attempt ceiling {} reached", url, self.max_attempts);
                break Terminal::Exhausted(ExhaustReason::Ceiling);
            }

            transition(&url, &mut phase, ResolverPhase::Loading);
            state.attempts_made += 1;

            match self.load_more(session).await {
                Ok(LoadStep::Activated(activation)) => activations.push(activation),
                Ok(LoadStep::NoControl) => {
                    if self.signals.expansion_confirmed() {
                        break Terminal::Exhausted(ExhaustReason::NoControl);
                    }
                    tracing::warn!(
                        "Structural anomaly: no reveal control on {} ({} products) and no expansion confirmed yet",
                        url,
                        seen.len()
                    );
                    break Terminal::Error(PaginationError::ControlNotFound { url: url.clone() });
                }
                Err(FetchError::Cancelled { .. }) => break Terminal::Cancelled,
                Err(e) => {
                    tracing::debug!("{}: reveal attempt {} failed: {}", url, state.attempts_made, e);
                }
            }

            transition(&url, &mut phase, ResolverPhase::Counting(CountStage::Post));
            let before = seen.len();
            if let Err(e) = self.count(session, &mut seen).await {
                break Terminal::from(e);
            }
            state.last_known_product_count = seen.len();
            history.push(seen.len());

            if seen.len() > before {
                transition(&url, &mut phase, ResolverPhase::Expanded);
                no_growth = 0;
                self.signals.confirm_expansion();
                continue;
            }

            no_growth += 1;
            if no_growth >= self.no_growth_limit {
                break Terminal::Exhausted(ExhaustReason::NoGrowth);
            }
        };

        state.exhausted = terminal.is_exhausted();
        let end = match terminal {
            Terminal::Exhausted(_) => ResolverPhase::Exhausted,
            Terminal::Error(_) => ResolverPhase::Error,
            Terminal::Cancelled => ResolverPhase::Cancelled,
        };
        transition(&url, &mut phase, end);

        tracing::info!(
            "Listing {} resolved: {} products after {} attempts ({})",
            url,
            seen.len(),
            state.attempts_made,
            phase
        );

        PaginationOutcome {
            product_links: seen,
            state,
            terminal,
            count_history: history,
            activations,
        }
    }

    /// Counting step: adds every product link currently visible
    async fn count(
        &self,
        session: &mut dyn ListingSession,
        seen: &mut BTreeSet<String>,
    ) -> Result<(), FetchError> {
        let base = Url::parse(session.url()).ok();
        for raw in session.links().await? {
            if let Some(url) = self.rules.canonicalize(&raw, base.as_ref()) {
                if self.rules.classify_url(&url) == LinkClass::Product {
                    seen.insert(url.to_string());
                }
            }
        }
        Ok(())
    }

    /// Loading step with its transient-failure retries
    async fn load_more(&self, session: &mut dyn ListingSession) -> Result<LoadStep, FetchError> {
        let mut attempt = 1;
        loop {
            match self.try_load(session).await {
                Err(e) if e.is_transient() && attempt <= self.load_retries => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::debug!("Reveal on {} failed ({}); retrying in {:?}", session.url(), e, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    async fn try_load(&self, session: &mut dyn ListingSession) -> Result<LoadStep, FetchError> {
        let controls = session.controls().await?;
        let Some(control) = select_control(&controls, &self.hints) else {
            return Ok(LoadStep::NoControl);
        };
        let activation = control.activation();

        let _admission = match &self.controller {
            Some(controller) => Some(controller.admit(session.url()).await?),
            None => None,
        };

        tracing::trace!(
            "Activating control {} ({:?}) on {} via {:?}",
            control.index,
            control.text,
            session.url(),
            activation
        );
        session.activate(control, activation).await?;
        session.settle().await?;
        Ok(LoadStep::Activated(activation))
    }
}

fn transition(url: &str, phase: &mut ResolverPhase, next: ResolverPhase) {
    tracing::trace!("{}: {} -> {}", url, phase, next);
    *phase = next;
}
