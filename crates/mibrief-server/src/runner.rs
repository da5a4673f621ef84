//! Background ingestion runs shared by the scheduler and the API.

use std::sync::Arc;

use tokio::sync::Mutex;

use mibrief_core::{Pillar, PillarsFile};
use mibrief_db::{CardStore, RunLedger};
use mibrief_ingest::{run_recorded, IngestConfig};
use mibrief_llm::CompletionClient;

/// A run is already in progress.
#[derive(Debug, thiserror::Error)]
#[error("an ingestion run is already in progress")]
pub struct RunnerBusy;

/// Owns everything an ingestion run needs and allows one run at a time.
pub struct IngestRunner {
    llm: Arc<dyn CompletionClient>,
    store: Arc<dyn CardStore>,
    ledger: Arc<dyn RunLedger>,
    plan: PillarsFile,
    config: IngestConfig,
    busy: Arc<Mutex<()>>,
}

impl IngestRunner {
    pub fn new(
        llm: Arc<dyn CompletionClient>,
        store: Arc<dyn CardStore>,
        ledger: Arc<dyn RunLedger>,
        plan: PillarsFile,
        config: IngestConfig,
    ) -> Self {
        Self {
            llm,
            store,
            ledger,
            plan,
            config,
            busy: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn plan(&self) -> &PillarsFile {
        &self.plan
    }

    /// Start a run in the background. Returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerBusy`] if a run is still in progress.
    pub fn spawn(
        self: &Arc<Self>,
        trigger_source: &'static str,
        pillar: Option<Pillar>,
    ) -> Result<(), RunnerBusy> {
        let guard = Arc::clone(&self.busy)
            .try_lock_owned()
            .map_err(|_| RunnerBusy)?;
        let runner = Arc::clone(self);

        tokio::spawn(async move {
            let _guard = guard;
            runner.execute(trigger_source, pillar).await;
        });
        Ok(())
    }

    async fn execute(&self, trigger_source: &'static str, pillar: Option<Pillar>) {
        let plan = match pillar {
            Some(p) => self.plan.clone().only(p),
            None => self.plan.clone(),
        };

        match run_recorded(
            self.llm.as_ref(),
            self.store.as_ref(),
            self.ledger.as_ref(),
            &plan,
            &self.config,
            trigger_source,
            pillar,
        )
        .await
        {
            Ok(summary) => tracing::info!(
                trigger_source,
                stored = summary.cards_stored,
                failed = summary.failed,
                "ingestion run complete"
            ),
            Err(e) => tracing::error!(trigger_source, error = %e, "ingestion run could not be recorded"),
        }
    }
}
