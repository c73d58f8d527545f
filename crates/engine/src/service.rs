//! Public entry points: each call runs in its own browser session.

use std::{sync::Arc, time::Duration};

use {
    futures::future::join_all,
    portalbot_browser::SessionProvider,
    portalbot_config::{AdaptiveConfig, PortalbotConfig},
    serde::Serialize,
    tokio::sync::Semaphore,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    adaptive::AdaptiveTimeout,
    auth,
    cache::{CacheStats, ResultCache},
    driver::SessionDriver,
    error::EngineError,
    extract::fetch_work_order,
    model::{Credentials, PortalResult, WorkOrderStatus},
    profile::PortalProfile,
    retry::RetryPolicy,
    transition::{self, TransitionOutcome},
};

/// Tunables for every session the service opens.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub retry: RetryPolicy,
    pub adaptive: AdaptiveConfig,
    /// Starting adaptive timeout.
    pub default_timeout: Duration,
    pub max_parallel_sessions: usize,
    pub session_deadline: Duration,
}

impl From<&PortalbotConfig> for ServiceSettings {
    fn from(config: &PortalbotConfig) -> Self {
        Self {
            retry: RetryPolicy::from(&config.retry),
            adaptive: config.adaptive.clone(),
            default_timeout: Duration::from_millis(config.browser.default_timeout_ms),
            max_parallel_sessions: config.sessions.max_parallel_sessions.max(1),
            session_deadline: Duration::from_millis(config.sessions.session_deadline_ms),
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&PortalbotConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    Details,
    Allocate,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub id: String,
    #[serde(flatten)]
    pub result: PortalResult,
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Details,
    Allocate,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Allocate => "allocate",
        }
    }
}

/// Work-order automation over an injected session provider.
pub struct PortalService {
    sessions: Arc<dyn SessionProvider>,
    profile: PortalProfile,
    settings: ServiceSettings,
    results: Arc<ResultCache>,
    permits: Semaphore,
    shutdown: CancellationToken,
}

impl PortalService {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        profile: PortalProfile,
        settings: ServiceSettings,
    ) -> Self {
        let permits = Semaphore::new(settings.max_parallel_sessions.max(1));
        Self {
            sessions,
            profile,
            settings,
            results: Arc::new(ResultCache::new()),
            permits,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(sessions: Arc<dyn SessionProvider>, config: &PortalbotConfig) -> Self {
        Self::new(
            sessions,
            PortalProfile::new(config.portal.clone()),
            ServiceSettings::from(config),
        )
    }

    /// Share a result cache with other services.
    pub fn with_result_cache(mut self, results: Arc<ResultCache>) -> Self {
        self.results = results;
        self
    }

    pub fn profile(&self) -> &PortalProfile {
        &self.profile
    }

    /// Fetch a snapshot, served from the result cache when present.
    pub async fn get_work_order_details(&self, id: &str, credentials: &Credentials) -> PortalResult {
        let id = id.trim();
        if let Some(order) = self.results.get(id) {
            info!(work_order_id = id, "serving work order from result cache");
            return PortalResult::success(
                format!("Detalhes da ordem de trabalho {id} (cache)"),
                order,
            );
        }
        self.run(Operation::Details, id, credentials).await
    }

    /// Allocate an `IN_PROGRESS` work order; other statuses are only consulted.
    pub async fn allocate_work_order(&self, id: &str, credentials: &Credentials) -> PortalResult {
        self.run(Operation::Allocate, id.trim(), credentials).await
    }

    /// Process several ids concurrently, at most `max_parallel_sessions` at a time.
    ///
    /// Repeated ids (after trimming) run once and share the result, so an
    /// order is never pushed through the allocation sequence twice. Items
    /// come back in input order.
    pub async fn process_batch(
        &self,
        ids: &[String],
        credentials: &Credentials,
        mode: BatchMode,
    ) -> Vec<BatchItem> {
        let mut unique: Vec<&str> = Vec::with_capacity(ids.len());
        let slots: Vec<usize> = ids
            .iter()
            .map(|id| {
                let id = id.trim();
                unique.iter().position(|u| *u == id).unwrap_or_else(|| {
                    unique.push(id);
                    unique.len() - 1
                })
            })
            .collect();
        if unique.len() < ids.len() {
            debug!(
                requested = ids.len(),
                unique = unique.len(),
                "collapsed repeated ids in batch"
            );
        }

        info!(count = unique.len(), ?mode, "processing batch");
        let results = join_all(unique.iter().map(|id| async move {
            match mode {
                BatchMode::Details => self.get_work_order_details(id, credentials).await,
                BatchMode::Allocate => self.allocate_work_order(id, credentials).await,
            }
        }))
        .await;

        slots
            .into_iter()
            .map(|slot| BatchItem {
                id: unique[slot].to_string(),
                result: results[slot].clone(),
            })
            .collect()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.results.stats()
    }

    pub fn evict(&self, id: &str) -> bool {
        self.results.evict(id.trim())
    }

    pub fn evict_all(&self) -> usize {
        self.results.evict_all()
    }

    /// Cancel running sessions and refuse new ones.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        self.permits.close();
    }

    async fn run(&self, op: Operation, id: &str, credentials: &Credentials) -> PortalResult {
        if id.is_empty() {
            return PortalResult::failure("Identificador da ordem de trabalho vazio");
        }

        let Ok(_permit) = self.permits.acquire().await else {
            return PortalResult::failure("Serviço encerrado");
        };

        let session = match self.sessions.acquire().await {
            Ok(session) => session,
            Err(e) => {
                error!(work_order_id = id, operation = op.name(), error = %e, "could not open browser session");
                return PortalResult::failure(format!("Falha ao iniciar o navegador: {e}"));
            },
        };

        let session_id = session.id().to_string();
        let cancel = self.shutdown.child_token();
        info!(session_id, work_order_id = id, operation = op.name(), "session started");

        let outcome = {
            let mut driver = SessionDriver::new(
                session.access(),
                session_id.clone(),
                AdaptiveTimeout::new(self.settings.default_timeout, &self.settings.adaptive),
                self.settings.retry,
                cancel.clone(),
            );
            let deadline = self.settings.session_deadline;
            match tokio::time::timeout(deadline, self.execute(op, &mut driver, id, credentials)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    cancel.cancel();
                    Err(EngineError::DeadlineExceeded(deadline.as_millis() as u64))
                },
            }
        };

        session.release().await;

        match outcome {
            Ok(result) => {
                info!(session_id, work_order_id = id, success = result.success, "session finished");
                result
            },
            Err(e) => {
                if e.is_fatal() {
                    error!(session_id, work_order_id = id, operation = op.name(), error = %e, "session aborted");
                } else {
                    warn!(session_id, work_order_id = id, operation = op.name(), error = %e, "session failed");
                }
                PortalResult::failure(failure_message(op, id, &e))
            },
        }
    }

    async fn execute(
        &self,
        op: Operation,
        driver: &mut SessionDriver<'_>,
        id: &str,
        credentials: &Credentials,
    ) -> Result<PortalResult, EngineError> {
        if !auth::login(driver, &self.profile, credentials).await? {
            return Ok(PortalResult::failure("Falha no login no portal"));
        }

        match op {
            Operation::Details => match fetch_work_order(driver, &self.profile, id).await? {
                Some(order) => {
                    self.results.insert(order.clone());
                    Ok(PortalResult::success(
                        format!("Detalhes da ordem de trabalho {id} obtidos"),
                        order,
                    ))
                },
                None => Ok(PortalResult::not_found(id)),
            },
            Operation::Allocate => Ok(self.allocation_result(
                id,
                transition::allocate(driver, &self.profile, id).await?,
            )),
        }
    }

    fn allocation_result(&self, id: &str, outcome: TransitionOutcome) -> PortalResult {
        match outcome {
            TransitionOutcome::NotFound => PortalResult::not_found(id),
            TransitionOutcome::ConsultOnly(order) => {
                self.results.insert(order.clone());
                PortalResult::success(
                    format!(
                        "Ordem de trabalho {id} em estado {}: apenas consulta",
                        order.status
                    ),
                    order,
                )
            },
            TransitionOutcome::Completed { after, .. } => {
                self.results.insert(after.clone());
                let message = if after.status == WorkOrderStatus::Allocated {
                    format!("Ordem de trabalho {id} alocada com sucesso")
                } else {
                    format!(
                        "Sequência de alocação da ordem {id} concluída; estado atual {}",
                        after.status
                    )
                };
                PortalResult::success(message, after)
            },
            TransitionOutcome::StepFailed {
                stage,
                snapshot,
                error,
            } => PortalResult::failure_with(
                format!("Falha na alocação da ordem {id} no passo {stage}: {error}"),
                snapshot,
            ),
            TransitionOutcome::RefetchFailed { before } => PortalResult::failure_with(
                format!("Alocação da ordem {id} executada, mas não foi possível confirmar o novo estado"),
                before,
            ),
        }
    }
}

fn failure_message(op: Operation, id: &str, error: &EngineError) -> String {
    match error {
        EngineError::DeadlineExceeded(ms) => {
            format!("Tempo limite de {ms}ms excedido ao processar a ordem {id}")
        },
        EngineError::Cancelled => format!("Processamento da ordem {id} cancelado"),
        EngineError::InvalidInput(msg) => format!("Pedido inválido: {msg}"),
        EngineError::Browser(e) => match op {
            Operation::Details => format!("Erro ao consultar a ordem {id}: {e}"),
            Operation::Allocate => format!("Erro ao alocar a ordem {id}: {e}"),
        },
    }
}
