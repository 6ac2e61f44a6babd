//! Background analysis worker.
//!
//! The page session never blocks on the network. Each request carries its
//! own one-shot reply channel; the session polls the returned
//! [`PendingAnalysis`] from its event loop.

use std::thread::JoinHandle;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CacheStore, EtymologyProvider, EtymologyRecord, Gateway};
use crate::effect::RequestId;

/// Outcome delivered back to the page.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisReply {
    Success(EtymologyRecord),
    /// Display text of the failure.
    Failure(String),
}

impl AnalysisReply {
    pub fn into_result(self) -> Result<EtymologyRecord, String> {
        match self {
            AnalysisReply::Success(record) => Ok(record),
            AnalysisReply::Failure(message) => Err(message),
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Analysis worker is disconnected")]
    Disconnected,
}

struct AnalysisRequest {
    id: RequestId,
    word: String,
    reply: Sender<AnalysisReply>,
}

/// An analysis in flight.
#[derive(Debug)]
pub struct PendingAnalysis {
    pub id: RequestId,
    pub word: String,
    reply: Receiver<AnalysisReply>,
}

impl PendingAnalysis {
    /// The reply if it has arrived.
    pub fn try_take(&self) -> Result<Option<AnalysisReply>, ChannelError> {
        match self.reply.try_recv() {
            Ok(reply) => Ok(Some(reply)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    /// Blocks up to `timeout` for the reply; `Ok(None)` on timeout.
    pub fn wait(&self, timeout: Duration) -> Result<Option<AnalysisReply>, ChannelError> {
        match self.reply.recv_timeout(timeout) {
            Ok(reply) => Ok(Some(reply)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }
}

/// Owns the worker thread that runs [`Gateway::lookup`].
pub struct AnalysisService {
    request_tx: Option<Sender<AnalysisRequest>>,
    worker: Option<JoinHandle<()>>,
}

impl AnalysisService {
    /// Moves `gateway` onto a new worker thread.
    pub fn spawn<C, P>(gateway: Gateway<C, P>) -> Self
    where
        C: CacheStore + Send + 'static,
        P: EtymologyProvider + Send + 'static,
    {
        let (request_tx, request_rx) = flume::unbounded();
        let worker = std::thread::Builder::new()
            .name("etymon-analysis".to_string())
            .spawn(move || analysis_worker(gateway, request_rx));

        match worker {
            Ok(handle) => Self {
                request_tx: Some(request_tx),
                worker: Some(handle),
            },
            Err(e) => {
                warn!("Failed to start analysis worker: {e}");
                Self {
                    request_tx: None,
                    worker: None,
                }
            }
        }
    }

    /// A service whose worker is already gone.
    #[cfg(any(test, feature = "test-utils"))]
    #[must_use]
    pub fn disconnected() -> Self {
        Self {
            request_tx: None,
            worker: None,
        }
    }

    /// Whether the worker still accepts requests.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.request_tx
            .as_ref()
            .is_some_and(|tx| !tx.is_disconnected())
    }

    /// Queues an analysis; the reply arrives on the returned handle.
    pub fn analyze(&self, id: RequestId, word: &str) -> Result<PendingAnalysis, ChannelError> {
        let Some(request_tx) = self.request_tx.as_ref().filter(|_| self.is_alive()) else {
            return Err(ChannelError::Disconnected);
        };
        let (reply_tx, reply_rx) = flume::bounded(1);
        request_tx
            .send(AnalysisRequest {
                id,
                word: word.to_string(),
                reply: reply_tx,
            })
            .map_err(|_| ChannelError::Disconnected)?;
        Ok(PendingAnalysis {
            id,
            word: word.to_string(),
            reply: reply_rx,
        })
    }
}

impl Drop for AnalysisService {
    fn drop(&mut self) {
        // Closing the queue ends the worker loop.
        self.request_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Analysis worker panicked");
            }
        }
    }
}

fn analysis_worker<C, P>(mut gateway: Gateway<C, P>, requests: Receiver<AnalysisRequest>)
where
    C: CacheStore,
    P: EtymologyProvider,
{
    info!("Analysis worker started");
    for request in requests.iter() {
        let reply = match gateway.lookup(&request.word) {
            Ok(record) => AnalysisReply::Success(record),
            Err(e) => {
                warn!("Analysis {} for '{}' failed: {e}", request.id, request.word);
                AnalysisReply::Failure(e.to_string())
            }
        };
        if request.reply.send(reply).is_err() {
            debug!("Analysis {} finished after its receiver went away", request.id);
        }
    }
    info!("Analysis worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{AnalysisError, MemoryCache};

    struct EchoProvider;

    impl EtymologyProvider for EchoProvider {
        fn fetch(&self, word: &str) -> Result<EtymologyRecord, AnalysisError> {
            if word == "fail" {
                return Err(AnalysisError::EmptyResponse);
            }
            Ok(EtymologyRecord {
                root: word.to_string(),
                ..EtymologyRecord::default()
            })
        }
    }

    fn service() -> AnalysisService {
        AnalysisService::spawn(Gateway::new(MemoryCache::new(), EchoProvider))
    }

    #[test]
    fn replies_arrive_on_their_own_channel() {
        let service = service();
        assert!(service.is_alive());
        let first = service.analyze(RequestId(1), "run").unwrap();
        let second = service.analyze(RequestId(2), "fail").unwrap();

        let reply = first.wait(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(reply.into_result().unwrap().root, "run");
        let reply = second.wait(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(
            reply,
            AnalysisReply::Failure("No content in response".to_string())
        );
        assert_eq!(first.try_take(), Err(ChannelError::Disconnected));
    }

    #[test]
    fn dead_worker_rejects_requests() {
        let service = AnalysisService::disconnected();
        assert!(!service.is_alive());
        assert_eq!(
            service.analyze(RequestId(1), "run").unwrap_err(),
            ChannelError::Disconnected
        );
    }

    #[test]
    fn reply_wire_format() {
        let ok = serde_json::to_value(AnalysisReply::Success(EtymologyRecord::default())).unwrap();
        assert!(ok["success"].is_object());
        let err = serde_json::to_value(AnalysisReply::Failure("boom".to_string())).unwrap();
        assert_eq!(err["failure"], "boom");
    }
}
