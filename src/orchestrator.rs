use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::{
    probe::{Connectivity, ConnectivityProbe},
    recorder::{RecordError, RecordingOutcome, StreamRecorder},
    session::{RecordingTarget, SessionState},
    status::{Availability, NotLiveReason, StatusError, StatusResolver, StreamEndpoint},
    util,
};

#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> Connectivity;
}

#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, target: &RecordingTarget) -> Result<Availability, StatusError>;
}

#[async_trait]
pub trait Record: Send + Sync {
    async fn record(
        &self,
        target: &RecordingTarget,
        endpoint: &StreamEndpoint,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RecordingOutcome, RecordError>;
}

#[async_trait]
impl<'a> Probe for ConnectivityProbe<'a> {
    async fn check(&self) -> Connectivity {
        ConnectivityProbe::check(self).await
    }
}

#[async_trait]
impl<'a> Resolve for StatusResolver<'a> {
    async fn resolve(&self, target: &RecordingTarget) -> Result<Availability, StatusError> {
        StatusResolver::resolve(self, target).await
    }
}

#[async_trait]
impl Record for StreamRecorder {
    async fn record(
        &self,
        target: &RecordingTarget,
        endpoint: &StreamEndpoint,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RecordingOutcome, RecordError> {
        StreamRecorder::record(self, target, endpoint, shutdown).await
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("Recording failed: {0}")]
    Output(#[from] RecordError),
}

#[derive(Debug, PartialEq)]
pub enum Step {
    /// Not ready yet; wait one interval before the next step.
    Retry,
    /// A recording attempt ran to completion; step again immediately.
    Recorded(RecordingOutcome),
}

/// Drives probe -> resolve -> record for a single target.
pub struct Orchestrator<P, R, C> {
    target: RecordingTarget,
    interval: Duration,
    probe: P,
    resolver: R,
    recorder: C,
    state: SessionState,
}

impl<P: Probe, R: Resolve, C: Record> Orchestrator<P, R, C> {
    pub fn new(
        target: RecordingTarget,
        interval: Duration,
        probe: P,
        resolver: R,
        recorder: C,
    ) -> Self {
        Self {
            target,
            interval,
            probe,
            resolver,
            recorder,
            state: SessionState::Unknown,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// One pass of the cycle. Only an output failure is returned as an error.
    pub async fn step(&mut self, shutdown: &watch::Receiver<bool>) -> Result<Step, RecordError> {
        let secs = self.interval.as_secs();

        self.state = match self.probe.check().await {
            Connectivity::Reachable => SessionState::NetworkUp,
            Connectivity::Unreachable => SessionState::NetworkDown,
        };
        if self.state == SessionState::NetworkDown {
            warn!("{} Network unreachable, retry after {}s.", self.state, secs);
            return Ok(Step::Retry);
        }

        let endpoint = match self.resolver.resolve(&self.target).await {
            Ok(Availability::Live(endpoint)) => endpoint,
            Ok(Availability::NotLive(reason)) => {
                match reason {
                    NotLiveReason::Offline => {
                        self.state = SessionState::NotLive;
                        info!("{} Live has not started, retry after {}s.", self.state, secs);
                    }
                    NotLiveReason::MissingEndpoint => {
                        self.state = SessionState::LiveDetected;
                        warn!(
                            "{} Live has started but the stream endpoint is missing, retry after {}s.",
                            self.state, secs
                        );
                    }
                    NotLiveReason::Malformed(e) => {
                        self.state = SessionState::NotLive;
                        warn!(
                            "{} Unreadable status response ({}), retry after {}s.",
                            self.state, e, secs
                        );
                    }
                }
                return Ok(Step::Retry);
            }
            Err(e) => {
                warn!("{} {}, retry after {}s.", self.state, e, secs);
                return Ok(Step::Retry);
            }
        };

        self.state = SessionState::EndpointResolved;
        if *shutdown.borrow() {
            info!("{} Live has started, but shutting down.", self.state);
            return Ok(Step::Retry);
        }
        info!("{} Live has started, try to record.", self.state);

        self.state = SessionState::Recording;
        match self
            .recorder
            .record(&self.target, &endpoint, shutdown.clone())
            .await
        {
            Ok(outcome) => {
                self.state = SessionState::Closed;
                match &outcome {
                    RecordingOutcome::ClosedNormally { .. } => {
                        info!("{} Stream connection closed.", self.state)
                    }
                    RecordingOutcome::ClosedWithTransportError { error, .. } => {
                        warn!("{} Stream connection lost: {}", self.state, error)
                    }
                }
                Ok(Step::Recorded(outcome))
            }
            Err(e) => {
                self.state = SessionState::Failed;
                error!("{} {}", self.state, e);
                Err(e)
            }
        }
    }

    /// Loop until `shutdown` is set. Returns early only on output failure.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), WatchError> {
        info!(
            "Watching {} every {}s",
            self.target,
            self.interval.as_secs()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.step(&shutdown).await? {
                Step::Recorded(_) => continue,
                Step::Retry => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.interval) => {}
                        _ = util::wait_for_shutdown(&mut shutdown) => break,
                    }
                }
            }
        }

        info!("Stopped watching {}", self.target);
        Ok(())
    }
}
