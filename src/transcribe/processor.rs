use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::provider::{FileState, RemoteFile, TranscriptionProvider};
use crate::utils::format_duration;
use crate::PipelineError;

/// How often and how long to wait for server-side processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,

    /// `None` waits forever
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_wait: None,
        }
    }
}

/// Waits for an uploaded file to become usable for inference
pub struct ReadinessPoller<'a, P: ?Sized> {
    provider: &'a P,
    policy: PollPolicy,
}

impl<'a, P: TranscriptionProvider + ?Sized> ReadinessPoller<'a, P> {
    pub fn new(provider: &'a P, policy: PollPolicy) -> Self {
        Self { provider, policy }
    }

    /// Poll the file state until it is ACTIVE, failing on FAILED or when the bound elapses
    pub async fn wait_until_active(&self, file: &RemoteFile) -> Result<RemoteFile, PipelineError> {
        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::default_spinner()
                .template("   {spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let start_time = Instant::now();
        let mut check_count = 0u32;

        loop {
            check_count += 1;

            let current = match self.provider.get_file(&file.name).await {
                Ok(current) => current,
                Err(e) => {
                    progress.finish_and_clear();
                    return Err(PipelineError::RemoteProcessing(format!(
                        "could not query state of {}: {:#}",
                        file.name, e
                    )));
                }
            };

            tracing::debug!("Check #{} for {}: {:?}", check_count, file.name, current.state);

            match current.state {
                FileState::Active => {
                    progress.finish_and_clear();
                    return Ok(current);
                }
                FileState::Failed => {
                    progress.finish_and_clear();
                    let reason = current
                        .error
                        .unwrap_or_else(|| format!("{} was marked FAILED", file.name));
                    return Err(PipelineError::RemoteProcessing(reason));
                }
                FileState::Processing | FileState::Uploading => {
                    let elapsed = start_time.elapsed();
                    if let Some(max_wait) = self.policy.max_wait {
                        if elapsed >= max_wait {
                            progress.finish_and_clear();
                            return Err(PipelineError::ProcessingTimeout {
                                waited_secs: elapsed.as_secs(),
                            });
                        }
                    }

                    progress.set_message(format!(
                        "Processing... ({} elapsed, check #{})",
                        format_duration(elapsed.as_secs_f64()),
                        check_count
                    ));
                    progress.tick();
                    sleep(self.policy.interval).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockTranscriptionProvider;
    use mockall::Sequence;

    fn remote(state: FileState) -> RemoteFile {
        RemoteFile {
            name: "files/abc".into(),
            uri: "https://example.test/files/abc".into(),
            mime_type: "audio/mp3".into(),
            state,
            error: None,
        }
    }

    fn fast() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_wait: None,
        }
    }

    #[tokio::test]
    async fn test_polls_until_active() {
        let mut provider = MockTranscriptionProvider::new();
        let mut seq = Sequence::new();
        for state in [FileState::Uploading, FileState::Processing, FileState::Active] {
            provider
                .expect_get_file()
                .withf(|name| name == "files/abc")
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(remote(state)));
        }

        let poller = ReadinessPoller::new(&provider, fast());
        let ready = poller.wait_until_active(&remote(FileState::Uploading)).await.unwrap();
        assert_eq!(ready.state, FileState::Active);
    }

    #[tokio::test]
    async fn test_failed_state_is_fatal() {
        let mut provider = MockTranscriptionProvider::new();
        provider.expect_get_file().times(1).returning(|_| {
            Ok(RemoteFile {
                error: Some("unsupported audio (code 3)".into()),
                ..remote(FileState::Failed)
            })
        });

        let poller = ReadinessPoller::new(&provider, fast());
        let err = poller.wait_until_active(&remote(FileState::Processing)).await.unwrap_err();

        match err {
            PipelineError::RemoteProcessing(reason) => {
                assert!(reason.contains("unsupported audio"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_query_error_is_fatal() {
        let mut provider = MockTranscriptionProvider::new();
        provider
            .expect_get_file()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("HTTP 403 Forbidden: permission denied")));

        let poller = ReadinessPoller::new(&provider, fast());
        let err = poller.wait_until_active(&remote(FileState::Processing)).await.unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_max_wait_bounds_polling() {
        let mut provider = MockTranscriptionProvider::new();
        provider
            .expect_get_file()
            .returning(|_| Ok(remote(FileState::Processing)));

        let policy = PollPolicy {
            interval: Duration::from_millis(5),
            max_wait: Some(Duration::from_millis(20)),
        };
        let poller = ReadinessPoller::new(&provider, policy);
        let err = poller.wait_until_active(&remote(FileState::Processing)).await.unwrap_err();

        assert!(matches!(err, PipelineError::ProcessingTimeout { .. }));
    }
}
