use std::time::Instant;

use tagsheet_catalog::{Catalog, Selection};

use crate::error::{PrintError, TransportError};
use crate::job::{Channel, PrinterGroup};
use crate::layout::items_per_row;
use crate::platform::PrintTransport;
use crate::raster::PageRasterizer;
use crate::router::ChannelRouter;

/// What happened to one channel during a print action.
/// 列印動作中單一通道的處理結果。
#[derive(Debug)]
pub enum ChannelOutcome {
    /// No labels were routed to the channel.
    Skipped,
    Submitted { pages: usize },
    Failed(PrintError),
    /// Not attempted because an earlier channel hit a structural error.
    Aborted,
}

impl ChannelOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, ChannelOutcome::Failed(_) | ChannelOutcome::Aborted)
    }
}

/// Per-channel result of [`run_print_action`].
/// [`run_print_action`] 的各通道結果。
#[derive(Debug)]
pub struct PrintReport {
    pub permanent: ChannelOutcome,
    pub non_permanent: ChannelOutcome,
}

impl PrintReport {
    pub fn outcome(&self, channel: Channel) -> &ChannelOutcome {
        match channel {
            Channel::Permanent => &self.permanent,
            Channel::NonPermanent => &self.non_permanent,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.permanent.is_failure() && !self.non_permanent.is_failure()
    }

    pub fn failures(&self) -> Vec<(Channel, &ChannelOutcome)> {
        Channel::ALL
            .into_iter()
            .map(|channel| (channel, self.outcome(channel)))
            .filter(|(_, outcome)| outcome.is_failure())
            .collect()
    }

    pub fn submitted_pages(&self) -> usize {
        Channel::ALL
            .into_iter()
            .map(|channel| match self.outcome(channel) {
                ChannelOutcome::Submitted { pages } => *pages,
                _ => 0,
            })
            .sum()
    }
}

/// Renders and submits both channels in order, permanent first.
/// 依序輸出並送出兩個通道，先處理永久通道。
///
/// Each channel is fully submitted before the next one is rendered. Printer
/// configuration errors and broker rejections are reported per channel.
/// A failed handshake or signature is not retried: the remaining channel
/// reports the same failure without being rendered. Structural failures stop
/// the action and leave the remaining channel `Aborted`.
/// 每個通道送出後才會輸出下一個通道。印表機設定錯誤與代理程式拒絕逐通道回報；
/// 連線或簽章失敗不會重試，其餘通道直接回報相同錯誤。
/// 結構性錯誤會中止動作，其餘通道標記為 `Aborted`。
pub async fn run_print_action<R, T>(
    router: &ChannelRouter<R>,
    selection: &Selection,
    catalog: &Catalog,
    group: Option<&PrinterGroup>,
    transport: &mut T,
) -> Result<PrintReport, PrintError>
where
    R: PageRasterizer,
    T: PrintTransport + ?Sized,
{
    let group = group.ok_or(PrintError::LocationNotFound)?;
    let streams = router.split(selection, catalog);
    if streams.is_empty() {
        return Err(PrintError::NoLabelsSelected);
    }
    items_per_row(router.settings())?;

    tracing::info!(
        location = %group.name,
        permanent = streams.permanent.len(),
        non_permanent = streams.non_permanent.len(),
        "starting print action"
    );

    let mut aborted = false;
    let mut session_error: Option<TransportError> = None;
    let mut outcomes = Vec::with_capacity(Channel::ALL.len());
    for channel in Channel::ALL {
        if aborted {
            outcomes.push(ChannelOutcome::Aborted);
            continue;
        }
        if let Some(err) = &session_error {
            outcomes.push(if streams.stream(channel).is_empty() {
                ChannelOutcome::Skipped
            } else {
                ChannelOutcome::Failed(err.clone().into_print_error(channel))
            });
            continue;
        }
        let profile = group.profile(channel);
        let outcome = match router.render_channel(channel, streams.stream(channel), profile) {
            Ok(None) => ChannelOutcome::Skipped,
            Ok(Some(document)) => {
                let started = Instant::now();
                match transport.submit(&document, profile).await {
                    Ok(()) => {
                        tracing::info!(
                            channel = %channel,
                            printer = %profile.name,
                            pages = document.page_count(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "submitted channel"
                        );
                        ChannelOutcome::Submitted {
                            pages: document.page_count(),
                        }
                    }
                    Err(err) => {
                        tracing::error!(
                            channel = %channel,
                            printer = %profile.name,
                            error = %err,
                            "submission failed"
                        );
                        if !matches!(err, TransportError::Rejected(_)) {
                            session_error = Some(err.clone());
                        }
                        ChannelOutcome::Failed(err.into_print_error(channel))
                    }
                }
            }
            Err(err) => {
                tracing::error!(channel = %channel, error = %err, "rendering failed");
                aborted = err.is_structural();
                ChannelOutcome::Failed(err)
            }
        };
        outcomes.push(outcome);
    }

    let mut outcomes = outcomes.into_iter();
    Ok(PrintReport {
        permanent: outcomes.next().unwrap_or(ChannelOutcome::Aborted),
        non_permanent: outcomes.next().unwrap_or(ChannelOutcome::Aborted),
    })
}
